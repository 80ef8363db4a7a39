use anyhow::Context;
use clap::{Parser, Subcommand};
use courier_backend_runtime::{telemetry, BackendServices};
use courier_config::load as load_config;
use courier_gateway::{create_router, GatewayState};
use sqlx::Row;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "courier-backend")]
#[command(about = "Courier chat backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default)
    Serve,
    /// Dump stored chat messages from the database
    DumpMessages,
    /// Issue a bearer token for a participant id (development helper)
    IssueToken {
        /// Participant identity to put in the token subject
        participant_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server().await,
        Commands::DumpMessages => dump_messages().await,
        Commands::IssueToken { participant_id } => issue_token(&participant_id).await,
    }
}

async fn run_server() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    info!("starting Courier backend");

    let config = load_config().context("failed to load configuration")?;

    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    let state = GatewayState::new(services.db_pool.clone(), &config);
    let app = create_router(state);

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(courier_backend_runtime::shutdown_signal())
        .await
        .context("http server error")?;

    info!("backend shut down");
    Ok(())
}

async fn dump_messages() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    let config = load_config().context("failed to load configuration")?;

    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    let messages = sqlx::query(
        r#"
        SELECT id, public_id, sender_id, receiver_id, kind, text, file_url, file_name, created_at
        FROM messages
        ORDER BY created_at ASC
        "#,
    )
    .fetch_all(&services.db_pool)
    .await
    .context("failed to fetch messages")?;

    if messages.is_empty() {
        println!("No messages found in database");
        return Ok(());
    }

    println!("Found {} messages:", messages.len());
    println!(
        "{:<5} {:<26} {:<26} {:<26} {:<8} {:<40} {:<25}",
        "ID", "Public ID", "Sender", "Receiver", "Kind", "Text (truncated)", "Created At"
    );
    println!("{}", "-".repeat(160));

    for message in messages {
        let id: i64 = message.get("id");
        let public_id: String = message.get("public_id");
        let sender_id: String = message.get("sender_id");
        let receiver_id: String = message.get("receiver_id");
        let kind: String = message.get("kind");
        let text: Option<String> = message.get("text");
        let created_at: String = message.get("created_at");

        let text_display = match text {
            Some(text) if text.len() > 37 => format!("{}...", &text[..34]),
            Some(text) => text,
            None => String::new(),
        };

        println!(
            "{:<5} {:<26} {:<26} {:<26} {:<8} {:<40} {:<25}",
            id, public_id, sender_id, receiver_id, kind, text_display, created_at
        );
    }

    Ok(())
}

async fn issue_token(participant_id: &str) -> anyhow::Result<()> {
    let config = load_config().context("failed to load configuration")?;

    let verifier = courier_auth::TokenVerifier::new(&config.auth);
    let token = verifier
        .issue(participant_id)
        .context("failed to issue token")?;

    println!("{token}");
    Ok(())
}
