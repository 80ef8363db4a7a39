//! Test plan for the `courier-config` crate.
//!
//! These tests exercise the configuration loader across default handling,
//! file discovery, environment overrides, and validation behaviour.

use std::fs;
use std::path::{Path, PathBuf};

use serial_test::serial;
use tempfile::TempDir;

use courier_config::{load, AppConfig, AuthConfig, ChatConfig, HttpConfig};

const ENV_VARS_TO_RESET: &[&str] = &[
    "COURIER_CONFIG",
    "COURIER__AUTH__AUDIENCE",
    "COURIER__AUTH__ISSUER",
    "COURIER__AUTH__JWT_SECRET",
    "COURIER__AUTH__TOKEN_TTL_SECONDS",
    "COURIER__CHAT__MAX_UPLOAD_BYTES",
    "COURIER__CHAT__OUTBOUND_BUFFER",
    "COURIER__CHAT__UPLOADS_DIR",
    "COURIER__DATABASE__MAX_CONNECTIONS",
    "COURIER__DATABASE__URL",
    "COURIER__HTTP__ADDRESS",
    "COURIER__HTTP__PORT",
];

struct TestContext {
    vars: Vec<(String, Option<String>)>,
    original_dir: Option<PathBuf>,
}

impl TestContext {
    fn new() -> Self {
        Self {
            vars: Vec::new(),
            original_dir: None,
        }
    }

    fn reset_environment(&mut self) {
        for key in ENV_VARS_TO_RESET {
            self.remove_var(key);
        }
    }

    fn set_var(&mut self, key: &str, value: impl AsRef<str>) {
        let previous = std::env::var(key).ok();
        std::env::set_var(key, value.as_ref());
        self.vars.push((key.to_string(), previous));
    }

    fn remove_var(&mut self, key: &str) {
        let previous = std::env::var(key).ok();
        std::env::remove_var(key);
        self.vars.push((key.to_string(), previous));
    }

    fn set_current_dir(&mut self, dir: &Path) {
        if self.original_dir.is_none() {
            self.original_dir =
                Some(std::env::current_dir().expect("failed to capture current directory"));
        }
        std::env::set_current_dir(dir).expect("failed to set current directory");
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if let Some(original) = self.original_dir.take() {
            let _ = std::env::set_current_dir(original);
        }

        while let Some((key, value)) = self.vars.pop() {
            match value {
                Some(val) => std::env::set_var(&key, val),
                None => std::env::remove_var(&key),
            }
        }
    }
}

fn write_config_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create config directories");
    }
    fs::write(path, contents).expect("failed to write config file");
}

#[test]
#[serial]
fn load_uses_default_values_when_no_files_found() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    let config = load().expect("configuration load should succeed without files");
    let defaults = AppConfig::default();

    assert_eq!(config.http.address, defaults.http.address);
    assert_eq!(config.http.port, defaults.http.port);
    assert_eq!(config.database.url, defaults.database.url);
    assert_eq!(
        config.database.max_connections,
        defaults.database.max_connections
    );
    assert_eq!(config.auth.jwt_secret, defaults.auth.jwt_secret);
    assert_eq!(config.auth.issuer, defaults.auth.issuer);
    assert_eq!(config.chat.outbound_buffer, defaults.chat.outbound_buffer);
    assert_eq!(config.chat.uploads_dir, defaults.chat.uploads_dir);
}

#[test]
#[serial]
fn load_picks_first_available_file_in_search_order() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "courier.toml",
        r#"
        [http]
        port = 4242
        "#,
    );
    write_config_file(
        temp_dir.path(),
        "config/courier.toml",
        r#"
        [http]
        port = 5151
        "#,
    );

    let config = load().expect("configuration load should pick the first file");
    assert_eq!(config.http.port, 4242);
}

#[test]
#[serial]
fn load_merges_partial_file_with_defaults() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "courier.toml",
        r#"
        [http]
        port = 8181

        [chat]
        outbound_buffer = 128
        "#,
    );

    let config = load().expect("configuration load should succeed");
    let defaults = AppConfig::default();

    assert_eq!(config.http.port, 8181);
    assert_eq!(config.http.address, defaults.http.address);
    assert_eq!(config.chat.outbound_buffer, 128);
    assert_eq!(config.chat.uploads_dir, defaults.chat.uploads_dir);
    assert_eq!(config.database.url, defaults.database.url);
}

#[test]
#[serial]
fn load_applies_environment_overrides() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "courier.toml",
        r#"
        [http]
        port = 3030
        "#,
    );

    ctx.set_var("COURIER__HTTP__PORT", "9090");

    let config = load().expect("configuration load should honour env overrides");
    assert_eq!(config.http.port, 9090);
}

#[test]
#[serial]
fn load_supports_database_url_environment_variable() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    let url = "sqlite:///var/lib/courier/courier.db";
    ctx.set_var("COURIER__DATABASE__URL", url);

    let config = load().expect("configuration load should read database env override");
    assert_eq!(config.database.url, url);
}

#[test]
#[serial]
fn load_reads_jwt_secret_from_env() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    ctx.set_var("COURIER__AUTH__JWT_SECRET", "super-secret-for-tests");

    let config = load().expect("configuration load should read auth env override");
    assert_eq!(config.auth.jwt_secret, "super-secret-for-tests");
}

#[test]
#[serial]
fn load_errors_on_invalid_toml_contents() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "courier.toml",
        r#"
        [http]
        port = "not-a-number
        "#,
    );

    let error = load().expect_err("invalid TOML should cause load to fail");
    let message = error.to_string();
    assert!(
        message.contains("invalid configuration")
            || message.contains("unable to build configuration"),
        "unexpected error message: {message}"
    );
}

#[test]
fn auth_config_defaults_are_populated() {
    let defaults = AuthConfig::default();
    assert_eq!(defaults.issuer, "courier");
    assert_eq!(defaults.audience, "courier-clients");
    assert_eq!(defaults.token_ttl_seconds, 86_400);
}

#[test]
fn chat_config_defaults_bound_buffers_and_uploads() {
    let defaults = ChatConfig::default();
    assert_eq!(defaults.outbound_buffer, 64);
    assert_eq!(defaults.max_upload_bytes, 10 * 1024 * 1024);
}

#[test]
fn http_config_defaults_match_expected_host_and_port() {
    let defaults = HttpConfig::default();
    assert_eq!(defaults.address, "127.0.0.1");
    assert_eq!(defaults.port, 8080);
}
