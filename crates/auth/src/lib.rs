//! Bearer credential verification for chat participants.
//!
//! Identity issuance lives in the account service; this crate only validates
//! the JWT a client presents at handshake time and extracts the participant
//! identity from it.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

use courier_config::AuthConfig;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing credential")]
    MissingCredential,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token creation failed: {0}")]
    TokenCreation(String),
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // Subject (participant identity)
    pub exp: usize,  // Expiration time
    pub iat: usize,  // Issued at
    pub iss: String, // Issuer
    pub aud: String, // Audience
    pub jti: String, // JWT ID
}

/// Validates bearer tokens and yields the participant identity carried in
/// their subject claim. Constructed once per process and shared.
#[derive(Clone)]
pub struct TokenVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    token_ttl: Duration,
}

impl TokenVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_ref()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_ref()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            token_ttl: Duration::from_secs(config.token_ttl_seconds),
        }
    }

    /// Validate a bearer token and return the participant identity it names.
    pub fn verify(&self, token: &str) -> Result<String, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::MissingCredential);
        }

        let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|err| AuthError::InvalidToken(err.to_string()))?;

        Ok(token_data.claims.sub)
    }

    /// Issue a token for the given participant. Used by tests and by
    /// development tooling; production tokens come from the account service
    /// with the same secret and claims.
    pub fn issue(&self, participant_id: &str) -> Result<String, AuthError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| AuthError::TokenCreation("system time error".to_string()))?;

        let exp = now + self.token_ttl;

        let claims = Claims {
            sub: participant_id.to_string(),
            exp: exp.as_secs() as usize,
            iat: now.as_secs() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|err| AuthError::TokenCreation(err.to_string()))
    }
}
