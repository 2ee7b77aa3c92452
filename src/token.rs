//! Manage signed session tokens.

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::Token as TokenConfig;
use crate::error::{Result, ServerError};
use crate::user::{Role, User};

/// Secrets shipped in sample configuration files.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me", "changeme", "secret"];

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum TokenError {
    #[error("token secret is empty, set `TOKEN_SECRET`")]
    EmptySecret,
    #[error("token secret is a well-known placeholder, set `TOKEN_SECRET`")]
    PlaceholderSecret,
}

/// Pieces of information asserted on a session token.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Recipients that the token is intended for.
    pub aud: String,
    /// Expiration time, in seconds since epoch.
    pub exp: u64,
    /// Issued at, in seconds since epoch.
    pub iat: u64,
    /// Issuer.
    pub iss: String,
    /// User ID.
    pub sub: String,
    pub role: Role,
}

impl Claims {
    /// Numeric user ID carried by `sub`.
    pub fn user_id(&self) -> Result<i64> {
        self.sub.parse().map_err(|_| ServerError::Unauthorized)
    }
}

/// Issue and check session tokens.
#[derive(Clone)]
pub struct TokenManager {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    lifetime: u64,
}

impl TokenManager {
    /// Create a new [`TokenManager`] instance.
    ///
    /// Refuses an empty or placeholder secret.
    pub fn new(
        issuer: &str,
        config: &TokenConfig,
    ) -> std::result::Result<Self, TokenError> {
        let secret = config.secret.trim();
        if secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }
        if PLACEHOLDER_SECRETS.contains(&secret.to_ascii_lowercase().as_str()) {
            return Err(TokenError::PlaceholderSecret);
        }

        Ok(Self {
            algorithm: Algorithm::HS256,
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: issuer.to_owned(),
            audience: config.audience.clone(),
            lifetime: config.lifetime,
        })
    }

    /// Token lifetime in seconds.
    pub fn lifetime(&self) -> u64 {
        self.lifetime
    }

    /// Sign a token for `user`.
    pub fn create(&self, user: &User) -> Result<String> {
        let time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|err| ServerError::internal("system clock before epoch", err))?
            .as_secs();
        let claims = Claims {
            aud: self.audience.clone(),
            exp: time + self.lifetime,
            iat: time,
            iss: self.issuer.clone(),
            sub: user.id.to_string(),
            role: user.role,
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|err| ServerError::internal("cannot sign session token", err))
    }

    /// Decode and check a token. Any failure is [`ServerError::Unauthorized`].
    pub fn decode(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(self.algorithm);
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|err| {
                tracing::debug!(error = %err, "rejected session token");
                ServerError::Unauthorized
            })
    }
}
