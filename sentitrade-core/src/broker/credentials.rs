//! Opaque API credential supply.
//!
//! Gateways ask a [`CredentialProvider`] for keys at construction time and
//! never read them from config files.

use std::fmt;
use thiserror::Error;

pub const ALPACA_KEY_VAR: &str = "ALPACA_API_KEY";
pub const ALPACA_SECRET_VAR: &str = "ALPACA_API_SECRET";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("environment variable {var} is not set")]
    Missing { var: String },

    #[error("credential {name} is empty")]
    Empty { name: String },
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub key_id: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(key_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            secret: secret.into(),
        }
    }

    /// Header pairs for Alpaca's REST APIs.
    pub fn alpaca_headers(&self) -> [(&'static str, String); 2] {
        [
            ("APCA-API-KEY-ID", self.key_id.clone()),
            ("APCA-API-SECRET-KEY", self.secret.clone()),
        ]
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key_id", &redact(&self.key_id))
            .field("secret", &"***")
            .finish()
    }
}

fn redact(value: &str) -> String {
    let shown: String = value.chars().take(4).collect();
    format!("{shown}***")
}

pub trait CredentialProvider: Send + Sync {
    fn credentials(&self) -> Result<Credentials, CredentialError>;
}

/// Reads a key/secret pair from the process environment.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    key_var: String,
    secret_var: String,
}

impl EnvCredentials {
    pub fn new(key_var: impl Into<String>, secret_var: impl Into<String>) -> Self {
        Self {
            key_var: key_var.into(),
            secret_var: secret_var.into(),
        }
    }

    pub fn alpaca() -> Self {
        Self::new(ALPACA_KEY_VAR, ALPACA_SECRET_VAR)
    }

    fn read(var: &str) -> Result<String, CredentialError> {
        let value = std::env::var(var).map_err(|_| CredentialError::Missing {
            var: var.to_string(),
        })?;
        let value = value.trim().to_string();
        if value.is_empty() {
            return Err(CredentialError::Empty {
                name: var.to_string(),
            });
        }
        Ok(value)
    }
}

impl CredentialProvider for EnvCredentials {
    fn credentials(&self) -> Result<Credentials, CredentialError> {
        Ok(Credentials::new(
            Self::read(&self.key_var)?,
            Self::read(&self.secret_var)?,
        ))
    }
}

/// Fixed credentials, for tests and embedding.
#[derive(Debug, Clone)]
pub struct StaticCredentials(pub Credentials);

impl CredentialProvider for StaticCredentials {
    fn credentials(&self) -> Result<Credentials, CredentialError> {
        if self.0.key_id.is_empty() {
            return Err(CredentialError::Empty {
                name: "key_id".into(),
            });
        }
        Ok(self.0.clone())
    }
}
