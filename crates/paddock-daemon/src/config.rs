//! Daemon configuration.
//!
//! Built programmatically or loaded from the environment:
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `PADDOCK_SOCKET` | protocol socket path | `paddock.sock` |
//! | `PADDOCK_DB` | SQLite database path (`:memory:` allowed) | `paddock.db` |
//! | `PADDOCK_OPERATOR_SECRET` | operator login secret | unset |
//!
//! The operator secret is optional: without one the daemon still serves
//! bettors, but every operator login fails closed. A configured secret
//! below the guard's minimum length is rejected at load time rather than
//! silently weakening logins.

use std::path::PathBuf;

use paddock_core::guard::{AccessGuard, GuardError, MIN_SECRET_LEN};
use secrecy::SecretString;
use thiserror::Error;
use tracing::warn;

/// Default socket path.
pub const DEFAULT_SOCKET: &str = "paddock.sock";

/// Default database path.
pub const DEFAULT_DB: &str = "paddock.db";

/// Errors from building daemon configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configured operator secret is below the minimum length.
    #[error("PADDOCK_OPERATOR_SECRET must be at least {MIN_SECRET_LEN} bytes")]
    SecretTooShort,
}

/// Daemon configuration.
#[derive(Clone)]
pub struct DaemonConfig {
    /// Protocol socket path.
    pub socket_path: PathBuf,
    /// SQLite database path.
    pub db_path: String,
    operator_secret: Option<SecretString>,
}

impl DaemonConfig {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> DaemonConfigBuilder {
        DaemonConfigBuilder::default()
    }

    /// Loads configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SecretTooShort`] for a configured but
    /// under-length operator secret.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = Self::builder();
        if let Ok(socket) = std::env::var("PADDOCK_SOCKET") {
            builder = builder.socket_path(socket);
        }
        if let Ok(db) = std::env::var("PADDOCK_DB") {
            builder = builder.db_path(db);
        }
        if let Ok(secret) = std::env::var("PADDOCK_OPERATOR_SECRET") {
            builder = builder.operator_secret(SecretString::from(secret));
        }
        builder.build()
    }

    /// Builds the access guard from the configured secret.
    ///
    /// `None` means no secret is configured; the orchestrator then fails
    /// every operator login closed.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::SecretTooShort`] if the stored secret is
    /// under-length (only reachable when the builder's check was skipped
    /// by constructing the config by hand).
    pub fn operator_guard(&self) -> Result<Option<AccessGuard>, GuardError> {
        self.operator_secret.clone().map(AccessGuard::new).transpose()
    }
}

/// Builder for [`DaemonConfig`].
#[derive(Default)]
pub struct DaemonConfigBuilder {
    socket_path: Option<PathBuf>,
    db_path: Option<String>,
    operator_secret: Option<SecretString>,
}

impl DaemonConfigBuilder {
    /// Sets the socket path.
    #[must_use]
    pub fn socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket_path = Some(path.into());
        self
    }

    /// Sets the database path.
    #[must_use]
    pub fn db_path(mut self, path: impl Into<String>) -> Self {
        self.db_path = Some(path.into());
        self
    }

    /// Sets the operator secret.
    #[must_use]
    pub fn operator_secret(mut self, secret: SecretString) -> Self {
        self.operator_secret = Some(secret);
        self
    }

    /// Finalizes the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SecretTooShort`] for an under-length secret.
    pub fn build(self) -> Result<DaemonConfig, ConfigError> {
        use secrecy::ExposeSecret;

        if let Some(secret) = &self.operator_secret {
            if secret.expose_secret().len() < MIN_SECRET_LEN {
                return Err(ConfigError::SecretTooShort);
            }
        } else {
            warn!("no operator secret configured; operator logins will fail closed");
        }
        Ok(DaemonConfig {
            socket_path: self.socket_path.unwrap_or_else(|| PathBuf::from(DEFAULT_SOCKET)),
            db_path: self.db_path.unwrap_or_else(|| DEFAULT_DB.to_string()),
            operator_secret: self.operator_secret,
        })
    }
}
