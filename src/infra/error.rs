use std::path::PathBuf;

use thiserror::Error;

/// Failures while wiring the process: storage, fixtures, telemetry.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("failed to read `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("site fixture is invalid: {message}")]
    Fixture { message: String },
    #[error("database unavailable: {0}")]
    Database(#[from] sqlx::Error),
    #[error("option schema migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
}

impl InfraError {
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub fn fixture(message: impl Into<String>) -> Self {
        Self::Fixture {
            message: message.into(),
        }
    }

    /// Whether the failure came from the option database.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Migration(_))
    }
}
