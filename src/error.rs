use thiserror::Error;

/// Errors surfaced by drivers, transactions and request handlers.
///
/// Nothing in this crate retries; every error is handed back to the caller
/// untouched so retry policy can live where the business context is.
#[derive(Debug, Error)]
pub enum DriverError {
    #[cfg(feature = "embedded")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Transaction state error: {0}")]
    TransactionStateError(String),

    #[error("Statement execution error: {0}")]
    ExecutionError(String),

    #[error("Resource error: {0}")]
    ResourceError(String),
}

impl DriverError {
    /// True for errors raised while the engine ran a statement, including
    /// native engine failures such as lock timeouts.
    #[must_use]
    pub fn is_execution(&self) -> bool {
        match self {
            Self::ExecutionError(_) => true,
            #[cfg(feature = "embedded")]
            Self::SqliteError(_) => true,
            _ => false,
        }
    }

    #[must_use]
    pub fn is_transaction_state(&self) -> bool {
        matches!(self, Self::TransactionStateError(_))
    }

    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::ConfigError(_))
    }

    #[must_use]
    pub fn is_resource(&self) -> bool {
        matches!(self, Self::ResourceError(_))
    }
}

impl From<tokio::task::JoinError> for DriverError {
    fn from(err: tokio::task::JoinError) -> Self {
        DriverError::ResourceError(format!("blocking engine task failed: {err}"))
    }
}
