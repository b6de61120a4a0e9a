use thiserror::Error;

/// Common error types used across the daemon.
///
/// The variants split into two classes. Startup and spool-integrity failures
/// are fatal and stop the process; fetch and announce failures are scoped to
/// a single source (or a single item) and are retried on the next due cycle.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Spool initialization error: {0}")]
    StoreInit(#[source] sqlx::Error),

    #[error("Spool error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("Feed error: {0}")]
    Fetch(String),

    #[error("Announce error: {0}")]
    Notify(String),
}

impl AppError {
    /// Whether the daemon must stop when this error surfaces.
    pub fn is_fatal(&self) -> bool {
        match self {
            AppError::Config(_) | AppError::StoreInit(_) | AppError::Store(_) => true,
            AppError::Fetch(_) | AppError::Notify(_) => false,
        }
    }
}
