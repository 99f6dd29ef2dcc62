use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Store error ({status}): {message}")]
    Store { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// True when the failure is the store rejecting an already-present key.
    /// Callers treat this as an expected outcome, not an error.
    pub fn is_duplicate(&self) -> bool {
        match self {
            AppError::Store { status, message } => {
                *status == 409 || message.to_lowercase().contains("duplicate")
            }
            AppError::Database(sqlx::Error::Database(db)) => db.is_unique_violation(),
            _ => false,
        }
    }
}
