#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Too many attempts, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Invalid session state: {0}")]
    InvalidState(String),

    #[error("Store change feed closed")]
    StoreClosed,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Message shown inline to the user. Store and internal causes are logged
    /// here and replaced by a generic message.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Unauthorized(msg)
            | AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::Conflict(msg)
            | AppError::InvalidState(msg) => msg.clone(),
            AppError::Forbidden | AppError::RateLimited { .. } | AppError::StoreClosed => {
                self.to_string()
            }
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                "Something went wrong, please try again".into()
            }
            AppError::Migration(e) => {
                tracing::error!(error = %e, "Migration error");
                "Something went wrong, please try again".into()
            }
            AppError::Serialization(e) => {
                tracing::error!(error = %e, "Serialization error");
                "Something went wrong, please try again".into()
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "Internal error");
                "Something went wrong, please try again".into()
            }
        }
    }

    /// Failures the user can fix by trying again with different input.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Unauthorized(_)
                | AppError::Validation(_)
                | AppError::Conflict(_)
                | AppError::RateLimited { .. }
        )
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(first_message(&errors))
    }
}

/// Picks a single message so the caller can show one inline error at a time.
/// Fields are visited in name order for a stable result.
fn first_message(errors: &validator::ValidationErrors) -> String {
    let field_errors = errors.field_errors();
    let mut fields: Vec<_> = field_errors.keys().copied().collect();
    fields.sort_unstable();

    fields
        .into_iter()
        .filter_map(|field| field_errors.get(field).and_then(|errs| errs.first()))
        .map(|err| match &err.message {
            Some(msg) => msg.to_string(),
            None => format!("Invalid value ({})", err.code),
        })
        .next()
        .unwrap_or_else(|| "Invalid input".into())
}

pub type AppResult<T> = Result<T, AppError>;
