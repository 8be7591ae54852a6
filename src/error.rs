use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Evidence storage failed: {0}")]
    Storage(String),
}

impl AppError {
    pub fn plan_not_found(id: &str) -> Self {
        Self::NotFound(format!("plan id {id}"))
    }

    /// True for failures the caller can fix by resubmitting corrected input.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}
