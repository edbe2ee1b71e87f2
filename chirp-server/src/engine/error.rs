use chirp_types::Email;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum EngagementError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Insufficient points to transfer: have {available}, need {required}")]
    InsufficientPoints { available: i64, required: i64 },

    #[error("Points can only be transferred once a day")]
    AlreadyTransferredToday,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl EngagementError {
    pub fn user_not_found(email: &Email) -> Self {
        EngagementError::NotFound(format!("user {}", email))
    }

    pub fn post_not_found(post_id: &Uuid) -> Self {
        EngagementError::NotFound(format!("post {}", post_id))
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        EngagementError::InvalidInput(message.into())
    }
}

pub type EngagementResult<T> = Result<T, EngagementError>;
