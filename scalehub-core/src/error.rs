use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScaleError {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("persistence error: {0}")]
    Persistence(#[from] std::io::Error),

    #[error("corrupt record for machine {machine_id}: {reason}")]
    CorruptRecord { machine_id: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("http error: {0}")]
    Http(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ScaleError {
    /// Whether the caller caused the failure (bad identifier or payload).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ScaleError::InvalidPayload(_) | ScaleError::InvalidRequest(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ScaleError>;
