use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("{operation} failed with HTTP status {status}")]
    Status { operation: &'static str, status: u16 },

    #[error("Failed to decode {operation} response: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

impl BackendError {
    /// HTTP status carried by the failure, if the backend answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Status { status, .. } => Some(*status),
            BackendError::NotFound(_) => Some(404),
            _ => None,
        }
    }

    /// True when the backend rejected the credentials
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }
}

pub type BackendResult<T> = Result<T, BackendError>;
