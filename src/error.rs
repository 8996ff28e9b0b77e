use thiserror::Error;

/// Failures surfaced by the poll engine and its repository boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    /// Bad input caught before anything reaches the backend.
    #[error("validation error: {0}")]
    Validation(String),

    /// The backend could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status.
    #[error("server error: {0}")]
    Server(String),

    /// The backend has no poll with this id.
    #[error("poll {0} not found")]
    NotFound(i64),

    /// The payload did not have the shape the contract promises.
    #[error("invalid format: {0}")]
    InvalidFormat(String),
}

impl PollError {
    pub fn validation(msg: impl Into<String>) -> Self {
        PollError::Validation(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, PollError::Validation(_))
    }
}

impl From<sqlx::Error> for PollError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => PollError::Network(err.to_string()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                PollError::InvalidFormat(err.to_string())
            }
            other => PollError::Server(other.to_string()),
        }
    }
}

pub type Result<T, E = PollError> = std::result::Result<T, E>;
