//! Checkpoint errors.

use thiserror::Error;

/// Checkpoint error types.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// State not found.
    #[error("Queue state not found: {0}")]
    NotFound(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid state data.
    #[error("Invalid state data: {0}")]
    InvalidData(String),

    /// Storage backend error.
    #[error("Storage error: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = CheckpointError::NotFound("abc".to_string());
        assert!(err.to_string().contains("not found"));
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn test_io_from() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: CheckpointError = io.into();
        assert!(matches!(err, CheckpointError::Io(_)));
    }
}
