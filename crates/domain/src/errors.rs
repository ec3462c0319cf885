//! Error types used throughout the scheduler

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for delayq
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum DelayqError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Schedule error: {0}")]
    Schedule(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for DelayqError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for delayq operations
pub type Result<T> = std::result::Result<T, DelayqError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let err = DelayqError::Queue("receive failed".into());
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, r#"{"type":"Queue","message":"receive failed"}"#);
    }

    #[test]
    fn json_errors_become_serialization_errors() {
        let parse = serde_json::from_str::<u32>("nope").unwrap_err();
        assert!(matches!(DelayqError::from(parse), DelayqError::Serialization(_)));
    }
}
