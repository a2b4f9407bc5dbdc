//! Error types for the pub/sub core.

use crate::types::SubscriptionId;
use thiserror::Error;

/// Main error type for pub/sub operations.
#[derive(Debug, Error)]
pub enum PubSubError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(SubscriptionId),

    #[error("Invalid subscription id: {0}")]
    InvalidSubscriptionId(String),

    #[error("Invalid filter on field '{field}': {reason}")]
    InvalidFilter { field: String, reason: String },

    #[error("Unknown comparison operator '{operator}' on field '{field}'")]
    UnknownOperator { field: String, operator: String },

    #[error("Invalid projection on field '{field}': {reason}")]
    InvalidProjection { field: String, reason: String },

    #[error("Invalid channel name: {0}")]
    InvalidChannel(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Pub/sub is disabled")]
    Disabled,
}

impl PubSubError {
    /// True for errors caused by a malformed filter or projection.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            PubSubError::InvalidFilter { .. }
                | PubSubError::UnknownOperator { .. }
                | PubSubError::InvalidProjection { .. }
                | PubSubError::InvalidChannel(_)
        )
    }
}

impl From<serde_json::Error> for PubSubError {
    fn from(e: serde_json::Error) -> Self {
        PubSubError::Serialization(e.to_string())
    }
}

/// Result type for pub/sub operations.
pub type Result<T> = std::result::Result<T, PubSubError>;
