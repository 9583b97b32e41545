//! Error types for sessions and the session factory.

use lazyorm_intercept::{InterceptError, StorageError};
use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors that can occur in session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session has been closed.
    #[error("session is closed")]
    Closed,

    /// The session is open but has no usable connection.
    #[error("session is not connected")]
    NotConnected,

    /// No persister is registered under this entity name.
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    /// A new entity was persisted without a value for a lazy property.
    #[error("cannot persist {entity_name}: lazy property '{field}' has no value")]
    UnsetLazyProperty { entity_name: String, field: String },

    /// Storage failure from a persister.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Failure raised by an entity's interception logic.
    #[error(transparent)]
    Intercept(#[from] InterceptError),

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for SessionError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}
