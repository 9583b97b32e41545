//! Error types for interception and lazy initialization.

use std::fmt;
use thiserror::Error;

/// Result type for interception operations.
pub type InterceptResult<T> = Result<T, InterceptError>;

/// Result type for persister fetches.
pub type StorageResult<T> = Result<T, StorageError>;

/// Why a lazy property could not be initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LazyInitFailure {
    /// The entity is detached: no session is bound to its interceptor.
    NoSession,
    /// A session is bound but it has been closed, disconnected or dropped.
    SessionNotConnected,
    /// The property was read while its entity's lazy properties were being
    /// fetched. The raw state is still unfetched at that point.
    InitializationInProgress,
}

impl fmt::Display for LazyInitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSession => f.write_str("entity with lazy properties is not associated with a session"),
            Self::SessionNotConnected => f.write_str("session is closed or not connected"),
            Self::InitializationInProgress => f.write_str("lazy properties are being initialized"),
        }
    }
}

/// Errors raised from an intercepted property access.
#[derive(Debug, Error)]
pub enum InterceptError {
    /// Usage error: the lazy property cannot be fetched from here.
    #[error("could not initialize lazy property '{field}' of {entity_name}: {reason}")]
    LazyInitialization {
        entity_name: String,
        field: String,
        reason: LazyInitFailure,
    },

    /// The bound session's factory has no persister for the entity.
    #[error("no persister registered for entity {0}")]
    UnknownEntity(String),

    /// The persister returned the unfetched marker instead of a value.
    #[error("persister for {entity_name} returned no value for lazy property '{field}'")]
    UnfetchedResult { entity_name: String, field: String },

    /// A raw value could not be converted to or from the attribute's type.
    #[error("conversion error for property '{field}': {source}")]
    Conversion {
        field: String,
        #[source]
        source: serde_json::Error,
    },

    /// The attribute is not mapped on the entity.
    #[error("unknown property '{field}' on {entity_name}")]
    UnknownAttribute { entity_name: String, field: String },

    /// Failure of the backing fetch, propagated unchanged.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl InterceptError {
    /// Returns the lazy-initialization failure reason, if this is one.
    pub const fn lazy_init_failure(&self) -> Option<LazyInitFailure> {
        match self {
            Self::LazyInitialization { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

/// Errors surfaced by a persister's storage fetch.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No row for the entity identifier.
    #[error("entity not found: {entity_name}#{id}")]
    NotFound { entity_name: String, id: String },

    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization of a stored value.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored or requested data does not fit the mapping.
    #[error("invalid data: {0}")]
    InvalidData(String),
}
