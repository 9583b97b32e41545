//! Error types for enhancement, transformation and class loading.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for enhancer operations.
pub type EnhanceResult<T> = Result<T, EnhancementError>;

/// Errors raised while enhancing a single descriptor.
#[derive(Debug, Error)]
pub enum EnhancementError {
    /// The bytes are not a valid mapping descriptor.
    #[error("invalid descriptor for {class_name}: {source}")]
    InvalidDescriptor {
        class_name: String,
        #[source]
        source: serde_json::Error,
    },

    /// The descriptor describes a different class than the one requested.
    #[error("descriptor name mismatch: expected {expected}, found {found}")]
    NameMismatch { expected: String, found: String },

    /// The descriptor could not be written back.
    #[error("failed to encode enhanced descriptor for {class_name}: {source}")]
    Encode {
        class_name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised by a class transformer.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error(transparent)]
    Enhancement(#[from] EnhancementError),

    #[error("transformation of {class_name} rejected: {reason}")]
    Rejected { class_name: String, reason: String },
}

/// Errors raised by class loaders.
#[derive(Debug, Error)]
pub enum ClassLoadError {
    /// The class does not exist, or its transformation failed.
    #[error("class not found: {name}")]
    ClassNotFound {
        name: String,
        #[source]
        source: Option<TransformError>,
    },

    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ClassLoadError {
    pub fn not_found(name: &str) -> Self {
        Self::ClassNotFound {
            name: name.to_string(),
            source: None,
        }
    }
}

/// Errors raised by the build-time enhancement task.
#[derive(Debug, Error)]
pub enum EnhanceTaskError {
    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A file-set pattern could not be compiled.
    #[error("invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex_lite::Error,
    },

    /// A file could not be read or written.
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file is not below the classes directory or is not a class file.
    #[error("cannot determine class name for {}", .0.display())]
    ClassName(PathBuf),

    /// The enhancer failed on a file.
    #[error("error while enhancing {}: {source}", .path.display())]
    Enhancement {
        path: PathBuf,
        #[source]
        source: EnhancementError,
    },
}

impl EnhanceTaskError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

impl From<toml::de::Error> for EnhanceTaskError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}
