//! Enhancement of lazyorm mapping descriptors.
//!
//! Mapped types are described by JSON descriptors stored as class files
//! (`org/foo/Bar.class` describes `org.foo.Bar`). Enhancement marks which
//! attributes must be routed through the lazy attribute interceptor and which
//! extra tracking is installed.
//!
//! Two entry points share the same [`Enhancer`]:
//! - [`EnhanceTask`] rewrites a classes directory in place at build time.
//! - [`InstrumentedClassLoader`] applies a [`ClassTransformer`] as classes
//!   are loaded.

mod context;
mod descriptor;
mod enhancer;
mod error;
mod loader;
mod task;
mod transformer;

pub use context::{DefaultEnhancementContext, EnhancementContext, EnhancementFlags};
pub use descriptor::{
    ClassDescriptor, DirtyTracking, EMBEDDABLE, ENTITY, EnhancementRecord, MAPPED_SUPERCLASS,
    TypeCategory,
};
pub use enhancer::{DescriptorEnhancer, Enhancer};
pub use error::{ClassLoadError, EnhanceResult, EnhanceTaskError, EnhancementError, TransformError};
pub use loader::{ClassLoader, DirectoryClassLoader, InstrumentedClassLoader, LoadedClass, class_file_path};
pub use task::{EnhanceReport, EnhanceTask, EnhancerConfig, FileOutcome, FileSet, ant_pattern};
pub use transformer::{ClassTransformer, EnhancingTransformer, ProtectionDomain};
