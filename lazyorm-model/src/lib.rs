//! Mapping model for lazyorm.
//!
//! Defines the types that every other lazyorm crate depends on:
//! - [`LazyValue`]: raw storage state of a lazy property (`Unfetched` or `Loaded`)
//! - [`LazyField`]: the interior-mutable cell an entity uses to hold a lazy property
//! - [`EntityMetadata`]: an entity type's identifier and attribute mapping
//! - [`AttributeMetadata`]: one mapped attribute, its kind and fetch mode
//!
//! These types carry no session or storage behavior. They are the contract
//! between generated entity code, the interceptor and the persisters.

mod lazy;
mod metadata;

pub use lazy::{LazyField, LazyValue};
pub use metadata::{AttributeKind, AttributeMetadata, EntityMetadata, FetchMode};
