//! # lazyorm
//!
//! Entities loaded through a [`Session`] are partially materialized: lazy
//! properties stay unfetched until first read, when the entity's
//! interceptor fetches them through the session that loaded it. Reads after
//! the session is gone fail with [`InterceptError::LazyInitialization`]
//! instead of touching the database.
//!
//! ```ignore
//! use lazyorm::{Entity, InterceptorSlot, LazyField, SessionFactory};
//!
//! #[derive(Entity)]
//! struct Document {
//!     #[entity(id)]
//!     id: i64,
//!     title: String,
//!     #[entity(lazy)]
//!     body: LazyField<String>,
//!     #[entity(interceptor)]
//!     interceptor: InterceptorSlot,
//! }
//!
//! let factory = SessionFactory::open_in_memory()?;
//! factory.register::<Document>()?;
//! let session = factory.open_session();
//! let doc: Document = session.load(1)?;
//! let body = doc.body()?; // fetched here
//! ```

pub use lazyorm_derive::Entity;
pub use lazyorm_intercept::{
    Entity, EntityPersister, FieldInterceptor, InterceptError, InterceptResult, Interceptable,
    InterceptorSlot, LazyAttributeInterceptor, LazyInitFailure, LazyPropertyInitializer,
    SessionFactoryContract, SessionHandle, SharedSessionContract, StorageError, StorageResult,
};
pub use lazyorm_model::{AttributeKind, AttributeMetadata, EntityMetadata, FetchMode, LazyField, LazyValue};
pub use lazyorm_session::{FactoryConfig, Session, SessionError, SessionFactory, SessionResult, SqlitePersister};

#[doc(hidden)]
pub mod __private {
    pub use serde_json;
}
