//! Field interception engine for lazyorm.
//!
//! Entities loaded with lazily fetched basic properties carry a
//! [`LazyAttributeInterceptor`]. Generated accessors hand every read of a
//! lazy property to the interceptor, which decides between passing the raw
//! stored value through and fetching the real value via the entity's
//! persister ([`LazyPropertyInitializer`]) using the bound session.
//!
//! # Components
//!
//! - **Contract**: [`FieldInterceptor`], implemented by [`LazyAttributeInterceptor`]
//! - **Initializer**: [`LazyPropertyInitializer`] / [`EntityPersister`]
//! - **Session capabilities**: [`SharedSessionContract`], [`SessionFactoryContract`],
//!   and the non-owning [`SessionHandle`]
//! - **Entity contracts**: [`Interceptable`], [`Entity`], [`InterceptorSlot`]
//!
//! # Threading
//!
//! Sessions and the entities they load are used by one thread at a time.
//! The interceptor keeps its state in `Cell`/`RefCell` and performs no
//! locking.

mod entity;
mod error;
mod initializer;
mod interceptor;
mod session;

pub use entity::{Entity, Interceptable, InterceptorSlot};
pub use error::{InterceptError, InterceptResult, LazyInitFailure, StorageError, StorageResult};
pub use initializer::{EntityPersister, LazyPropertyInitializer};
pub use interceptor::{FieldInterceptor, LazyAttributeInterceptor};
pub use session::{SessionFactoryContract, SessionHandle, SharedSessionContract};
