//! Derive macro for lazyorm entities.
//!
//! `#[derive(Entity)]` writes the interception logic straight into the
//! entity's accessors, so no runtime rewriting of the type is needed.
//!
//! ```ignore
//! use lazyorm::{Entity, InterceptorSlot, LazyField};
//!
//! #[derive(Entity)]
//! #[entity(name = "Document")]
//! struct Document {
//!     #[entity(id)]
//!     id: i64,
//!     title: String,
//!     #[entity(lazy)]
//!     body: LazyField<String>,
//!     #[entity(interceptor)]
//!     interceptor: InterceptorSlot,
//! }
//! ```
//!
//! Container options: `name = "..."` (defaults to the type name) and
//! `lazy_group` (lazy properties stay lazy when laziness is disabled
//! globally).
//!
//! Field options: `id`, `lazy`, `transient`, `interceptor`, `to_one`,
//! `to_many`, `embedded`. Fields without options are eager basic
//! properties.

use proc_macro::TokenStream;

mod attr;
mod entity;

#[proc_macro_derive(Entity, attributes(entity))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    entity::derive_entity(input.into()).into()
}
