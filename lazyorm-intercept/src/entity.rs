//! Contracts implemented by entity types, normally through `#[derive(Entity)]`.

use crate::error::InterceptResult;
use crate::interceptor::{FieldInterceptor, LazyAttributeInterceptor};
use lazyorm_model::{EntityMetadata, LazyValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::collections::BTreeMap;

/// An entity instance as seen by the interceptor and the persisters.
///
/// Object safe: persisters receive the instance as `&dyn Interceptable`.
pub trait Interceptable {
    fn entity_name(&self) -> &str;

    /// The identifier value, used by persisters to locate the row.
    fn identifier(&self) -> InterceptResult<Value>;

    /// The interceptor installed on this instance, if any.
    fn interceptor(&self) -> Option<&LazyAttributeInterceptor>;

    /// Raw stored state of a persistent attribute, without interception.
    fn raw_attribute(&self, name: &str) -> InterceptResult<LazyValue<Value>>;

    /// Stores a fetched value into a lazy attribute, without interception
    /// and without marking the instance dirty.
    fn inject_attribute(&self, name: &str, value: Value) -> InterceptResult<()>;

    fn as_any(&self) -> &dyn Any;
}

impl dyn Interceptable + '_ {
    /// Reads an attribute through the interceptor.
    ///
    /// Unlike the generated typed accessors the result is not written back to
    /// the instance; persisters inject fetched values themselves.
    pub fn read_attribute(&self, name: &str) -> InterceptResult<LazyValue<Value>> {
        let current = self.raw_attribute(name)?;
        match self.interceptor() {
            Some(interceptor) => interceptor.intercept(self, name, current),
            None => Ok(current),
        }
    }
}

/// A mapped entity type.
pub trait Entity: Interceptable + Sized + 'static {
    /// The type's mapping.
    fn metadata() -> EntityMetadata;

    /// Builds an instance from stored values.
    ///
    /// `values` holds the persistent attributes that were read. Lazy
    /// attributes absent from it start out `Unfetched`.
    fn hydrate(id: Value, values: BTreeMap<String, Value>) -> InterceptResult<Self>;

    /// Raw state of every persistent attribute other than the identifier.
    fn dehydrate(&self) -> InterceptResult<BTreeMap<String, LazyValue<Value>>>;

    /// Installs (or removes) the interceptor, returning the previous one.
    fn install_interceptor(
        &mut self,
        interceptor: Option<LazyAttributeInterceptor>,
    ) -> Option<LazyAttributeInterceptor>;
}

/// Field that carries an entity's interceptor.
///
/// Serializes as the interceptor's persistent state (or `null`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterceptorSlot(Option<LazyAttributeInterceptor>);

impl InterceptorSlot {
    pub const fn empty() -> Self {
        Self(None)
    }

    pub const fn get(&self) -> Option<&LazyAttributeInterceptor> {
        self.0.as_ref()
    }

    /// Replaces the interceptor, returning the previous one.
    pub fn replace(&mut self, interceptor: Option<LazyAttributeInterceptor>) -> Option<LazyAttributeInterceptor> {
        std::mem::replace(&mut self.0, interceptor)
    }

    /// Marks the owning instance dirty, if an interceptor is installed.
    pub fn mark_dirty(&self) {
        if let Some(interceptor) = &self.0 {
            interceptor.dirty();
        }
    }
}

impl From<LazyAttributeInterceptor> for InterceptorSlot {
    fn from(interceptor: LazyAttributeInterceptor) -> Self {
        Self(Some(interceptor))
    }
}
