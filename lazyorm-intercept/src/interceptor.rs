//! The per-instance field interceptor.

use crate::entity::Interceptable;
use crate::error::{InterceptError, InterceptResult, LazyInitFailure};
use crate::session::SessionHandle;
use lazyorm_model::LazyValue;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use tracing::debug;

/// Field interception contract.
///
/// Implemented by the helper object attached to every lazy-aware entity.
/// All operations take `&self`: the helper is reached through a shared
/// borrow of its entity, and entities are confined to one thread.
pub trait FieldInterceptor {
    /// Rebinds the interceptor to a session, or detaches it with `None`.
    /// The session's liveness is not checked here, only at fetch time.
    fn set_session(&self, session: Option<SessionHandle>);

    /// True once no lazy field remains uninitialized.
    fn is_initialized(&self) -> bool;

    /// True iff `field` is not waiting to be fetched.
    fn is_field_initialized(&self, field: &str) -> bool;

    /// Marks the entity as modified.
    fn dirty(&self);

    fn is_dirty(&self) -> bool;

    /// Resets the dirty flag. Called by the session's flush.
    fn clear_dirty(&self);

    fn entity_name(&self) -> &str;

    /// Decides the value to use for a read of `field` whose raw stored state
    /// is `current`: either `current` itself or the freshly fetched value.
    fn intercept(
        &self,
        target: &dyn Interceptable,
        field: &str,
        current: LazyValue<Value>,
    ) -> InterceptResult<LazyValue<Value>>;
}

/// Interceptor for entities with lazily fetched basic properties.
///
/// `session` and `initializing` are transient; a deserialized interceptor is
/// detached until the owning session rebinds it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LazyAttributeInterceptor {
    entity_name: String,
    /// `None` once fully initialized. Only ever shrinks.
    uninitialized_fields: RefCell<Option<BTreeSet<String>>>,
    dirty: Cell<bool>,
    #[serde(skip)]
    session: RefCell<Option<SessionHandle>>,
    #[serde(skip)]
    initializing: Cell<bool>,
}

impl LazyAttributeInterceptor {
    /// Creates an interceptor tracking `lazy_fields` as uninitialized.
    pub fn new<I, S>(entity_name: impl Into<String>, lazy_fields: I, session: Option<SessionHandle>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: BTreeSet<String> = lazy_fields.into_iter().map(Into::into).collect();
        Self {
            entity_name: entity_name.into(),
            uninitialized_fields: RefCell::new((!fields.is_empty()).then_some(fields)),
            dirty: Cell::new(false),
            session: RefCell::new(session),
            initializing: Cell::new(false),
        }
    }

    /// Snapshot of the fields still waiting to be fetched.
    pub fn uninitialized_fields(&self) -> Option<BTreeSet<String>> {
        self.uninitialized_fields.borrow().clone()
    }

    /// The currently bound session handle.
    pub fn session(&self) -> Option<SessionHandle> {
        self.session.borrow().clone()
    }

    /// True while a fetch triggered by this interceptor is in flight.
    pub fn is_initializing(&self) -> bool {
        self.initializing.get()
    }

    /// Typed form of [`FieldInterceptor::intercept`], used by generated
    /// accessors.
    pub fn intercept_as<T: DeserializeOwned>(
        &self,
        target: &dyn Interceptable,
        field: &str,
        current: LazyValue<T>,
    ) -> InterceptResult<LazyValue<T>> {
        if !self.needs_fetch(field) {
            return Ok(current);
        }
        let value = self.fetch(target, field)?;
        serde_json::from_value(value)
            .map(LazyValue::Loaded)
            .map_err(|source| InterceptError::Conversion {
                field: field.to_string(),
                source,
            })
    }

    fn needs_fetch(&self, field: &str) -> bool {
        !self.initializing.get()
            && self
                .uninitialized_fields
                .borrow()
                .as_ref()
                .is_some_and(|fields| fields.contains(field))
    }

    fn fetch(&self, target: &dyn Interceptable, field: &str) -> InterceptResult<Value> {
        let Some(handle) = self.session() else {
            return Err(self.lazy_init_error(field, LazyInitFailure::NoSession));
        };
        let session = match handle.upgrade() {
            Some(session) if session.is_open() && session.is_connected() => session,
            _ => return Err(self.lazy_init_error(field, LazyInitFailure::SessionNotConnected)),
        };
        let persister = session
            .factory()
            .entity_persister(&self.entity_name)
            .ok_or_else(|| InterceptError::UnknownEntity(self.entity_name.clone()))?;

        debug!(entity = %self.entity_name, field, "initializing lazy properties");
        let fetched = {
            let _guard = InitializingGuard::enter(&self.initializing);
            persister.initialize_lazy_property(field, target, session.as_ref())
        }?;

        let LazyValue::Loaded(value) = fetched else {
            return Err(InterceptError::UnfetchedResult {
                entity_name: self.entity_name.clone(),
                field: field.to_string(),
            });
        };

        // One lazy fetch group: the fetch above initialized every tracked field.
        self.uninitialized_fields.replace(None);
        debug!(entity = %self.entity_name, field, "lazy properties initialized");
        Ok(value)
    }

    fn lazy_init_error(&self, field: &str, reason: LazyInitFailure) -> InterceptError {
        InterceptError::LazyInitialization {
            entity_name: self.entity_name.clone(),
            field: field.to_string(),
            reason,
        }
    }
}

impl FieldInterceptor for LazyAttributeInterceptor {
    fn set_session(&self, session: Option<SessionHandle>) {
        self.session.replace(session);
    }

    fn is_initialized(&self) -> bool {
        self.uninitialized_fields
            .borrow()
            .as_ref()
            .is_none_or(BTreeSet::is_empty)
    }

    fn is_field_initialized(&self, field: &str) -> bool {
        self.uninitialized_fields
            .borrow()
            .as_ref()
            .is_none_or(|fields| !fields.contains(field))
    }

    fn dirty(&self) {
        self.dirty.set(true);
    }

    fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    fn clear_dirty(&self) {
        self.dirty.set(false);
    }

    fn entity_name(&self) -> &str {
        &self.entity_name
    }

    fn intercept(
        &self,
        target: &dyn Interceptable,
        field: &str,
        current: LazyValue<Value>,
    ) -> InterceptResult<LazyValue<Value>> {
        if !self.needs_fetch(field) {
            return Ok(current);
        }
        self.fetch(target, field).map(LazyValue::Loaded)
    }
}

/// Holds the reentrancy flag for the duration of a fetch, success or failure.
struct InitializingGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> InitializingGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self { flag }
    }
}

impl Drop for InitializingGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}
