//! Sessions: the unit of work that loads, tracks and writes entities.

use crate::error::{SessionError, SessionResult};
use crate::factory::SessionFactory;
use crate::persister::SqlitePersister;
use lazyorm_intercept::{
    Entity, EntityPersister, FieldInterceptor, LazyAttributeInterceptor, SessionFactoryContract, SessionHandle,
    SharedSessionContract,
};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, info};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// State shared between a session and the handles held by its entities.
struct SessionState {
    id: u64,
    factory: Arc<SessionFactory>,
    open: AtomicBool,
    connected: AtomicBool,
}

impl SharedSessionContract for SessionState {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn factory(&self) -> &dyn SessionFactoryContract {
        self.factory.as_ref()
    }
}

/// A session.
///
/// Entities loaded by a session hold a weak handle to it. Once the session is
/// closed, disconnected or dropped, reading an unfetched lazy property of
/// those entities fails instead of touching the database.
pub struct Session {
    state: Arc<SessionState>,
}

impl Session {
    pub(crate) fn new(factory: Arc<SessionFactory>) -> Self {
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        debug!(session = id, "session opened");
        Self {
            state: Arc::new(SessionState {
                id,
                factory,
                open: AtomicBool::new(true),
                connected: AtomicBool::new(true),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.state.id
    }

    pub fn factory(&self) -> &Arc<SessionFactory> {
        &self.state.factory
    }

    /// A non-owning handle for binding interceptors to this session.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle::new(&self.state)
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Closes the session. Closing twice is a no-op.
    pub fn close(&self) {
        if self.state.open.swap(false, Ordering::SeqCst) {
            self.state.connected.store(false, Ordering::SeqCst);
            info!(session = self.state.id, "session closed");
        }
    }

    /// Releases the connection while keeping the session open.
    pub fn disconnect(&self) {
        self.state.connected.store(false, Ordering::SeqCst);
        debug!(session = self.state.id, "session disconnected");
    }

    /// Reacquires the connection of an open session.
    pub fn reconnect(&self) -> SessionResult<()> {
        if !self.is_open() {
            return Err(SessionError::Closed);
        }
        self.state.connected.store(true, Ordering::SeqCst);
        debug!(session = self.state.id, "session reconnected");
        Ok(())
    }

    fn ensure_usable(&self) -> SessionResult<()> {
        if !self.is_open() {
            return Err(SessionError::Closed);
        }
        if !self.is_connected() {
            return Err(SessionError::NotConnected);
        }
        Ok(())
    }

    fn persister_for<E: Entity>(&self) -> SessionResult<Arc<SqlitePersister>> {
        self.state.factory.persister(&E::metadata().entity_name)
    }

    fn interceptor_for(&self, persister: &SqlitePersister) -> Option<LazyAttributeInterceptor> {
        let lazy = persister.lazy_attributes();
        (!lazy.is_empty()).then(|| {
            LazyAttributeInterceptor::new(
                persister.entity_name(),
                lazy.iter().cloned(),
                Some(self.handle()),
            )
        })
    }

    // ── Entity operations ────────────────────────────────────────

    /// Loads an entity by identifier.
    ///
    /// Eager attributes are read immediately. If the type has lazy
    /// properties, the instance gets an interceptor bound to this session
    /// and its lazy properties are fetched on first access.
    pub fn load<E: Entity>(&self, id: impl Into<Value>) -> SessionResult<E> {
        self.ensure_usable()?;
        let id = id.into();
        let persister = self.persister_for::<E>()?;
        let values = persister.select_eager(&id)?;
        let mut entity = E::hydrate(id.clone(), values)?;
        entity.install_interceptor(self.interceptor_for(&persister));
        debug!(session = self.state.id, entity = persister.entity_name(), %id, "loaded");
        Ok(entity)
    }

    /// Stores a new entity and attaches it to this session.
    ///
    /// Every lazy property must hold a value: a new instance has nothing to
    /// fetch it from.
    pub fn persist<E: Entity>(&self, entity: &mut E) -> SessionResult<()> {
        self.ensure_usable()?;
        let persister = self.persister_for::<E>()?;
        let id = entity.identifier()?;
        let values = entity.dehydrate()?;
        if let Some((field, _)) = values.iter().find(|(_, value)| !value.is_loaded()) {
            return Err(SessionError::UnsetLazyProperty {
                entity_name: persister.entity_name().to_string(),
                field: field.clone(),
            });
        }
        persister.insert(&id, &values)?;

        let interceptor = (!persister.lazy_attributes().is_empty()).then(|| {
            LazyAttributeInterceptor::new(persister.entity_name(), Vec::<String>::new(), Some(self.handle()))
        });
        entity.install_interceptor(interceptor);
        debug!(session = self.state.id, entity = persister.entity_name(), %id, "persisted");
        Ok(())
    }

    /// Writes a modified entity back.
    ///
    /// Entities with an interceptor are written only when dirty, and their
    /// dirty flag is cleared. Entities without one cannot be tracked and are
    /// always written. Returns whether a write happened.
    pub fn flush<E: Entity>(&self, entity: &E) -> SessionResult<bool> {
        self.ensure_usable()?;
        if entity.interceptor().is_some_and(|i| !i.is_dirty()) {
            return Ok(false);
        }
        let persister = self.persister_for::<E>()?;
        let id = entity.identifier()?;
        persister.update(&id, &entity.dehydrate()?)?;
        if let Some(interceptor) = entity.interceptor() {
            interceptor.clear_dirty();
        }
        debug!(session = self.state.id, entity = persister.entity_name(), %id, "flushed");
        Ok(true)
    }

    /// Deletes an entity's row and detaches the instance.
    pub fn remove<E: Entity>(&self, entity: &E) -> SessionResult<bool> {
        self.ensure_usable()?;
        let persister = self.persister_for::<E>()?;
        let removed = persister.delete(&entity.identifier()?)?;
        self.detach(entity);
        Ok(removed)
    }

    /// Binds a detached entity's interceptor to this session.
    pub fn reattach<E: Entity>(&self, entity: &E) -> SessionResult<()> {
        if !self.is_open() {
            return Err(SessionError::Closed);
        }
        if let Some(interceptor) = entity.interceptor() {
            interceptor.set_session(Some(self.handle()));
        }
        Ok(())
    }

    /// Unbinds an entity from any session.
    pub fn detach<E: Entity>(&self, entity: &E) {
        if let Some(interceptor) = entity.interceptor() {
            interceptor.set_session(None);
        }
    }

    /// True if the entity's interceptor is bound to this session.
    pub fn contains<E: Entity>(&self, entity: &E) -> bool {
        let own = self.handle();
        entity
            .interceptor()
            .and_then(LazyAttributeInterceptor::session)
            .is_some_and(|handle| handle.same_session(&own))
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.state.id)
            .field("open", &self.is_open())
            .field("connected", &self.is_connected())
            .finish()
    }
}
