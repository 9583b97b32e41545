//! Session capabilities consumed by the interceptor.
//!
//! The interceptor never owns a session. It holds a [`SessionHandle`], a weak
//! reference that is upgraded and checked for liveness on every fetch.

use crate::initializer::EntityPersister;
use std::fmt;
use std::sync::{Arc, Weak};

/// What the interceptor needs from a session.
pub trait SharedSessionContract {
    /// False once the session has been closed.
    fn is_open(&self) -> bool;

    /// False while the session has no usable connection.
    fn is_connected(&self) -> bool;

    /// The factory that created this session, used for persister lookup.
    fn factory(&self) -> &dyn SessionFactoryContract;
}

/// Persister lookup.
pub trait SessionFactoryContract {
    fn entity_persister(&self, entity_name: &str) -> Option<Arc<dyn EntityPersister>>;
}

/// Non-owning reference to a session.
///
/// Keeping a handle never keeps the session alive. A handle whose session
/// has been dropped upgrades to `None`.
#[derive(Clone)]
pub struct SessionHandle {
    session: Weak<dyn SharedSessionContract>,
}

impl SessionHandle {
    /// Creates a handle to a shared session.
    pub fn new<S: SharedSessionContract + 'static>(session: &Arc<S>) -> Self {
        let session: Weak<S> = Arc::downgrade(session);
        Self { session }
    }

    /// Returns the session if it is still alive.
    pub fn upgrade(&self) -> Option<Arc<dyn SharedSessionContract>> {
        self.session.upgrade()
    }

    /// Returns true if both handles refer to the same session.
    pub fn same_session(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.session, &other.session)
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("alive", &(self.session.strong_count() > 0))
            .finish()
    }
}
