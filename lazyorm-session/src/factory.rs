//! The session factory: one database connection, one persister per entity.

use crate::config::FactoryConfig;
use crate::error::{SessionError, SessionResult};
use crate::persister::SqlitePersister;
use crate::session::Session;
use lazyorm_intercept::{Entity, EntityPersister, SessionFactoryContract, StorageError};
use rusqlite::Connection;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::info;

/// Creates sessions and owns the persister registry.
pub struct SessionFactory {
    config: FactoryConfig,
    conn: Arc<Mutex<Connection>>,
    persisters: RwLock<HashMap<String, Arc<SqlitePersister>>>,
}

impl SessionFactory {
    /// Opens the configured database.
    pub fn new(config: FactoryConfig) -> SessionResult<Arc<Self>> {
        let conn = match &config.database_path {
            Some(path) => Connection::open(path)
                .map_err(|e| StorageError::Database(format!("failed to open {}: {e}", path.display())))?,
            None => Connection::open_in_memory()
                .map_err(|e| StorageError::Database(format!("failed to open in-memory database: {e}")))?,
        };
        info!(
            database = ?config.database_path,
            lazy_loading = config.enable_lazy_loading,
            "session factory opened"
        );
        Ok(Arc::new(Self {
            config,
            conn: Arc::new(Mutex::new(conn)),
            persisters: RwLock::new(HashMap::new()),
        }))
    }

    /// Opens an in-memory factory with default settings (for testing).
    pub fn open_in_memory() -> SessionResult<Arc<Self>> {
        Self::new(FactoryConfig::in_memory())
    }

    pub const fn config(&self) -> &FactoryConfig {
        &self.config
    }

    /// Registers the persister for `E`, creating its table if needed.
    /// Registering a type twice keeps the first persister.
    pub fn register<E: Entity>(&self) -> SessionResult<()> {
        let metadata = E::metadata();
        let mut persisters = self.persisters.write().map_err(|_| poisoned())?;
        if persisters.contains_key(&metadata.entity_name) {
            return Ok(());
        }
        let name = metadata.entity_name.clone();
        let persister = SqlitePersister::new(
            metadata,
            Arc::clone(&self.conn),
            self.config.enable_lazy_loading,
            self.config.show_sql,
        )?;
        info!(
            entity = %name,
            lazy = ?persister.lazy_attributes(),
            "registered entity"
        );
        persisters.insert(name, Arc::new(persister));
        Ok(())
    }

    /// The persister registered under `entity_name`.
    pub fn persister(&self, entity_name: &str) -> SessionResult<Arc<SqlitePersister>> {
        self.persisters
            .read()
            .map_err(|_| poisoned())?
            .get(entity_name)
            .cloned()
            .ok_or_else(|| SessionError::UnknownEntity(entity_name.to_string()))
    }

    /// Opens a new session, connected and ready for use.
    pub fn open_session(self: &Arc<Self>) -> Session {
        Session::new(Arc::clone(self))
    }
}

impl SessionFactoryContract for SessionFactory {
    fn entity_persister(&self, entity_name: &str) -> Option<Arc<dyn EntityPersister>> {
        let persister: Arc<dyn EntityPersister> = self.persisters.read().ok()?.get(entity_name).cloned()?;
        Some(persister)
    }
}

fn poisoned() -> SessionError {
    SessionError::Storage(StorageError::Database("persister registry lock poisoned".into()))
}
