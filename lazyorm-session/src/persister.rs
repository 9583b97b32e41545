//! SQLite-backed entity persister.
//!
//! Each entity type maps to one table named after the entity. The identifier
//! and every persistent attribute are stored as JSON text columns.

use lazyorm_intercept::{
    EntityPersister, Interceptable, LazyPropertyInitializer, SharedSessionContract, StorageError,
    StorageResult,
};
use lazyorm_model::{EntityMetadata, LazyValue};
use rusqlite::{Connection, OptionalExtension, params_from_iter};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, trace};

/// Persister for one entity type.
pub struct SqlitePersister {
    metadata: EntityMetadata,
    conn: Arc<Mutex<Connection>>,
    lazy_attributes: BTreeSet<String>,
    eager_attributes: Vec<String>,
    show_sql: bool,
    lazy_fetches: AtomicUsize,
}

impl SqlitePersister {
    /// Creates the persister and its table if it does not exist yet.
    pub fn new(
        metadata: EntityMetadata,
        conn: Arc<Mutex<Connection>>,
        lazy_loading_enabled: bool,
        show_sql: bool,
    ) -> StorageResult<Self> {
        let persister = Self {
            lazy_attributes: metadata.lazy_attribute_names(lazy_loading_enabled),
            eager_attributes: metadata.eager_attribute_names(lazy_loading_enabled),
            metadata,
            conn,
            show_sql,
            lazy_fetches: AtomicUsize::new(0),
        };
        persister.init_schema()?;
        Ok(persister)
    }

    fn init_schema(&self) -> StorageResult<()> {
        let mut columns = vec![format!("{} TEXT PRIMARY KEY", quote(&self.metadata.identifier))];
        columns.extend(
            self.metadata
                .persistent_attributes()
                .map(|a| format!("{} TEXT", quote(&a.name))),
        );
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote(&self.metadata.entity_name),
            columns.join(", ")
        );
        self.log_sql(&sql);
        self.lock()?
            .execute_batch(&sql)
            .map_err(|e| StorageError::Database(format!("failed to init schema: {e}")))?;
        Ok(())
    }

    /// Attributes intercepted for lazy loading: the lazy fetch group.
    pub const fn lazy_attributes(&self) -> &BTreeSet<String> {
        &self.lazy_attributes
    }

    /// Attributes read when an entity is loaded.
    pub fn eager_attributes(&self) -> &[String] {
        &self.eager_attributes
    }

    /// Number of lazy group fetches performed so far.
    pub fn lazy_fetch_count(&self) -> usize {
        self.lazy_fetches.load(Ordering::SeqCst)
    }

    // ── Writes ───────────────────────────────────────────────────

    /// Inserts a new row.
    pub fn insert(&self, id: &Value, values: &BTreeMap<String, LazyValue<Value>>) -> StorageResult<()> {
        let loaded = self.loaded_columns(values)?;
        let mut names = vec![quote(&self.metadata.identifier)];
        let mut params = vec![encode(id)?];
        for (name, value) in loaded {
            names.push(quote(name));
            params.push(value);
        }
        let placeholders: Vec<String> = (1..=params.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote(&self.metadata.entity_name),
            names.join(", "),
            placeholders.join(", ")
        );
        self.log_sql(&sql);
        self.lock()?
            .execute(&sql, params_from_iter(params.iter()))
            .map_err(|e| StorageError::Database(format!("failed to insert {}: {e}", self.metadata.entity_name)))?;
        debug!(entity = %self.metadata.entity_name, %id, "inserted");
        Ok(())
    }

    /// Updates the loaded attributes of an existing row. `Unfetched` values
    /// are left as stored.
    pub fn update(&self, id: &Value, values: &BTreeMap<String, LazyValue<Value>>) -> StorageResult<()> {
        let loaded = self.loaded_columns(values)?;
        if loaded.is_empty() {
            return Ok(());
        }
        let assignments: Vec<String> = loaded
            .iter()
            .enumerate()
            .map(|(i, (name, _))| format!("{} = ?{}", quote(name), i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            quote(&self.metadata.entity_name),
            assignments.join(", "),
            quote(&self.metadata.identifier),
            loaded.len() + 1
        );
        let mut params: Vec<String> = loaded.into_iter().map(|(_, value)| value).collect();
        params.push(encode(id)?);

        self.log_sql(&sql);
        let changed = self
            .lock()?
            .execute(&sql, params_from_iter(params.iter()))
            .map_err(|e| StorageError::Database(format!("failed to update {}: {e}", self.metadata.entity_name)))?;
        if changed == 0 {
            return Err(self.not_found(id));
        }
        debug!(entity = %self.metadata.entity_name, %id, "updated");
        Ok(())
    }

    /// Deletes a row. Returns false if there was none.
    pub fn delete(&self, id: &Value) -> StorageResult<bool> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?1",
            quote(&self.metadata.entity_name),
            quote(&self.metadata.identifier)
        );
        self.log_sql(&sql);
        let changed = self
            .lock()?
            .execute(&sql, [encode(id)?])
            .map_err(|e| StorageError::Database(format!("failed to delete {}: {e}", self.metadata.entity_name)))?;
        Ok(changed > 0)
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Reads the eager attributes of a row.
    pub fn select_eager(&self, id: &Value) -> StorageResult<BTreeMap<String, Value>> {
        self.select_columns(id, &self.eager_attributes)
    }

    /// Reads every attribute of the lazy fetch group in one query.
    pub fn select_lazy_group(&self, id: &Value) -> StorageResult<BTreeMap<String, Value>> {
        let names: Vec<String> = self.lazy_attributes.iter().cloned().collect();
        let values = self.select_columns(id, &names)?;
        self.lazy_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(values)
    }

    fn select_columns(&self, id: &Value, names: &[String]) -> StorageResult<BTreeMap<String, Value>> {
        // Selecting the identifier keeps the column list non-empty.
        let mut columns = vec![quote(&self.metadata.identifier)];
        columns.extend(names.iter().map(|n| quote(n)));
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            columns.join(", "),
            quote(&self.metadata.entity_name),
            quote(&self.metadata.identifier)
        );
        self.log_sql(&sql);

        let raw: Option<Vec<Option<String>>> = {
            let conn = self.lock()?;
            conn.query_row(&sql, [encode(id)?], |row| {
                (1..=names.len()).map(|i| row.get::<_, Option<String>>(i)).collect()
            })
            .optional()
            .map_err(|e| StorageError::Database(format!("failed to read {}: {e}", self.metadata.entity_name)))?
        };
        let Some(raw) = raw else {
            return Err(self.not_found(id));
        };

        names
            .iter()
            .zip(raw)
            .map(|(name, text)| -> StorageResult<(String, Value)> {
                let value = match text {
                    Some(text) => serde_json::from_str(&text)?,
                    None => Value::Null,
                };
                Ok((name.clone(), value))
            })
            .collect()
    }

    // ── Helpers ──────────────────────────────────────────────────

    fn loaded_columns<'a>(
        &self,
        values: &'a BTreeMap<String, LazyValue<Value>>,
    ) -> StorageResult<Vec<(&'a str, String)>> {
        let mut columns = Vec::new();
        for (name, value) in values {
            if self.metadata.attribute(name).is_none_or(|a| !a.persistent) {
                continue;
            }
            if let LazyValue::Loaded(value) = value {
                columns.push((name.as_str(), encode(value)?));
            }
        }
        Ok(columns)
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Database("connection lock poisoned".into()))
    }

    fn not_found(&self, id: &Value) -> StorageError {
        StorageError::NotFound {
            entity_name: self.metadata.entity_name.clone(),
            id: id.to_string(),
        }
    }

    fn log_sql(&self, sql: &str) {
        if self.show_sql {
            info!(entity = %self.metadata.entity_name, sql, "executing statement");
        } else {
            trace!(entity = %self.metadata.entity_name, sql, "executing statement");
        }
    }
}

impl LazyPropertyInitializer for SqlitePersister {
    fn initialize_lazy_property(
        &self,
        field: &str,
        entity: &dyn Interceptable,
        _session: &dyn SharedSessionContract,
    ) -> StorageResult<LazyValue<Value>> {
        if !self.lazy_attributes.contains(field) {
            return Err(StorageError::InvalidData(format!(
                "{field} is not a lazy property of {}",
                self.metadata.entity_name
            )));
        }
        let id = entity
            .identifier()
            .map_err(|e| StorageError::InvalidData(e.to_string()))?;
        let values = self.select_lazy_group(&id)?;
        debug!(entity = %self.metadata.entity_name, %id, field, fetched = values.len(), "fetched lazy group");

        // The lock is released: injection may run entity code. Values written
        // through setters before the fetch win over the stored ones.
        let mut requested = None;
        for (name, stored) in values {
            let current = entity
                .raw_attribute(&name)
                .map_err(|e| StorageError::InvalidData(e.to_string()))?;
            let value = match current {
                LazyValue::Loaded(current) => current,
                LazyValue::Unfetched => {
                    entity
                        .inject_attribute(&name, stored.clone())
                        .map_err(|e| StorageError::InvalidData(e.to_string()))?;
                    stored
                }
            };
            if name == field {
                requested = Some(value);
            }
        }
        requested
            .map(LazyValue::Loaded)
            .ok_or_else(|| StorageError::InvalidData(format!("no value fetched for {field}")))
    }
}

impl EntityPersister for SqlitePersister {
    fn entity_name(&self) -> &str {
        &self.metadata.entity_name
    }

    fn metadata(&self) -> &EntityMetadata {
        &self.metadata
    }
}

fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn encode(value: &Value) -> StorageResult<String> {
    Ok(serde_json::to_string(value)?)
}
