//! Shared fixtures for interceptor tests: a hand-written entity and an
//! in-memory session, factory and persister.

#![allow(dead_code)]

use lazyorm_intercept::{
    EntityPersister, InterceptError, InterceptResult, Interceptable, InterceptorSlot,
    LazyAttributeInterceptor, LazyPropertyInitializer, SessionFactoryContract, SessionHandle,
    SharedSessionContract, StorageError, StorageResult,
};
use lazyorm_model::{AttributeMetadata, EntityMetadata, LazyField, LazyValue};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Entity ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doc {
    pub id: i64,
    pub title: String,
    pub body: LazyField<String>,
    pub summary: LazyField<String>,
    pub interceptor: InterceptorSlot,
}

impl Doc {
    /// A freshly loaded doc: eager state set, lazy state unfetched.
    pub fn loaded(id: i64, title: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            body: LazyField::unfetched(),
            summary: LazyField::unfetched(),
            interceptor: InterceptorSlot::empty(),
        }
    }

    pub fn attach(&mut self, session: Option<SessionHandle>) {
        let interceptor = LazyAttributeInterceptor::new("Doc", ["body", "summary"], session);
        self.interceptor.replace(Some(interceptor));
    }

    pub fn body(&self) -> InterceptResult<LazyValue<String>> {
        self.read_lazy(&self.body, "body")
    }

    pub fn summary(&self) -> InterceptResult<LazyValue<String>> {
        self.read_lazy(&self.summary, "summary")
    }

    fn read_lazy(&self, field: &LazyField<String>, name: &str) -> InterceptResult<LazyValue<String>> {
        let current = field.get();
        let value = match self.interceptor.get() {
            Some(interceptor) => interceptor.intercept_as(self, name, current)?,
            None => current,
        };
        field.replace(value.clone());
        Ok(value)
    }

    pub fn lazy_interceptor(&self) -> &LazyAttributeInterceptor {
        self.interceptor.get().expect("interceptor installed")
    }
}

impl Interceptable for Doc {
    fn entity_name(&self) -> &str {
        "Doc"
    }

    fn identifier(&self) -> InterceptResult<Value> {
        Ok(json!(self.id))
    }

    fn interceptor(&self) -> Option<&LazyAttributeInterceptor> {
        self.interceptor.get()
    }

    fn raw_attribute(&self, name: &str) -> InterceptResult<LazyValue<Value>> {
        match name {
            "title" => Ok(LazyValue::Loaded(json!(self.title))),
            "body" => Ok(self.body.get().map(Value::String)),
            "summary" => Ok(self.summary.get().map(Value::String)),
            _ => Err(InterceptError::UnknownAttribute {
                entity_name: "Doc".into(),
                field: name.into(),
            }),
        }
    }

    fn inject_attribute(&self, name: &str, value: Value) -> InterceptResult<()> {
        let field = match name {
            "body" => &self.body,
            "summary" => &self.summary,
            _ => {
                return Err(InterceptError::UnknownAttribute {
                    entity_name: "Doc".into(),
                    field: name.into(),
                });
            }
        };
        let value: String = serde_json::from_value(value).map_err(|source| InterceptError::Conversion {
            field: name.into(),
            source,
        })?;
        field.set(value);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ── Persister ────────────────────────────────────────────────────

/// What the mock persister does when asked for a lazy property.
pub enum Behavior {
    /// Inject every stored lazy value and return the requested one.
    Fetch,
    /// Fail with a storage error.
    Fail,
    /// Return the unfetched marker.
    ReturnUnfetched,
    /// Read `field` through the interceptor before fetching.
    NestedRead(&'static str),
}

pub struct DocPersister {
    metadata: EntityMetadata,
    stored: BTreeMap<String, Value>,
    behavior: Mutex<Behavior>,
    calls: AtomicUsize,
    nested_reads: Mutex<Vec<(LazyValue<Value>, bool)>>,
}

impl DocPersister {
    pub fn new(behavior: Behavior) -> Self {
        let mut stored = BTreeMap::new();
        stored.insert("body".to_string(), json!("long text"));
        stored.insert("summary".to_string(), json!("short"));
        Self {
            metadata: EntityMetadata::new("Doc", "id")
                .with_attribute(AttributeMetadata::basic("title"))
                .with_attribute(AttributeMetadata::lazy("body"))
                .with_attribute(AttributeMetadata::lazy("summary")),
            stored,
            behavior: Mutex::new(behavior),
            calls: AtomicUsize::new(0),
            nested_reads: Mutex::new(Vec::new()),
        }
    }

    pub fn set_behavior(&self, behavior: Behavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Values observed by nested reads, with the interceptor's
    /// `is_initializing` flag at that moment.
    pub fn nested_reads(&self) -> Vec<(LazyValue<Value>, bool)> {
        self.nested_reads.lock().unwrap().clone()
    }

    fn fetch_all(&self, field: &str, entity: &dyn Interceptable) -> StorageResult<LazyValue<Value>> {
        for (name, value) in &self.stored {
            entity
                .inject_attribute(name, value.clone())
                .map_err(|e| StorageError::InvalidData(e.to_string()))?;
        }
        self.stored
            .get(field)
            .cloned()
            .map(LazyValue::Loaded)
            .ok_or_else(|| StorageError::InvalidData(format!("not a lazy property: {field}")))
    }
}

impl LazyPropertyInitializer for DocPersister {
    fn initialize_lazy_property(
        &self,
        field: &str,
        entity: &dyn Interceptable,
        _session: &dyn SharedSessionContract,
    ) -> StorageResult<LazyValue<Value>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let behavior = std::mem::replace(&mut *self.behavior.lock().unwrap(), Behavior::Fetch);
        match behavior {
            Behavior::Fetch => self.fetch_all(field, entity),
            Behavior::Fail => {
                *self.behavior.lock().unwrap() = Behavior::Fail;
                Err(StorageError::NotFound {
                    entity_name: "Doc".into(),
                    id: entity.identifier().map(|v| v.to_string()).unwrap_or_default(),
                })
            }
            Behavior::ReturnUnfetched => {
                *self.behavior.lock().unwrap() = Behavior::ReturnUnfetched;
                Ok(LazyValue::Unfetched)
            }
            Behavior::NestedRead(other) => {
                let seen = entity
                    .read_attribute(other)
                    .map_err(|e| StorageError::InvalidData(e.to_string()))?;
                let initializing = entity.interceptor().is_some_and(|i| i.is_initializing());
                self.nested_reads.lock().unwrap().push((seen, initializing));
                self.fetch_all(field, entity)
            }
        }
    }
}

impl EntityPersister for DocPersister {
    fn entity_name(&self) -> &str {
        "Doc"
    }

    fn metadata(&self) -> &EntityMetadata {
        &self.metadata
    }
}

// ── Session ──────────────────────────────────────────────────────

pub struct MockFactory {
    persisters: HashMap<String, Arc<dyn EntityPersister>>,
}

impl MockFactory {
    pub fn with(persister: Arc<DocPersister>) -> Self {
        let mut persisters: HashMap<String, Arc<dyn EntityPersister>> = HashMap::new();
        persisters.insert("Doc".to_string(), persister);
        Self { persisters }
    }

    pub fn empty() -> Self {
        Self {
            persisters: HashMap::new(),
        }
    }
}

impl SessionFactoryContract for MockFactory {
    fn entity_persister(&self, entity_name: &str) -> Option<Arc<dyn EntityPersister>> {
        self.persisters.get(entity_name).cloned()
    }
}

pub struct MockSession {
    open: AtomicBool,
    connected: AtomicBool,
    factory: MockFactory,
}

impl MockSession {
    pub fn open(factory: MockFactory) -> Arc<Self> {
        Arc::new(Self {
            open: AtomicBool::new(true),
            connected: AtomicBool::new(true),
            factory,
        })
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl SharedSessionContract for MockSession {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn factory(&self) -> &dyn SessionFactoryContract {
        &self.factory
    }
}

/// A doc attached to a fresh open session backed by `persister`.
pub fn attached_doc(persister: &Arc<DocPersister>) -> (Doc, Arc<MockSession>) {
    let session = MockSession::open(MockFactory::with(Arc::clone(persister)));
    let mut doc = Doc::loaded(1, "Intro");
    doc.attach(Some(SessionHandle::new(&session)));
    (doc, session)
}
