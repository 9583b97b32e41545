use crate::entity::Interceptable;
use crate::error::StorageResult;
use crate::session::SharedSessionContract;
use lazyorm_model::{EntityMetadata, LazyValue};
use serde_json::Value;

/// Performs the backing fetch of a lazy property.
///
/// Implemented by the component owning the entity's storage mapping. Given a
/// live, connected session and an entity whose identifier is resolvable, the
/// implementation reads the current persisted value of `field` and returns
/// it as `LazyValue::Loaded`. It must not return `LazyValue::Unfetched`; the
/// interceptor treats that as an error.
///
/// Fetch failures (missing row, lost connection) are returned as
/// [`StorageError`](crate::StorageError) and reach the caller unchanged.
pub trait LazyPropertyInitializer {
    fn initialize_lazy_property(
        &self,
        field: &str,
        entity: &dyn Interceptable,
        session: &dyn SharedSessionContract,
    ) -> StorageResult<LazyValue<Value>>;
}

/// The persister for one entity type. From the interceptor's point of view
/// the persister and the lazy property initializer are the same component.
pub trait EntityPersister: LazyPropertyInitializer + Send + Sync {
    fn entity_name(&self) -> &str;

    fn metadata(&self) -> &EntityMetadata;
}
