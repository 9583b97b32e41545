mod common;

use common::{Behavior, Doc, DocPersister, MockFactory, MockSession, attached_doc};
use lazyorm_intercept::{
    FieldInterceptor, InterceptError, Interceptable, LazyAttributeInterceptor, LazyInitFailure,
    SessionHandle, StorageError,
};
use lazyorm_model::LazyValue;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;

fn names(fields: &[&str]) -> Option<BTreeSet<String>> {
    Some(fields.iter().map(|f| f.to_string()).collect())
}

// ── Contract basics ──────────────────────────────────────────────

#[test]
fn fresh_interceptor_tracks_lazy_fields() {
    let persister = Arc::new(DocPersister::new(Behavior::Fetch));
    let (doc, _session) = attached_doc(&persister);
    let interceptor = doc.lazy_interceptor();

    assert!(!interceptor.is_initialized());
    assert!(!interceptor.is_field_initialized("body"));
    assert!(!interceptor.is_field_initialized("summary"));
    assert!(interceptor.is_field_initialized("title"));
    assert_eq!(interceptor.uninitialized_fields(), names(&["body", "summary"]));
    assert_eq!(interceptor.entity_name(), "Doc");
}

#[test]
fn untracked_field_passes_through() {
    let persister = Arc::new(DocPersister::new(Behavior::Fetch));
    let (doc, _session) = attached_doc(&persister);
    let dyn_doc: &dyn Interceptable = &doc;

    let title = dyn_doc.read_attribute("title").unwrap();
    assert_eq!(title, LazyValue::Loaded(json!("Intro")));
    assert_eq!(persister.calls(), 0);
}

// ── Fetching ─────────────────────────────────────────────────────

#[test]
fn first_read_fetches_whole_group_once() {
    let persister = Arc::new(DocPersister::new(Behavior::Fetch));
    let (doc, _session) = attached_doc(&persister);

    assert_eq!(doc.body().unwrap(), LazyValue::Loaded("long text".to_string()));
    assert_eq!(persister.calls(), 1);
    assert!(doc.lazy_interceptor().is_initialized());
    assert_eq!(doc.lazy_interceptor().uninitialized_fields(), None);

    // Sibling in the same group was injected by the fetch.
    assert_eq!(doc.summary().unwrap(), LazyValue::Loaded("short".to_string()));
    assert_eq!(doc.body().unwrap(), LazyValue::Loaded("long text".to_string()));
    assert_eq!(persister.calls(), 1);
}

#[test]
fn fetched_value_is_written_back_to_field() {
    let persister = Arc::new(DocPersister::new(Behavior::Fetch));
    let (doc, _session) = attached_doc(&persister);

    assert!(!doc.body.is_loaded());
    doc.body().unwrap();
    assert!(doc.body.is_loaded());
    assert!(doc.summary.is_loaded());
}

#[test]
fn reattached_interceptor_fetches_through_new_session() {
    let persister = Arc::new(DocPersister::new(Behavior::Fetch));
    let mut doc = Doc::loaded(7, "Detached");
    doc.attach(None);

    let session = MockSession::open(MockFactory::with(Arc::clone(&persister)));
    doc.lazy_interceptor().set_session(Some(SessionHandle::new(&session)));

    assert_eq!(doc.summary().unwrap(), LazyValue::Loaded("short".to_string()));
    assert_eq!(persister.calls(), 1);
}

// ── Failures ─────────────────────────────────────────────────────

#[test]
fn read_without_session_fails() {
    let persister = Arc::new(DocPersister::new(Behavior::Fetch));
    let mut doc = Doc::loaded(1, "Orphan");
    doc.attach(None);

    let err = doc.body().unwrap_err();
    assert!(matches!(
        &err,
        InterceptError::LazyInitialization { entity_name, field, reason: LazyInitFailure::NoSession }
            if entity_name == "Doc" && field == "body"
    ));
    assert_eq!(err.lazy_init_failure(), Some(LazyInitFailure::NoSession));
    assert_eq!(doc.lazy_interceptor().uninitialized_fields(), names(&["body", "summary"]));
    assert_eq!(persister.calls(), 0);
}

#[test]
fn read_after_close_fails() {
    let persister = Arc::new(DocPersister::new(Behavior::Fetch));
    let (doc, session) = attached_doc(&persister);
    session.close();

    let err = doc.body().unwrap_err();
    assert_eq!(err.lazy_init_failure(), Some(LazyInitFailure::SessionNotConnected));
    assert!(!doc.lazy_interceptor().is_field_initialized("body"));
    assert_eq!(persister.calls(), 0);
}

#[test]
fn read_while_disconnected_fails() {
    let persister = Arc::new(DocPersister::new(Behavior::Fetch));
    let (doc, session) = attached_doc(&persister);
    session.disconnect();

    let err = doc.summary().unwrap_err();
    assert_eq!(err.lazy_init_failure(), Some(LazyInitFailure::SessionNotConnected));
    assert_eq!(persister.calls(), 0);
}

#[test]
fn read_after_session_dropped_fails() {
    let persister = Arc::new(DocPersister::new(Behavior::Fetch));
    let (doc, session) = attached_doc(&persister);
    drop(session);

    let err = doc.body().unwrap_err();
    assert_eq!(err.lazy_init_failure(), Some(LazyInitFailure::SessionNotConnected));
    assert_eq!(persister.calls(), 0);
}

#[test]
fn storage_error_propagates_and_state_is_kept() {
    let persister = Arc::new(DocPersister::new(Behavior::Fail));
    let (doc, _session) = attached_doc(&persister);

    let err = doc.body().unwrap_err();
    assert!(matches!(err, InterceptError::Storage(StorageError::NotFound { .. })));
    assert_eq!(err.lazy_init_failure(), None);
    assert_eq!(doc.lazy_interceptor().uninitialized_fields(), names(&["body", "summary"]));
    assert!(!doc.lazy_interceptor().is_initializing());

    // A later read retries the fetch.
    persister.set_behavior(Behavior::Fetch);
    assert_eq!(doc.body().unwrap(), LazyValue::Loaded("long text".to_string()));
    assert_eq!(persister.calls(), 2);
}

#[test]
fn unfetched_result_is_rejected() {
    let persister = Arc::new(DocPersister::new(Behavior::ReturnUnfetched));
    let (doc, _session) = attached_doc(&persister);

    let err = doc.body().unwrap_err();
    assert!(matches!(err, InterceptError::UnfetchedResult { ref field, .. } if field == "body"));
    assert!(!doc.lazy_interceptor().is_initialized());
}

#[test]
fn missing_persister_is_reported() {
    let session = MockSession::open(MockFactory::empty());
    let mut doc = Doc::loaded(1, "Unmapped");
    doc.attach(Some(SessionHandle::new(&session)));

    let err = doc.body().unwrap_err();
    assert!(matches!(err, InterceptError::UnknownEntity(ref name) if name == "Doc"));
}

// ── Reentrancy ───────────────────────────────────────────────────

#[test]
fn nested_read_during_fetch_sees_raw_state() {
    let persister = Arc::new(DocPersister::new(Behavior::NestedRead("summary")));
    let (doc, _session) = attached_doc(&persister);

    assert_eq!(doc.body().unwrap(), LazyValue::Loaded("long text".to_string()));
    assert_eq!(persister.calls(), 1);
    assert_eq!(persister.nested_reads(), vec![(LazyValue::Unfetched, true)]);
    assert!(!doc.lazy_interceptor().is_initializing());
    assert!(doc.lazy_interceptor().is_initialized());
}

// ── Dirty tracking ───────────────────────────────────────────────

#[test]
fn dirty_flag_set_and_cleared() {
    let interceptor = LazyAttributeInterceptor::new("Doc", ["body"], None);
    assert!(!interceptor.is_dirty());
    interceptor.dirty();
    interceptor.dirty();
    assert!(interceptor.is_dirty());
    interceptor.clear_dirty();
    assert!(!interceptor.is_dirty());
}

#[test]
fn reads_do_not_mark_dirty() {
    let persister = Arc::new(DocPersister::new(Behavior::Fetch));
    let (doc, _session) = attached_doc(&persister);
    doc.body().unwrap();
    doc.summary().unwrap();
    assert!(!doc.lazy_interceptor().is_dirty());
}

// ── Serialization ────────────────────────────────────────────────

#[test]
fn serialized_doc_keeps_loaded_values_and_drops_session() {
    let persister = Arc::new(DocPersister::new(Behavior::Fetch));
    let (doc, _session) = attached_doc(&persister);
    doc.body().unwrap();

    let json = serde_json::to_string(&doc).unwrap();
    let copy: Doc = serde_json::from_str(&json).unwrap();

    assert!(copy.lazy_interceptor().session().is_none());
    assert!(copy.lazy_interceptor().is_initialized());
    assert_eq!(copy.body().unwrap(), LazyValue::Loaded("long text".to_string()));
    assert_eq!(copy.summary().unwrap(), LazyValue::Loaded("short".to_string()));
    assert_eq!(persister.calls(), 1);
}

#[test]
fn serialized_uninitialized_doc_needs_a_session() {
    let persister = Arc::new(DocPersister::new(Behavior::Fetch));
    let (doc, _session) = attached_doc(&persister);

    let json = serde_json::to_string(&doc).unwrap();
    let copy: Doc = serde_json::from_str(&json).unwrap();

    let err = copy.body().unwrap_err();
    assert_eq!(err.lazy_init_failure(), Some(LazyInitFailure::NoSession));
}

// ── Properties ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn initialization_is_monotonic(reads in prop::collection::vec(prop::bool::ANY, 1..20)) {
        let persister = Arc::new(DocPersister::new(Behavior::Fetch));
        let (doc, _session) = attached_doc(&persister);
        let mut initialized = false;

        for read_body in reads {
            let value = if read_body { doc.body() } else { doc.summary() };
            prop_assert!(value.unwrap().is_loaded());
            prop_assert!(doc.lazy_interceptor().is_initialized());
            prop_assert!(!initialized || persister.calls() == 1);
            initialized = true;
        }
        prop_assert_eq!(persister.calls(), 1);
    }
}
