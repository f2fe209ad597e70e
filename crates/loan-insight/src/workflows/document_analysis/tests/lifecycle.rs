use super::common::*;
use crate::workflows::document_analysis::domain::{Document, DocumentStatus};
use crate::workflows::document_analysis::lifecycle::{claim, finish, ClaimError, ClaimMode};
use crate::workflows::document_analysis::repository::{
    InMemoryResultStore, ResultStore, StoreError,
};

const ALL: [DocumentStatus; 3] = [
    DocumentStatus::Processing,
    DocumentStatus::Done,
    DocumentStatus::Failed,
];

#[test]
fn transition_table_only_leaves_terminal_states_through_processing() {
    let allowed: Vec<(DocumentStatus, DocumentStatus)> = ALL
        .iter()
        .flat_map(|from| ALL.iter().map(move |to| (*from, *to)))
        .filter(|(from, to)| from.can_transition_to(*to))
        .collect();

    assert_eq!(
        allowed,
        vec![
            (DocumentStatus::Processing, DocumentStatus::Processing),
            (DocumentStatus::Processing, DocumentStatus::Done),
            (DocumentStatus::Processing, DocumentStatus::Failed),
            (DocumentStatus::Done, DocumentStatus::Processing),
            (DocumentStatus::Failed, DocumentStatus::Processing),
        ]
    );
    assert!(DocumentStatus::Done.is_terminal());
    assert!(!DocumentStatus::Processing.is_terminal());
}

#[test]
fn ingest_derives_content_addressed_reference() {
    let store = InMemoryResultStore::default();
    let document = ingest(&store, "doc-ingest");

    assert_eq!(document.status, DocumentStatus::Processing);
    assert_eq!(document.generation, 0);
    assert_eq!(document.sha256.len(), 64);
    assert_eq!(
        document.storage_reference.as_str(),
        format!("user-42/documents/{}_application.pdf", document.sha256)
    );
    assert!(matches!(
        store.insert_document(document),
        Err(StoreError::Conflict)
    ));
}

#[test]
fn transition_is_compare_and_swap_on_status_and_generation() {
    let store = InMemoryResultStore::default();
    let document = ingest(&store, "doc-cas");

    let done = store
        .transition(&document.id, DocumentStatus::Processing, 0, DocumentStatus::Done)
        .expect("first transition wins");
    assert_eq!(done.generation, 1);

    match store.transition(&document.id, DocumentStatus::Processing, 0, DocumentStatus::Failed) {
        Err(StoreError::StatusConflict {
            actual: DocumentStatus::Done,
            actual_generation: 1,
            ..
        }) => {}
        other => panic!("expected status conflict, got {other:?}"),
    }

    assert!(matches!(
        store.transition(&document.id, DocumentStatus::Done, 1, DocumentStatus::Failed),
        Err(StoreError::InvalidTransition { .. })
    ));
}

#[test]
fn run_claims_only_processing_documents() {
    let store = InMemoryResultStore::default();
    let document = ingest(&store, "doc-claim");

    let lease = claim(&store, &document, ClaimMode::Run).expect("claim");
    assert_eq!(lease.generation, 1);

    let finished: Document = finish(&store, &lease, DocumentStatus::Done).expect("finish");
    assert!(matches!(
        claim(&store, &finished, ClaimMode::Run),
        Err(ClaimError::NotProcessing {
            status: DocumentStatus::Done
        })
    ));

    let reclaimed = claim(&store, &finished, ClaimMode::Rerun).expect("rerun claim");
    assert_eq!(reclaimed.generation, 3);
}

#[test]
fn claiming_from_a_stale_snapshot_conflicts() {
    let store = InMemoryResultStore::default();
    let snapshot = ingest(&store, "doc-snapshot");

    claim(&store, &snapshot, ClaimMode::Rerun).expect("first claim");
    assert!(matches!(
        claim(&store, &snapshot, ClaimMode::Rerun),
        Err(ClaimError::Store(StoreError::StatusConflict { .. }))
    ));
}

#[test]
fn superseded_lease_cannot_write() {
    let store = InMemoryResultStore::default();
    let document = ingest(&store, "doc-lease");

    let old = claim(&store, &document, ClaimMode::Run).expect("first claim");
    let current = store
        .fetch_document(&document.id)
        .expect("fetch")
        .expect("present");
    let new = claim(&store, &current, ClaimMode::Rerun).expect("second claim");

    match store.replace_page_texts(&old, vec![page(1, "late")]) {
        Err(err @ StoreError::StaleLease { lease: 1, current: 2 }) => {
            assert!(err.is_superseded())
        }
        other => panic!("expected stale lease, got {other:?}"),
    }
    assert!(matches!(
        store.delete_analyses(&old),
        Err(StoreError::StaleLease { .. })
    ));

    store
        .replace_page_texts(&new, vec![page(1, "fresh")])
        .expect("current lease writes");
    assert_eq!(
        store.page_texts(&document.id).expect("pages"),
        vec![page(1, "fresh")]
    );
    assert!(finish(&store, &old, DocumentStatus::Done).is_err());
}
