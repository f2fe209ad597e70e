use serde::{Deserialize, Serialize};

use super::domain::{Document, DocumentId, DocumentStatus};
use super::repository::{ResultStore, StoreError};

impl DocumentStatus {
    /// Allowed edges of the lifecycle. `processing → processing` is a claim by a new run.
    pub const fn can_transition_to(self, next: DocumentStatus) -> bool {
        matches!(
            (self, next),
            (DocumentStatus::Processing, DocumentStatus::Processing)
                | (DocumentStatus::Processing, DocumentStatus::Done)
                | (DocumentStatus::Processing, DocumentStatus::Failed)
                | (DocumentStatus::Done, DocumentStatus::Processing)
                | (DocumentStatus::Failed, DocumentStatus::Processing)
        )
    }
}

/// Proof that a run owns the document at a given generation.
///
/// Every write a run makes presents its lease; once another run claims the document the lease
/// goes stale and those writes are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLease {
    pub document_id: DocumentId,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimMode {
    /// First run after ingestion; the document must still be processing.
    Run,
    /// Explicit retry from any status, including a stuck `processing`.
    Rerun,
}

#[derive(Debug, thiserror::Error)]
pub enum ClaimError {
    #[error("document is {status}; only processing documents can be run")]
    NotProcessing { status: DocumentStatus },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Move the document to `processing` at a fresh generation and hand back the lease.
pub fn claim<S>(store: &S, document: &Document, mode: ClaimMode) -> Result<DocumentLease, ClaimError>
where
    S: ResultStore + ?Sized,
{
    if mode == ClaimMode::Run && document.status != DocumentStatus::Processing {
        return Err(ClaimError::NotProcessing {
            status: document.status,
        });
    }

    let claimed = store.transition(
        &document.id,
        document.status,
        document.generation,
        DocumentStatus::Processing,
    )?;

    Ok(DocumentLease {
        document_id: claimed.id,
        generation: claimed.generation,
    })
}

/// Close a run by moving its claimed document to `done` or `failed`.
pub fn finish<S>(
    store: &S,
    lease: &DocumentLease,
    outcome: DocumentStatus,
) -> Result<Document, StoreError>
where
    S: ResultStore + ?Sized,
{
    store.transition(
        &lease.document_id,
        DocumentStatus::Processing,
        lease.generation,
        outcome,
    )
}
