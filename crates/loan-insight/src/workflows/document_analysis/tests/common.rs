use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;

use crate::workflows::document_analysis::domain::{
    AnalysisRecord, Document, DocumentId, DocumentStatus, PageText, StorageReference, UserId,
};
use crate::workflows::document_analysis::extraction::{ExtractionError, TextSource};
use crate::workflows::document_analysis::lifecycle::DocumentLease;
use crate::workflows::document_analysis::repository::{
    ArtifactError, ArtifactSink, HeatmapArtifact, InMemoryResultStore, ResultStore, StoreError,
};
use crate::workflows::document_analysis::scoring::{
    Capability, Payload, ScoringClient, ScoringError,
};
use crate::workflows::document_analysis::service::AnalysisOrchestrator;

pub(super) const APPLICATION_TEXT: &str = "Age: 45 years. Occupation: unemployed. Housing: own. \
     Loan amount: Rs. 50000. Duration: 24 months. Purpose: education.";

/// 1x1 transparent PNG.
pub(super) const PIXEL_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

pub(super) fn page(page_number: u32, text: &str) -> PageText {
    PageText {
        page_number,
        text: text.to_string(),
    }
}

pub(super) fn user() -> UserId {
    UserId("user-42".to_string())
}

pub(super) fn ingest(store: &InMemoryResultStore, id: &str) -> Document {
    let document = Document::ingest(
        DocumentId(id.to_string()),
        user(),
        "application.pdf",
        b"%PDF-1.4 sample",
    );
    store
        .insert_document(document)
        .expect("document registers")
}

pub(super) fn status_of(store: &InMemoryResultStore, id: &DocumentId) -> DocumentStatus {
    store
        .fetch_document(id)
        .expect("fetch succeeds")
        .expect("document present")
        .status
}

pub(super) fn object(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        other => panic!("expected JSON object, got {other}"),
    }
}

pub(super) fn risk_payload() -> Value {
    json!({
        "prediction": 1,
        "risk_score": 0.71,
        "probability": 0.71,
        "risk_class": "bad",
        "risk_factors": ["unemployed applicant"],
        "confidence": 0.64
    })
}

pub(super) fn compliance_payload() -> Value {
    json!({
        "compliance_score": 0.8,
        "violations": [{ "clause": "RBI-7", "issue": "income proof missing", "severity": "medium" }],
        "checks_performed": ["income", "kyc"],
        "status": "non_compliant"
    })
}

pub(super) fn crossverify_payload() -> Value {
    json!({
        "overall_score": 0.95,
        "matches": { "age": "match" },
        "discrepancies": [],
        "verification_status": "verified"
    })
}

/// Canned reply for one capability.
#[derive(Debug, Clone)]
pub(super) enum Reply {
    Payload(Value),
    Timeout,
    Refused,
    Status(u16),
}

impl Reply {
    fn resolve(&self, capability: Capability) -> Result<Payload, ScoringError> {
        match self {
            Reply::Payload(value) => Ok(object(value.clone())),
            Reply::Timeout => Err(ScoringError::Timeout { seconds: 60.0 }),
            Reply::Refused => Err(ScoringError::Connect {
                url: format!("http://localhost:5000/{}", capability.endpoint()),
            }),
            Reply::Status(status) => Err(ScoringError::Status {
                status: *status,
                body: "internal error".to_string(),
            }),
        }
    }
}

#[derive(Default)]
pub(super) struct ScriptedScoring {
    replies: HashMap<Capability, Reply>,
    calls: Mutex<Vec<(Capability, Value)>>,
}

impl ScriptedScoring {
    pub(super) fn healthy() -> Self {
        Self::default()
            .reply(Capability::Risk, Reply::Payload(risk_payload()))
            .reply(Capability::Compliance, Reply::Payload(compliance_payload()))
            .reply(Capability::CrossVerify, Reply::Payload(crossverify_payload()))
    }

    pub(super) fn unreachable() -> Self {
        Self::default()
            .reply(Capability::Risk, Reply::Refused)
            .reply(Capability::Compliance, Reply::Timeout)
            .reply(Capability::CrossVerify, Reply::Refused)
    }

    pub(super) fn reply(mut self, capability: Capability, reply: Reply) -> Self {
        self.replies.insert(capability, reply);
        self
    }

    pub(super) fn calls(&self) -> Vec<(Capability, Value)> {
        self.calls.lock().expect("scoring mutex poisoned").clone()
    }

    pub(super) fn body_for(&self, capability: Capability) -> Value {
        self.calls()
            .into_iter()
            .find(|(called, _)| *called == capability)
            .map(|(_, body)| body)
            .expect("capability was called")
    }
}

#[async_trait]
impl ScoringClient for ScriptedScoring {
    async fn invoke(&self, capability: Capability, body: &Value) -> Result<Payload, ScoringError> {
        self.calls
            .lock()
            .expect("scoring mutex poisoned")
            .push((capability, body.clone()));
        self.replies
            .get(&capability)
            .unwrap_or(&Reply::Refused)
            .resolve(capability)
    }
}

/// Returns the scripted page sets in order, repeating the last; the first call can be held
/// open until [`ScriptedText::release`].
pub(super) struct ScriptedText {
    responses: Vec<Vec<PageText>>,
    calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl ScriptedText {
    pub(super) fn new(responses: Vec<Vec<PageText>>) -> Self {
        Self {
            responses,
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub(super) fn application() -> Self {
        Self::new(vec![vec![page(1, APPLICATION_TEXT)]])
    }

    pub(super) fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Notify::new()));
        self
    }

    pub(super) fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextSource for ScriptedText {
    async fn pages(&self, _reference: &StorageReference) -> Result<Vec<PageText>, ExtractionError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == 0 {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
        }

        let index = call.min(self.responses.len().saturating_sub(1));
        Ok(self.responses.get(index).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub(super) struct RecordingSink {
    artifacts: Mutex<Vec<HeatmapArtifact>>,
    fail: bool,
}

impl RecordingSink {
    pub(super) fn failing() -> Self {
        Self {
            artifacts: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub(super) fn artifacts(&self) -> Vec<HeatmapArtifact> {
        self.artifacts.lock().expect("sink mutex poisoned").clone()
    }
}

#[async_trait]
impl ArtifactSink for RecordingSink {
    async fn store_heatmap(&self, artifact: HeatmapArtifact) -> Result<(), ArtifactError> {
        if self.fail {
            return Err(ArtifactError::Storage("bucket offline".to_string()));
        }
        self.artifacts
            .lock()
            .expect("sink mutex poisoned")
            .push(artifact);
        Ok(())
    }
}

/// Delegates to the in-memory store but rejects the first `failures` analysis inserts and the
/// first `done_failures` moves to `done`.
pub(super) struct FlakyStore {
    pub(super) inner: InMemoryResultStore,
    failures: AtomicUsize,
    done_failures: AtomicUsize,
}

impl FlakyStore {
    pub(super) fn new(inner: InMemoryResultStore, failures: usize) -> Self {
        Self {
            inner,
            failures: AtomicUsize::new(failures),
            done_failures: AtomicUsize::new(0),
        }
    }

    pub(super) fn failing_done(inner: InMemoryResultStore, done_failures: usize) -> Self {
        Self {
            done_failures: AtomicUsize::new(done_failures),
            ..Self::new(inner, 0)
        }
    }
}

fn take_failure(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
            remaining.checked_sub(1)
        })
        .is_ok()
}

impl ResultStore for FlakyStore {
    fn insert_document(&self, document: Document) -> Result<Document, StoreError> {
        self.inner.insert_document(document)
    }

    fn fetch_document(&self, id: &DocumentId) -> Result<Option<Document>, StoreError> {
        self.inner.fetch_document(id)
    }

    fn transition(
        &self,
        id: &DocumentId,
        expected: DocumentStatus,
        generation: u64,
        next: DocumentStatus,
    ) -> Result<Document, StoreError> {
        if next == DocumentStatus::Done && take_failure(&self.done_failures) {
            return Err(StoreError::Unavailable("commit timeout".to_string()));
        }
        self.inner.transition(id, expected, generation, next)
    }

    fn replace_page_texts(
        &self,
        lease: &DocumentLease,
        pages: Vec<PageText>,
    ) -> Result<(), StoreError> {
        self.inner.replace_page_texts(lease, pages)
    }

    fn page_texts(&self, id: &DocumentId) -> Result<Vec<PageText>, StoreError> {
        self.inner.page_texts(id)
    }

    fn insert_analysis(
        &self,
        lease: &DocumentLease,
        record: AnalysisRecord,
    ) -> Result<AnalysisRecord, StoreError> {
        if take_failure(&self.failures) {
            return Err(StoreError::Unavailable("write timeout".to_string()));
        }
        self.inner.insert_analysis(lease, record)
    }

    fn analyses_for(&self, id: &DocumentId) -> Result<Vec<AnalysisRecord>, StoreError> {
        self.inner.analyses_for(id)
    }

    fn delete_analyses(&self, lease: &DocumentLease) -> Result<usize, StoreError> {
        self.inner.delete_analyses(lease)
    }

    fn delete_page_texts(&self, lease: &DocumentLease) -> Result<usize, StoreError> {
        self.inner.delete_page_texts(lease)
    }
}

pub(super) fn build_orchestrator(
    text: ScriptedText,
    scoring: ScriptedScoring,
) -> (
    AnalysisOrchestrator<InMemoryResultStore>,
    InMemoryResultStore,
    Arc<ScriptedText>,
    Arc<ScriptedScoring>,
) {
    let store = InMemoryResultStore::default();
    let text = Arc::new(text);
    let scoring = Arc::new(scoring);
    let orchestrator =
        AnalysisOrchestrator::new(Arc::new(store.clone()), text.clone(), scoring.clone());
    (orchestrator, store, text, scoring)
}
