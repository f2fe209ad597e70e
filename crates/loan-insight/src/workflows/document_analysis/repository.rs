use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::domain::{
    AnalysisId, AnalysisRecord, Document, DocumentId, DocumentStatus, PageText, ParsedFieldSet,
    StorageReference, UserId,
};
use super::lifecycle::DocumentLease;
use super::scoring::HeatmapReference;

/// Durable record of documents, their extracted pages, and analysis results.
///
/// Status changes are compare-and-swap on `(status, generation)`; writes made on behalf of a
/// run carry its [`DocumentLease`] and fail once the lease is superseded.
pub trait ResultStore: Send + Sync {
    fn insert_document(&self, document: Document) -> Result<Document, StoreError>;
    fn fetch_document(&self, id: &DocumentId) -> Result<Option<Document>, StoreError>;
    fn transition(
        &self,
        id: &DocumentId,
        expected: DocumentStatus,
        generation: u64,
        next: DocumentStatus,
    ) -> Result<Document, StoreError>;
    fn replace_page_texts(
        &self,
        lease: &DocumentLease,
        pages: Vec<PageText>,
    ) -> Result<(), StoreError>;
    fn page_texts(&self, id: &DocumentId) -> Result<Vec<PageText>, StoreError>;
    fn insert_analysis(
        &self,
        lease: &DocumentLease,
        record: AnalysisRecord,
    ) -> Result<AnalysisRecord, StoreError>;
    fn analyses_for(&self, id: &DocumentId) -> Result<Vec<AnalysisRecord>, StoreError>;
    fn delete_analyses(&self, lease: &DocumentLease) -> Result<usize, StoreError>;
    fn delete_page_texts(&self, lease: &DocumentLease) -> Result<usize, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document already exists")]
    Conflict,
    #[error("document not found")]
    NotFound,
    #[error(
        "status conflict: expected {expected} at generation {expected_generation}, \
         found {actual} at generation {actual_generation}"
    )]
    StatusConflict {
        expected: DocumentStatus,
        expected_generation: u64,
        actual: DocumentStatus,
        actual_generation: u64,
    },
    #[error("transition from {from} to {to} is not allowed")]
    InvalidTransition {
        from: DocumentStatus,
        to: DocumentStatus,
    },
    #[error("lease at generation {lease} was superseded by generation {current}")]
    StaleLease { lease: u64, current: u64 },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Another run claimed the document first.
    pub fn is_superseded(&self) -> bool {
        matches!(
            self,
            StoreError::StaleLease { .. } | StoreError::StatusConflict { .. }
        )
    }
}

#[derive(Debug, Default)]
struct StoreState {
    documents: HashMap<DocumentId, Document>,
    pages: HashMap<DocumentId, Vec<PageText>>,
    analyses: HashMap<DocumentId, Vec<AnalysisRecord>>,
}

impl StoreState {
    fn check_lease(&self, lease: &DocumentLease) -> Result<(), StoreError> {
        let document = self
            .documents
            .get(&lease.document_id)
            .ok_or(StoreError::NotFound)?;
        if document.generation != lease.generation || document.status != DocumentStatus::Processing
        {
            return Err(StoreError::StaleLease {
                lease: lease.generation,
                current: document.generation,
            });
        }
        Ok(())
    }
}

/// Process-local [`ResultStore`]; every operation runs under one lock so the guards are atomic.
#[derive(Debug, Default, Clone)]
pub struct InMemoryResultStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryResultStore {
    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))
    }
}

impl ResultStore for InMemoryResultStore {
    fn insert_document(&self, document: Document) -> Result<Document, StoreError> {
        let mut state = self.lock()?;
        if state.documents.contains_key(&document.id) {
            return Err(StoreError::Conflict);
        }
        state.documents.insert(document.id.clone(), document.clone());
        Ok(document)
    }

    fn fetch_document(&self, id: &DocumentId) -> Result<Option<Document>, StoreError> {
        Ok(self.lock()?.documents.get(id).cloned())
    }

    fn transition(
        &self,
        id: &DocumentId,
        expected: DocumentStatus,
        generation: u64,
        next: DocumentStatus,
    ) -> Result<Document, StoreError> {
        let mut state = self.lock()?;
        let document = state.documents.get_mut(id).ok_or(StoreError::NotFound)?;

        if document.status != expected || document.generation != generation {
            return Err(StoreError::StatusConflict {
                expected,
                expected_generation: generation,
                actual: document.status,
                actual_generation: document.generation,
            });
        }
        if !expected.can_transition_to(next) {
            return Err(StoreError::InvalidTransition {
                from: expected,
                to: next,
            });
        }

        document.status = next;
        document.generation += 1;
        Ok(document.clone())
    }

    fn replace_page_texts(
        &self,
        lease: &DocumentLease,
        pages: Vec<PageText>,
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.check_lease(lease)?;
        state.pages.insert(lease.document_id.clone(), pages);
        Ok(())
    }

    fn page_texts(&self, id: &DocumentId) -> Result<Vec<PageText>, StoreError> {
        Ok(self.lock()?.pages.get(id).cloned().unwrap_or_default())
    }

    fn insert_analysis(
        &self,
        lease: &DocumentLease,
        record: AnalysisRecord,
    ) -> Result<AnalysisRecord, StoreError> {
        let mut state = self.lock()?;
        state.check_lease(lease)?;
        state
            .analyses
            .entry(lease.document_id.clone())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    fn analyses_for(&self, id: &DocumentId) -> Result<Vec<AnalysisRecord>, StoreError> {
        Ok(self.lock()?.analyses.get(id).cloned().unwrap_or_default())
    }

    fn delete_analyses(&self, lease: &DocumentLease) -> Result<usize, StoreError> {
        let mut state = self.lock()?;
        state.check_lease(lease)?;
        Ok(state
            .analyses
            .remove(&lease.document_id)
            .map_or(0, |records| records.len()))
    }

    fn delete_page_texts(&self, lease: &DocumentLease) -> Result<usize, StoreError> {
        let mut state = self.lock()?;
        state.check_lease(lease)?;
        Ok(state
            .pages
            .remove(&lease.document_id)
            .map_or(0, |pages| pages.len()))
    }
}

pub const HEATMAP_CAPTION: &str = "Credit Risk Analysis Heatmap";

/// Visual derived from the risk outcome, linked to the analysis that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapArtifact {
    pub document_id: DocumentId,
    pub analysis_id: AnalysisId,
    pub user_id: UserId,
    pub caption: String,
    pub content: HeatmapContent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HeatmapContent {
    /// Decoded image bytes to be written at `reference`.
    Image {
        reference: StorageReference,
        content_type: mime::Mime,
        bytes: Vec<u8>,
    },
    /// Already rendered by the scoring service.
    External { url: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("heatmap is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("artifact storage failed: {0}")]
    Storage(String),
}

/// Optional sink for derived visuals.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    async fn store_heatmap(&self, artifact: HeatmapArtifact) -> Result<(), ArtifactError>;
}

/// Condensed view of a document's latest analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub has_analysis: bool,
    pub risk_score: Option<f64>,
    pub risk_class: Option<String>,
    pub prediction: Option<i64>,
    pub compliance_score: Option<f64>,
    pub violations_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_fields: Option<ParsedFieldSet>,
    pub has_heatmap: bool,
}

impl AnalysisSummary {
    pub fn from_record(record: Option<&AnalysisRecord>) -> Self {
        let Some(record) = record else {
            return Self {
                has_analysis: false,
                risk_score: None,
                risk_class: None,
                prediction: None,
                compliance_score: None,
                violations_count: 0,
                parsed_fields: None,
                has_heatmap: false,
            };
        };

        let risk = &record.risk.payload;
        let compliance = &record.compliance.payload;

        Self {
            has_analysis: true,
            risk_score: risk.get("risk_score").and_then(Value::as_f64),
            risk_class: risk
                .get("risk_class")
                .and_then(Value::as_str)
                .map(str::to_string),
            prediction: risk.get("prediction").and_then(Value::as_i64),
            compliance_score: compliance.get("compliance_score").and_then(Value::as_f64),
            violations_count: compliance
                .get("violations")
                .and_then(Value::as_array)
                .map_or(0, Vec::len),
            parsed_fields: record.parsed_fields.clone(),
            has_heatmap: HeatmapReference::from_payload(risk).is_some(),
        }
    }
}
