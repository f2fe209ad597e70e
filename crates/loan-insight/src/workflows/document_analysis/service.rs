use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;
use tracing::{error, info, warn};

use super::domain::{
    AnalysisId, AnalysisRecord, Document, DocumentId, DocumentStatus, StorageReference,
};
use super::extraction::{full_text, ExtractionError, TextSource};
use super::lifecycle::{claim, finish, ClaimError, ClaimMode, DocumentLease};
use super::parser::parse_fields;
use super::repository::{
    AnalysisSummary, ArtifactError, ArtifactSink, HeatmapArtifact, HeatmapContent, ResultStore,
    StoreError, HEATMAP_CAPTION,
};
use super::scoring::{
    failed_outcome, score_all, Capability, HeatmapReference, ScoringClient, ScoringRequest,
};
use super::validation::validate;

static ANALYSIS_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_analysis_id() -> AnalysisId {
    let id = ANALYSIS_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    AnalysisId(format!("analysis-{id:06}"))
}

/// Drives extraction, parsing, validation, scoring and persistence for one document.
pub struct AnalysisOrchestrator<S> {
    store: Arc<S>,
    text_source: Arc<dyn TextSource>,
    scoring: Arc<dyn ScoringClient>,
    artifacts: Option<Arc<dyn ArtifactSink>>,
    include_raw_text: bool,
}

impl<S> AnalysisOrchestrator<S>
where
    S: ResultStore + 'static,
{
    pub fn new(
        store: Arc<S>,
        text_source: Arc<dyn TextSource>,
        scoring: Arc<dyn ScoringClient>,
    ) -> Self {
        Self {
            store,
            text_source,
            scoring,
            artifacts: None,
            include_raw_text: false,
        }
    }

    /// Forward heatmaps produced by the risk capability to `sink`.
    pub fn with_artifacts(mut self, sink: Arc<dyn ArtifactSink>) -> Self {
        self.artifacts = Some(sink);
        self
    }

    /// Send the concatenated document text along with the risk request.
    pub fn with_raw_text(mut self, include: bool) -> Self {
        self.include_raw_text = include;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Register an uploaded document in `processing`.
    pub fn ingest(&self, document: Document) -> Result<Document, PipelineError> {
        Ok(self.store.insert_document(document)?)
    }

    /// Analyze a freshly ingested document.
    pub async fn run(&self, document_id: &DocumentId) -> Result<AnalysisRecord, PipelineError> {
        let document = self.document(document_id)?;
        let lease = claim(self.store.as_ref(), &document, ClaimMode::Run)?;
        self.execute(&document, &lease).await
    }

    /// Discard previous results and analyze the document again.
    pub async fn rerun(&self, document_id: &DocumentId) -> Result<AnalysisRecord, PipelineError> {
        let document = self.document(document_id)?;
        info!(document_id = %document_id, status = %document.status, "rerunning analysis");

        let lease = claim(self.store.as_ref(), &document, ClaimMode::Rerun)?;
        let analyses = self.store.delete_analyses(&lease)?;
        let pages = self.store.delete_page_texts(&lease)?;
        info!(
            document_id = %document_id,
            analyses,
            pages,
            "cleared previous analysis"
        );

        self.execute(&document, &lease).await
    }

    /// The stored analysis, only once the document reached `done`.
    pub fn completed_analysis(
        &self,
        document_id: &DocumentId,
    ) -> Result<AnalysisRecord, PipelineError> {
        let document = self.document(document_id)?;
        if document.status != DocumentStatus::Done {
            return Err(PipelineError::NotReady {
                status: document.status,
            });
        }

        self.store
            .analyses_for(document_id)?
            .into_iter()
            .next()
            .ok_or(PipelineError::NotReady {
                status: document.status,
            })
    }

    pub fn summary(&self, document_id: &DocumentId) -> Result<AnalysisSummary, PipelineError> {
        let analyses = self.store.analyses_for(document_id)?;
        Ok(AnalysisSummary::from_record(analyses.first()))
    }

    fn document(&self, document_id: &DocumentId) -> Result<Document, PipelineError> {
        self.store
            .fetch_document(document_id)?
            .ok_or_else(|| PipelineError::DocumentNotFound(document_id.clone()))
    }

    async fn execute(
        &self,
        document: &Document,
        lease: &DocumentLease,
    ) -> Result<AnalysisRecord, PipelineError> {
        info!(document_id = %document.id, generation = lease.generation, "starting analysis");

        let stored = match self.analyze(document, lease).await {
            Ok(stored) => stored,
            Err(err) => return Err(self.fail(document, lease, err, false)),
        };

        match finish(self.store.as_ref(), lease, DocumentStatus::Done) {
            Ok(_) => {
                info!(document_id = %document.id, "analysis complete");
                Ok(stored)
            }
            Err(err) => Err(self.fail(document, lease, err.into(), true)),
        }
    }

    /// `stored` is set once this run's analysis record has been written.
    fn fail(
        &self,
        document: &Document,
        lease: &DocumentLease,
        err: PipelineError,
        stored: bool,
    ) -> PipelineError {
        if err.is_superseded() {
            warn!(document_id = %document.id, error = %err, "analysis superseded by a newer run");
        } else {
            error!(document_id = %document.id, error = %err, "analysis failed");
            self.record_failure(document, lease, &err, stored);
        }
        err
    }

    async fn analyze(
        &self,
        document: &Document,
        lease: &DocumentLease,
    ) -> Result<AnalysisRecord, PipelineError> {
        let pages = self.text_source.pages(&document.storage_reference).await?;
        self.store.replace_page_texts(lease, pages.clone())?;
        let text = full_text(&pages)?;
        info!(
            document_id = %document.id,
            pages = pages.len(),
            characters = text.chars().count(),
            "extracted document text"
        );

        let mut fields = parse_fields(&text);
        let report = validate(&fields);
        if !report.is_valid {
            warn!(
                document_id = %document.id,
                errors = %report.errors.join(", "),
                "field validation warnings"
            );
        }
        fields.validation_errors = report.errors;

        let request = ScoringRequest {
            document_id: &document.id,
            fields: &fields,
            raw_text: self.include_raw_text.then_some(text.as_str()),
        };
        let outcomes = score_all(self.scoring.as_ref(), request).await;
        if outcomes.degraded_count() > 0 {
            warn!(
                document_id = %document.id,
                degraded = outcomes.degraded_count(),
                "completing with degraded scoring outcomes"
            );
        }

        let record = AnalysisRecord {
            id: next_analysis_id(),
            document_id: document.id.clone(),
            user_id: document.user_id.clone(),
            risk: outcomes.risk,
            compliance: outcomes.compliance,
            crossverify: outcomes.crossverify,
            parsed_fields: Some(fields),
            error: None,
            created_at: Utc::now(),
        };
        let stored = self.store.insert_analysis(lease, record)?;
        info!(document_id = %document.id, analysis_id = %stored.id, "analysis stored");

        self.attach_heatmap(document, &stored).await;
        Ok(stored)
    }

    async fn attach_heatmap(&self, document: &Document, record: &AnalysisRecord) {
        let Some(sink) = &self.artifacts else {
            return;
        };
        let Some(heatmap) = HeatmapReference::from_outcome(&record.risk) else {
            return;
        };

        let artifact = match heatmap_artifact(document, record, heatmap) {
            Ok(artifact) => artifact,
            Err(err) => {
                warn!(document_id = %document.id, error = %err, "failed to process heatmap");
                return;
            }
        };

        match sink.store_heatmap(artifact).await {
            Ok(()) => info!(document_id = %document.id, "heatmap stored"),
            Err(err) => {
                warn!(document_id = %document.id, error = %err, "failed to store heatmap")
            }
        }
    }

    /// Best effort: an error-only record first, then `failed`. Neither failure is propagated.
    ///
    /// A run keeps a single record, so an analysis it already stored is discarded first; if that
    /// is not possible the stored record stays and only the status changes.
    fn record_failure(
        &self,
        document: &Document,
        lease: &DocumentLease,
        err: &PipelineError,
        replace_stored: bool,
    ) {
        if replace_stored {
            if let Err(store_err) = self.store.delete_analyses(lease) {
                warn!(document_id = %document.id, error = %store_err, "could not discard analysis of failed run");
                self.mark_failed(document, lease);
                return;
            }
        }

        let message = err.to_string();
        let record = AnalysisRecord {
            id: next_analysis_id(),
            document_id: document.id.clone(),
            user_id: document.user_id.clone(),
            risk: failed_outcome(Capability::Risk, &message),
            compliance: failed_outcome(Capability::Compliance, &message),
            crossverify: failed_outcome(Capability::CrossVerify, &message),
            parsed_fields: None,
            error: Some(message),
            created_at: Utc::now(),
        };

        if let Err(store_err) = self.store.insert_analysis(lease, record) {
            warn!(document_id = %document.id, error = %store_err, "could not store failure record");
        }
        self.mark_failed(document, lease);
    }

    fn mark_failed(&self, document: &Document, lease: &DocumentLease) {
        if let Err(store_err) = finish(self.store.as_ref(), lease, DocumentStatus::Failed) {
            warn!(document_id = %document.id, error = %store_err, "could not mark document failed");
        }
    }
}

fn heatmap_artifact(
    document: &Document,
    record: &AnalysisRecord,
    heatmap: HeatmapReference,
) -> Result<HeatmapArtifact, ArtifactError> {
    let content = match heatmap {
        HeatmapReference::Encoded(encoded) => HeatmapContent::Image {
            reference: StorageReference::heatmap(&document.user_id, &document.id),
            content_type: mime::IMAGE_PNG,
            bytes: STANDARD.decode(encoded.as_bytes())?,
        },
        HeatmapReference::Url(url) => HeatmapContent::External { url },
    };

    Ok(HeatmapArtifact {
        document_id: document.id.clone(),
        analysis_id: record.id.clone(),
        user_id: document.user_id.clone(),
        caption: HEATMAP_CAPTION.to_string(),
        content,
    })
}

/// Errors that escape the pipeline. Scoring failures never do.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("document {0} not found")]
    DocumentNotFound(DocumentId),
    #[error("document is {status}; only processing documents can be run")]
    NotProcessing { status: DocumentStatus },
    #[error("analysis not ready: document is {status}")]
    NotReady { status: DocumentStatus },
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PipelineError {
    /// A newer run owns the document; this run must not touch it further.
    pub fn is_superseded(&self) -> bool {
        matches!(self, PipelineError::Store(err) if err.is_superseded())
    }
}

impl From<ClaimError> for PipelineError {
    fn from(err: ClaimError) -> Self {
        match err {
            ClaimError::NotProcessing { status } => PipelineError::NotProcessing { status },
            ClaimError::Store(err) => PipelineError::Store(err),
        }
    }
}
