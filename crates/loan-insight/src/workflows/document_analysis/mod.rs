//! Credit-application document analysis: page text in, scored and persisted verdict out.

pub mod domain;
pub mod extraction;
pub mod lifecycle;
pub mod parser;
pub mod repository;
pub mod scoring;
pub mod service;
pub mod validation;

pub use domain::{
    AnalysisId, AnalysisRecord, CheckingLevel, Document, DocumentId, DocumentStatus, Gender,
    HousingType, JobCategory, LoanPurpose, OutcomeStatus, PageText, ParsedFieldSet,
    SavingsLevel, ScoringOutcome, StorageReference, UserId,
};
pub use extraction::{ExtractionError, PdfToTextSource, StaticTextSource, TextSource};
pub use lifecycle::{ClaimMode, DocumentLease};
pub use parser::{parse_fields, parse_fields_at};
pub use repository::{
    AnalysisSummary, ArtifactError, ArtifactSink, HeatmapArtifact, HeatmapContent,
    InMemoryResultStore, ResultStore, StoreError, HEATMAP_CAPTION,
};
pub use scoring::{
    Capability, ComplianceReport, CrossVerification, HeatmapReference, HttpScoringClient,
    RiskAssessment, ScoringClient, ScoringError, ScoringErrorKind,
};
pub use service::{AnalysisOrchestrator, PipelineError};
pub use validation::{validate, validate_raw, ValidationReport};

#[cfg(test)]
mod tests;
