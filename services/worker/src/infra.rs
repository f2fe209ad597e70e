use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use loan_insight::config::AppConfig;
use loan_insight::error::AppError;
use loan_insight::workflows::document_analysis::{
    AnalysisOrchestrator, ArtifactError, ArtifactSink, Document, HeatmapArtifact, HeatmapContent,
    HttpScoringClient, InMemoryResultStore, PdfToTextSource, StorageReference,
};
use tracing::info;

/// Writes heatmaps under the local storage root.
#[derive(Debug, Clone)]
pub(crate) struct FsArtifactSink {
    root: PathBuf,
}

impl FsArtifactSink {
    pub(crate) fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ArtifactSink for FsArtifactSink {
    async fn store_heatmap(&self, artifact: HeatmapArtifact) -> Result<(), ArtifactError> {
        let (path, bytes) = match &artifact.content {
            HeatmapContent::Image {
                reference, bytes, ..
            } => (self.root.join(reference.as_str()), bytes.clone()),
            HeatmapContent::External { url } => {
                let reference = StorageReference::heatmap(&artifact.user_id, &artifact.document_id);
                let path = self.root.join(format!("{}.url", reference.as_str()));
                (path, format!("{url}\n").into_bytes())
            }
        };

        write_file(&path, &bytes)
            .await
            .map_err(|err| ArtifactError::Storage(format!("{}: {err}", path.display())))?;

        info!(
            analysis_id = %artifact.analysis_id,
            path = %path.display(),
            caption = %artifact.caption,
            "heatmap written"
        );
        Ok(())
    }
}

pub(crate) async fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await
}

/// Copy uploaded bytes to the document's content-addressed location under the storage root.
pub(crate) async fn store_upload(
    config: &AppConfig,
    document: &Document,
    bytes: &[u8],
) -> Result<PathBuf, AppError> {
    let path = config.storage.root.join(document.storage_reference.as_str());
    write_file(&path, bytes).await?;
    Ok(path)
}

pub(crate) fn build_orchestrator(
    config: &AppConfig,
) -> Result<AnalysisOrchestrator<InMemoryResultStore>, AppError> {
    let store = Arc::new(InMemoryResultStore::default());
    let text_source = Arc::new(PdfToTextSource::new(
        config.storage.root.clone(),
        config.storage.pdftotext_bin.clone(),
    ));
    let scoring = Arc::new(HttpScoringClient::new(&config.scoring)?);

    let orchestrator = AnalysisOrchestrator::new(store, text_source, scoring)
        .with_raw_text(config.scoring.include_raw_text);

    if config.storage.attach_heatmaps {
        let sink = Arc::new(FsArtifactSink::new(config.storage.root.clone()));
        Ok(orchestrator.with_artifacts(sink))
    } else {
        Ok(orchestrator)
    }
}
