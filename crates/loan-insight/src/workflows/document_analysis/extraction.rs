use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::domain::{PageText, StorageReference};

const FORM_FEED: char = '\u{000C}';

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Failed to read document {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("PDF extraction failed: {0}")]
    Tool(String),
    #[error("No text extracted from document")]
    NoPages,
    #[error("Document appears to be empty or contains only images")]
    Blank,
}

/// Supplies ordered per-page text for a stored document.
#[async_trait]
pub trait TextSource: Send + Sync {
    async fn pages(&self, reference: &StorageReference) -> Result<Vec<PageText>, ExtractionError>;
}

/// Join non-empty pages into the text the parser sees. Blank documents are an error.
pub fn full_text(pages: &[PageText]) -> Result<String, ExtractionError> {
    if pages.is_empty() {
        return Err(ExtractionError::NoPages);
    }

    let text = pages
        .iter()
        .map(|page| page.text.as_str())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    if text.trim().is_empty() {
        return Err(ExtractionError::Blank);
    }
    Ok(text)
}

/// Split `pdftotext` output into trimmed, 1-based pages.
pub fn split_pages(output: &str) -> Vec<PageText> {
    let mut segments: Vec<&str> = output.split(FORM_FEED).collect();
    if segments.last().is_some_and(|last| last.trim().is_empty()) {
        segments.pop();
    }

    segments
        .into_iter()
        .enumerate()
        .map(|(index, text)| PageText {
            page_number: page_number(index),
            text: text.trim().to_string(),
        })
        .collect()
}

/// 1-based page number for a zero-based index, saturating at `u32::MAX`.
fn page_number(index: usize) -> u32 {
    u32::try_from(index.saturating_add(1)).unwrap_or(u32::MAX)
}

/// Extracts text with the poppler `pdftotext` utility from files under a storage root.
#[derive(Debug, Clone)]
pub struct PdfToTextSource {
    root: PathBuf,
    program: String,
}

impl PdfToTextSource {
    pub fn new(root: impl Into<PathBuf>, program: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            program: program.into(),
        }
    }

    pub fn resolve(&self, reference: &StorageReference) -> PathBuf {
        self.root.join(reference.as_str())
    }

    async fn run(&self, path: &Path) -> Result<String, ExtractionError> {
        let output = Command::new(&self.program)
            .arg("-enc")
            .arg("UTF-8")
            .arg(path)
            .arg("-")
            .output()
            .await
            .map_err(|source| ExtractionError::Launch {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ExtractionError::Tool(format!("{}: {}", output.status, stderr)));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl TextSource for PdfToTextSource {
    async fn pages(&self, reference: &StorageReference) -> Result<Vec<PageText>, ExtractionError> {
        let path = self.resolve(reference);
        tokio::fs::metadata(&path)
            .await
            .map_err(|source| ExtractionError::Unreadable {
                path: path.clone(),
                source,
            })?;

        let output = self.run(&path).await?;
        let pages = split_pages(&output);
        debug!(path = %path.display(), pages = pages.len(), "pdftotext finished");
        Ok(pages)
    }
}

/// Fixed pages regardless of the reference.
#[derive(Debug, Clone, Default)]
pub struct StaticTextSource {
    pages: Vec<PageText>,
}

impl StaticTextSource {
    pub fn new(pages: Vec<PageText>) -> Self {
        Self { pages }
    }

    /// Single page holding `text`.
    pub fn single(text: impl Into<String>) -> Self {
        Self::new(vec![PageText {
            page_number: 1,
            text: text.into(),
        }])
    }
}

#[async_trait]
impl TextSource for StaticTextSource {
    async fn pages(&self, _reference: &StorageReference) -> Result<Vec<PageText>, ExtractionError> {
        Ok(self.pages.clone())
    }
}
