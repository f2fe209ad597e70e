use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::document_analysis::{PipelineError, ScoringError, StoreError};
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Json(serde_json::Error),
    Scoring(ScoringError),
    Pipeline(PipelineError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Json(err) => write!(f, "json error: {}", err),
            AppError::Scoring(err) => write!(f, "scoring client error: {}", err),
            AppError::Pipeline(err) => write!(f, "analysis pipeline failed: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Json(err) => Some(err),
            AppError::Scoring(err) => Some(err),
            AppError::Pipeline(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<ScoringError> for AppError {
    fn from(value: ScoringError) -> Self {
        Self::Scoring(value)
    }
}

impl From<PipelineError> for AppError {
    fn from(value: PipelineError) -> Self {
        Self::Pipeline(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        Self::Pipeline(PipelineError::Store(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::document_analysis::ExtractionError;
    use std::error::Error as _;

    #[test]
    fn pipeline_errors_keep_their_source() {
        let err = AppError::from(PipelineError::Extraction(ExtractionError::Blank));
        assert_eq!(
            err.to_string(),
            "analysis pipeline failed: Document appears to be empty or contains only images"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn store_errors_are_pipeline_errors() {
        let err = AppError::from(StoreError::NotFound);
        assert!(matches!(
            err,
            AppError::Pipeline(PipelineError::Store(StoreError::NotFound))
        ));
    }
}
