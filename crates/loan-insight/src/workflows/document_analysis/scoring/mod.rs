//! The three remote scoring capabilities and how their failures degrade.

mod http;
mod views;

pub use http::HttpScoringClient;
pub use views::{
    ComplianceReport, ComplianceViolation, CrossVerification, Discrepancy, HeatmapReference,
    MatchStatus, RiskAssessment, RiskClass, Severity,
};

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use super::domain::{DocumentId, OutcomeStatus, ParsedFieldSet, ScoringOutcome};

pub type Payload = Map<String, Value>;

const COMPLIANCE_PLACEHOLDER: &str = "Compliance endpoint not yet implemented by ML team";
const CROSSVERIFY_PLACEHOLDER: &str =
    "Cross-verification endpoint not yet implemented by ML team";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Risk,
    Compliance,
    CrossVerify,
}

impl Capability {
    pub const ALL: [Self; 3] = [Self::Risk, Self::Compliance, Self::CrossVerify];

    /// Path segment under the scoring service's base URL.
    pub const fn endpoint(self) -> &'static str {
        match self {
            Capability::Risk => "predict",
            Capability::Compliance => "compliance",
            Capability::CrossVerify => "crossverify",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Capability::Risk => "risk",
            Capability::Compliance => "compliance",
            Capability::CrossVerify => "crossverify",
        }
    }
}

/// Failure classes a scoring call can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringErrorKind {
    Timeout,
    Connect,
    Status(u16),
    Decode,
    Request,
}

impl ScoringErrorKind {
    /// Transport-level failures mean the service is unreachable; everything else is an error.
    pub const fn outcome_status(self) -> OutcomeStatus {
        match self {
            ScoringErrorKind::Timeout | ScoringErrorKind::Connect => OutcomeStatus::Unavailable,
            ScoringErrorKind::Status(_) | ScoringErrorKind::Decode | ScoringErrorKind::Request => {
                OutcomeStatus::Error
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("ML API timeout after {seconds} seconds")]
    Timeout { seconds: f64 },
    #[error("Cannot connect to ML API at {url}")]
    Connect { url: String },
    #[error("ML API HTTP error: {status} - {body}")]
    Status { status: u16, body: String },
    #[error("ML API returned an unreadable response: {0}")]
    Decode(String),
    #[error("ML API call failed: {0}")]
    Request(String),
}

impl ScoringError {
    pub fn kind(&self) -> ScoringErrorKind {
        match self {
            ScoringError::Timeout { .. } => ScoringErrorKind::Timeout,
            ScoringError::Connect { .. } => ScoringErrorKind::Connect,
            ScoringError::Status { status, .. } => ScoringErrorKind::Status(*status),
            ScoringError::Decode(_) => ScoringErrorKind::Decode,
            ScoringError::Request(_) => ScoringErrorKind::Request,
        }
    }
}

/// Remote scoring service. Implementations return the response object verbatim.
#[async_trait]
pub trait ScoringClient: Send + Sync {
    async fn invoke(&self, capability: Capability, body: &Value) -> Result<Payload, ScoringError>;
}

/// Inputs shared by the three capability requests of one run.
#[derive(Debug, Clone, Copy)]
pub struct ScoringRequest<'a> {
    pub document_id: &'a DocumentId,
    pub fields: &'a ParsedFieldSet,
    /// Forwarded to the risk capability only.
    pub raw_text: Option<&'a str>,
}

impl ScoringRequest<'_> {
    pub fn body(&self, capability: Capability) -> Value {
        let mut body = match serde_json::to_value(self.fields) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };

        match capability {
            Capability::Risk => {
                if let Some(text) = self.raw_text {
                    body.insert("text".to_string(), Value::String(text.to_string()));
                }
            }
            Capability::Compliance => {}
            Capability::CrossVerify => {
                body.insert("document_ids".to_string(), json!([self.document_id.0]));
            }
        }

        Value::Object(body)
    }
}

/// One outcome per capability, always present.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredOutcomes {
    pub risk: ScoringOutcome,
    pub compliance: ScoringOutcome,
    pub crossverify: ScoringOutcome,
}

impl ScoredOutcomes {
    pub fn degraded_count(&self) -> usize {
        [&self.risk, &self.compliance, &self.crossverify]
            .into_iter()
            .filter(|outcome| outcome.is_degraded())
            .count()
    }
}

/// Call all three capabilities concurrently. Individual failures never escape.
pub async fn score_all(client: &dyn ScoringClient, request: ScoringRequest<'_>) -> ScoredOutcomes {
    let (risk, compliance, crossverify) = tokio::join!(
        score_one(client, Capability::Risk, request),
        score_one(client, Capability::Compliance, request),
        score_one(client, Capability::CrossVerify, request),
    );

    ScoredOutcomes {
        risk,
        compliance,
        crossverify,
    }
}

async fn score_one(
    client: &dyn ScoringClient,
    capability: Capability,
    request: ScoringRequest<'_>,
) -> ScoringOutcome {
    let result = client.invoke(capability, &request.body(capability)).await;
    let outcome = settle(capability, result);

    match outcome.status {
        OutcomeStatus::Ok => info!(
            document_id = %request.document_id,
            capability = capability.label(),
            "scoring capability responded"
        ),
        status => warn!(
            document_id = %request.document_id,
            capability = capability.label(),
            ?status,
            error = outcome.message.as_deref().unwrap_or_default(),
            "scoring capability degraded"
        ),
    }

    outcome
}

/// Turn a client result into an outcome, substituting the placeholder payload on failure.
pub fn settle(capability: Capability, result: Result<Payload, ScoringError>) -> ScoringOutcome {
    match result {
        Ok(payload) => ScoringOutcome::ok(payload),
        Err(err) => {
            let message = err.to_string();
            ScoringOutcome {
                status: err.kind().outcome_status(),
                payload: placeholder(capability, &message),
                message: Some(message),
            }
        }
    }
}

fn placeholder(capability: Capability, error: &str) -> Payload {
    let value = match capability {
        Capability::Risk => json!({
            "prediction": null,
            "risk_score": null,
            "error": error,
            "status": "unavailable",
        }),
        Capability::Compliance => json!({
            "compliance_score": 1.0,
            "violations": [],
            "checks_performed": [],
            "status": "not_available",
            "message": COMPLIANCE_PLACEHOLDER,
        }),
        Capability::CrossVerify => json!({
            "overall_score": 1.0,
            "matches": {},
            "discrepancies": [],
            "status": "not_available",
            "message": CROSSVERIFY_PLACEHOLDER,
        }),
    };

    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Outcome recorded for every capability when the pipeline itself fails.
pub fn failed_outcome(capability: Capability, error: &str) -> ScoringOutcome {
    let mut payload = Map::new();
    if capability == Capability::Risk {
        payload.insert("error".to_string(), Value::String(error.to_string()));
        payload.insert("status".to_string(), Value::String("failed".to_string()));
    }

    ScoringOutcome {
        status: OutcomeStatus::Error,
        payload,
        message: Some(error.to_string()),
    }
}
