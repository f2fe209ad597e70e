//! Typed readings of `ok` scoring payloads.
//!
//! The remote service only partially implements its contract, so every field defaults when
//! missing and unknown enum values decode to `Unknown` instead of rejecting the payload.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::workflows::document_analysis::domain::ScoringOutcome;

fn decode<T: DeserializeOwned>(outcome: &ScoringOutcome) -> Option<T> {
    if !outcome.is_ok() {
        return None;
    }
    serde_json::from_value(Value::Object(outcome.payload.clone())).ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskClass {
    Good,
    Bad,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskAssessment {
    pub prediction: Option<u8>,
    pub risk_score: Option<f64>,
    pub probability: Option<f64>,
    pub risk_class: Option<RiskClass>,
    pub risk_factors: Vec<String>,
    pub confidence: Option<f64>,
    pub heatmap_base64: Option<String>,
    pub heatmap_url: Option<String>,
}

impl RiskAssessment {
    pub fn from_outcome(outcome: &ScoringOutcome) -> Option<Self> {
        decode(outcome)
    }

    pub fn has_heatmap(&self) -> bool {
        let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.is_empty());
        present(&self.heatmap_base64) || present(&self.heatmap_url)
    }
}

/// Heatmap attached to a risk payload, read from the raw keys so that a field the typed
/// [`RiskAssessment`] cannot decode never hides it. Null and empty strings count as absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeatmapReference {
    /// `heatmap_base64`; wins over a URL.
    Encoded(String),
    Url(String),
}

impl HeatmapReference {
    pub fn from_outcome(outcome: &ScoringOutcome) -> Option<Self> {
        if !outcome.is_ok() {
            return None;
        }
        Self::from_payload(&outcome.payload)
    }

    pub fn from_payload(payload: &Map<String, Value>) -> Option<Self> {
        let text = |key: &str| {
            payload
                .get(key)
                .and_then(Value::as_str)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        text("heatmap_base64")
            .map(Self::Encoded)
            .or_else(|| text("heatmap_url").map(Self::Url))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceViolation {
    pub clause: String,
    pub issue: String,
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceReport {
    pub compliance_score: Option<f64>,
    pub violations: Vec<ComplianceViolation>,
    pub checks_performed: Vec<String>,
    /// `compliant`, `non_compliant` or `not_available`.
    pub status: Option<String>,
}

impl ComplianceReport {
    pub fn from_outcome(outcome: &ScoringOutcome) -> Option<Self> {
        decode(outcome)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Match,
    PartialMatch,
    Mismatch,
    NotProvided,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub field: String,
    pub status: MatchStatus,
    #[serde(default)]
    pub details: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossVerification {
    pub overall_score: Option<f64>,
    pub matches: BTreeMap<String, MatchStatus>,
    pub discrepancies: Vec<Discrepancy>,
    pub verification_status: Option<String>,
}

impl CrossVerification {
    pub fn from_outcome(outcome: &ScoringOutcome) -> Option<Self> {
        decode(outcome)
    }
}
