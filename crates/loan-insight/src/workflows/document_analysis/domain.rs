use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Identifier wrapper for uploaded documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub String);

/// Identifier wrapper for the owner of a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Identifier wrapper for stored analysis records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalysisId(pub String);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for AnalysisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque storage path understood by the blob collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageReference(pub String);

impl StorageReference {
    /// `{user_id}/documents/{sha256}_{filename}`
    pub fn document(user_id: &UserId, sha256: &str, filename: &str) -> Self {
        Self(format!("{}/documents/{}_{}", user_id.0, sha256, filename))
    }

    /// `{user_id}/heatmaps/{document_id}_risk.png`
    pub fn heatmap(user_id: &UserId, document_id: &DocumentId) -> Self {
        Self(format!("{}/heatmaps/{}_risk.png", user_id.0, document_id.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Processing status exposed to downstream consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Processing,
    Done,
    Failed,
}

impl DocumentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            DocumentStatus::Processing => "processing",
            DocumentStatus::Done => "done",
            DocumentStatus::Failed => "failed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, DocumentStatus::Done | DocumentStatus::Failed)
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Uploaded credit application tracked through the analysis lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub user_id: UserId,
    pub filename: String,
    pub sha256: String,
    pub storage_reference: StorageReference,
    pub status: DocumentStatus,
    /// Bumped on every successful status transition; used as the compare-and-swap token.
    pub generation: u64,
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Register freshly uploaded bytes. The document starts in `processing`.
    pub fn ingest(id: DocumentId, user_id: UserId, filename: &str, bytes: &[u8]) -> Self {
        let sha256 = hex::encode(Sha256::digest(bytes));
        let storage_reference = StorageReference::document(&user_id, &sha256, filename);

        Self {
            id,
            user_id,
            filename: filename.to_string(),
            sha256,
            storage_reference,
            status: DocumentStatus::Processing,
            generation: 0,
            created_at: Utc::now(),
        }
    }
}

/// Text of one extracted page, 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    pub page_number: u32,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobCategory {
    #[serde(rename = "unemployed")]
    Unemployed,
    #[serde(rename = "unskilled")]
    Unskilled,
    #[serde(rename = "skilled")]
    Skilled,
    #[serde(rename = "highly skilled")]
    HighlySkilled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HousingType {
    Free,
    Rent,
    Own,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SavingsLevel {
    #[serde(rename = "none")]
    None,
    #[serde(rename = "little")]
    Little,
    #[serde(rename = "moderate")]
    Moderate,
    #[serde(rename = "quite rich")]
    QuiteRich,
    #[serde(rename = "rich")]
    Rich,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckingLevel {
    None,
    Little,
    Moderate,
    Rich,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanPurpose {
    #[serde(rename = "business")]
    Business,
    #[serde(rename = "car")]
    Car,
    #[serde(rename = "domestic appliances")]
    DomesticAppliances,
    #[serde(rename = "education")]
    Education,
    #[serde(rename = "furniture/equipment")]
    FurnitureEquipment,
    #[serde(rename = "radio/TV")]
    RadioTv,
    #[serde(rename = "repairs")]
    Repairs,
    #[serde(rename = "vacation/others")]
    VacationOthers,
}

impl Gender {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }
}

impl JobCategory {
    pub const ALL: [Self; 4] = [
        Self::Unemployed,
        Self::Unskilled,
        Self::Skilled,
        Self::HighlySkilled,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Unemployed => "unemployed",
            Self::Unskilled => "unskilled",
            Self::Skilled => "skilled",
            Self::HighlySkilled => "highly skilled",
        }
    }
}

impl HousingType {
    pub const ALL: [Self; 3] = [Self::Free, Self::Rent, Self::Own];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Rent => "rent",
            Self::Own => "own",
        }
    }
}

impl SavingsLevel {
    pub const ALL: [Self; 5] = [
        Self::None,
        Self::Little,
        Self::Moderate,
        Self::QuiteRich,
        Self::Rich,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Little => "little",
            Self::Moderate => "moderate",
            Self::QuiteRich => "quite rich",
            Self::Rich => "rich",
        }
    }
}

impl CheckingLevel {
    pub const ALL: [Self; 4] = [Self::None, Self::Little, Self::Moderate, Self::Rich];

    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Little => "little",
            Self::Moderate => "moderate",
            Self::Rich => "rich",
        }
    }
}

impl LoanPurpose {
    pub const ALL: [Self; 8] = [
        Self::Business,
        Self::Car,
        Self::DomesticAppliances,
        Self::Education,
        Self::FurnitureEquipment,
        Self::RadioTv,
        Self::Repairs,
        Self::VacationOthers,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Business => "business",
            Self::Car => "car",
            Self::DomesticAppliances => "domestic appliances",
            Self::Education => "education",
            Self::FurnitureEquipment => "furniture/equipment",
            Self::RadioTv => "radio/TV",
            Self::Repairs => "repairs",
            Self::VacationOthers => "vacation/others",
        }
    }
}

/// ML-ready field set extracted from a credit application.
///
/// Field names on the wire follow the scoring service's request schema, so the struct can be
/// posted as-is. Absent values serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedFieldSet {
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub job: JobCategory,
    pub housing: HousingType,
    #[serde(rename = "saving_accounts")]
    pub savings: SavingsLevel,
    #[serde(rename = "checking_account")]
    pub checking: CheckingLevel,
    pub credit_amount: Option<f64>,
    #[serde(rename = "duration")]
    pub duration_months: Option<u32>,
    pub purpose: LoanPurpose,
    #[serde(
        rename = "_validation_errors",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub validation_errors: Vec<String>,
}

/// Normalized status of one scoring capability call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Ok,
    Unavailable,
    Error,
}

/// Always-present result of a scoring capability, including degraded states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringOutcome {
    pub status: OutcomeStatus,
    pub payload: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ScoringOutcome {
    pub fn ok(payload: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            status: OutcomeStatus::Ok,
            payload,
            message: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == OutcomeStatus::Ok
    }

    pub fn is_degraded(&self) -> bool {
        !self.is_ok()
    }
}

/// Persisted verdict for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: AnalysisId,
    pub document_id: DocumentId,
    pub user_id: UserId,
    pub risk: ScoringOutcome,
    pub compliance: ScoringOutcome,
    pub crossverify: ScoringOutcome,
    /// Absent only on failed runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed_fields: Option<ParsedFieldSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AnalysisRecord {
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }

    pub fn validation_errors(&self) -> &[String] {
        self.parsed_fields
            .as_ref()
            .map(|fields| fields.validation_errors.as_slice())
            .unwrap_or(&[])
    }
}
