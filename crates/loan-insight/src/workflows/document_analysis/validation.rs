use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::domain::{
    CheckingLevel, HousingType, JobCategory, LoanPurpose, ParsedFieldSet, SavingsLevel,
};

const MIN_AGE: f64 = 18.0;
const MAX_AGE: f64 = 100.0;
const GENDERS: [&str; 2] = ["male", "female"];

/// Outcome of checking a field set against the scoring service's input contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    /// One message per violation, in field declaration order.
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

/// Validate a typed field set. Never fails; violations are reported, not raised.
pub fn validate(fields: &ParsedFieldSet) -> ValidationReport {
    let candidate = Candidate {
        age: fields.age.map(f64::from),
        gender: fields.gender.map(|gender| gender.label().to_string()),
        job: Some(fields.job.label().to_string()),
        housing: Some(fields.housing.label().to_string()),
        savings: Some(fields.savings.label().to_string()),
        checking: Some(fields.checking.label().to_string()),
        credit_amount: fields.credit_amount,
        duration: fields.duration_months.map(f64::from),
        purpose: Some(fields.purpose.label().to_string()),
    };
    report(candidate.check())
}

/// Validate a field set decoded from untyped JSON using the scoring service's wire keys.
pub fn validate_raw(fields: &Value) -> ValidationReport {
    let text = |key: &str| match fields.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(value)) => Some(value.clone()),
        Some(other) => Some(other.to_string()),
    };
    let number = |key: &str| fields.get(key).and_then(Value::as_f64);

    let candidate = Candidate {
        age: number("age"),
        gender: text("gender"),
        job: text("job"),
        housing: text("housing"),
        savings: text("saving_accounts"),
        checking: text("checking_account"),
        credit_amount: number("credit_amount"),
        duration: number("duration"),
        purpose: text("purpose"),
    };
    report(candidate.check())
}

fn report(errors: Vec<String>) -> ValidationReport {
    if errors.is_empty() {
        debug!("all fields validated");
    } else {
        warn!(count = errors.len(), ?errors, "field validation failed");
    }
    ValidationReport::from_errors(errors)
}

/// Label-level view shared by typed and untyped input.
struct Candidate {
    age: Option<f64>,
    gender: Option<String>,
    job: Option<String>,
    housing: Option<String>,
    savings: Option<String>,
    checking: Option<String>,
    credit_amount: Option<f64>,
    duration: Option<f64>,
    purpose: Option<String>,
}

impl Candidate {
    fn check(&self) -> Vec<String> {
        let mut errors = Vec::new();

        match self.age {
            None => errors.push("Age not found in document".to_string()),
            Some(age) if !(MIN_AGE..=MAX_AGE).contains(&age) => errors.push(format!(
                "Age {} out of valid range (18-100)",
                display_number(age)
            )),
            Some(_) => {}
        }

        if !one_of(&self.gender, &GENDERS) {
            errors.push("Gender must be 'male' or 'female'".to_string());
        }

        let jobs = JobCategory::ALL.map(JobCategory::label);
        if !one_of(&self.job, &jobs) {
            errors.push(format!(
                "Job '{}' must be one of {}",
                display_label(&self.job),
                list_literal(&jobs)
            ));
        }

        let housing = HousingType::ALL.map(HousingType::label);
        if !one_of(&self.housing, &housing) {
            errors.push(format!(
                "Housing '{}' must be one of {}",
                display_label(&self.housing),
                list_literal(&housing)
            ));
        }

        let savings = SavingsLevel::ALL.map(SavingsLevel::label);
        if !one_of(&self.savings, &savings) {
            errors.push(format!(
                "Saving accounts must be one of {}",
                list_literal(&savings)
            ));
        }

        let checking = CheckingLevel::ALL.map(CheckingLevel::label);
        if !one_of(&self.checking, &checking) {
            errors.push(format!(
                "Checking account must be one of {}",
                list_literal(&checking)
            ));
        }

        match self.credit_amount {
            None => errors.push("Credit amount not found in document".to_string()),
            Some(amount) if amount <= 0.0 => {
                errors.push("Credit amount must be positive".to_string())
            }
            Some(_) => {}
        }

        match self.duration {
            None => errors.push("Loan duration not found in document".to_string()),
            Some(months) if months <= 0.0 => {
                errors.push("Duration must be positive (in months)".to_string())
            }
            Some(_) => {}
        }

        let purposes = LoanPurpose::ALL.map(LoanPurpose::label);
        if !one_of(&self.purpose, &purposes) {
            errors.push(format!(
                "Purpose must be one of {}",
                list_literal(&purposes)
            ));
        }

        errors
    }
}

fn one_of(value: &Option<String>, allowed: &[&str]) -> bool {
    value
        .as_deref()
        .is_some_and(|value| allowed.contains(&value))
}

fn display_label(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("None")
}

fn display_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// `['a', 'b']`, the list format the scoring service documents its vocabularies in.
fn list_literal(values: &[&str]) -> String {
    let quoted: Vec<String> = values.iter().map(|value| format!("'{value}'")).collect();
    format!("[{}]", quoted.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::document_analysis::domain::Gender;
    use serde_json::json;

    fn complete() -> ParsedFieldSet {
        ParsedFieldSet {
            age: Some(35),
            gender: Some(Gender::Female),
            job: JobCategory::Skilled,
            housing: HousingType::Own,
            savings: SavingsLevel::Moderate,
            checking: CheckingLevel::Little,
            credit_amount: Some(12_000.0),
            duration_months: Some(36),
            purpose: LoanPurpose::Car,
            validation_errors: Vec::new(),
        }
    }

    #[test]
    fn complete_field_set_is_valid() {
        let report = validate(&complete());
        assert!(report.is_valid);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn collects_every_violation_in_field_order() {
        let fields = ParsedFieldSet {
            age: None,
            gender: None,
            credit_amount: None,
            duration_months: None,
            ..complete()
        };
        let report = validate(&fields);

        assert!(!report.is_valid);
        assert_eq!(
            report.errors,
            vec![
                "Age not found in document",
                "Gender must be 'male' or 'female'",
                "Credit amount not found in document",
                "Loan duration not found in document",
            ]
        );
    }

    #[test]
    fn range_and_sign_violations_have_their_own_messages() {
        let fields = ParsedFieldSet {
            age: Some(17),
            credit_amount: Some(-5.0),
            duration_months: Some(0),
            ..complete()
        };
        assert_eq!(
            validate(&fields).errors,
            vec![
                "Age 17 out of valid range (18-100)",
                "Credit amount must be positive",
                "Duration must be positive (in months)",
            ]
        );
    }

    #[test]
    fn raw_input_reports_vocabulary_violations() {
        let raw = json!({
            "age": 44,
            "gender": "male",
            "job": "astronaut",
            "housing": null,
            "saving_accounts": "plenty",
            "checking_account": "rich",
            "credit_amount": 1000.0,
            "duration": 12,
            "purpose": "holiday"
        });
        let report = validate_raw(&raw);

        assert_eq!(
            report.errors,
            vec![
                "Job 'astronaut' must be one of ['unemployed', 'unskilled', 'skilled', 'highly skilled']",
                "Housing 'None' must be one of ['free', 'rent', 'own']",
                "Saving accounts must be one of ['none', 'little', 'moderate', 'quite rich', 'rich']",
                "Purpose must be one of ['business', 'car', 'domestic appliances', 'education', 'furniture/equipment', 'radio/TV', 'repairs', 'vacation/others']",
            ]
        );
    }

    #[test]
    fn raw_input_matches_typed_validation_for_serialized_fields() {
        let fields = ParsedFieldSet {
            gender: None,
            ..complete()
        };
        let raw = serde_json::to_value(&fields).expect("field set serializes");
        assert_eq!(validate_raw(&raw), validate(&fields));
    }

    #[test]
    fn raw_fractional_age_is_reported_verbatim() {
        let raw = json!({ "age": 101.5 });
        let report = validate_raw(&raw);
        assert_eq!(report.errors[0], "Age 101.5 out of valid range (18-100)");
        assert_eq!(report.errors.len(), 9);
    }
}
