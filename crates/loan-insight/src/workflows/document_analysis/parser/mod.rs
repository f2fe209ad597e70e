//! Free text → [`ParsedFieldSet`].
//!
//! Each field has its own ordered rule table. Rules are evaluated against the lowercased
//! document and the first one that fires decides the value; if none fires the field falls back
//! to `None` or its documented default. Parsing never fails.

mod rules;
mod vocabulary;

use std::sync::LazyLock;

use chrono::{Datelike, Utc};
use regex::Regex;
use tracing::{debug, warn};

use super::domain::{
    CheckingLevel, Gender, HousingType, JobCategory, LoanPurpose, ParsedFieldSet, SavingsLevel,
};
use rules::{
    compile, AccountRule, AgeRule, AmountRule, BalanceBuckets, ClassRule, DurationRule, Matcher,
    RuleTable, AMOUNT, CURRENCY,
};
use vocabulary::*;

const MIN_AGE: u32 = 18;
const MAX_AGE: u32 = 100;

static SAVINGS_BANDS: [(f64, SavingsLevel); 3] = [
    (1_000.0, SavingsLevel::Little),
    (10_000.0, SavingsLevel::Moderate),
    (50_000.0, SavingsLevel::QuiteRich),
];

static CHECKING_BANDS: [(f64, CheckingLevel); 2] = [
    (500.0, CheckingLevel::Little),
    (5_000.0, CheckingLevel::Moderate),
];

static RULES: LazyLock<RuleBook> = LazyLock::new(RuleBook::standard);

/// Every field's rule table, compiled once.
struct RuleBook {
    age: Vec<AgeRule>,
    gender: RuleTable<Option<Gender>>,
    job: RuleTable<JobCategory>,
    housing: RuleTable<HousingType>,
    savings: AccountRule<SavingsLevel>,
    checking: AccountRule<CheckingLevel>,
    credit_amount: Vec<AmountRule>,
    duration: Vec<DurationRule>,
    explicit_purpose: Regex,
    purpose: RuleTable<LoanPurpose>,
}

fn rule<T>(matcher: Matcher, value: T) -> ClassRule<T> {
    ClassRule { matcher, value }
}

fn pattern<T>(regex: &str, value: T) -> ClassRule<T> {
    rule(Matcher::pattern(regex), value)
}

fn keywords<T>(words: &'static [&'static str], value: T) -> ClassRule<T> {
    rule(Matcher::Keywords(words), value)
}

impl RuleBook {
    fn standard() -> Self {
        let age = vec![
            AgeRule::Stated(compile(r"age[:\s]+([0-9]{2,3})")),
            AgeRule::Stated(compile(r"([0-9]{2})\s*years?\s*old")),
            AgeRule::Stated(compile(r"age[:\s]*([0-9]{2,3})\s*years?")),
            AgeRule::BirthDate(compile(
                r"dob[:\s]+([0-9]{1,2})[/-]([0-9]{1,2})[/-]([0-9]{4})",
            )),
            AgeRule::BirthDate(compile(
                r"date\s+of\s+birth[:\s]+([0-9]{1,2})[/-]([0-9]{1,2})[/-]([0-9]{4})",
            )),
        ];

        let gender = RuleTable::new(
            vec![
                pattern(r"\bgender[:\s]*(male|m)\b", Some(Gender::Male)),
                pattern(r"\bgender[:\s]*(female|f)\b", Some(Gender::Female)),
                rule(
                    Matcher::PatternWithout {
                        present: compile(r"\b(mr\.|mr|sir)\b"),
                        absent: compile(r"\b(mrs\.|mrs|ms\.|ms|miss)\b"),
                    },
                    Some(Gender::Male),
                ),
                pattern(r"\b(mrs\.|mrs|ms\.|ms|miss|madam)\b", Some(Gender::Female)),
            ],
            None,
        );

        let job = RuleTable::new(
            vec![
                pattern(
                    r"\b(unemployed|jobless|not\s+working|no\s+job|not\s+employed)\b",
                    JobCategory::Unemployed,
                ),
                keywords(HIGHLY_SKILLED_JOBS, JobCategory::HighlySkilled),
                keywords(SKILLED_JOBS, JobCategory::Skilled),
                keywords(UNSKILLED_JOBS, JobCategory::Unskilled),
                pattern(
                    r"\b(employed|occupation|profession|job|work|working)\b",
                    JobCategory::Skilled,
                ),
            ],
            JobCategory::Unemployed,
        );

        let housing = RuleTable::new(
            vec![
                pattern(
                    r"\b(own|owned|owner|self[- ]owned|property\s+owner)\b",
                    HousingType::Own,
                ),
                pattern(
                    r"\b(rent|rented|rental|tenant|lease|leased|renting)\b",
                    HousingType::Rent,
                ),
                pattern(
                    r"\b(free|provided|company\s+housing|parents|family\s+house|no\s+rent)\b",
                    HousingType::Free,
                ),
            ],
            HousingType::Rent,
        );

        let savings = AccountRule::for_account(
            "saving",
            BalanceBuckets {
                zero: SavingsLevel::None,
                bands: &SAVINGS_BANDS,
                top: SavingsLevel::Rich,
            },
            RuleTable::new(
                vec![
                    pattern(r"saving[s]?[:\s]*(none|no|zero|nil|\b0\b)", SavingsLevel::None),
                    pattern(r"saving[s]?[:\s]*(little|small|minimal|low)", SavingsLevel::Little),
                    pattern(
                        r"saving[s]?[:\s]*(quite\s+rich|very\s+good|substantial|significant)",
                        SavingsLevel::QuiteRich,
                    ),
                    pattern(r"saving[s]?[:\s]*(rich|high|excellent|strong)", SavingsLevel::Rich),
                    pattern(
                        r"saving[s]?[:\s]*(moderate|average|medium|fair)",
                        SavingsLevel::Moderate,
                    ),
                ],
                SavingsLevel::Little,
            ),
        );

        let checking = AccountRule::for_account(
            "checking",
            BalanceBuckets {
                zero: CheckingLevel::None,
                bands: &CHECKING_BANDS,
                top: CheckingLevel::Rich,
            },
            RuleTable::new(
                vec![
                    pattern(r"checking[:\s]*(none|no|zero|nil|\b0\b)", CheckingLevel::None),
                    pattern(r"checking[:\s]*(little|small|minimal|low)", CheckingLevel::Little),
                    pattern(
                        r"checking[:\s]*(rich|high|substantial|significant)",
                        CheckingLevel::Rich,
                    ),
                    pattern(
                        r"checking[:\s]*(moderate|average|medium|fair)",
                        CheckingLevel::Moderate,
                    ),
                ],
                CheckingLevel::Little,
            ),
        );

        let credit_amount = [
            format!(r"(?:loan|credit)\s*(?:amount|sum)?[:\s]*{CURRENCY}\s*{AMOUNT}"),
            format!(r"(?:amount|sum)[:\s]*{CURRENCY}\s*{AMOUNT}"),
            format!(r"(?:rs\.?|₹|inr|\$)\s*{AMOUNT}"),
            format!(r"principal[:\s]*{CURRENCY}\s*{AMOUNT}"),
        ]
        .iter()
        .map(|source| AmountRule(compile(source)))
        .collect();

        let duration = vec![
            DurationRule::months(r"duration[:\s]*([0-9]+)\s*months?"),
            DurationRule::months(r"tenure[:\s]*([0-9]+)\s*months?"),
            DurationRule::months(r"period[:\s]*([0-9]+)\s*months?"),
            DurationRule::months(r"term[:\s]*([0-9]+)\s*months?"),
            DurationRule::months(r"([0-9]+)\s*months?\s*(?:loan|tenure|period|term)"),
            DurationRule::years(r"duration[:\s]*([0-9]+)\s*years?"),
            DurationRule::years(r"tenure[:\s]*([0-9]+)\s*years?"),
            DurationRule::years(r"period[:\s]*([0-9]+)\s*years?"),
            DurationRule::years(r"term[:\s]*([0-9]+)\s*years?"),
        ];

        let purpose = RuleTable::new(
            vec![
                keywords(PURPOSE_BUSINESS, LoanPurpose::Business),
                keywords(PURPOSE_CAR, LoanPurpose::Car),
                keywords(PURPOSE_DOMESTIC_APPLIANCES, LoanPurpose::DomesticAppliances),
                keywords(PURPOSE_EDUCATION, LoanPurpose::Education),
                keywords(PURPOSE_FURNITURE, LoanPurpose::FurnitureEquipment),
                keywords(PURPOSE_RADIO_TV, LoanPurpose::RadioTv),
                keywords(PURPOSE_REPAIRS, LoanPurpose::Repairs),
            ],
            LoanPurpose::VacationOthers,
        );

        Self {
            age,
            gender,
            job,
            housing,
            savings,
            checking,
            credit_amount,
            duration,
            explicit_purpose: compile(r"purpose[:\s]*([a-zA-Z\s/]+)"),
            purpose,
        }
    }

    fn age(&self, text: &str, reference_year: i32) -> Option<u32> {
        self.age
            .iter()
            .filter_map(|rule| rule.evaluate(text, reference_year))
            .find(|age| (MIN_AGE..=MAX_AGE).contains(age))
    }

    fn credit_amount(&self, text: &str) -> Option<f64> {
        self.credit_amount
            .iter()
            .filter_map(|rule| rule.evaluate(text))
            .find(|amount| *amount > 0.0)
    }

    fn duration_months(&self, text: &str) -> Option<u32> {
        self.duration.iter().find_map(|rule| rule.evaluate(text))
    }

    fn purpose(&self, text: &str) -> LoanPurpose {
        let explicit = self
            .explicit_purpose
            .captures(text)
            .and_then(|captures| captures.get(1))
            .and_then(|field| self.purpose.first_match(field.as_str().trim()));

        explicit.unwrap_or_else(|| self.purpose.classify(text))
    }
}

/// Parse a full document using the current year for date-of-birth arithmetic.
pub fn parse_fields(full_text: &str) -> ParsedFieldSet {
    parse_fields_at(full_text, Utc::now().year())
}

/// Parse a full document, computing date-of-birth ages against `reference_year`.
pub fn parse_fields_at(full_text: &str, reference_year: i32) -> ParsedFieldSet {
    let text = full_text.to_lowercase();
    let rules = &*RULES;

    let fields = ParsedFieldSet {
        age: rules.age(&text, reference_year),
        gender: rules.gender.classify(&text),
        job: rules.job.classify(&text),
        housing: rules.housing.classify(&text),
        savings: rules.savings.classify(&text),
        checking: rules.checking.classify(&text),
        credit_amount: rules.credit_amount(&text),
        duration_months: rules.duration_months(&text),
        purpose: rules.purpose(&text),
        validation_errors: Vec::new(),
    };

    log_fields(&fields);
    fields
}

fn log_fields(fields: &ParsedFieldSet) {
    debug!(
        age = ?fields.age,
        gender = ?fields.gender,
        job = fields.job.label(),
        housing = fields.housing.label(),
        savings = fields.savings.label(),
        checking = fields.checking.label(),
        credit_amount = ?fields.credit_amount,
        duration_months = ?fields.duration_months,
        purpose = fields.purpose.label(),
        "parsed credit fields"
    );

    let missing: Vec<&str> = [
        ("age", fields.age.is_none()),
        ("gender", fields.gender.is_none()),
        ("credit_amount", fields.credit_amount.is_none()),
        ("duration", fields.duration_months.is_none()),
    ]
    .into_iter()
    .filter_map(|(name, absent)| absent.then_some(name))
    .collect();

    if !missing.is_empty() {
        warn!(?missing, "fields not found in document text");
    }
}
