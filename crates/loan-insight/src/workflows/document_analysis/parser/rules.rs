//! Declarative rule tables evaluated top to bottom; the first matching rule wins.

use regex::{Captures, Regex};

/// Currency prefix accepted in front of every amount.
pub(crate) const CURRENCY: &str = r"(?:rs\.?|₹|inr|\$)?";
/// `1,234,567.89`-style amount, captured.
pub(crate) const AMOUNT: &str = r"([0-9]+(?:,[0-9]{3})*(?:\.[0-9]{2})?)";

pub(crate) fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("rule pattern compiles")
}

pub(crate) fn parse_amount(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse::<f64>().ok()
}

fn capture_u32(captures: &Captures<'_>, index: usize) -> Option<u32> {
    captures.get(index)?.as_str().parse().ok()
}

/// How a classification rule decides that it fires.
pub(crate) enum Matcher {
    /// Regex found anywhere in the text.
    Pattern(Regex),
    /// `present` found and `absent` not found.
    PatternWithout { present: Regex, absent: Regex },
    /// Any keyword found as a plain substring.
    Keywords(&'static [&'static str]),
}

impl Matcher {
    pub(crate) fn pattern(pattern: &str) -> Self {
        Self::Pattern(compile(pattern))
    }

    pub(crate) fn matches(&self, text: &str) -> bool {
        match self {
            Matcher::Pattern(regex) => regex.is_match(text),
            Matcher::PatternWithout { present, absent } => {
                present.is_match(text) && !absent.is_match(text)
            }
            Matcher::Keywords(keywords) => keywords.iter().any(|keyword| text.contains(keyword)),
        }
    }
}

pub(crate) struct ClassRule<T> {
    pub(crate) matcher: Matcher,
    pub(crate) value: T,
}

/// Ordered classification with a documented fallback.
pub(crate) struct RuleTable<T> {
    rules: Vec<ClassRule<T>>,
    fallback: T,
}

impl<T: Copy> RuleTable<T> {
    pub(crate) fn new(rules: Vec<ClassRule<T>>, fallback: T) -> Self {
        Self { rules, fallback }
    }

    /// Value of the first rule that fires, if any.
    pub(crate) fn first_match(&self, text: &str) -> Option<T> {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(text))
            .map(|rule| rule.value)
    }

    pub(crate) fn classify(&self, text: &str) -> T {
        self.first_match(text).unwrap_or(self.fallback)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.rules.len()
    }
}

/// One way of reading the applicant's age.
pub(crate) enum AgeRule {
    /// First capture group is the age itself.
    Stated(Regex),
    /// Captures day, month, year of birth.
    BirthDate(Regex),
}

impl AgeRule {
    /// Only the first occurrence of each pattern is considered.
    pub(crate) fn evaluate(&self, text: &str, reference_year: i32) -> Option<u32> {
        match self {
            AgeRule::Stated(regex) => {
                let captures = regex.captures(text)?;
                capture_u32(&captures, 1)
            }
            AgeRule::BirthDate(regex) => {
                let captures = regex.captures(text)?;
                let year = captures.get(3)?.as_str().parse::<i32>().ok()?;
                if year <= 1900 {
                    return None;
                }
                u32::try_from(reference_year - year).ok()
            }
        }
    }
}

/// Pattern whose first capture group is a currency amount.
pub(crate) struct AmountRule(pub(crate) Regex);

impl AmountRule {
    pub(crate) fn evaluate(&self, text: &str) -> Option<f64> {
        let captures = self.0.captures(text)?;
        parse_amount(captures.get(1)?.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DurationUnit {
    Months,
    Years,
}

/// Loan term pattern with its unit and the accepted range in that unit.
pub(crate) struct DurationRule {
    pub(crate) pattern: Regex,
    pub(crate) unit: DurationUnit,
}

impl DurationRule {
    pub(crate) fn months(pattern: &str) -> Self {
        Self {
            pattern: compile(pattern),
            unit: DurationUnit::Months,
        }
    }

    pub(crate) fn years(pattern: &str) -> Self {
        Self {
            pattern: compile(pattern),
            unit: DurationUnit::Years,
        }
    }

    pub(crate) fn evaluate(&self, text: &str) -> Option<u32> {
        let captures = self.pattern.captures(text)?;
        let value = capture_u32(&captures, 1)?;
        match self.unit {
            DurationUnit::Months if (1..=120).contains(&value) => Some(value),
            DurationUnit::Years if (1..=10).contains(&value) => Some(value * 12),
            _ => None,
        }
    }
}

/// Fixed balance thresholds: exactly zero, then ascending exclusive upper bounds, then the top band.
pub(crate) struct BalanceBuckets<T: 'static> {
    pub(crate) zero: T,
    pub(crate) bands: &'static [(f64, T)],
    pub(crate) top: T,
}

impl<T: Copy> BalanceBuckets<T> {
    pub(crate) fn bucket(&self, amount: f64) -> T {
        if amount == 0.0 {
            return self.zero;
        }
        self.bands
            .iter()
            .find(|(limit, _)| amount < *limit)
            .map(|(_, level)| *level)
            .unwrap_or(self.top)
    }
}

/// Account level: numeric balance first, keyword table second.
pub(crate) struct AccountRule<T: 'static> {
    pub(crate) balance: Vec<AmountRule>,
    pub(crate) buckets: BalanceBuckets<T>,
    pub(crate) keywords: RuleTable<T>,
}

impl<T: Copy> AccountRule<T> {
    pub(crate) fn for_account(
        account: &str,
        buckets: BalanceBuckets<T>,
        keywords: RuleTable<T>,
    ) -> Self {
        let balance = vec![
            AmountRule(compile(&format!(
                r"{account}[:\s]*(?:balance|account)?[:\s]*{CURRENCY}\s*{AMOUNT}"
            ))),
            AmountRule(compile(&format!(
                r"{account}[:\s]*(?:a/c|acc)[:\s]*{CURRENCY}\s*{AMOUNT}"
            ))),
        ];
        Self {
            balance,
            buckets,
            keywords,
        }
    }

    pub(crate) fn balance(&self, text: &str) -> Option<f64> {
        self.balance.iter().find_map(|rule| rule.evaluate(text))
    }

    pub(crate) fn classify(&self, text: &str) -> T {
        match self.balance(text) {
            Some(amount) => self.buckets.bucket(amount),
            None => self.keywords.classify(text),
        }
    }
}
