// src/utils/text.rs

//! Text cleanup and field inference shared by the adapters.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{EmploymentType, ExperienceLevel, SalaryRange};

static RANGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(\d[\d,]*(?:\.\d+)?)\s*(k)?\s*(?:-|–|to)\s*(?:[$£€]|kes|ksh\.?|usd|gbp|eur)?\s*(\d[\d,]*(?:\.\d+)?)\s*(k)?",
    )
    .expect("salary range pattern")
});

static SINGLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d[\d,]*(?:\.\d+)?)\s*(k)?").expect("salary pattern")
});

static INTERN_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bintern(s|ship|ships)?\b").expect("intern pattern"));

static SENIOR_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(senior|sr|lead|principal|staff)\b").expect("senior pattern")
});

static ENTRY_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(junior|jr|entry|associate|graduate)\b").expect("entry pattern")
});

static MID_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(mid|intermediate)\b").expect("mid pattern"));

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_amount(digits: &str, thousands: bool) -> Option<f64> {
    let value: f64 = digits.replace(',', "").parse().ok()?;
    Some(if thousands { value * 1000.0 } else { value })
}

/// Guess the currency from symbols or codes in the text.
pub fn detect_currency(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    if lower.contains("kes") || lower.contains("ksh") {
        "KES"
    } else if text.contains('£') || lower.contains("gbp") {
        "GBP"
    } else if text.contains('€') || lower.contains("eur") {
        "EUR"
    } else {
        "USD"
    }
}

/// Extract a salary range from free text such as "$80k - $100k" or "KES 50,000+".
pub fn extract_salary(text: &str) -> Option<SalaryRange> {
    if text.trim().is_empty() {
        return None;
    }
    let currency = detect_currency(text);

    if let Some(caps) = RANGE_PATTERN.captures(text) {
        let min = parse_amount(&caps[1], caps.get(2).is_some() || caps.get(4).is_some());
        let max = parse_amount(&caps[3], caps.get(4).is_some());
        if min.is_some() || max.is_some() {
            return Some(SalaryRange::new(min, max, currency));
        }
    }

    let caps = SINGLE_PATTERN.captures(text)?;
    let amount = parse_amount(&caps[1], caps.get(2).is_some())?;
    Some(SalaryRange::new(Some(amount), None, currency))
}

/// Infer employment type from a description or contract label.
pub fn infer_employment_type(text: &str) -> Option<EmploymentType> {
    let lower = text.to_lowercase();
    if lower.contains("full-time") || lower.contains("full time") {
        Some(EmploymentType::FullTime)
    } else if lower.contains("part-time") || lower.contains("part time") {
        Some(EmploymentType::PartTime)
    } else if lower.contains("contract") {
        Some(EmploymentType::Contract)
    } else if lower.contains("internship") {
        Some(EmploymentType::Internship)
    } else if lower.contains("freelance") {
        Some(EmploymentType::Freelance)
    } else {
        None
    }
}

/// Infer seniority from a title or description, matching whole words.
pub fn infer_experience_level(text: &str) -> Option<ExperienceLevel> {
    if INTERN_WORDS.is_match(text) {
        Some(ExperienceLevel::Intern)
    } else if SENIOR_WORDS.is_match(text) {
        Some(ExperienceLevel::Senior)
    } else if ENTRY_WORDS.is_match(text) {
        Some(ExperienceLevel::Entry)
    } else if MID_WORDS.is_match(text) {
        Some(ExperienceLevel::MidLevel)
    } else {
        None
    }
}

/// Whether the text advertises remote work.
pub fn mentions_remote(text: &str) -> bool {
    let lower = text.to_lowercase();
    ["remote", "work from home", "wfh", "distributed"]
        .iter()
        .any(|k| lower.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \n b\t c "), "a b c");
        assert_eq!(normalize_whitespace(""), "");
    }

    #[test]
    fn test_extract_salary_range() {
        let salary = extract_salary("$80,000 - $100,000 a year").unwrap();
        assert_eq!(salary.min, Some(80_000.0));
        assert_eq!(salary.max, Some(100_000.0));
        assert_eq!(salary.currency, "USD");
    }

    #[test]
    fn test_extract_salary_thousands_suffix() {
        let salary = extract_salary("$80k to $120k").unwrap();
        assert_eq!(salary.min, Some(80_000.0));
        assert_eq!(salary.max, Some(120_000.0));
    }

    #[test]
    fn test_extract_salary_single_amount() {
        let salary = extract_salary("KES 50,000+").unwrap();
        assert_eq!(salary.min, Some(50_000.0));
        assert_eq!(salary.max, None);
        assert_eq!(salary.currency, "KES");
    }

    #[test]
    fn test_extract_salary_none() {
        assert!(extract_salary("").is_none());
        assert!(extract_salary("Competitive").is_none());
    }

    #[test]
    fn test_infer_fields() {
        assert_eq!(
            infer_employment_type("This is a Full-Time role"),
            Some(EmploymentType::FullTime)
        );
        assert_eq!(infer_employment_type("great team"), None);
        assert_eq!(
            infer_experience_level("Senior Data Analyst"),
            Some(ExperienceLevel::Senior)
        );
        assert_eq!(
            infer_experience_level("Data Analyst Internship"),
            Some(ExperienceLevel::Intern)
        );
        assert_eq!(
            infer_experience_level("Senior International Sales Lead"),
            Some(ExperienceLevel::Senior)
        );
        assert_eq!(infer_experience_level("Internal Auditor"), None);
        assert_eq!(
            infer_experience_level("Mid-level Sentry Engineer"),
            Some(ExperienceLevel::MidLevel)
        );
        assert!(mentions_remote("Fully remote, EU timezones"));
        assert!(!mentions_remote("On-site in Austin"));
    }
}
