// src/models/job.rs

//! Normalized job record produced by every source adapter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::text::normalize_whitespace;

/// Marker carried by the title of every placeholder record.
pub const PLACEHOLDER_TITLE_MARKER: &str = "[PLACEHOLDER]";

/// Marker carried by the description of every placeholder record.
pub const PLACEHOLDER_DESCRIPTION_MARKER: &str = "[NOT A REAL JOB POSTING]";

/// Salary range attached to a posting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SalaryRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    /// ISO 4217 currency code
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl SalaryRange {
    pub fn new(min: Option<f64>, max: Option<f64>, currency: impl Into<String>) -> Self {
        Self {
            min,
            max,
            currency: currency.into(),
        }
    }

    /// Drop bounds that are not finite positive amounts.
    fn sanitized(self) -> Option<Self> {
        let keep = |v: Option<f64>| v.filter(|x| x.is_finite() && *x > 0.0);
        let min = keep(self.min);
        let max = keep(self.max);
        if min.is_none() && max.is_none() {
            return None;
        }
        let currency = self.currency.trim().to_uppercase();
        Some(Self {
            min,
            max,
            currency: if currency.is_empty() {
                default_currency()
            } else {
                currency
            },
        })
    }
}

/// Kind of employment offered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Contract,
    Internship,
    Freelance,
}

/// Seniority expected of the candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Intern,
    Entry,
    MidLevel,
    Senior,
}

/// A job posting in the common shape all adapters produce.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct JobRecord {
    pub title: String,

    pub company_name: String,

    #[serde(default)]
    pub location: String,

    #[serde(default)]
    pub description: String,

    /// Adapter-assigned URL, ideally unique per posting
    #[serde(default)]
    pub source_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<SalaryRange>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employment_type: Option<EmploymentType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_level: Option<ExperienceLevel>,

    #[serde(default)]
    pub remote: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_date: Option<DateTime<Utc>>,
}

impl JobRecord {
    pub fn new(title: impl Into<String>, company_name: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            company_name: company_name.into(),
            ..Self::default()
        }
    }

    /// Collapse whitespace, trim the URL and drop unusable salary bounds.
    pub fn normalized(mut self) -> Self {
        self.title = normalize_whitespace(&self.title);
        self.company_name = normalize_whitespace(&self.company_name);
        self.location = normalize_whitespace(&self.location);
        self.description = normalize_whitespace(&self.description);
        self.source_url = self.source_url.trim().to_string();
        self.salary = self.salary.and_then(SalaryRange::sanitized);
        self
    }

    /// Title and company name must both be present.
    pub fn is_acceptable(&self) -> bool {
        !self.title.trim().is_empty() && !self.company_name.trim().is_empty()
    }

    /// Whether this record came from the placeholder generator.
    pub fn is_placeholder(&self) -> bool {
        self.description.contains(PLACEHOLDER_DESCRIPTION_MARKER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_collapses_whitespace() {
        let record = JobRecord {
            title: "  Data   Analyst \n".into(),
            company_name: "Acme\tCorp".into(),
            source_url: " https://example.com/1 ".into(),
            ..JobRecord::default()
        }
        .normalized();

        assert_eq!(record.title, "Data Analyst");
        assert_eq!(record.company_name, "Acme Corp");
        assert_eq!(record.source_url, "https://example.com/1");
    }

    #[test]
    fn normalized_drops_invalid_salary() {
        let record = JobRecord {
            salary: Some(SalaryRange::new(Some(-5.0), Some(f64::NAN), "usd")),
            ..JobRecord::new("Engineer", "Acme")
        }
        .normalized();
        assert!(record.salary.is_none());

        let record = JobRecord {
            salary: Some(SalaryRange::new(Some(50_000.0), None, "kes")),
            ..JobRecord::new("Engineer", "Acme")
        }
        .normalized();
        let salary = record.salary.unwrap();
        assert_eq!(salary.min, Some(50_000.0));
        assert_eq!(salary.currency, "KES");
    }

    #[test]
    fn acceptance_requires_title_and_company() {
        assert!(JobRecord::new("Engineer", "Acme").is_acceptable());
        assert!(!JobRecord::new("", "Acme").is_acceptable());
        assert!(!JobRecord::new("Engineer", "   ").is_acceptable());
    }
}
