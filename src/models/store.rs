// src/models/store.rs

//! Persisted company and job postings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::{EmploymentType, ExperienceLevel, JobRecord, SalaryRange, SourceId};

/// Posting status in the store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Active,
    Expired,
    Filled,
    Unknown,
}

/// A company, unique by exact name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Company {
    pub id: u64,
    pub name: String,

    #[serde(default)]
    pub website: String,

    #[serde(default)]
    pub location: String,

    #[serde(default)]
    pub industry: String,

    pub created_at: DateTime<Utc>,
}

/// Optional attributes applied when a company is first created.
#[derive(Debug, Clone, Default)]
pub struct CompanyDefaults {
    pub website: String,
    pub location: String,
    pub industry: String,
}

/// A persisted job posting, unique by (title, company, source URL).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: u64,
    pub title: String,
    pub company_id: u64,
    pub source_url: String,
    pub source: SourceId,
    pub status: JobStatus,

    #[serde(default)]
    pub location: String,

    #[serde(default)]
    pub description: String,

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

    /// When the posting was first discovered
    pub discovered_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Attributes applied when a job is first created.
#[derive(Debug, Clone)]
pub struct JobDefaults {
    pub source: SourceId,
    pub location: String,
    pub description: String,
    pub salary: Option<SalaryRange>,
    pub employment_type: Option<EmploymentType>,
    pub experience_level: Option<ExperienceLevel>,
    pub remote: bool,
    pub posted_date: Option<DateTime<Utc>>,
}

impl JobDefaults {
    pub fn from_record(record: &JobRecord, source: SourceId) -> Self {
        Self {
            source,
            location: record.location.clone(),
            description: record.description.clone(),
            salary: record.salary.clone(),
            employment_type: record.employment_type,
            experience_level: record.experience_level,
            remote: record.remote,
            posted_date: record.posted_date,
        }
    }
}

impl Job {
    /// Build a new active job from its key and defaults.
    pub fn create(
        id: u64,
        title: &str,
        company_id: u64,
        source_url: &str,
        defaults: JobDefaults,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: title.to_string(),
            company_id,
            source_url: source_url.to_string(),
            source: defaults.source,
            status: JobStatus::Active,
            location: defaults.location,
            description: defaults.description,
            salary: defaults.salary,
            employment_type: defaults.employment_type,
            experience_level: defaults.experience_level,
            remote: defaults.remote,
            posted_date: defaults.posted_date,
            discovered_at: now,
            updated_at: now,
        }
    }

    /// Stable digest of the uniqueness key.
    pub fn key(&self) -> String {
        job_key(&self.title, self.company_id, &self.source_url)
    }
}

/// Digest of the (title, company, source URL) uniqueness triple.
pub fn job_key(title: &str, company_id: u64, source_url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update([0u8]);
    hasher.update(company_id.to_be_bytes());
    hasher.update([0u8]);
    hasher.update(source_url.as_bytes());
    hex::encode(hasher.finalize())
}
