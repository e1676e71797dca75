// src/adapters/jobright.rs

//! Jobright search API.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::adapters::{AdapterKind, AdapterOutcome, SearchRequest, SourceAdapter};
use crate::error::Result;
use crate::models::{ErrorKind, HttpConfig, JobRecord, JobrightConfig, SalaryRange};
use crate::utils::http::{HttpSession, LeaseTracker};
use crate::utils::text::{infer_employment_type, infer_experience_level, mentions_remote};

const MAX_PAGE_SIZE: usize = 50;

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    jobs: Vec<JobrightJob>,
}

#[derive(Debug, Deserialize)]
struct JobrightJob {
    #[serde(default)]
    title: String,
    #[serde(default)]
    company: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    salary_min: Option<f64>,
    #[serde(default)]
    salary_max: Option<f64>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    employment_type: Option<String>,
    #[serde(default)]
    remote: Option<bool>,
    #[serde(default)]
    posted_date: Option<String>,
}

impl JobrightJob {
    fn into_record(self) -> JobRecord {
        let salary = (self.salary_min.is_some() || self.salary_max.is_some()).then(|| {
            SalaryRange::new(
                self.salary_min,
                self.salary_max,
                self.currency.clone().unwrap_or_else(|| "USD".to_string()),
            )
        });
        let employment_type = self
            .employment_type
            .as_deref()
            .and_then(infer_employment_type)
            .or_else(|| infer_employment_type(&self.description));
        let remote = self
            .remote
            .unwrap_or_else(|| mentions_remote(&format!("{} {}", self.location, self.title)));

        JobRecord {
            experience_level: infer_experience_level(&self.title),
            posted_date: self.posted_date.as_deref().and_then(parse_posted_date),
            title: self.title,
            company_name: self.company,
            location: self.location,
            description: self.description,
            source_url: self.url,
            salary,
            employment_type,
            remote,
        }
    }
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates.
fn parse_posted_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
}

/// Jobright job search.
pub struct JobrightAdapter {
    config: JobrightConfig,
    http: HttpConfig,
    leases: LeaseTracker,
}

impl JobrightAdapter {
    pub fn new(config: JobrightConfig, http: HttpConfig) -> Self {
        Self {
            config,
            http,
            leases: LeaseTracker::new(),
        }
    }

    async fn fetch(&self, request: &SearchRequest) -> Result<Vec<JobRecord>> {
        let session = HttpSession::open(&self.http, &self.leases, self.name())?;
        let url = format!("{}/jobs/search", self.config.base_url.trim_end_matches('/'));
        let query = [
            ("api_key", self.config.api_key.clone()),
            ("q", request.query.clone()),
            ("location", request.location.clone()),
            ("limit", request.max_results.min(MAX_PAGE_SIZE).to_string()),
        ];

        let page: SearchPage = session.get_json(&url, &query).await?;
        log::info!("jobright: {} results", page.jobs.len());
        Ok(page
            .jobs
            .into_iter()
            .take(request.max_results)
            .map(JobrightJob::into_record)
            .collect())
    }
}

#[async_trait]
impl SourceAdapter for JobrightAdapter {
    fn name(&self) -> &str {
        "jobright"
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Api
    }

    async fn search(&self, request: &SearchRequest) -> AdapterOutcome {
        if self.config.api_key.trim().is_empty() {
            return AdapterOutcome::failed(ErrorKind::Other, "Jobright API key not configured");
        }
        AdapterOutcome::from_result(self.fetch(request).await)
    }
}
