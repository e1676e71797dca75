// src/adapters/remoteok.rs

//! RemoteOK public feed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::adapters::{AdapterKind, AdapterOutcome, SearchRequest, SourceAdapter};
use crate::error::Result;
use crate::models::{HttpConfig, JobRecord, SalaryRange, SourceConfig};
use crate::utils::http::{HttpSession, LeaseTracker};
use crate::utils::text::{extract_salary, infer_employment_type, infer_experience_level};

/// One feed entry. The first entry of the feed is a legal notice with none of these fields.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FeedEntry {
    position: String,
    company: String,
    location: String,
    description: String,
    url: String,
    apply_url: String,
    salary_min: Option<f64>,
    salary_max: Option<f64>,
    salary: Option<String>,
    date: Option<String>,
    tags: Vec<String>,
}

impl FeedEntry {
    fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        if query.is_empty() {
            return true;
        }
        let haystack = format!(
            "{} {} {} {}",
            self.position,
            self.company,
            self.description,
            self.tags.join(" ")
        )
        .to_lowercase();
        haystack.contains(&query)
    }

    fn into_record(self) -> JobRecord {
        let salary = match (self.salary_min, self.salary_max) {
            (None, None) => self.salary.as_deref().and_then(extract_salary),
            (min, max) => Some(SalaryRange::new(min, max, "USD")),
        };
        let source_url = if self.url.is_empty() {
            self.apply_url
        } else {
            self.url
        };

        JobRecord {
            employment_type: infer_employment_type(&self.description),
            experience_level: infer_experience_level(&self.position)
                .or_else(|| infer_experience_level(&self.description)),
            posted_date: self
                .date
                .as_deref()
                .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
                .map(|d| d.with_timezone(&Utc)),
            title: self.position,
            company_name: self.company,
            location: if self.location.is_empty() {
                "Remote".to_string()
            } else {
                self.location
            },
            description: self.description,
            source_url,
            salary,
            remote: true,
        }
    }
}

/// Filter a decoded feed down to matching records.
fn collect_matches(feed: Vec<FeedEntry>, query: &str, max_results: usize) -> Vec<JobRecord> {
    feed.into_iter()
        .filter(|entry| !entry.position.is_empty())
        .filter(|entry| entry.matches(query))
        .take(max_results)
        .map(FeedEntry::into_record)
        .collect()
}

/// RemoteOK scraper. Every posting it returns is remote.
pub struct RemoteOkAdapter {
    feed_url: String,
    http: HttpConfig,
    leases: LeaseTracker,
}

impl RemoteOkAdapter {
    pub fn new(source: &SourceConfig, http: HttpConfig) -> Self {
        Self {
            feed_url: format!("{}/api", source.base_url.trim_end_matches('/')),
            http,
            leases: LeaseTracker::new(),
        }
    }

    async fn fetch(&self, request: &SearchRequest) -> Result<Vec<JobRecord>> {
        let session = HttpSession::open(&self.http, &self.leases, self.name())?;
        let feed: Vec<FeedEntry> = session.get_json(&self.feed_url, &[]).await?;
        log::debug!("remoteok: feed holds {} entries", feed.len());
        Ok(collect_matches(feed, &request.query, request.max_results))
    }
}

#[async_trait]
impl SourceAdapter for RemoteOkAdapter {
    fn name(&self) -> &str {
        "remoteok"
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Scraper
    }

    async fn search(&self, request: &SearchRequest) -> AdapterOutcome {
        AdapterOutcome::from_result(self.fetch(request).await)
    }
}
