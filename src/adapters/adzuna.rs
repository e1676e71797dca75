// src/adapters/adzuna.rs

//! Adzuna search API.
//!
//! The same client doubles as the regional adapter: restricted to one
//! country, it serves region-specific searches for sources without an API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::adapters::{AdapterKind, AdapterOutcome, SearchRequest, SourceAdapter};
use crate::error::Result;
use crate::models::{
    AdzunaConfig, EmploymentType, ErrorKind, HttpConfig, JobRecord, Region, SalaryRange,
};
use crate::utils::http::{HttpSession, LeaseTracker};
use crate::utils::text::{infer_employment_type, infer_experience_level, mentions_remote};

const MAX_PAGE_SIZE: usize = 50;

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    results: Vec<AdzunaJob>,
}

#[derive(Debug, Default, Deserialize)]
struct DisplayName {
    #[serde(default)]
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct AdzunaJob {
    #[serde(default)]
    title: String,
    #[serde(default)]
    company: Option<DisplayName>,
    #[serde(default)]
    location: Option<DisplayName>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    redirect_url: String,
    #[serde(default)]
    salary_min: Option<f64>,
    #[serde(default)]
    salary_max: Option<f64>,
    #[serde(default)]
    contract_type: Option<String>,
    #[serde(default)]
    contract_time: Option<String>,
    #[serde(default)]
    created: Option<String>,
}

impl AdzunaJob {
    fn into_record(self, country: &str) -> JobRecord {
        let salary = (self.salary_min.is_some() || self.salary_max.is_some())
            .then(|| SalaryRange::new(self.salary_min, self.salary_max, currency_for(country)));

        let contract = format!(
            "{} {}",
            self.contract_type.as_deref().unwrap_or_default(),
            self.contract_time.as_deref().unwrap_or_default()
        )
        .to_lowercase();
        let employment_type = if contract.contains("contract") {
            Some(EmploymentType::Contract)
        } else if contract.contains("part_time") {
            Some(EmploymentType::PartTime)
        } else if contract.contains("full_time") || contract.contains("permanent") {
            Some(EmploymentType::FullTime)
        } else {
            infer_employment_type(&self.description)
        };

        let remote = mentions_remote(&format!("{} {}", self.title, self.description));
        let posted_date = self
            .created
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc));

        JobRecord {
            experience_level: infer_experience_level(&self.title),
            company_name: self.company.unwrap_or_default().display_name,
            location: self.location.unwrap_or_default().display_name,
            title: self.title,
            description: self.description,
            source_url: self.redirect_url,
            salary,
            employment_type,
            remote,
            posted_date,
        }
    }
}

fn currency_for(country: &str) -> &'static str {
    match country {
        "gb" => "GBP",
        "ca" => "CAD",
        "au" => "AUD",
        "ke" => "KES",
        "de" | "fr" | "nl" | "it" | "es" | "at" => "EUR",
        _ => "USD",
    }
}

/// Adzuna job search.
pub struct AdzunaAdapter {
    name: String,
    config: AdzunaConfig,
    http: HttpConfig,
    region: Option<Region>,
    leases: LeaseTracker,
}

impl AdzunaAdapter {
    pub fn new(config: AdzunaConfig, http: HttpConfig) -> Self {
        Self {
            name: "adzuna".to_string(),
            config,
            http,
            region: None,
            leases: LeaseTracker::new(),
        }
    }

    /// Adzuna restricted to the country serving `region`.
    pub fn regional(region: Region, config: AdzunaConfig, http: HttpConfig) -> Self {
        Self {
            name: format!("adzuna-{}", region.country_code()),
            region: Some(region),
            ..Self::new(config, http)
        }
    }

    pub fn leases(&self) -> &LeaseTracker {
        &self.leases
    }

    /// Countries to search for a location, in order.
    fn countries_for(&self, location: &str) -> Vec<String> {
        if let Some(region) = self.region.or_else(|| Region::detect(location)) {
            return vec![region.country_code().to_string()];
        }
        if location.trim().is_empty() {
            self.config.countries.clone()
        } else {
            vec![self.config.default_country.clone()]
        }
    }

    async fn fetch(&self, request: &SearchRequest) -> Result<Vec<JobRecord>> {
        let session = HttpSession::open(&self.http, &self.leases, &self.name)?;
        let mut records = Vec::new();
        let mut first_error = None;

        for country in self.countries_for(&request.location) {
            let remaining = request.max_results.saturating_sub(records.len());
            if remaining == 0 {
                break;
            }

            let url = format!(
                "{}/{}/search/1",
                self.config.base_url.trim_end_matches('/'),
                country
            );
            let mut query = vec![
                ("app_id", self.config.app_id.clone()),
                ("app_key", self.config.app_key.clone()),
                ("what", request.query.clone()),
                ("results_per_page", remaining.min(MAX_PAGE_SIZE).to_string()),
            ];
            if !request.location.is_empty() {
                query.push(("where", request.location.clone()));
            }

            match session.get_json::<SearchPage>(&url, &query).await {
                Ok(page) => {
                    log::info!(
                        "{}: {} results from country '{}'",
                        self.name,
                        page.results.len(),
                        country
                    );
                    records.extend(
                        page.results
                            .into_iter()
                            .take(remaining)
                            .map(|job| job.into_record(&country)),
                    );
                }
                Err(e) => {
                    log::warn!("{}: country '{}' failed: {}", self.name, country, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) if records.is_empty() => Err(e),
            _ => Ok(records),
        }
    }
}

#[async_trait]
impl SourceAdapter for AdzunaAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Api
    }

    async fn search(&self, request: &SearchRequest) -> AdapterOutcome {
        if !self.config.is_configured() {
            return AdapterOutcome::failed(ErrorKind::Other, "Adzuna credentials not configured");
        }
        AdapterOutcome::from_result(self.fetch(request).await)
    }
}
