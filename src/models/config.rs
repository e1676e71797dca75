//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{BoardSelectors, SourceConfig, SourceId};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP transport settings shared by all adapters
    #[serde(default)]
    pub http: HttpConfig,

    /// Listing pagination limits for scraping adapters
    #[serde(default)]
    pub scrape: ScrapeConfig,

    /// Run-level behavior
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Background execution policy
    #[serde(default)]
    pub background: BackgroundConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub adzuna: AdzunaConfig,

    #[serde(default)]
    pub jobright: JobrightConfig,

    /// Ordered source list
    #[serde(default = "defaults::default_sources")]
    pub sources: Vec<SourceConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.apply_env();
        Ok(config)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default().with_env()
        })
    }

    /// [`Config::apply_env`] by value.
    pub fn with_env(mut self) -> Self {
        self.apply_env();
        self
    }

    /// Override API credentials from the environment when present.
    pub fn apply_env(&mut self) {
        if let Ok(id) = std::env::var("ADZUNA_APP_ID") {
            self.adzuna.app_id = id;
        }
        if let Ok(key) = std::env::var("ADZUNA_APP_KEY") {
            self.adzuna.app_key = key;
        }
        if let Ok(key) = std::env::var("JOBRIGHT_API_KEY") {
            self.jobright.api_key = key;
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agents.iter().all(|ua| ua.trim().is_empty()) {
            return Err(AppError::validation("http.user_agents is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.http.max_concurrent == 0 {
            return Err(AppError::validation("http.max_concurrent must be > 0"));
        }
        if self.scrape.max_scroll_attempts == 0 {
            return Err(AppError::validation(
                "scrape.max_scroll_attempts must be > 0",
            ));
        }
        if !(0.0..=1.0).contains(&self.pipeline.similarity_threshold) {
            return Err(AppError::validation(
                "pipeline.similarity_threshold must be within 0..=1",
            ));
        }
        if self.background.max_attempts == 0 {
            return Err(AppError::validation("background.max_attempts must be > 0"));
        }

        let mut seen = std::collections::HashSet::new();
        for source in &self.sources {
            if !seen.insert(source.id) {
                return Err(AppError::validation(format!(
                    "source '{}' is configured twice",
                    source.id
                )));
            }
            if url::Url::parse(&source.base_url).is_err() {
                return Err(AppError::validation(format!(
                    "source '{}' has an invalid base_url",
                    source.id
                )));
            }
        }
        Ok(())
    }

    /// Active sources in configured order, optionally restricted to `only`.
    pub fn active_sources(&self, only: Option<&[SourceId]>) -> Vec<SourceConfig> {
        self.sources
            .iter()
            .filter(|s| s.active)
            .filter(|s| only.is_none_or(|ids| ids.contains(&s.id)))
            .cloned()
            .collect()
    }

    pub fn source(&self, id: SourceId) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.id == id)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            scrape: ScrapeConfig::default(),
            pipeline: PipelineConfig::default(),
            background: BackgroundConfig::default(),
            logging: LoggingConfig::default(),
            adzuna: AdzunaConfig::default(),
            jobright: JobrightConfig::default(),
            sources: defaults::default_sources(),
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Identity pool; one is picked at random per adapter session
    #[serde(default = "defaults::user_agents")]
    pub user_agents: Vec<String>,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Transport-level attempts per request
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Delay between transport attempts in milliseconds
    #[serde(default = "defaults::retry_delay")]
    pub retry_delay_ms: u64,

    /// Maximum sources processed at once
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agents: defaults::user_agents(),
            timeout_secs: defaults::timeout(),
            max_retries: defaults::max_retries(),
            retry_delay_ms: defaults::retry_delay(),
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

/// Listing pagination settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Hard cap on listing pages fetched per search
    #[serde(default = "defaults::max_scroll_attempts")]
    pub max_scroll_attempts: usize,

    /// Pause between listing pages in milliseconds
    #[serde(default = "defaults::page_delay")]
    pub page_delay_ms: u64,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            max_scroll_attempts: defaults::max_scroll_attempts(),
            page_delay_ms: defaults::page_delay(),
        }
    }
}

/// Run-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Synthesize marked placeholder postings when every adapter comes back empty
    #[serde(default = "defaults::placeholder_enabled")]
    pub placeholder_enabled: bool,

    #[serde(default = "defaults::placeholder_limit")]
    pub placeholder_limit: usize,

    /// Title similarity above which same-company postings are merged
    #[serde(default = "defaults::similarity_threshold")]
    pub similarity_threshold: f64,

    #[serde(default = "defaults::retention_days")]
    pub session_retention_days: i64,

    #[serde(default = "defaults::retention_days")]
    pub posting_expiry_days: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            placeholder_enabled: defaults::placeholder_enabled(),
            placeholder_limit: defaults::placeholder_limit(),
            similarity_threshold: defaults::similarity_threshold(),
            session_retention_days: defaults::retention_days(),
            posting_expiry_days: defaults::retention_days(),
        }
    }
}

/// Retry policy for background runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundConfig {
    /// Total attempts, including the first
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Initial backoff, doubled after each failed attempt
    #[serde(default = "defaults::backoff")]
    pub backoff_ms: u64,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            backoff_ms: defaults::backoff(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

/// Adzuna API credentials and search scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdzunaConfig {
    #[serde(default = "defaults::adzuna_url")]
    pub base_url: String,

    #[serde(default)]
    pub app_id: String,

    #[serde(default)]
    pub app_key: String,

    /// Countries searched when the run has no location
    #[serde(default = "defaults::adzuna_countries")]
    pub countries: Vec<String>,

    /// Country searched when the run has a location
    #[serde(default = "defaults::adzuna_default_country")]
    pub default_country: String,
}

impl AdzunaConfig {
    pub fn is_configured(&self) -> bool {
        !self.app_id.trim().is_empty() && !self.app_key.trim().is_empty()
    }
}

impl Default for AdzunaConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::adzuna_url(),
            app_id: String::new(),
            app_key: String::new(),
            countries: defaults::adzuna_countries(),
            default_country: defaults::adzuna_default_country(),
        }
    }
}

/// Jobright API credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobrightConfig {
    #[serde(default = "defaults::jobright_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,
}

impl Default for JobrightConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::jobright_url(),
            api_key: String::new(),
        }
    }
}

mod defaults {
    use super::{BoardSelectors, SourceConfig, SourceId};

    // HTTP defaults
    pub fn user_agents() -> Vec<String> {
        vec![
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".into(),
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".into(),
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".into(),
        ]
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn max_retries() -> u32 {
        3
    }
    pub fn retry_delay() -> u64 {
        2000
    }
    pub fn max_concurrent() -> usize {
        4
    }

    // Scrape defaults
    pub fn max_scroll_attempts() -> usize {
        5
    }
    pub fn page_delay() -> u64 {
        500
    }

    // Pipeline defaults
    pub fn placeholder_enabled() -> bool {
        true
    }
    pub fn placeholder_limit() -> usize {
        5
    }
    pub fn similarity_threshold() -> f64 {
        0.8
    }
    pub fn retention_days() -> i64 {
        30
    }

    // Background defaults
    pub fn max_attempts() -> u32 {
        3
    }
    pub fn backoff() -> u64 {
        60_000
    }

    pub fn log_level() -> String {
        "info".into()
    }

    // API defaults
    pub fn adzuna_url() -> String {
        "https://api.adzuna.com/v1/api/jobs".into()
    }
    pub fn adzuna_countries() -> Vec<String> {
        ["us", "gb", "ca", "au", "ke"]
            .into_iter()
            .map(String::from)
            .collect()
    }
    pub fn adzuna_default_country() -> String {
        "us".into()
    }
    pub fn jobright_url() -> String {
        "https://jobright.ai/api".into()
    }

    // Source defaults
    pub fn default_sources() -> Vec<SourceConfig> {
        vec![
            SourceConfig::new(SourceId::LinkedIn, "LinkedIn", "https://www.linkedin.com").with_board(
                BoardSelectors {
                    row_selector: ".jobs-search__results-list li, .base-card".into(),
                    title_selector: ".base-search-card__title".into(),
                    company_selector: ".base-search-card__subtitle".into(),
                    location_selector: Some(".job-search-card__location".into()),
                    salary_selector: Some(".job-search-card__salary-info".into()),
                    link_selector: Some("a.base-card__full-link".into()),
                    description_selector: None,
                    page_param: "start".into(),
                    page_step: 25,
                    first_page: 0,
                    ..BoardSelectors::generic("/jobs/search?keywords={query}&location={location}")
                },
            ),
            SourceConfig::new(SourceId::Indeed, "Indeed", "https://www.indeed.com").with_board(
                BoardSelectors {
                    row_selector: ".job_seen_beacon, .result".into(),
                    title_selector: "h2.jobTitle span, h2.jobTitle".into(),
                    company_selector: "[data-testid='company-name'], .companyName".into(),
                    location_selector: Some("[data-testid='text-location'], .companyLocation".into()),
                    description_selector: Some(".job-snippet".into()),
                    salary_selector: Some(".salary-snippet-container, .estimated-salary".into()),
                    link_selector: Some("h2.jobTitle a".into()),
                    page_param: "start".into(),
                    page_step: 10,
                    first_page: 0,
                    ..BoardSelectors::generic("/jobs?q={query}&l={location}")
                },
            ),
            SourceConfig::new(SourceId::Glassdoor, "Glassdoor", "https://www.glassdoor.com").with_board(
                BoardSelectors {
                    row_selector: "li.react-job-listing, [data-test='jobListing']".into(),
                    title_selector: "[data-test='job-title'], .job-title".into(),
                    company_selector: ".EmployerProfile_compactEmployerName__LE242, .employer-name".into(),
                    location_selector: Some("[data-test='emp-location']".into()),
                    salary_selector: Some("[data-test='detailSalary']".into()),
                    link_selector: Some("a[data-test='job-link'], a".into()),
                    ..BoardSelectors::generic("/Job/jobs.htm?sc.keyword={query}&locKeyword={location}")
                },
            ),
            SourceConfig::new(SourceId::RemoteOk, "RemoteOK", "https://remoteok.com"),
            SourceConfig::new(
                SourceId::BrighterMonday,
                "BrighterMonday",
                "https://www.brightermonday.co.ke",
            )
            .with_board(BoardSelectors::generic("/jobs?q={query}")),
            SourceConfig::new(SourceId::Fuzu, "Fuzu", "https://www.fuzu.com")
                .with_board(BoardSelectors::generic("/kenya/jobs?search={query}")),
            SourceConfig::new(SourceId::Adzuna, "Adzuna", "https://www.adzuna.com"),
            SourceConfig::new(SourceId::Jobright, "Jobright", "https://jobright.ai").inactive(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agents() {
        let mut config = Config::default();
        config.http.user_agents = vec!["  ".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.http.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_sources() {
        let mut config = Config::default();
        config.sources.push(SourceConfig::new(
            SourceId::Adzuna,
            "Adzuna again",
            "https://www.adzuna.com",
        ));
        assert!(config.validate().is_err());
    }

    #[test]
    fn active_sources_skip_inactive_and_filter() {
        let config = Config::default();
        let active = config.active_sources(None);
        assert!(active.iter().all(|s| s.active));
        assert!(!active.iter().any(|s| s.id == SourceId::Jobright));

        let only = config.active_sources(Some(&[SourceId::RemoteOk, SourceId::Jobright]));
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].id, SourceId::RemoteOk);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml = r#"
            [pipeline]
            placeholder_enabled = false

            [[sources]]
            id = "remoteok"
            name = "RemoteOK"
            base_url = "https://remoteok.com"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(!config.pipeline.placeholder_enabled);
        assert_eq!(config.pipeline.placeholder_limit, 5);
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.sources.len(), 1);
        assert!(config.sources[0].active);
    }

    #[test]
    fn sample_config_parses_and_validates() {
        let config: Config = toml::from_str(include_str!("../../data/config.toml")).unwrap();
        config.validate().unwrap();
        assert_eq!(config.sources.len(), 7);
        assert!(!config.source(SourceId::Jobright).unwrap().active);
        let linkedin = config.source(SourceId::LinkedIn).unwrap();
        assert_eq!(linkedin.board.as_ref().unwrap().page_step, 25);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load_or_default("does/not/exist.toml");
        assert_eq!(config.sources.len(), defaults::default_sources().len());
    }
}
