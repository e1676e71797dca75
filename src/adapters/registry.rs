// src/adapters/registry.rs

//! Source-to-adapter registry and the per-source fallback chain.
//!
//! Resolution order for one source:
//! 1. the regional adapter when the location names a region the chain covers;
//! 2. the API adapter when step 1 did not run or produced no records;
//! 3. the scraper when no API-kind step produced records;
//! 4. marked placeholders when nothing produced records and placeholders are enabled.
//!
//! Each step runs at most once per source per run.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::adapters::{
    AdapterOutcome, AdzunaAdapter, BoardAdapter, JobrightAdapter, PlaceholderGenerator,
    RemoteOkAdapter, SearchRequest, SourceAdapter,
};
use crate::models::{Config, ErrorKind, JobRecord, Region, SourceId};

/// Position of an attempt in the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainStep {
    Api,
    Regional(Region),
    Scraper,
    Placeholder,
}

impl fmt::Display for ChainStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api => f.write_str("api"),
            Self::Regional(region) => write!(f, "regional({})", region.country_code()),
            Self::Scraper => f.write_str("scraper"),
            Self::Placeholder => f.write_str("placeholder"),
        }
    }
}

/// Adapters registered for one source.
#[derive(Clone, Default)]
pub struct AdapterChain {
    pub api: Option<Arc<dyn SourceAdapter>>,
    pub regional: Vec<(Region, Arc<dyn SourceAdapter>)>,
    pub scraper: Option<Arc<dyn SourceAdapter>>,
}

impl AdapterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api(mut self, adapter: Arc<dyn SourceAdapter>) -> Self {
        self.api = Some(adapter);
        self
    }

    pub fn with_regional(mut self, region: Region, adapter: Arc<dyn SourceAdapter>) -> Self {
        self.regional.push((region, adapter));
        self
    }

    pub fn with_scraper(mut self, adapter: Arc<dyn SourceAdapter>) -> Self {
        self.scraper = Some(adapter);
        self
    }

    /// Live adapters to try for `location`, in order.
    pub fn plan(&self, location: &str) -> Vec<(ChainStep, Arc<dyn SourceAdapter>)> {
        let mut plan = Vec::with_capacity(3);

        let regional = Region::detect(location)
            .and_then(|region| self.regional.iter().find(|(r, _)| *r == region));
        if let Some((region, adapter)) = regional {
            plan.push((ChainStep::Regional(*region), Arc::clone(adapter)));
        }
        if let Some(api) = &self.api {
            plan.push((ChainStep::Api, Arc::clone(api)));
        }
        if let Some(scraper) = &self.scraper {
            plan.push((ChainStep::Scraper, Arc::clone(scraper)));
        }
        plan
    }
}

/// What one step of the chain produced.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptResult {
    Records(usize),
    Empty,
    Failed { kind: ErrorKind, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepAttempt {
    pub step: ChainStep,
    pub adapter: String,
    pub result: AttemptResult,
}

/// Outcome of running one source's chain.
#[derive(Debug, Clone)]
pub struct ChainReport {
    pub source: SourceId,
    pub records: Vec<JobRecord>,
    pub produced_by: Option<ChainStep>,
    pub attempts: Vec<StepAttempt>,
}

impl ChainReport {
    pub fn failures(&self) -> impl Iterator<Item = &StepAttempt> {
        self.attempts
            .iter()
            .filter(|a| matches!(a.result, AttemptResult::Failed { .. }))
    }

    pub fn used_placeholder(&self) -> bool {
        self.produced_by == Some(ChainStep::Placeholder)
    }
}

/// Closed mapping from source id to its adapter chain.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    chains: HashMap<SourceId, AdapterChain>,
    placeholder: Option<PlaceholderGenerator>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default chains for every configured source.
    pub fn from_config(config: &Config) -> Self {
        let http = &config.http;
        let adzuna: Arc<dyn SourceAdapter> =
            Arc::new(AdzunaAdapter::new(config.adzuna.clone(), http.clone()));
        let kenya: Arc<dyn SourceAdapter> = Arc::new(AdzunaAdapter::regional(
            Region::Kenya,
            config.adzuna.clone(),
            http.clone(),
        ));

        let mut registry = Self::new();
        for source in &config.sources {
            let board = BoardAdapter::from_source(source, http.clone(), config.scrape.clone())
                .map(|b| Arc::new(b) as Arc<dyn SourceAdapter>);

            let chain = match source.id {
                SourceId::Adzuna => AdapterChain::new().with_api(Arc::clone(&adzuna)),
                SourceId::Jobright => AdapterChain::new()
                    .with_api(Arc::new(JobrightAdapter::new(
                        config.jobright.clone(),
                        http.clone(),
                    )))
                    .with_regional(Region::Kenya, Arc::clone(&kenya)),
                SourceId::RemoteOk => AdapterChain::new()
                    .with_scraper(Arc::new(RemoteOkAdapter::new(source, http.clone()))),
                SourceId::LinkedIn | SourceId::Indeed | SourceId::Glassdoor => AdapterChain {
                    scraper: board,
                    ..AdapterChain::default()
                },
                SourceId::BrighterMonday | SourceId::Fuzu => AdapterChain {
                    scraper: board,
                    ..AdapterChain::default()
                }
                .with_regional(Region::Kenya, Arc::clone(&kenya)),
            };
            registry.register(source.id, chain);
        }

        if config.pipeline.placeholder_enabled {
            registry.placeholder = Some(PlaceholderGenerator::new(
                config.pipeline.placeholder_limit,
            ));
        }
        registry
    }

    pub fn register(&mut self, source: SourceId, chain: AdapterChain) {
        self.chains.insert(source, chain);
    }

    pub fn with_placeholder(mut self, placeholder: Option<PlaceholderGenerator>) -> Self {
        self.placeholder = placeholder;
        self
    }

    pub fn chain(&self, source: SourceId) -> Option<&AdapterChain> {
        self.chains.get(&source)
    }

    /// Run the fallback chain for one source.
    pub async fn run(&self, source: SourceId, request: &SearchRequest) -> ChainReport {
        let mut report = ChainReport {
            source,
            records: Vec::new(),
            produced_by: None,
            attempts: Vec::new(),
        };

        let plan = match self.chain(source) {
            Some(chain) => chain.plan(&request.location),
            None => {
                log::warn!("{}: no adapters registered", source);
                Vec::new()
            }
        };

        for (step, adapter) in plan {
            let outcome = adapter.search(request).await;
            let result = match outcome {
                AdapterOutcome::Records(mut records) => {
                    records.truncate(request.max_results);
                    let count = records.len();
                    report.records = records;
                    report.produced_by = Some(step);
                    AttemptResult::Records(count)
                }
                AdapterOutcome::Empty => AttemptResult::Empty,
                AdapterOutcome::Failed { kind, message } => {
                    log::warn!(
                        "{}: {} adapter '{}' failed ({}): {}",
                        source,
                        step,
                        adapter.name(),
                        kind,
                        message
                    );
                    AttemptResult::Failed { kind, message }
                }
            };
            report.attempts.push(StepAttempt {
                step,
                adapter: adapter.name().to_string(),
                result,
            });
            if report.produced_by.is_some() {
                return report;
            }
        }

        if let Some(generator) = &self.placeholder {
            let records = generator.generate(source, request);
            log::warn!(
                "{}: no live results, generated {} placeholder postings",
                source,
                records.len()
            );
            report.attempts.push(StepAttempt {
                step: ChainStep::Placeholder,
                adapter: "placeholder".to_string(),
                result: AttemptResult::Records(records.len()),
            });
            report.produced_by = Some(ChainStep::Placeholder);
            report.records = records;
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::AdapterKind;
    use crate::adapters::stub::{StubAdapter, record};

    fn request(location: &str) -> SearchRequest {
        SearchRequest::new("Data Analyst", location, 10)
    }

    #[tokio::test]
    async fn api_success_skips_scraper() {
        let api = StubAdapter::records(
            "api",
            AdapterKind::Api,
            vec![record("A", "Acme", "u1"), record("B", "Acme", "u2")],
        );
        let scraper = StubAdapter::records("scraper", AdapterKind::Scraper, vec![record("C", "X", "u3")]);
        let scraper_calls = scraper.calls();

        let mut registry = AdapterRegistry::new();
        registry.register(
            SourceId::Adzuna,
            AdapterChain::new()
                .with_api(Arc::new(api))
                .with_scraper(Arc::new(scraper)),
        );

        let report = registry.run(SourceId::Adzuna, &request("")).await;
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.produced_by, Some(ChainStep::Api));
        assert_eq!(scraper_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_api_falls_back_to_scraper() {
        let mut registry = AdapterRegistry::new();
        registry.register(
            SourceId::Jobright,
            AdapterChain::new()
                .with_api(Arc::new(StubAdapter::failing("api", AdapterKind::Api, ErrorKind::Blocked)))
                .with_scraper(Arc::new(StubAdapter::records(
                    "scraper",
                    AdapterKind::Scraper,
                    vec![record("C", "X", "u3")],
                ))),
        );

        let report = registry.run(SourceId::Jobright, &request("")).await;
        assert_eq!(report.produced_by, Some(ChainStep::Scraper));
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.attempts.len(), 2);
    }

    #[tokio::test]
    async fn region_prefers_regional_adapter() {
        let api = StubAdapter::empty("api", AdapterKind::Api);
        let api_calls = api.calls();
        let regional = StubAdapter::records("kenya", AdapterKind::Api, vec![record("K", "Safari", "k1")]);

        let mut registry = AdapterRegistry::new();
        registry.register(
            SourceId::Jobright,
            AdapterChain::new()
                .with_api(Arc::new(api))
                .with_regional(Region::Kenya, Arc::new(regional)),
        );

        let report = registry.run(SourceId::Jobright, &request("Nairobi, Kenya")).await;
        assert_eq!(report.produced_by, Some(ChainStep::Regional(Region::Kenya)));
        assert_eq!(api_calls.load(std::sync::atomic::Ordering::SeqCst), 0);

        let report = registry.run(SourceId::Jobright, &request("Berlin")).await;
        assert_eq!(report.produced_by, None);
        assert_eq!(api_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_regional_falls_back_to_api_then_scraper() {
        let regional = StubAdapter::empty("kenya", AdapterKind::Api);
        let api = StubAdapter::records("api", AdapterKind::Api, vec![record("A", "Acme", "a1")]);
        let scraper = StubAdapter::records("scraper", AdapterKind::Scraper, vec![record("S", "X", "s1")]);
        let (regional_calls, api_calls, scraper_calls) =
            (regional.calls(), api.calls(), scraper.calls());

        let mut registry = AdapterRegistry::new();
        registry.register(
            SourceId::Jobright,
            AdapterChain::new()
                .with_api(Arc::new(api))
                .with_regional(Region::Kenya, Arc::new(regional))
                .with_scraper(Arc::new(scraper)),
        );

        let report = registry.run(SourceId::Jobright, &request("Nairobi, Kenya")).await;
        assert_eq!(report.produced_by, Some(ChainStep::Api));
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.attempts.len(), 2);
        assert_eq!(regional_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(api_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(scraper_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_chain_uses_bounded_placeholder_once() {
        let api = StubAdapter::empty("api", AdapterKind::Api);
        let scraper = StubAdapter::failing("scraper", AdapterKind::Scraper, ErrorKind::Network);
        let (api_calls, scraper_calls) = (api.calls(), scraper.calls());

        let mut registry = AdapterRegistry::new().with_placeholder(Some(PlaceholderGenerator::new(5)));
        registry.register(
            SourceId::Fuzu,
            AdapterChain::new()
                .with_api(Arc::new(api))
                .with_scraper(Arc::new(scraper)),
        );

        let report = registry
            .run(SourceId::Fuzu, &SearchRequest::new("Data Analyst", "", 3))
            .await;
        assert!(report.used_placeholder());
        assert_eq!(report.records.len(), 3);
        assert!(report.records.iter().all(|r| r.is_placeholder()));
        assert_eq!(api_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(scraper_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn records_are_truncated_to_budget() {
        let records = (0..5).map(|i| record("T", "C", &format!("u{i}"))).collect();
        let mut registry = AdapterRegistry::new();
        registry.register(
            SourceId::RemoteOk,
            AdapterChain::new().with_scraper(Arc::new(StubAdapter::records(
                "remoteok",
                AdapterKind::Scraper,
                records,
            ))),
        );

        let report = registry
            .run(SourceId::RemoteOk, &SearchRequest::new("T", "", 2))
            .await;
        assert_eq!(report.records.len(), 2);
    }

    #[test]
    fn default_chains_follow_source_catalogue() {
        let registry = AdapterRegistry::from_config(&Config::default());

        let adzuna = registry.chain(SourceId::Adzuna).unwrap();
        assert_eq!(adzuna.plan("").len(), 1);
        assert_eq!(adzuna.plan("")[0].0, ChainStep::Api);

        let fuzu = registry.chain(SourceId::Fuzu).unwrap();
        let steps: Vec<_> = fuzu.plan("Nairobi, Kenya").into_iter().map(|(s, _)| s).collect();
        assert_eq!(steps, vec![ChainStep::Regional(Region::Kenya), ChainStep::Scraper]);
        let steps: Vec<_> = fuzu.plan("").into_iter().map(|(s, _)| s).collect();
        assert_eq!(steps, vec![ChainStep::Scraper]);

        let jobright = registry.chain(SourceId::Jobright).unwrap();
        let steps: Vec<_> = jobright.plan("Nairobi, Kenya").into_iter().map(|(s, _)| s).collect();
        assert_eq!(steps, vec![ChainStep::Regional(Region::Kenya), ChainStep::Api]);
        let steps: Vec<_> = jobright.plan("").into_iter().map(|(s, _)| s).collect();
        assert_eq!(steps, vec![ChainStep::Api]);

        let remoteok = registry.chain(SourceId::RemoteOk).unwrap();
        assert_eq!(remoteok.plan("")[0].1.name(), "remoteok");
        assert_eq!(remoteok.plan("")[0].1.kind(), AdapterKind::Scraper);
    }
}
