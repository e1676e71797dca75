// src/pipeline/orchestrator.rs

//! Run orchestrator.
//!
//! Drives one aggregation run: `pending -> running -> {completed | failed | cancelled}`.
//! Sources are searched concurrently with a bounded fan-out; each source's
//! records are reconciled in order. Per-source and per-record failures are
//! recorded on the session and never abort the run. Deduplication runs once
//! every source has finished.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use uuid::Uuid;

use crate::adapters::{AdapterRegistry, AttemptResult, SearchRequest};
use crate::error::{AppError, Result};
use crate::models::{
    Config, ErrorKind, LogLevel, RunParams, Session, SessionCounters, SessionError, SessionLog,
    SessionStatus, SourceConfig, SourceId,
};
use crate::pipeline::dedup::Deduplicator;
use crate::pipeline::progress::{LogReporter, ProgressReporter, RunEvent};
use crate::pipeline::reconcile::{Reconciled, Reconciler};
use crate::storage::{JobStore, SessionStore};

/// Final state of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub session_id: Uuid,
    pub status: SessionStatus,
    pub counters: SessionCounters,
}

impl RunSummary {
    /// Labelled values for console output.
    pub fn items(&self) -> Vec<(&'static str, String)> {
        vec![
            ("session", self.session_id.to_string()),
            ("status", self.status.to_string()),
            ("found", self.counters.found.to_string()),
            ("processed", self.counters.processed.to_string()),
            ("created", self.counters.created.to_string()),
            ("updated", self.counters.updated.to_string()),
            ("errors", self.counters.errors.to_string()),
            ("duplicates merged", self.counters.duplicates_merged.to_string()),
        ]
    }
}

/// Runs aggregation sessions against a registry and a store.
#[derive(Clone)]
pub struct Orchestrator {
    config: Arc<Config>,
    registry: Arc<AdapterRegistry>,
    jobs: Arc<dyn JobStore>,
    sessions: Arc<dyn SessionStore>,
    reporter: Arc<dyn ProgressReporter>,
}

impl Orchestrator {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<AdapterRegistry>,
        jobs: Arc<dyn JobStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            config,
            registry,
            jobs,
            sessions,
            reporter: Arc::new(LogReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    pub fn jobs(&self) -> &Arc<dyn JobStore> {
        &self.jobs
    }

    /// Active sources for a run, in configured order.
    pub fn resolve_sources(&self, params: &RunParams) -> Result<Vec<SourceConfig>> {
        let sources = self.config.active_sources(params.source_ids.as_deref());
        if sources.is_empty() {
            return Err(AppError::NoActiveSources);
        }
        Ok(sources)
    }

    /// Create a session for `params` and run it to completion.
    ///
    /// Invalid parameters and an empty source list are rejected before any
    /// session is created.
    pub async fn run(&self, params: RunParams) -> Result<RunSummary> {
        params.validate()?;
        let sources = self.resolve_sources(&params)?;
        let session = Session::new(params);
        self.sessions.insert(&session).await?;
        self.drive(session.id, &sources).await
    }

    /// Run a session that was already stored as `pending`.
    pub async fn execute(&self, session_id: Uuid) -> Result<RunSummary> {
        let session = self
            .sessions
            .get(session_id)
            .await?
            .ok_or_else(|| AppError::SessionNotFound(session_id.to_string()))?;

        let sources = match session
            .params
            .validate()
            .and_then(|_| self.resolve_sources(&session.params))
        {
            Ok(sources) => sources,
            Err(e) => {
                self.fail(session_id, &e, SessionCounters::default()).await;
                return Err(e);
            }
        };
        self.drive(session_id, &sources).await
    }

    async fn drive(&self, session_id: Uuid, sources: &[SourceConfig]) -> Result<RunSummary> {
        let session = match self.sessions.transition(session_id, SessionStatus::Running).await {
            Ok(session) => session,
            Err(AppError::InvalidTransition {
                from: SessionStatus::Cancelled,
                ..
            }) => {
                log::info!("Session {} was cancelled before it started", session_id);
                return Ok(RunSummary {
                    session_id,
                    status: SessionStatus::Cancelled,
                    counters: SessionCounters::default(),
                });
            }
            Err(e) => return Err(e),
        };

        let mut counters = SessionCounters::default();
        match self.run_sources(&session, sources, &mut counters).await {
            Ok(status) => {
                self.reporter
                    .report(session_id, RunEvent::Finished { status, counters });
                Ok(RunSummary {
                    session_id,
                    status,
                    counters,
                })
            }
            Err(e) => {
                self.fail(session_id, &e, counters).await;
                Err(e)
            }
        }
    }

    async fn run_sources(
        &self,
        session: &Session,
        sources: &[SourceConfig],
        counters: &mut SessionCounters,
    ) -> Result<SessionStatus> {
        let session_id = session.id;
        let ids: Vec<SourceId> = sources.iter().map(|s| s.id).collect();
        self.reporter
            .report(session_id, RunEvent::Started { sources: ids.clone() });
        self.log(
            session_id,
            LogLevel::Info,
            format!(
                "Starting run for '{}' across {} sources",
                session.params.query,
                ids.len()
            ),
            None,
        )
        .await?;

        let request = SearchRequest::from(&session.params);
        let concurrency = self.config.http.max_concurrent.clamp(1, ids.len().max(1));

        let mut results = stream::iter(ids)
            .map(|source| self.process_source(session_id, source, &request))
            .buffer_unordered(concurrency);
        while let Some(result) = results.next().await {
            if let Some(source_counters) = result? {
                counters.absorb(&source_counters);
                self.sessions.record_counters(session_id, *counters).await?;
            }
        }
        drop(results);

        if self.is_cancelled(session_id).await? {
            self.sessions.record_counters(session_id, *counters).await?;
            self.log(
                session_id,
                LogLevel::Warning,
                "Run cancelled; postings reconciled so far are kept".to_string(),
                None,
            )
            .await?;
            return Ok(SessionStatus::Cancelled);
        }

        let removed = Deduplicator::new(
            Arc::clone(&self.jobs),
            self.config.pipeline.similarity_threshold,
        )
        .run()
        .await?;
        counters.duplicates_merged = removed;
        self.reporter
            .report(session_id, RunEvent::Deduplicated { removed });

        self.sessions.record_counters(session_id, *counters).await?;
        self.log(
            session_id,
            LogLevel::Info,
            format!(
                "Run completed: found {}, processed {}, created {}, updated {}, errors {}, duplicates merged {}",
                counters.found,
                counters.processed,
                counters.created,
                counters.updated,
                counters.errors,
                counters.duplicates_merged
            ),
            None,
        )
        .await?;

        match self
            .sessions
            .transition(session_id, SessionStatus::Completed)
            .await
        {
            Ok(_) => Ok(SessionStatus::Completed),
            Err(AppError::InvalidTransition {
                from: SessionStatus::Cancelled,
                ..
            }) => Ok(SessionStatus::Cancelled),
            Err(e) => Err(e),
        }
    }

    /// Search one source and reconcile its records in order.
    ///
    /// Returns `None` when the run was cancelled before this source started.
    async fn process_source(
        &self,
        session_id: Uuid,
        source: SourceId,
        request: &SearchRequest,
    ) -> Result<Option<SessionCounters>> {
        if self.is_cancelled(session_id).await? {
            log::info!("{}: skipped, session {} is cancelled", source, session_id);
            return Ok(None);
        }
        self.reporter
            .report(session_id, RunEvent::SourceStarted { source });

        let mut counters = SessionCounters::default();
        let report = match AssertUnwindSafe(self.registry.run(source, request))
            .catch_unwind()
            .await
        {
            Ok(report) => report,
            Err(_) => {
                counters.errors += 1;
                self.record_error(
                    session_id,
                    SessionError::new(ErrorKind::Network, "adapter panicked").with_source(source),
                )
                .await?;
                return Ok(Some(counters));
            }
        };

        for attempt in &report.attempts {
            self.reporter.report(
                session_id,
                RunEvent::Attempt {
                    source,
                    step: attempt.step,
                    adapter: attempt.adapter.clone(),
                    result: attempt.result.clone(),
                },
            );
        }
        for attempt in report.failures() {
            if let AttemptResult::Failed { kind, message } = &attempt.result {
                counters.errors += 1;
                let error = AppError::adapter(
                    source,
                    *kind,
                    format!("{} adapter '{}' failed: {}", attempt.step, attempt.adapter, message),
                );
                self.record_error(session_id, SessionError::from_error(&error)).await?;
            }
        }
        if report.used_placeholder() {
            self.log(
                session_id,
                LogLevel::Warning,
                format!(
                    "No live results; {} placeholder postings generated",
                    report.records.len()
                ),
                Some(source),
            )
            .await?;
        }

        for record in report.records {
            counters.found += 1;
            let record = record.normalized();
            if !record.is_acceptable() {
                log::debug!("{}: dropped record without title or company", source);
                continue;
            }

            match Reconciler::new(Arc::clone(&self.jobs))
                .reconcile(&record, source)
                .await
            {
                Ok(reconciled) => {
                    counters.processed += 1;
                    match reconciled {
                        Reconciled::Created(_) => counters.created += 1,
                        Reconciled::Updated(_) => counters.updated += 1,
                    }
                }
                Err(e) => {
                    counters.errors += 1;
                    self.record_error(
                        session_id,
                        SessionError::new(ErrorKind::Parsing, e.to_string())
                            .with_source(source)
                            .with_url(record.source_url.clone()),
                    )
                    .await?;
                }
            }
        }

        self.log(
            session_id,
            LogLevel::Info,
            format!(
                "found {}, created {}, updated {}, errors {}",
                counters.found, counters.created, counters.updated, counters.errors
            ),
            Some(source),
        )
        .await?;
        self.reporter
            .report(session_id, RunEvent::SourceFinished { source, counters });
        Ok(Some(counters))
    }

    async fn is_cancelled(&self, session_id: Uuid) -> Result<bool> {
        Ok(self.sessions.status(session_id).await? == Some(SessionStatus::Cancelled))
    }

    async fn log(
        &self,
        session_id: Uuid,
        level: LogLevel,
        message: String,
        source: Option<SourceId>,
    ) -> Result<()> {
        let mut entry = SessionLog::new(level, message);
        if let Some(source) = source {
            entry = entry.with_source(source);
        }
        self.sessions.append_log(session_id, entry).await
    }

    async fn record_error(&self, session_id: Uuid, error: SessionError) -> Result<()> {
        self.sessions.append_error(session_id, error).await
    }

    /// Close a session as failed. Store errors here are logged; the caller re-raises `error`.
    async fn fail(&self, session_id: Uuid, error: &AppError, mut counters: SessionCounters) {
        log::error!("Run {} failed: {}", session_id, error);
        counters.errors += 1;

        if let Err(e) = self.sessions.record_counters(session_id, counters).await {
            log::error!("Could not record counters for {}: {}", session_id, e);
        }
        if let Err(e) = self
            .record_error(session_id, SessionError::new(ErrorKind::Other, error.to_string()))
            .await
        {
            log::error!("Could not record failure for {}: {}", session_id, e);
        }
        if let Err(e) = self
            .sessions
            .transition(session_id, SessionStatus::Failed)
            .await
        {
            log::error!("Could not mark {} failed: {}", session_id, e);
        }
        self.reporter.report(
            session_id,
            RunEvent::Finished {
                status: SessionStatus::Failed,
                counters,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use async_trait::async_trait;

    use super::*;
    use crate::adapters::stub::{StubAdapter, record};
    use crate::adapters::{
        AdapterChain, AdapterKind, AdapterOutcome, PlaceholderGenerator, SourceAdapter,
    };
    use crate::models::JobRecord;
    use crate::pipeline::progress::ChannelReporter;
    use crate::storage::MemoryStorage;
    use crate::storage::flaky::FlakyStore;

    fn config(sources: Vec<SourceConfig>) -> Arc<Config> {
        let mut config = Config {
            sources,
            ..Config::default()
        };
        config.http.max_concurrent = 1;
        Arc::new(config)
    }

    fn source(id: SourceId) -> SourceConfig {
        SourceConfig::new(id, id.as_str(), "https://example.com")
    }

    fn orchestrator(
        config: Arc<Config>,
        registry: AdapterRegistry,
        store: &Arc<MemoryStorage>,
    ) -> Orchestrator {
        Orchestrator::new(config, Arc::new(registry), store.clone(), store.clone())
    }

    fn api_only(adapter: StubAdapter) -> AdapterChain {
        AdapterChain::new().with_api(Arc::new(adapter))
    }

    fn three_records() -> Vec<JobRecord> {
        vec![
            record("Data Analyst", "Acme", "https://a/1"),
            record("Data Engineer", "Globex", "https://a/2"),
            record("BI Developer", "Initech", "https://a/3"),
        ]
    }

    #[tokio::test]
    async fn no_active_sources_raises_before_any_session() {
        let store = Arc::new(MemoryStorage::new());
        let orchestrator = orchestrator(
            config(vec![source(SourceId::Adzuna).inactive()]),
            AdapterRegistry::new(),
            &store,
        );

        let err = orchestrator
            .run(RunParams::new("Data Analyst", "", 10))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoActiveSources));
        assert!(SessionStore::list(store.as_ref()).await.unwrap().is_empty());
        assert!(store.list_jobs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn pending_session_without_sources_ends_failed() {
        let store = Arc::new(MemoryStorage::new());
        let orchestrator = orchestrator(config(vec![]), AdapterRegistry::new(), &store);
        let session = Session::new(RunParams::new("Data Analyst", "", 10));
        store.insert(&session).await.unwrap();

        assert!(orchestrator.execute(session.id).await.is_err());
        let stored = store.get(session.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Failed);
        assert_eq!(stored.counters.errors, 1);
        assert_eq!(stored.errors.len(), 1);
        assert_eq!(stored.errors[0].kind, ErrorKind::Other);
        assert!(stored.completed_at.is_some());
    }

    #[tokio::test]
    async fn api_success_completes_without_scraper() {
        let store = Arc::new(MemoryStorage::new());
        let scraper = StubAdapter::records("scraper", AdapterKind::Scraper, vec![]);
        let scraper_calls = scraper.calls();

        let mut registry = AdapterRegistry::new();
        registry.register(
            SourceId::Adzuna,
            AdapterChain::new()
                .with_api(Arc::new(StubAdapter::records(
                    "api",
                    AdapterKind::Api,
                    three_records(),
                )))
                .with_scraper(Arc::new(scraper)),
        );
        let orchestrator = orchestrator(config(vec![source(SourceId::Adzuna)]), registry, &store);

        let summary = orchestrator
            .run(RunParams::new("Data Analyst", "", 10))
            .await
            .unwrap();
        assert_eq!(summary.status, SessionStatus::Completed);
        assert_eq!(summary.counters.created, 3);
        assert_eq!(summary.counters.errors, 0);
        assert_eq!(scraper_calls.load(Ordering::SeqCst), 0);

        let session = store.get(summary.session_id).await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.counters.created, 3);
        assert!(session.started_at.is_some() && session.completed_at.is_some());
        assert!(
            session
                .logs
                .last()
                .is_some_and(|l| l.message.starts_with("Run completed"))
        );
    }

    #[tokio::test]
    async fn placeholder_path_completes_within_budget() {
        let store = Arc::new(MemoryStorage::new());
        let mut registry =
            AdapterRegistry::new().with_placeholder(Some(PlaceholderGenerator::new(5)));
        registry.register(
            SourceId::Fuzu,
            AdapterChain::new()
                .with_api(Arc::new(StubAdapter::empty("api", AdapterKind::Api)))
                .with_scraper(Arc::new(StubAdapter::empty("scraper", AdapterKind::Scraper))),
        );
        let orchestrator = orchestrator(config(vec![source(SourceId::Fuzu)]), registry, &store);

        let summary = orchestrator
            .run(RunParams::new("Data Analyst", "", 3))
            .await
            .unwrap();
        assert_eq!(summary.status, SessionStatus::Completed);
        assert_eq!(summary.counters.created, 3);

        let jobs = store.list_jobs().await.unwrap();
        assert_eq!(jobs.len(), 3);
        assert!(
            jobs.iter()
                .all(|j| j.description.contains(crate::models::PLACEHOLDER_DESCRIPTION_MARKER))
        );
    }

    #[tokio::test]
    async fn failing_source_does_not_fail_the_run() {
        let store = Arc::new(MemoryStorage::new());
        let mut registry = AdapterRegistry::new();
        registry.register(
            SourceId::Jobright,
            api_only(StubAdapter::failing("a", AdapterKind::Api, ErrorKind::Network)),
        );
        registry.register(
            SourceId::Adzuna,
            api_only(StubAdapter::records("b", AdapterKind::Api, three_records())),
        );
        let orchestrator = orchestrator(
            config(vec![source(SourceId::Jobright), source(SourceId::Adzuna)]),
            registry,
            &store,
        );

        let summary = orchestrator
            .run(RunParams::new("Data Analyst", "", 10))
            .await
            .unwrap();
        assert_eq!(summary.status, SessionStatus::Completed);
        assert_eq!(summary.counters.errors, 1);
        assert_eq!(store.list_jobs().await.unwrap().len(), 3);

        let session = store.get(summary.session_id).await.unwrap().unwrap();
        assert_eq!(session.errors_for(SourceId::Jobright).count(), 1);
        assert_eq!(session.errors_for(SourceId::Adzuna).count(), 0);
        assert_eq!(session.errors[0].kind, ErrorKind::Network);
    }

    #[tokio::test]
    async fn inactive_source_is_never_attempted() {
        let store = Arc::new(MemoryStorage::new());
        let inactive = StubAdapter::records("inactive", AdapterKind::Api, three_records());
        let inactive_calls = inactive.calls();

        let mut registry = AdapterRegistry::new();
        registry.register(SourceId::Jobright, api_only(inactive));
        registry.register(
            SourceId::Adzuna,
            api_only(StubAdapter::records("b", AdapterKind::Api, three_records())),
        );
        let orchestrator = orchestrator(
            config(vec![
                source(SourceId::Jobright).inactive(),
                source(SourceId::Adzuna),
            ]),
            registry,
            &store,
        );

        let summary = orchestrator
            .run(RunParams::new("Data Analyst", "", 10))
            .await
            .unwrap();
        assert_eq!(inactive_calls.load(Ordering::SeqCst), 0);

        let session = store.get(summary.session_id).await.unwrap().unwrap();
        assert!(session.logs.iter().all(|l| l.source != Some(SourceId::Jobright)));
        assert!(
            session
                .logs
                .iter()
                .all(|l| !l.message.contains(SourceId::Jobright.as_str()))
        );
    }

    #[tokio::test]
    async fn second_run_updates_instead_of_creating() {
        let store = Arc::new(MemoryStorage::new());
        let mut registry = AdapterRegistry::new();
        registry.register(
            SourceId::Adzuna,
            api_only(StubAdapter::records("api", AdapterKind::Api, three_records())),
        );
        let orchestrator = orchestrator(config(vec![source(SourceId::Adzuna)]), registry, &store);
        let params = RunParams::new("Data Analyst", "", 10);

        orchestrator.run(params.clone()).await.unwrap();
        let summary = orchestrator.run(params).await.unwrap();
        assert_eq!(summary.counters.created, 0);
        assert_eq!(summary.counters.updated, 3);
        assert_eq!(store.list_jobs().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn unacceptable_records_are_found_not_processed() {
        let store = Arc::new(MemoryStorage::new());
        let mut registry = AdapterRegistry::new();
        registry.register(
            SourceId::Adzuna,
            api_only(StubAdapter::records(
                "api",
                AdapterKind::Api,
                vec![
                    record("Data Analyst", "Acme", "https://a/1"),
                    record("   ", "Acme", "https://a/2"),
                    record("Data Analyst", "", "https://a/3"),
                ],
            )),
        );
        let orchestrator = orchestrator(config(vec![source(SourceId::Adzuna)]), registry, &store);

        let summary = orchestrator
            .run(RunParams::new("Data Analyst", "", 10))
            .await
            .unwrap();
        assert_eq!(summary.counters.found, 3);
        assert_eq!(summary.counters.processed, 1);
        assert_eq!(summary.counters.errors, 0);
    }

    #[tokio::test]
    async fn duplicates_across_sources_are_merged_after_join() {
        let store = Arc::new(MemoryStorage::new());
        let mut registry = AdapterRegistry::new();
        registry.register(
            SourceId::Adzuna,
            api_only(StubAdapter::records(
                "a",
                AdapterKind::Api,
                vec![record("Data Analyst", "Acme", "https://a/1")],
            )),
        );
        registry.register(
            SourceId::RemoteOk,
            AdapterChain::new().with_scraper(Arc::new(StubAdapter::records(
                "b",
                AdapterKind::Scraper,
                vec![record("data analyst", "Acme", "https://b/1")],
            ))),
        );
        let mut config = (*config(vec![source(SourceId::Adzuna), source(SourceId::RemoteOk)])).clone();
        config.http.max_concurrent = 4;
        let orchestrator = orchestrator(Arc::new(config), registry, &store);

        let summary = orchestrator
            .run(RunParams::new("Data Analyst", "", 10))
            .await
            .unwrap();
        assert_eq!(summary.counters.created, 2);
        assert_eq!(summary.counters.duplicates_merged, 1);
        assert_eq!(store.list_jobs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn progress_events_are_reported() {
        let store = Arc::new(MemoryStorage::new());
        let mut registry = AdapterRegistry::new();
        registry.register(
            SourceId::Adzuna,
            api_only(StubAdapter::records("api", AdapterKind::Api, three_records())),
        );
        let (reporter, mut rx) = ChannelReporter::new();
        let orchestrator = orchestrator(config(vec![source(SourceId::Adzuna)]), registry, &store)
            .with_reporter(Arc::new(reporter));

        orchestrator
            .run(RunParams::new("Data Analyst", "", 10))
            .await
            .unwrap();

        let mut events = Vec::new();
        while let Ok(update) = rx.try_recv() {
            events.push(update.event);
        }
        assert!(matches!(events.first(), Some(RunEvent::Started { .. })));
        assert!(matches!(
            events.last(),
            Some(RunEvent::Finished {
                status: SessionStatus::Completed,
                ..
            })
        ));
        assert!(events.iter().any(|e| matches!(e, RunEvent::Deduplicated { .. })));
    }

    /// Cancels its session from inside the search.
    struct CancellingAdapter {
        store: Arc<MemoryStorage>,
        session_id: Uuid,
    }

    #[async_trait]
    impl SourceAdapter for CancellingAdapter {
        fn name(&self) -> &str {
            "cancelling"
        }

        fn kind(&self) -> AdapterKind {
            AdapterKind::Api
        }

        async fn search(&self, _request: &SearchRequest) -> AdapterOutcome {
            self.store
                .transition(self.session_id, SessionStatus::Cancelled)
                .await
                .unwrap();
            AdapterOutcome::Records(vec![record("Data Analyst", "Acme", "https://a/1")])
        }
    }

    #[tokio::test]
    async fn cancellation_stops_at_next_source_and_keeps_partial_results() {
        let store = Arc::new(MemoryStorage::new());
        let session = Session::new(RunParams::new("Data Analyst", "", 10));
        store.insert(&session).await.unwrap();

        let later = StubAdapter::records("later", AdapterKind::Api, three_records());
        let later_calls = later.calls();
        let mut registry = AdapterRegistry::new();
        registry.register(
            SourceId::Adzuna,
            AdapterChain::new().with_api(Arc::new(CancellingAdapter {
                store: store.clone(),
                session_id: session.id,
            })),
        );
        registry.register(SourceId::Jobright, api_only(later));
        let orchestrator = orchestrator(
            config(vec![source(SourceId::Adzuna), source(SourceId::Jobright)]),
            registry,
            &store,
        );

        let summary = orchestrator.execute(session.id).await.unwrap();
        assert_eq!(summary.status, SessionStatus::Cancelled);
        assert_eq!(summary.counters.created, 1);
        assert_eq!(later_calls.load(Ordering::SeqCst), 0);

        let stored = store.get(session.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Cancelled);
        assert_eq!(stored.counters.created, 1);
        assert_eq!(store.list_jobs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn record_failure_is_recorded_as_parsing_and_run_continues() {
        let jobs = Arc::new(FlakyStore::poisoned("Data Engineer"));
        let sessions = Arc::new(MemoryStorage::new());
        let mut registry = AdapterRegistry::new();
        registry.register(
            SourceId::Adzuna,
            api_only(StubAdapter::records("api", AdapterKind::Api, three_records())),
        );
        let orchestrator = Orchestrator::new(
            config(vec![source(SourceId::Adzuna)]),
            Arc::new(registry),
            jobs.clone(),
            sessions.clone(),
        );

        let summary = orchestrator
            .run(RunParams::new("Data Analyst", "", 10))
            .await
            .unwrap();
        assert_eq!(summary.status, SessionStatus::Completed);
        assert_eq!(summary.counters.created, 2);
        assert_eq!(summary.counters.errors, 1);

        let session = sessions.get(summary.session_id).await.unwrap().unwrap();
        assert_eq!(session.errors[0].kind, ErrorKind::Parsing);
        assert_eq!(session.errors[0].url.as_deref(), Some("https://a/2"));
    }

    #[tokio::test]
    async fn escaping_error_fails_the_session_and_is_reraised() {
        let jobs = Arc::new(FlakyStore::failing_lists(1));
        let sessions = Arc::new(MemoryStorage::new());
        let mut registry = AdapterRegistry::new();
        registry.register(
            SourceId::Adzuna,
            api_only(StubAdapter::records("api", AdapterKind::Api, three_records())),
        );
        let orchestrator = Orchestrator::new(
            config(vec![source(SourceId::Adzuna)]),
            Arc::new(registry),
            jobs.clone(),
            sessions.clone(),
        );

        let err = orchestrator
            .run(RunParams::new("Data Analyst", "", 10))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Store(_)));

        let session = SessionStore::list(sessions.as_ref())
            .await
            .unwrap()
            .pop()
            .unwrap();
        assert_eq!(session.status, SessionStatus::Failed);
        assert_eq!(session.counters.created, 3);
        assert_eq!(session.counters.errors, 1);
        assert_eq!(session.errors.last().map(|e| e.kind), Some(ErrorKind::Other));
        assert!(session.completed_at.is_some());
    }
}
