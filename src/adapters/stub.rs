// src/adapters/stub.rs

//! Scripted adapters for pipeline tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::adapters::{AdapterKind, AdapterOutcome, SearchRequest, SourceAdapter};
use crate::models::{ErrorKind, JobRecord};

pub(crate) fn record(title: &str, company: &str, url: &str) -> JobRecord {
    JobRecord {
        source_url: url.to_string(),
        ..JobRecord::new(title, company)
    }
}

/// Returns the same outcome on every call and counts calls.
pub(crate) struct StubAdapter {
    name: String,
    kind: AdapterKind,
    outcome: AdapterOutcome,
    calls: Arc<AtomicUsize>,
}

impl StubAdapter {
    pub(crate) fn new(name: &str, kind: AdapterKind, outcome: AdapterOutcome) -> Self {
        Self {
            name: name.to_string(),
            kind,
            outcome,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn records(name: &str, kind: AdapterKind, records: Vec<JobRecord>) -> Self {
        Self::new(name, kind, AdapterOutcome::Records(records))
    }

    pub(crate) fn empty(name: &str, kind: AdapterKind) -> Self {
        Self::new(name, kind, AdapterOutcome::Empty)
    }

    pub(crate) fn failing(name: &str, kind: AdapterKind, error: ErrorKind) -> Self {
        Self::new(name, kind, AdapterOutcome::failed(error, "scripted failure"))
    }

    pub(crate) fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl SourceAdapter for StubAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> AdapterKind {
        self.kind
    }

    async fn search(&self, _request: &SearchRequest) -> AdapterOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}
