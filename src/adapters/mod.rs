// src/adapters/mod.rs

//! Source adapters.
//!
//! Every external source is reached through a [`SourceAdapter`]. An adapter
//! never returns an error past its boundary: transport, parsing and rate-limit
//! failures come back as [`AdapterOutcome::Failed`] so the fallback chain in
//! [`AdapterRegistry`] can branch on data.

mod adzuna;
mod board;
mod jobright;
mod placeholder;
mod registry;
mod remoteok;

#[cfg(test)]
pub(crate) mod stub;

use std::fmt;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ErrorKind, JobRecord, RunParams};

pub use adzuna::AdzunaAdapter;
pub use board::BoardAdapter;
pub use jobright::JobrightAdapter;
pub use placeholder::PlaceholderGenerator;
pub use registry::{AdapterChain, AdapterRegistry, AttemptResult, ChainReport, ChainStep, StepAttempt};
pub use remoteok::RemoteOkAdapter;

/// Kind of adapter; decides its place in the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    /// Structured third-party endpoint
    Api,
    /// Drives an HTTP session against a listing site
    Scraper,
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api => f.write_str("api"),
            Self::Scraper => f.write_str("scraper"),
        }
    }
}

/// A single search against one source.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub location: String,
    pub max_results: usize,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, location: impl Into<String>, max_results: usize) -> Self {
        Self {
            query: query.into(),
            location: location.into(),
            max_results: max_results.max(1),
        }
    }
}

impl From<&RunParams> for SearchRequest {
    fn from(params: &RunParams) -> Self {
        Self::new(
            params.query.trim(),
            params.location.trim(),
            params.max_results,
        )
    }
}

/// Result of one adapter attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterOutcome {
    Records(Vec<JobRecord>),
    Empty,
    Failed { kind: ErrorKind, message: String },
}

impl AdapterOutcome {
    pub fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Failed {
            kind,
            message: message.into(),
        }
    }

    /// Fold a fallible fetch into an outcome.
    pub fn from_result(result: Result<Vec<JobRecord>>) -> Self {
        match result {
            Ok(records) if records.is_empty() => Self::Empty,
            Ok(records) => Self::Records(records),
            Err(e) => Self::failed(e.kind(), e.to_string()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Records(records) => records.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The search contract every source implements.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Short name used in logs and error records.
    fn name(&self) -> &str;

    fn kind(&self) -> AdapterKind;

    /// Search the source. Any HTTP session is released before this returns.
    async fn search(&self, request: &SearchRequest) -> AdapterOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn outcome_from_result() {
        assert_eq!(AdapterOutcome::from_result(Ok(vec![])), AdapterOutcome::Empty);

        let outcome = AdapterOutcome::from_result(Ok(vec![JobRecord::new("Engineer", "Acme")]));
        assert_eq!(outcome.len(), 1);

        let outcome = AdapterOutcome::from_result(Err(AppError::validation("bad payload")));
        assert!(matches!(
            outcome,
            AdapterOutcome::Failed {
                kind: ErrorKind::Parsing,
                ..
            }
        ));
        assert!(outcome.is_empty());
    }

    #[test]
    fn search_request_clamps_budget() {
        let request = SearchRequest::new("rust", "", 0);
        assert_eq!(request.max_results, 1);

        let params = RunParams::new("  Data Analyst ", " Nairobi ", 10);
        let request = SearchRequest::from(&params);
        assert_eq!(request.query, "Data Analyst");
        assert_eq!(request.location, "Nairobi");
    }
}
