// src/models/session.rs

//! Aggregation session: one run's parameters, status, counters and history.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::SourceId;

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Whether a run that ended in this status may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Failed | Self::Cancelled)
    }

    fn can_transition_to(&self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Pending, Failed)
                | (Pending, Cancelled)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Cancelled)
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a recorded error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Parsing,
    Timeout,
    Blocked,
    NotFound,
    Other,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Parsing => "parsing",
            Self::Timeout => "timeout",
            Self::Blocked => "blocked",
            Self::NotFound => "not_found",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a session log entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of an aggregation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunParams {
    pub query: String,

    #[serde(default)]
    pub location: String,

    pub max_results: usize,

    /// Restrict the run to these sources; `None` means every active source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ids: Option<Vec<SourceId>>,
}

impl RunParams {
    pub fn new(query: impl Into<String>, location: impl Into<String>, max_results: usize) -> Self {
        Self {
            query: query.into(),
            location: location.into(),
            max_results,
            source_ids: None,
        }
    }

    pub fn with_sources(mut self, source_ids: Vec<SourceId>) -> Self {
        self.source_ids = Some(source_ids);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(AppError::validation("query must not be empty"));
        }
        if self.max_results == 0 {
            return Err(AppError::validation("max_results must be >= 1"));
        }
        Ok(())
    }
}

/// Aggregate counters for a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SessionCounters {
    pub found: usize,
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub errors: usize,
    pub duplicates_merged: usize,
}

impl SessionCounters {
    pub fn absorb(&mut self, other: &SessionCounters) {
        self.found += other.found;
        self.processed += other.processed;
        self.created += other.created;
        self.updated += other.updated;
        self.errors += other.errors;
        self.duplicates_merged += other.duplicates_merged;
    }
}

/// An error recorded against a session. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionError {
    pub kind: ErrorKind,
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl SessionError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
            url: None,
            created_at: Utc::now(),
        }
    }

    /// Classified record of `error`, attributed to its source when it has one.
    pub fn from_error(error: &AppError) -> Self {
        let record = Self::new(error.kind(), error.to_string());
        match error.source_id() {
            Some(source) => record.with_source(source),
            None => record,
        }
    }

    pub fn with_source(mut self, source: SourceId) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        if !url.is_empty() {
            self.url = Some(url);
        }
        self
    }
}

/// A log line recorded against a session. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionLog {
    pub level: LogLevel,
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceId>,

    pub created_at: DateTime<Utc>,
}

impl SessionLog {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            source: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_source(mut self, source: SourceId) -> Self {
        self.source = Some(source);
        self
    }
}

/// One aggregation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: Uuid,
    pub params: RunParams,
    pub status: SessionStatus,

    #[serde(default)]
    pub counters: SessionCounters,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub errors: Vec<SessionError>,

    #[serde(default)]
    pub logs: Vec<SessionLog>,
}

impl Session {
    pub fn new(params: RunParams) -> Self {
        Self {
            id: Uuid::new_v4(),
            params,
            status: SessionStatus::Pending,
            counters: SessionCounters::default(),
            started_at: None,
            completed_at: None,
            created_at: Utc::now(),
            errors: Vec::new(),
            logs: Vec::new(),
        }
    }

    /// Move to `next`, stamping start/completion times.
    pub fn transition(&mut self, next: SessionStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        let now = Utc::now();
        if next == SessionStatus::Running {
            self.started_at = Some(now);
        }
        if next.is_terminal() {
            self.completed_at = Some(now);
        }
        self.status = next;
        Ok(())
    }

    pub fn duration(&self) -> Option<Duration> {
        let start = self.started_at?;
        Some(self.completed_at.unwrap_or_else(Utc::now) - start)
    }

    /// Share of found records that were processed, in `[0, 1]`.
    pub fn success_rate(&self) -> f64 {
        if self.counters.found == 0 {
            return 0.0;
        }
        self.counters.processed as f64 / self.counters.found as f64
    }

    pub fn errors_for(&self, source: SourceId) -> impl Iterator<Item = &SessionError> {
        self.errors.iter().filter(move |e| e.source == Some(source))
    }
}
