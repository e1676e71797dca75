// src/pipeline/runner.rs

//! Run trigger surface.
//!
//! Synchronous runs, background runs with retry, cancellation, retry of
//! finished sessions, and housekeeping. Every path ends in the same
//! [`Orchestrator`] logic.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{BackgroundConfig, RunParams, Session, SessionStatus, SourceId};
use crate::pipeline::orchestrator::{Orchestrator, RunSummary};
use crate::pipeline::progress::{ChannelReporter, ProgressUpdate};

/// Where a background run stands.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskState {
    Queued,
    Running { attempt: u32, session_id: Uuid },
    Succeeded(RunSummary),
    Failed { attempts: u32, message: String },
}

impl TaskState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running { .. } => "running",
            Self::Succeeded(_) => "succeeded",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::Failed { .. })
    }
}

/// Handle to a run submitted with [`RunService::submit`].
pub struct RunHandle {
    session_id: Uuid,
    state: watch::Receiver<TaskState>,
    progress: mpsc::UnboundedReceiver<ProgressUpdate>,
    task: JoinHandle<()>,
}

impl RunHandle {
    /// Session of the first attempt.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn status(&self) -> TaskState {
        self.state.borrow().clone()
    }

    /// Progress events from every attempt.
    pub fn progress(&mut self) -> &mut mpsc::UnboundedReceiver<ProgressUpdate> {
        &mut self.progress
    }

    /// Wait for the task to finish and return its final state.
    pub async fn wait(self) -> TaskState {
        if let Err(e) = self.task.await {
            return TaskState::Failed {
                attempts: 0,
                message: format!("background task aborted: {}", e),
            };
        }
        self.state.borrow().clone()
    }
}

/// Entry point for callers that trigger, inspect and maintain runs.
#[derive(Clone)]
pub struct RunService {
    orchestrator: Orchestrator,
    background: BackgroundConfig,
}

impl RunService {
    pub fn new(orchestrator: Orchestrator) -> Self {
        let background = orchestrator.config().background.clone();
        Self {
            orchestrator,
            background,
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Run to completion and return the final counters.
    pub async fn start_run(
        &self,
        query: &str,
        location: &str,
        max_results: usize,
        sources: Option<Vec<SourceId>>,
    ) -> Result<RunSummary> {
        let mut params = RunParams::new(query, location, max_results);
        if let Some(sources) = sources {
            params = params.with_sources(sources);
        }
        self.orchestrator.run(params).await
    }

    /// Queue a run on the tokio runtime and return immediately.
    ///
    /// Parameters and sources are checked up front; the first attempt's session
    /// is stored as `pending` before this returns. A failed attempt is retried
    /// with a fresh session up to `background.max_attempts` times.
    pub async fn submit(&self, params: RunParams) -> Result<RunHandle> {
        params.validate()?;
        self.orchestrator.resolve_sources(&params)?;

        let session = Session::new(params.clone());
        self.orchestrator.sessions().insert(&session).await?;

        let (reporter, progress) = ChannelReporter::new();
        let orchestrator = self.orchestrator.clone().with_reporter(Arc::new(reporter));
        let (state_tx, state) = watch::channel(TaskState::Queued);
        let policy = self.background.clone();
        let first = session.id;

        let task = tokio::spawn(async move {
            let final_state = run_with_retry(&orchestrator, &policy, params, first, &state_tx).await;
            // Receivers may all be gone; the session record is authoritative.
            let _ = state_tx.send(final_state);
        });

        Ok(RunHandle {
            session_id: first,
            state,
            progress,
            task,
        })
    }

    pub async fn get_session(&self, id: Uuid) -> Result<Session> {
        self.orchestrator
            .sessions()
            .get(id)
            .await?
            .ok_or_else(|| AppError::SessionNotFound(id.to_string()))
    }

    /// Start a brand-new run with the parameters of a failed or cancelled session.
    pub async fn retry_run(&self, id: Uuid) -> Result<RunSummary> {
        let session = self.get_session(id).await?;
        if !session.status.is_retryable() {
            return Err(AppError::NotRetryable {
                id: id.to_string(),
                status: session.status,
            });
        }
        log::info!("Retrying session {} as a new run", id);
        self.orchestrator.run(session.params).await
    }

    /// Mark a pending or running session cancelled.
    pub async fn cancel_run(&self, id: Uuid) -> Result<Session> {
        let session = self
            .orchestrator
            .sessions()
            .transition(id, SessionStatus::Cancelled)
            .await?;
        log::info!("Cancelled session {}", id);
        Ok(session)
    }

    /// Delete sessions created more than `days` days ago.
    pub async fn cleanup_sessions_older_than(&self, days: i64) -> Result<usize> {
        let cutoff = Utc::now() - chrono::Duration::days(days.max(0));
        let removed = self.orchestrator.sessions().delete_older_than(cutoff).await?;
        log::info!("Removed {} sessions created before {}", removed, cutoff);
        Ok(removed)
    }

    /// Expire active postings whose posted date is more than `days` days old.
    pub async fn expire_stale_postings(&self, days: i64) -> Result<usize> {
        let cutoff = Utc::now() - chrono::Duration::days(days.max(0));
        let expired = self.orchestrator.jobs().mark_expired(cutoff).await?;
        log::info!("Expired {} postings posted before {}", expired, cutoff);
        Ok(expired)
    }
}

async fn run_with_retry(
    orchestrator: &Orchestrator,
    policy: &BackgroundConfig,
    params: RunParams,
    first: Uuid,
    state: &watch::Sender<TaskState>,
) -> TaskState {
    let max_attempts = policy.max_attempts.max(1);
    let mut session_id = first;
    let mut attempt = 1;

    loop {
        let _ = state.send(TaskState::Running {
            attempt,
            session_id,
        });
        let error = match orchestrator.execute(session_id).await {
            Ok(summary) => return TaskState::Succeeded(summary),
            Err(e) => e,
        };

        if attempt >= max_attempts || !is_transient(&error) {
            log::error!(
                "Background run gave up after {} attempt(s): {}",
                attempt,
                error
            );
            return TaskState::Failed {
                attempts: attempt,
                message: error.to_string(),
            };
        }

        let delay = backoff(policy.backoff_ms, attempt);
        log::warn!(
            "Attempt {} failed ({}); retrying in {:?}",
            attempt,
            error,
            delay
        );
        tokio::time::sleep(delay).await;

        let session = Session::new(params.clone());
        if let Err(e) = orchestrator.sessions().insert(&session).await {
            return TaskState::Failed {
                attempts: attempt,
                message: e.to_string(),
            };
        }
        session_id = session.id;
        attempt += 1;
    }
}

/// Errors a later attempt cannot fix are not retried.
fn is_transient(error: &AppError) -> bool {
    !matches!(
        error,
        AppError::NoActiveSources
            | AppError::Validation(_)
            | AppError::Config(_)
            | AppError::SessionNotFound(_)
    )
}

/// Exponential backoff: `base`, `2 * base`, `4 * base`, ...
fn backoff(base_ms: u64, attempt: u32) -> Duration {
    let factor = 1u64 << (attempt.saturating_sub(1)).min(16);
    Duration::from_millis(base_ms.saturating_mul(factor))
}
