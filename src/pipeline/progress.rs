// src/pipeline/progress.rs

//! Session-scoped progress events.
//!
//! The orchestrator reports through one [`ProgressReporter`]; where the events
//! go (log lines, a channel to a background handle, nowhere) is up to the caller.

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::adapters::{AttemptResult, ChainStep};
use crate::models::{SessionCounters, SessionStatus, SourceId};

/// Something that happened during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Started {
        sources: Vec<SourceId>,
    },
    SourceStarted {
        source: SourceId,
    },
    Attempt {
        source: SourceId,
        step: ChainStep,
        adapter: String,
        result: AttemptResult,
    },
    SourceFinished {
        source: SourceId,
        counters: SessionCounters,
    },
    Deduplicated {
        removed: usize,
    },
    Finished {
        status: SessionStatus,
        counters: SessionCounters,
    },
}

/// A progress event tagged with its session.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub session_id: Uuid,
    pub event: RunEvent,
}

/// Sink for run progress.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, session_id: Uuid, event: RunEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn report(&self, _session_id: Uuid, _event: RunEvent) {}
}

/// Writes events through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl ProgressReporter for LogReporter {
    fn report(&self, session_id: Uuid, event: RunEvent) {
        let short = &session_id.to_string()[..8];
        match event {
            RunEvent::Started { sources } => {
                let names: Vec<&str> = sources.iter().map(|s| s.as_str()).collect();
                log::info!("[{}] run started: {}", short, names.join(", "));
            }
            RunEvent::SourceStarted { source } => {
                log::info!("[{}] {}: searching", short, source);
            }
            RunEvent::Attempt {
                source,
                step,
                adapter,
                result,
            } => match result {
                AttemptResult::Records(n) => {
                    log::info!("[{}] {}: {} ({}) returned {} records", short, source, step, adapter, n)
                }
                AttemptResult::Empty => {
                    log::info!("[{}] {}: {} ({}) returned nothing", short, source, step, adapter)
                }
                AttemptResult::Failed { kind, message } => log::warn!(
                    "[{}] {}: {} ({}) failed [{}]: {}",
                    short,
                    source,
                    step,
                    adapter,
                    kind,
                    message
                ),
            },
            RunEvent::SourceFinished { source, counters } => log::info!(
                "[{}] {}: found {}, created {}, updated {}, errors {}",
                short,
                source,
                counters.found,
                counters.created,
                counters.updated,
                counters.errors
            ),
            RunEvent::Deduplicated { removed } => {
                log::info!("[{}] deduplication removed {} postings", short, removed)
            }
            RunEvent::Finished { status, counters } => log::info!(
                "[{}] run {}: found {}, processed {}, created {}, updated {}, errors {}",
                short,
                status,
                counters.found,
                counters.processed,
                counters.created,
                counters.updated,
                counters.errors
            ),
        }
    }
}

/// Forwards events to a channel; used by background runs.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: mpsc::UnboundedSender<ProgressUpdate>,
}

impl ChannelReporter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressReporter for ChannelReporter {
    fn report(&self, session_id: Uuid, event: RunEvent) {
        // A dropped receiver only means nobody is listening.
        let _ = self.tx.send(ProgressUpdate { session_id, event });
    }
}
