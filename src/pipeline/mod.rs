//! Pipeline entry points for aggregation runs.
//!
//! - `Orchestrator`: runs one session across the active sources
//! - `RunService`: sync/background triggers, retry, cancel and housekeeping

pub mod dedup;
pub mod orchestrator;
pub mod progress;
pub mod reconcile;
pub mod runner;

pub use dedup::Deduplicator;
pub use orchestrator::{Orchestrator, RunSummary};
pub use progress::{
    ChannelReporter, LogReporter, NullReporter, ProgressReporter, ProgressUpdate, RunEvent,
};
pub use reconcile::{Reconciled, Reconciler};
pub use runner::{RunHandle, RunService, TaskState};
