//! Storage abstractions for companies, job postings and run sessions.
//!
//! Two backends implement both traits:
//! - [`MemoryStorage`]: process-local, for tests and one-shot runs
//! - [`LocalStorage`]: JSON files under a storage directory
//!
//! ```text
//! storage/
//! ├── companies.json
//! ├── jobs.json
//! └── sessions.json     # sessions with nested errors and logs
//! ```

#[cfg(test)]
pub(crate) mod flaky;
pub mod local;
pub mod memory;
mod state;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Company, CompanyDefaults, Job, JobDefaults, Session, SessionCounters, SessionError,
    SessionLog, SessionStatus,
};

// Re-export for convenience
pub use local::LocalStorage;
pub use memory::MemoryStorage;

/// Company and job posting persistence.
///
/// Implementations guarantee name-uniqueness for companies and
/// (title, company, source URL) uniqueness for jobs, also under concurrent calls.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Resolve a company by exact name, creating it with `defaults` when absent.
    async fn get_or_create_company(
        &self,
        name: &str,
        defaults: CompanyDefaults,
    ) -> Result<(Company, bool)>;

    /// Resolve a job by its uniqueness triple, creating it as active when absent.
    async fn get_or_create_job(
        &self,
        title: &str,
        company: &Company,
        source_url: &str,
        defaults: JobDefaults,
    ) -> Result<(Job, bool)>;

    /// Bump a job's update timestamp.
    async fn touch_job(&self, id: u64) -> Result<Job>;

    /// Apply one deduplication pass as a single change: delete `absorbed`
    /// postings and store the `merged` canonical ones. Postings already gone
    /// are skipped. Returns how many postings were deleted.
    async fn apply_merges(&self, merged: &[Job], absorbed: &[u64]) -> Result<usize>;

    async fn list_jobs(&self) -> Result<Vec<Job>>;

    async fn list_companies(&self) -> Result<Vec<Company>>;

    async fn company(&self, id: u64) -> Result<Option<Company>>;

    /// Expire active postings posted before `before`; returns how many changed.
    async fn mark_expired(&self, before: DateTime<Utc>) -> Result<usize>;
}

/// Session persistence. Status changes go through [`SessionStore::transition`],
/// which validates against the stored status.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: &Session) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Option<Session>>;

    /// Move a stored session to `next`, returning the updated session.
    async fn transition(&self, id: Uuid, next: SessionStatus) -> Result<Session>;

    async fn record_counters(&self, id: Uuid, counters: SessionCounters) -> Result<()>;

    async fn append_error(&self, id: Uuid, error: SessionError) -> Result<()>;

    async fn append_log(&self, id: Uuid, entry: SessionLog) -> Result<()>;

    /// Sessions ordered by creation time.
    async fn list(&self) -> Result<Vec<Session>>;

    /// Delete sessions created before `cutoff`; returns how many were removed.
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize>;

    async fn status(&self, id: Uuid) -> Result<Option<SessionStatus>> {
        Ok(self.get(id).await?.map(|s| s.status))
    }
}
