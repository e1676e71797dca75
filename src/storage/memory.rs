//! In-memory storage backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Company, CompanyDefaults, Job, JobDefaults, Session, SessionCounters, SessionError,
    SessionLog, SessionStatus,
};
use crate::storage::state::StoreState;
use crate::storage::{JobStore, SessionStore};

/// Process-local store; contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: Mutex<StoreState>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryStorage {
    async fn get_or_create_company(
        &self,
        name: &str,
        defaults: CompanyDefaults,
    ) -> Result<(Company, bool)> {
        Ok(self.state.lock().await.get_or_create_company(name, defaults))
    }

    async fn get_or_create_job(
        &self,
        title: &str,
        company: &Company,
        source_url: &str,
        defaults: JobDefaults,
    ) -> Result<(Job, bool)> {
        self.state
            .lock()
            .await
            .get_or_create_job(title, company.id, source_url, defaults)
    }

    async fn touch_job(&self, id: u64) -> Result<Job> {
        self.state.lock().await.touch_job(id)
    }

    async fn apply_merges(&self, merged: &[Job], absorbed: &[u64]) -> Result<usize> {
        let mut state = self.state.lock().await;
        let mut draft = state.clone();
        let removed = draft.apply_merges(merged, absorbed)?;
        *state = draft;
        Ok(removed)
    }

    async fn list_jobs(&self) -> Result<Vec<Job>> {
        Ok(self.state.lock().await.jobs())
    }

    async fn list_companies(&self) -> Result<Vec<Company>> {
        Ok(self.state.lock().await.companies())
    }

    async fn company(&self, id: u64) -> Result<Option<Company>> {
        Ok(self.state.lock().await.company(id))
    }

    async fn mark_expired(&self, before: DateTime<Utc>) -> Result<usize> {
        Ok(self.state.lock().await.mark_expired(before))
    }
}

#[async_trait]
impl SessionStore for MemoryStorage {
    async fn insert(&self, session: &Session) -> Result<()> {
        self.state.lock().await.insert_session(session)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Session>> {
        Ok(self.state.lock().await.session(id))
    }

    async fn transition(&self, id: Uuid, next: SessionStatus) -> Result<Session> {
        self.state.lock().await.transition_session(id, next)
    }

    async fn record_counters(&self, id: Uuid, counters: SessionCounters) -> Result<()> {
        self.state.lock().await.record_counters(id, counters)
    }

    async fn append_error(&self, id: Uuid, error: SessionError) -> Result<()> {
        self.state.lock().await.append_error(id, error)
    }

    async fn append_log(&self, id: Uuid, entry: SessionLog) -> Result<()> {
        self.state.lock().await.append_log(id, entry)
    }

    async fn list(&self) -> Result<Vec<Session>> {
        Ok(self.state.lock().await.sessions())
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        Ok(self.state.lock().await.delete_sessions_before(cutoff))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::{JobRecord, SourceId};

    #[tokio::test]
    async fn concurrent_upserts_create_one_job() {
        let store = Arc::new(MemoryStorage::new());
        let (company, _) = store
            .get_or_create_company("Acme", CompanyDefaults::default())
            .await
            .unwrap();

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                let company = company.clone();
                tokio::spawn(async move {
                    let defaults =
                        JobDefaults::from_record(&JobRecord::new("Analyst", "Acme"), SourceId::Fuzu);
                    store
                        .get_or_create_job("Analyst", &company, "https://x/1", defaults)
                        .await
                        .unwrap()
                        .1
                })
            })
            .collect();

        let mut created = 0;
        for task in tasks {
            if task.await.unwrap() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(store.list_jobs().await.unwrap().len(), 1);
    }
}
