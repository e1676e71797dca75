//! Local filesystem storage implementation.
//!
//! Keeps the full store in memory behind a lock. A mutation is applied to a
//! draft copy, the affected JSON file is rewritten from the draft, and the
//! draft replaces the live state only once that write succeeded.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── companies.json
//! ├── jobs.json
//! └── sessions.json
//! ```

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{
    Company, CompanyDefaults, Job, JobDefaults, Session, SessionCounters, SessionError,
    SessionLog, SessionStatus,
};
use crate::storage::state::StoreState;
use crate::storage::{JobStore, SessionStore};

const COMPANIES_KEY: &str = "companies.json";
const JOBS_KEY: &str = "jobs.json";
const SESSIONS_KEY: &str = "sessions.json";

/// Local filesystem storage backend.
pub struct LocalStorage {
    root_dir: PathBuf,
    state: Mutex<StoreState>,
}

impl LocalStorage {
    /// Open the store rooted at the given directory, loading existing files.
    pub async fn open(root_dir: impl Into<PathBuf>) -> Result<Self> {
        let root_dir = root_dir.into();
        let companies: Vec<Company> = read_json(&root_dir, COMPANIES_KEY)
            .await?
            .unwrap_or_default();
        let jobs: Vec<Job> = read_json(&root_dir, JOBS_KEY).await?.unwrap_or_default();
        let sessions: Vec<Session> = read_json(&root_dir, SESSIONS_KEY)
            .await?
            .unwrap_or_default();

        log::debug!(
            "Loaded {} companies, {} jobs, {} sessions from {:?}",
            companies.len(),
            jobs.len(),
            sessions.len(),
            root_dir
        );

        Ok(Self {
            state: Mutex::new(StoreState::from_parts(companies, jobs, sessions)),
            root_dir,
        })
    }

    pub fn root_dir(&self) -> &PathBuf {
        &self.root_dir
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.root_dir.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    async fn persist(&self, file: StoreFile, state: &StoreState) -> Result<()> {
        match file {
            StoreFile::Companies => self.write_json(COMPANIES_KEY, &state.companies()).await,
            StoreFile::Jobs => self.write_json(JOBS_KEY, &state.jobs()).await,
            StoreFile::Sessions => self.write_json(SESSIONS_KEY, &state.sessions()).await,
        }
    }

    /// Run `change` against a draft of the state. When it reports a change,
    /// `file` is written from the draft before the draft is committed.
    async fn mutate<T, F>(&self, file: StoreFile, change: F) -> Result<T>
    where
        T: Send,
        F: FnOnce(&mut StoreState) -> Result<(T, bool)> + Send,
    {
        let mut state = self.state.lock().await;
        let mut draft = state.clone();
        let (value, changed) = change(&mut draft)?;
        if changed {
            self.persist(file, &draft).await?;
            *state = draft;
        }
        Ok(value)
    }
}

#[derive(Debug, Clone, Copy)]
enum StoreFile {
    Companies,
    Jobs,
    Sessions,
}

/// Read JSON data, returning None if the file doesn't exist.
async fn read_json<T: DeserializeOwned>(root: &PathBuf, key: &str) -> Result<Option<T>> {
    match tokio::fs::read(root.join(key)).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::Io(e)),
    }
}

#[async_trait]
impl JobStore for LocalStorage {
    async fn get_or_create_company(
        &self,
        name: &str,
        defaults: CompanyDefaults,
    ) -> Result<(Company, bool)> {
        self.mutate(StoreFile::Companies, |state| {
            let (company, created) = state.get_or_create_company(name, defaults);
            Ok(((company, created), created))
        })
        .await
    }

    async fn get_or_create_job(
        &self,
        title: &str,
        company: &Company,
        source_url: &str,
        defaults: JobDefaults,
    ) -> Result<(Job, bool)> {
        let company_id = company.id;
        self.mutate(StoreFile::Jobs, |state| {
            let (job, created) = state.get_or_create_job(title, company_id, source_url, defaults)?;
            Ok(((job, created), created))
        })
        .await
    }

    async fn touch_job(&self, id: u64) -> Result<Job> {
        self.mutate(StoreFile::Jobs, |state| Ok((state.touch_job(id)?, true)))
            .await
    }

    async fn apply_merges(&self, merged: &[Job], absorbed: &[u64]) -> Result<usize> {
        self.mutate(StoreFile::Jobs, |state| {
            let removed = state.apply_merges(merged, absorbed)?;
            Ok((removed, removed > 0 || !merged.is_empty()))
        })
        .await
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
        self.mutate(StoreFile::Jobs, |state| {
            let count = state.mark_expired(before);
            Ok((count, count > 0))
        })
        .await
    }
}

#[async_trait]
impl SessionStore for LocalStorage {
    async fn insert(&self, session: &Session) -> Result<()> {
        self.mutate(StoreFile::Sessions, |state| Ok((state.insert_session(session)?, true)))
            .await
    }

    async fn get(&self, id: Uuid) -> Result<Option<Session>> {
        Ok(self.state.lock().await.session(id))
    }

    async fn transition(&self, id: Uuid, next: SessionStatus) -> Result<Session> {
        self.mutate(StoreFile::Sessions, |state| {
            Ok((state.transition_session(id, next)?, true))
        })
        .await
    }

    async fn record_counters(&self, id: Uuid, counters: SessionCounters) -> Result<()> {
        self.mutate(StoreFile::Sessions, |state| {
            Ok((state.record_counters(id, counters)?, true))
        })
        .await
    }

    async fn append_error(&self, id: Uuid, error: SessionError) -> Result<()> {
        self.mutate(StoreFile::Sessions, |state| Ok((state.append_error(id, error)?, true)))
            .await
    }

    async fn append_log(&self, id: Uuid, entry: SessionLog) -> Result<()> {
        self.mutate(StoreFile::Sessions, |state| Ok((state.append_log(id, entry)?, true)))
            .await
    }

    async fn list(&self) -> Result<Vec<Session>> {
        Ok(self.state.lock().await.sessions())
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        self.mutate(StoreFile::Sessions, |state| {
            let count = state.delete_sessions_before(cutoff);
            Ok((count, count > 0))
        })
        .await
    }
}
