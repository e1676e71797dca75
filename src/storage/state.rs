// src/storage/state.rs

//! Indexed store contents shared by the storage backends.
//!
//! Backends hold this behind a lock, so every operation here is atomic with
//! respect to the company-name and job-key uniqueness rules.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{
    Company, CompanyDefaults, Job, JobDefaults, JobStatus, Session, SessionCounters,
    SessionError, SessionLog, SessionStatus, job_key,
};

#[derive(Debug, Clone, Default)]
pub(crate) struct StoreState {
    companies: BTreeMap<u64, Company>,
    company_names: HashMap<String, u64>,
    jobs: BTreeMap<u64, Job>,
    job_keys: HashMap<String, u64>,
    sessions: HashMap<Uuid, Session>,
    next_company_id: u64,
    next_job_id: u64,
}

impl StoreState {
    pub(crate) fn from_parts(companies: Vec<Company>, jobs: Vec<Job>, sessions: Vec<Session>) -> Self {
        let mut state = Self::default();
        for company in companies {
            state.company_names.insert(company.name.clone(), company.id);
            state.companies.insert(company.id, company);
        }
        for job in jobs {
            state.job_keys.insert(job.key(), job.id);
            state.jobs.insert(job.id, job);
        }
        state.sessions = sessions.into_iter().map(|s| (s.id, s)).collect();
        state.next_company_id = state.companies.keys().next_back().map_or(0, |last| *last);
        state.next_job_id = state.jobs.keys().next_back().map_or(0, |last| *last);
        state
    }

    pub(crate) fn companies(&self) -> Vec<Company> {
        self.companies.values().cloned().collect()
    }

    pub(crate) fn jobs(&self) -> Vec<Job> {
        self.jobs.values().cloned().collect()
    }

    /// Sessions ordered by creation time.
    pub(crate) fn sessions(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self.sessions.values().cloned().collect();
        sessions.sort_by_key(|s| s.created_at);
        sessions
    }

    pub(crate) fn company(&self, id: u64) -> Option<Company> {
        self.companies.get(&id).cloned()
    }

    pub(crate) fn get_or_create_company(
        &mut self,
        name: &str,
        defaults: CompanyDefaults,
    ) -> (Company, bool) {
        if let Some(company) = self
            .company_names
            .get(name)
            .and_then(|id| self.companies.get(id))
        {
            return (company.clone(), false);
        }

        self.next_company_id += 1;
        let id = self.next_company_id;
        let company = Company {
            id,
            name: name.to_string(),
            website: defaults.website,
            location: defaults.location,
            industry: defaults.industry,
            created_at: Utc::now(),
        };
        self.company_names.insert(company.name.clone(), id);
        self.companies.insert(id, company.clone());
        (company, true)
    }

    pub(crate) fn get_or_create_job(
        &mut self,
        title: &str,
        company_id: u64,
        source_url: &str,
        defaults: JobDefaults,
    ) -> Result<(Job, bool)> {
        if !self.companies.contains_key(&company_id) {
            return Err(AppError::store(format!("company {company_id} not found")));
        }
        let key = job_key(title, company_id, source_url);
        if let Some(job) = self.job_keys.get(&key).and_then(|id| self.jobs.get(id)) {
            return Ok((job.clone(), false));
        }

        // Ids are never reused, also after deletes.
        self.next_job_id += 1;
        let id = self.next_job_id;
        let job = Job::create(id, title, company_id, source_url, defaults);
        self.job_keys.insert(key, id);
        self.jobs.insert(id, job.clone());
        Ok((job, true))
    }

    pub(crate) fn touch_job(&mut self, id: u64) -> Result<Job> {
        let job = self
            .jobs
            .get_mut(&id)
            .ok_or_else(|| AppError::store(format!("job {id} not found")))?;
        job.updated_at = Utc::now();
        Ok(job.clone())
    }

    fn update_job(&mut self, job: &Job) -> Result<()> {
        let previous = self
            .jobs
            .get(&job.id)
            .ok_or_else(|| AppError::store(format!("job {} not found", job.id)))?;

        let old_key = previous.key();
        let new_key = job.key();
        if old_key != new_key {
            if self.job_keys.contains_key(&new_key) {
                return Err(AppError::store(format!(
                    "job {} would collide with an existing posting",
                    job.id
                )));
            }
            self.job_keys.remove(&old_key);
            self.job_keys.insert(new_key, job.id);
        }

        let mut job = job.clone();
        job.updated_at = Utc::now();
        self.jobs.insert(job.id, job);
        Ok(())
    }

    /// Delete the `absorbed` postings and store the `merged` canonical ones.
    ///
    /// Ids that no longer exist were already merged by another pass and are
    /// skipped. Returns how many postings were deleted.
    pub(crate) fn apply_merges(&mut self, merged: &[Job], absorbed: &[u64]) -> Result<usize> {
        let mut removed = 0;
        for id in absorbed {
            if let Some(job) = self.jobs.remove(id) {
                self.job_keys.remove(&job.key());
                removed += 1;
            }
        }
        for job in merged {
            if self.jobs.contains_key(&job.id) {
                self.update_job(job)?;
            }
        }
        Ok(removed)
    }

    /// Mark active postings whose posted date is before `before` as expired.
    pub(crate) fn mark_expired(&mut self, before: DateTime<Utc>) -> usize {
        let now = Utc::now();
        let mut count = 0;
        for job in self.jobs.values_mut() {
            let stale = job.posted_date.is_some_and(|posted| posted < before);
            if job.status == JobStatus::Active && stale {
                job.status = JobStatus::Expired;
                job.updated_at = now;
                count += 1;
            }
        }
        count
    }

    pub(crate) fn insert_session(&mut self, session: &Session) -> Result<()> {
        if self.sessions.contains_key(&session.id) {
            return Err(AppError::store(format!("session {} already exists", session.id)));
        }
        self.sessions.insert(session.id, session.clone());
        Ok(())
    }

    pub(crate) fn session(&self, id: Uuid) -> Option<Session> {
        self.sessions.get(&id).cloned()
    }

    fn session_mut(&mut self, id: Uuid) -> Result<&mut Session> {
        self.sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::SessionNotFound(id.to_string()))
    }

    pub(crate) fn transition_session(&mut self, id: Uuid, next: SessionStatus) -> Result<Session> {
        let session = self.session_mut(id)?;
        session.transition(next)?;
        Ok(session.clone())
    }

    pub(crate) fn record_counters(&mut self, id: Uuid, counters: SessionCounters) -> Result<()> {
        self.session_mut(id)?.counters = counters;
        Ok(())
    }

    pub(crate) fn append_error(&mut self, id: Uuid, error: SessionError) -> Result<()> {
        self.session_mut(id)?.errors.push(error);
        Ok(())
    }

    pub(crate) fn append_log(&mut self, id: Uuid, entry: SessionLog) -> Result<()> {
        self.session_mut(id)?.logs.push(entry);
        Ok(())
    }

    /// Drop sessions created before `cutoff`, with their errors and logs.
    pub(crate) fn delete_sessions_before(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.created_at >= cutoff);
        before - self.sessions.len()
    }
}
