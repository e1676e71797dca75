// src/storage/flaky.rs

//! Job store wrapper that injects failures, for pipeline tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{Company, CompanyDefaults, Job, JobDefaults};
use crate::storage::{JobStore, MemoryStorage};

#[derive(Default)]
pub(crate) struct FlakyStore {
    inner: MemoryStorage,
    poison_title: Option<&'static str>,
    list_failures: AtomicUsize,
}

impl FlakyStore {
    /// Refuses to create jobs with this exact title.
    pub(crate) fn poisoned(title: &'static str) -> Self {
        Self {
            poison_title: Some(title),
            ..Self::default()
        }
    }

    /// Fails the next `count` calls to `list_jobs`.
    pub(crate) fn failing_lists(count: usize) -> Self {
        Self {
            list_failures: AtomicUsize::new(count),
            ..Self::default()
        }
    }
}

#[async_trait]
impl JobStore for FlakyStore {
    async fn get_or_create_company(
        &self,
        name: &str,
        defaults: CompanyDefaults,
    ) -> Result<(Company, bool)> {
        self.inner.get_or_create_company(name, defaults).await
    }

    async fn get_or_create_job(
        &self,
        title: &str,
        company: &Company,
        source_url: &str,
        defaults: JobDefaults,
    ) -> Result<(Job, bool)> {
        if self.poison_title == Some(title) {
            return Err(AppError::store("constraint violated"));
        }
        self.inner
            .get_or_create_job(title, company, source_url, defaults)
            .await
    }

    async fn touch_job(&self, id: u64) -> Result<Job> {
        self.inner.touch_job(id).await
    }

    async fn apply_merges(&self, merged: &[Job], absorbed: &[u64]) -> Result<usize> {
        self.inner.apply_merges(merged, absorbed).await
    }

    async fn list_jobs(&self) -> Result<Vec<Job>> {
        let remaining = self
            .list_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if remaining.is_ok() {
            return Err(AppError::store("listing unavailable"));
        }
        self.inner.list_jobs().await
    }

    async fn list_companies(&self) -> Result<Vec<Company>> {
        self.inner.list_companies().await
    }

    async fn company(&self, id: u64) -> Result<Option<Company>> {
        self.inner.company(id).await
    }

    async fn mark_expired(&self, before: DateTime<Utc>) -> Result<usize> {
        self.inner.mark_expired(before).await
    }
}
