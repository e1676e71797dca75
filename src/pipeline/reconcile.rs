// src/pipeline/reconcile.rs

//! Record reconciliation: upsert normalized records into the company/job store.

use std::sync::Arc;

use crate::error::Result;
use crate::models::{CompanyDefaults, Job, JobDefaults, JobRecord, SourceId};
use crate::storage::JobStore;

/// Whether reconciliation created a posting or refreshed an existing one.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciled {
    Created(Job),
    Updated(Job),
}

impl Reconciled {
    pub fn job(&self) -> &Job {
        match self {
            Self::Created(job) | Self::Updated(job) => job,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Upserts records into a [`JobStore`].
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn JobStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Resolve the company by exact name, then upsert the job by (title, company, source URL).
    pub async fn reconcile(&self, record: &JobRecord, source: SourceId) -> Result<Reconciled> {
        let company_defaults = CompanyDefaults {
            location: record.location.clone(),
            ..CompanyDefaults::default()
        };
        let (company, _) = self
            .store
            .get_or_create_company(&record.company_name, company_defaults)
            .await?;

        let (job, created) = self
            .store
            .get_or_create_job(
                &record.title,
                &company,
                &record.source_url,
                JobDefaults::from_record(record, source),
            )
            .await?;

        if created {
            log::debug!("created job {} '{}' at {}", job.id, job.title, company.name);
            return Ok(Reconciled::Created(job));
        }
        let job = self.store.touch_job(job.id).await?;
        Ok(Reconciled::Updated(job))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobStatus;
    use crate::storage::MemoryStorage;

    fn record() -> JobRecord {
        JobRecord {
            source_url: "https://board.example/1".into(),
            location: "Nairobi".into(),
            ..JobRecord::new("Data Analyst", "Acme")
        }
    }

    #[tokio::test]
    async fn same_record_twice_creates_then_updates() {
        let store = Arc::new(MemoryStorage::new());
        let reconciler = Reconciler::new(store.clone());

        let first = reconciler.reconcile(&record(), SourceId::Fuzu).await.unwrap();
        assert!(first.is_created());
        assert_eq!(first.job().status, JobStatus::Active);

        let second = reconciler.reconcile(&record(), SourceId::Fuzu).await.unwrap();
        assert!(!second.is_created());
        assert_eq!(second.job().id, first.job().id);
        assert!(second.job().updated_at >= first.job().updated_at);

        assert_eq!(store.list_jobs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn existing_company_is_reused() {
        let store = Arc::new(MemoryStorage::new());
        let reconciler = Reconciler::new(store.clone());

        reconciler.reconcile(&record(), SourceId::Fuzu).await.unwrap();
        let other = JobRecord {
            source_url: "https://board.example/2".into(),
            ..JobRecord::new("Data Engineer", "Acme")
        };
        reconciler.reconcile(&other, SourceId::Indeed).await.unwrap();

        let companies = store.list_companies().await.unwrap();
        assert_eq!(companies.len(), 1);
        assert_eq!(companies[0].location, "Nairobi");
        assert_eq!(store.list_jobs().await.unwrap().len(), 2);
    }
}
