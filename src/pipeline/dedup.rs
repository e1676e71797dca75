// src/pipeline/dedup.rs

//! Store-wide deduplication of near-identical postings.
//!
//! Postings are ordered by (title, company, discovery time) and scanned with a
//! single canonical pointer. A posting matching the canonical one is merged
//! into it; the pointer moves only when no merge happened. The whole pass is
//! handed to the store as one [`JobStore::apply_merges`] call, so passes
//! racing on the same store skip postings the other already absorbed.

use std::collections::HashMap;
use std::sync::Arc;

use similar::TextDiff;

use crate::error::Result;
use crate::models::Job;
use crate::storage::JobStore;

/// Merges duplicate postings across the whole store.
#[derive(Clone)]
pub struct Deduplicator {
    store: Arc<dyn JobStore>,
    threshold: f64,
}

impl Deduplicator {
    pub fn new(store: Arc<dyn JobStore>, threshold: f64) -> Self {
        Self { store, threshold }
    }

    /// Run one pass; returns the number of postings removed.
    pub async fn run(&self) -> Result<usize> {
        let companies: HashMap<u64, String> = self
            .store
            .list_companies()
            .await?
            .into_iter()
            .map(|c| (c.id, c.name.to_lowercase()))
            .collect();
        let company_of = |job: &Job| companies.get(&job.company_id).cloned().unwrap_or_default();

        let mut jobs = self.store.list_jobs().await?;
        jobs.sort_by(|a, b| {
            (a.title.to_lowercase(), company_of(a), a.discovered_at, a.id).cmp(&(
                b.title.to_lowercase(),
                company_of(b),
                b.discovered_at,
                b.id,
            ))
        });

        let mut jobs = jobs.into_iter();
        let Some(mut canonical) = jobs.next() else {
            return Ok(0);
        };
        let mut changed = false;
        let mut merged = Vec::new();
        let mut absorbed = Vec::new();

        for job in jobs {
            if self.is_duplicate(&canonical, &company_of(&canonical), &job, &company_of(&job)) {
                log::debug!(
                    "merging job {} '{}' into {}",
                    job.id,
                    job.title,
                    canonical.id
                );
                changed |= merge_into(&mut canonical, &job);
                absorbed.push(job.id);
            } else {
                let previous = std::mem::replace(&mut canonical, job);
                if changed {
                    merged.push(previous);
                }
                changed = false;
            }
        }
        if changed {
            merged.push(canonical);
        }
        if absorbed.is_empty() {
            return Ok(0);
        }

        let removed = self.store.apply_merges(&merged, &absorbed).await?;
        if removed > 0 {
            log::info!("Deduplication removed {} postings", removed);
        }
        Ok(removed)
    }

    fn is_duplicate(&self, a: &Job, a_company: &str, b: &Job, b_company: &str) -> bool {
        if a_company != b_company {
            return false;
        }
        let (a_title, b_title) = (a.title.to_lowercase(), b.title.to_lowercase());
        a_title == b_title || title_similarity(&a_title, &b_title) > self.threshold
    }
}

/// Matching-blocks ratio `2 * M / T` of two titles, in `[0, 1]`.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    f64::from(TextDiff::from_chars(a, b).ratio())
}

/// Fill blank fields of `canonical` from `duplicate`; returns whether anything changed.
///
/// The description is replaced only by a strictly longer one.
pub fn merge_into(canonical: &mut Job, duplicate: &Job) -> bool {
    let mut changed = false;

    if duplicate.description.len() > canonical.description.len() {
        canonical.description = duplicate.description.clone();
        changed = true;
    }
    if canonical.location.trim().is_empty() && !duplicate.location.trim().is_empty() {
        canonical.location = duplicate.location.clone();
        changed = true;
    }

    match (&mut canonical.salary, &duplicate.salary) {
        (None, Some(salary)) => {
            canonical.salary = Some(salary.clone());
            changed = true;
        }
        (Some(own), Some(other)) => {
            if own.min.is_none() && other.min.is_some() {
                own.min = other.min;
                changed = true;
            }
            if own.max.is_none() && other.max.is_some() {
                own.max = other.max;
                changed = true;
            }
        }
        _ => {}
    }

    if canonical.employment_type.is_none() && duplicate.employment_type.is_some() {
        canonical.employment_type = duplicate.employment_type;
        changed = true;
    }
    if canonical.experience_level.is_none() && duplicate.experience_level.is_some() {
        canonical.experience_level = duplicate.experience_level;
        changed = true;
    }
    if canonical.posted_date.is_none() && duplicate.posted_date.is_some() {
        canonical.posted_date = duplicate.posted_date;
        changed = true;
    }
    if !canonical.remote && duplicate.remote {
        canonical.remote = true;
        changed = true;
    }
    changed
}
