// src/adapters/placeholder.rs

//! Marked placeholder postings for sources where every adapter came back empty.

use crate::adapters::SearchRequest;
use crate::models::{
    JobRecord, PLACEHOLDER_DESCRIPTION_MARKER, PLACEHOLDER_TITLE_MARKER, SourceId,
};

/// Synthesizes a bounded number of clearly non-real postings.
#[derive(Debug, Clone)]
pub struct PlaceholderGenerator {
    limit: usize,
}

impl PlaceholderGenerator {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    /// At most `min(limit, max_results)` records, each marked in title, description and URL.
    pub fn generate(&self, source: SourceId, request: &SearchRequest) -> Vec<JobRecord> {
        let count = self.limit.min(request.max_results);
        let slug: String = request
            .query
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-");
        let location = if request.location.is_empty() {
            "Unspecified".to_string()
        } else {
            request.location.clone()
        };

        (1..=count)
            .map(|i| JobRecord {
                title: format!("{} {} #{}", PLACEHOLDER_TITLE_MARKER, request.query, i),
                company_name: format!("Placeholder Employer {} ({})", i, source),
                location: location.clone(),
                description: format!(
                    "{} Generated because no live result was available from {} for '{}'.",
                    PLACEHOLDER_DESCRIPTION_MARKER, source, request.query
                ),
                source_url: format!("placeholder://{}/PLACEHOLDER-{}-{}", source, slug, i),
                ..JobRecord::default()
            })
            .collect()
    }
}
