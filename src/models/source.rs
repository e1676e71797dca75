// src/models/source.rs

//! Job source identities and their configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Stable identifier of an external job source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    #[serde(rename = "linkedin")]
    LinkedIn,
    Indeed,
    Glassdoor,
    #[serde(rename = "remoteok")]
    RemoteOk,
    #[serde(rename = "brightermonday")]
    BrighterMonday,
    Fuzu,
    Adzuna,
    Jobright,
}

impl SourceId {
    pub const ALL: [SourceId; 8] = [
        SourceId::LinkedIn,
        SourceId::Indeed,
        SourceId::Glassdoor,
        SourceId::RemoteOk,
        SourceId::BrighterMonday,
        SourceId::Fuzu,
        SourceId::Adzuna,
        SourceId::Jobright,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LinkedIn => "linkedin",
            Self::Indeed => "indeed",
            Self::Glassdoor => "glassdoor",
            Self::RemoteOk => "remoteok",
            Self::BrighterMonday => "brightermonday",
            Self::Fuzu => "fuzu",
            Self::Adzuna => "adzuna",
            Self::Jobright => "jobright",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == key)
            .ok_or_else(|| AppError::validation(format!("unknown source id '{s}'")))
    }
}

/// Geographic region that may call for a specialized adapter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    Kenya,
}

impl Region {
    /// Detect a region from a free-text location.
    pub fn detect(location: &str) -> Option<Self> {
        let location = location.to_lowercase();
        if location.contains("kenya") {
            return Some(Self::Kenya);
        }
        None
    }

    /// Adzuna country code serving this region.
    pub fn country_code(&self) -> &'static str {
        match self {
            Self::Kenya => "ke",
        }
    }
}

/// CSS selectors and paging rules for an HTML listing page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoardSelectors {
    /// Search path relative to the source base URL; `{query}` and `{location}` are substituted
    pub search_path: String,

    /// Selector for each posting card in the listing
    pub row_selector: String,

    pub title_selector: String,

    pub company_selector: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_selector: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_selector: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_selector: Option<String>,

    /// Selector for the link element; falls back to the title element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_selector: Option<String>,

    /// HTML attribute for link extraction
    #[serde(default = "default_attr_name")]
    pub attr_name: String,

    /// Query parameter carrying the page offset
    #[serde(default = "default_page_param")]
    pub page_param: String,

    /// Increment applied to `page_param` per page (1 for page numbers, 25 for result offsets)
    #[serde(default = "default_page_step")]
    pub page_step: usize,

    /// Value of `page_param` for the first page
    #[serde(default)]
    pub first_page: usize,
}

fn default_attr_name() -> String {
    "href".to_string()
}

fn default_page_param() -> String {
    "page".to_string()
}

fn default_page_step() -> usize {
    1
}

impl BoardSelectors {
    /// Generic selectors for card-based job listings.
    pub fn generic(search_path: impl Into<String>) -> Self {
        Self {
            search_path: search_path.into(),
            row_selector: ".job-card, [data-testid='job-card'], .job-listing".to_string(),
            title_selector: ".job-title, h3, h2".to_string(),
            company_selector: ".company-name, .company, .employer".to_string(),
            location_selector: Some(".job-location, .location".to_string()),
            description_selector: Some(".job-description, .description, .summary".to_string()),
            salary_selector: Some(".salary, .compensation, .pay".to_string()),
            link_selector: Some("a".to_string()),
            attr_name: default_attr_name(),
            page_param: default_page_param(),
            page_step: default_page_step(),
            first_page: 1,
        }
    }
}

/// A configured source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceConfig {
    pub id: SourceId,

    /// Display name; not used for adapter lookup
    pub name: String,

    pub base_url: String,

    #[serde(default = "default_active")]
    pub active: bool,

    /// Listing selectors for scraping-kind sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board: Option<BoardSelectors>,
}

fn default_active() -> bool {
    true
}

impl SourceConfig {
    pub fn new(id: SourceId, name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            base_url: base_url.into(),
            active: true,
            board: None,
        }
    }

    pub fn with_board(mut self, board: BoardSelectors) -> Self {
        self.board = Some(board);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_id_round_trips_through_str() {
        for id in SourceId::ALL {
            assert_eq!(id.as_str().parse::<SourceId>().unwrap(), id);
        }
        assert_eq!("RemoteOK".parse::<SourceId>().unwrap(), SourceId::RemoteOk);
        assert!("monster".parse::<SourceId>().is_err());
    }

    #[test]
    fn source_id_serde_matches_as_str() {
        let json = serde_json::to_string(&SourceId::BrighterMonday).unwrap();
        assert_eq!(json, "\"brightermonday\"");
    }

    #[test]
    fn region_detection() {
        assert_eq!(Region::detect("Nairobi, Kenya"), Some(Region::Kenya));
        assert_eq!(Region::detect("KENYA"), Some(Region::Kenya));
        assert_eq!(Region::detect("Berlin"), None);
        assert_eq!(Region::detect(""), None);
    }
}
