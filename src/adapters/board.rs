// src/adapters/board.rs

//! Generic HTML job-board scraper.
//!
//! Fetches listing pages using configured CSS selectors and walks the pages
//! until the budget is met, a page yields nothing new, or the attempt cap is hit.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::adapters::{AdapterKind, AdapterOutcome, SearchRequest, SourceAdapter};
use crate::error::{AppError, Result};
use crate::models::{BoardSelectors, HttpConfig, JobRecord, ScrapeConfig, SourceConfig};
use crate::utils::http::{HttpSession, LeaseTracker};
use crate::utils::text::{
    extract_salary, infer_employment_type, infer_experience_level, mentions_remote,
    normalize_whitespace,
};
use crate::utils::{fill_template, resolve_url};

/// Compiled selectors for one board.
struct ListingSelectors {
    row: Selector,
    title: Selector,
    company: Selector,
    location: Option<Selector>,
    description: Option<Selector>,
    salary: Option<Selector>,
    link: Option<Selector>,
}

impl ListingSelectors {
    fn compile(board: &BoardSelectors) -> Result<Self> {
        let optional = |s: &Option<String>| s.as_deref().map(parse_selector).transpose();
        Ok(Self {
            row: parse_selector(&board.row_selector)?,
            title: parse_selector(&board.title_selector)?,
            company: parse_selector(&board.company_selector)?,
            location: optional(&board.location_selector)?,
            description: optional(&board.description_selector)?,
            salary: optional(&board.salary_selector)?,
            link: optional(&board.link_selector)?,
        })
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

fn first_text(row: &ElementRef, selector: Option<&Selector>) -> String {
    selector
        .and_then(|sel| row.select(sel).next())
        .map(|el| normalize_whitespace(&el.text().collect::<String>()))
        .unwrap_or_default()
}

/// Parse one listing page into records.
fn parse_listing(
    html: &str,
    selectors: &ListingSelectors,
    attr_name: &str,
    page_url: &Url,
) -> Vec<JobRecord> {
    let document = Html::parse_document(html);
    let mut records = Vec::new();

    for row in document.select(&selectors.row) {
        let title = first_text(&row, Some(&selectors.title));
        let company_name = first_text(&row, Some(&selectors.company));
        if title.is_empty() || company_name.is_empty() {
            continue;
        }
        let location = first_text(&row, selectors.location.as_ref());
        let description = first_text(&row, selectors.description.as_ref());
        let salary_text = first_text(&row, selectors.salary.as_ref());

        let raw_link = selectors
            .link
            .as_ref()
            .and_then(|sel| row.select(sel).next())
            .or_else(|| row.select(&selectors.title).next())
            .and_then(|el| el.value().attr(attr_name))
            .unwrap_or("");
        let source_url = if raw_link.is_empty() {
            // No link on the card; key the posting by its listing page.
            let mut url = page_url.clone();
            url.set_fragment(Some(&format!("{}-{}", title, company_name)));
            url.to_string()
        } else {
            resolve_url(page_url, raw_link)
        };

        let blob = format!("{} {} {}", title, location, description);
        records.push(JobRecord {
            salary: extract_salary(&salary_text),
            employment_type: infer_employment_type(&description),
            experience_level: infer_experience_level(&title),
            remote: mentions_remote(&blob),
            title,
            company_name,
            location,
            description,
            source_url,
            posted_date: None,
        });
    }
    records
}

/// Source of listing pages, addressed by page number.
#[async_trait]
trait ListingPages: Send + Sync {
    async fn page(&self, number: usize) -> Result<String>;
}

/// Pages fetched over an HTTP session; dropping it releases the session.
struct SessionPages {
    session: HttpSession,
    url: String,
    param: String,
}

#[async_trait]
impl ListingPages for SessionPages {
    async fn page(&self, number: usize) -> Result<String> {
        self.session
            .get_text(&self.url, &[(self.param.as_str(), number.to_string())])
            .await
    }
}

/// CSS-selector scraper for one listing site.
pub struct BoardAdapter {
    name: String,
    base_url: String,
    board: BoardSelectors,
    http: HttpConfig,
    scrape: ScrapeConfig,
    leases: LeaseTracker,
}

impl BoardAdapter {
    /// Build a scraper for a source; `None` when the source has no board selectors.
    pub fn from_source(source: &SourceConfig, http: HttpConfig, scrape: ScrapeConfig) -> Option<Self> {
        let board = source.board.clone()?;
        Some(Self {
            name: source.id.as_str().to_string(),
            base_url: source.base_url.clone(),
            board,
            http,
            scrape,
            leases: LeaseTracker::new(),
        })
    }

    pub fn leases(&self) -> &LeaseTracker {
        &self.leases
    }

    fn listing_url(&self, request: &SearchRequest) -> Result<Url> {
        let base = Url::parse(&self.base_url)?;
        let path = fill_template(&self.board.search_path, &request.query, &request.location);
        Ok(base.join(&path)?)
    }

    async fn fetch(&self, request: &SearchRequest) -> Result<Vec<JobRecord>> {
        let selectors = ListingSelectors::compile(&self.board)?;
        let listing_url = self.listing_url(request)?;
        let pages = SessionPages {
            session: HttpSession::open(&self.http, &self.leases, &self.name)?,
            url: listing_url.to_string(),
            param: self.board.page_param.clone(),
        };
        self.walk(pages, &selectors, &listing_url, request.max_results)
            .await
    }

    /// Walk listing pages until `max_results` postings are collected, a page
    /// adds no new source URL, or the attempt cap is reached.
    ///
    /// Takes `pages` by value so it is released on every exit path.
    async fn walk<P: ListingPages>(
        &self,
        pages: P,
        selectors: &ListingSelectors,
        listing_url: &Url,
        max_results: usize,
    ) -> Result<Vec<JobRecord>> {
        let delay = Duration::from_millis(self.scrape.page_delay_ms);
        let mut seen = HashSet::new();
        let mut records = Vec::new();

        for attempt in 0..self.scrape.max_scroll_attempts.max(1) {
            if records.len() >= max_results {
                break;
            }
            let page = self.board.first_page + attempt * self.board.page_step;
            let html = match pages.page(page).await {
                Ok(html) => html,
                Err(e) if attempt == 0 => return Err(e),
                Err(e) => {
                    log::warn!("{}: stopping at page {}: {}", self.name, page, e);
                    break;
                }
            };

            let before = records.len();
            for record in parse_listing(&html, selectors, &self.board.attr_name, listing_url) {
                if records.len() >= max_results {
                    break;
                }
                if seen.insert(record.source_url.clone()) {
                    records.push(record);
                }
            }
            log::debug!(
                "{}: page {} yielded {} new postings",
                self.name,
                page,
                records.len() - before
            );
            if records.len() == before {
                break;
            }

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        Ok(records)
    }
}

#[async_trait]
impl SourceAdapter for BoardAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Scraper
    }

    async fn search(&self, request: &SearchRequest) -> AdapterOutcome {
        AdapterOutcome::from_result(self.fetch(request).await)
    }
}
