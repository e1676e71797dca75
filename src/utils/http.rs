// src/utils/http.rs

//! HTTP client utilities.
//!
//! Adapters open an [`HttpSession`] for the duration of one search. The session
//! holds a lease on its adapter's [`LeaseTracker`] which is returned on drop,
//! so every exit path (records, empty result, or error) releases it.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rand::seq::SliceRandom;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{AppError, Result};
use crate::models::{ErrorKind, HttpConfig};

const ACCEPT_LANGUAGES: [&str; 3] = ["en-US,en;q=0.9", "en-GB,en;q=0.8", "en;q=0.7"];

/// Counts open sessions for one adapter.
#[derive(Debug, Clone, Default)]
pub struct LeaseTracker {
    open: Arc<AtomicUsize>,
}

impl LeaseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions currently open.
    pub fn open(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    fn acquire(&self) -> Lease {
        self.open.fetch_add(1, Ordering::SeqCst);
        Lease {
            open: Arc::clone(&self.open),
        }
    }
}

#[derive(Debug)]
struct Lease {
    open: Arc<AtomicUsize>,
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A scoped HTTP session with a randomized identity.
#[derive(Debug)]
pub struct HttpSession {
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
    label: String,
    _lease: Lease,
}

impl HttpSession {
    /// Open a session; it is released when dropped.
    pub fn open(config: &HttpConfig, tracker: &LeaseTracker, label: &str) -> Result<Self> {
        let client = create_async_client(config)?;
        log::debug!("{}: HTTP session opened", label);
        Ok(Self {
            client,
            max_retries: config.max_retries.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            label: label.to_string(),
            _lease: tracker.acquire(),
        })
    }

    /// GET with the transport retry budget.
    ///
    /// Blocked and not-found responses are not retried.
    pub async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<reqwest::Response> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self
                .client
                .get(url)
                .query(query)
                .send()
                .await
                .and_then(|r| r.error_for_status());

            match result {
                Ok(response) => return Ok(response),
                Err(e) => {
                    let kind = classify(&e);
                    let retryable = !matches!(kind, ErrorKind::Blocked | ErrorKind::NotFound);
                    if !retryable || attempt >= self.max_retries {
                        return Err(AppError::Http(e));
                    }
                    log::warn!(
                        "{}: attempt {} failed for {}: {}",
                        self.label,
                        attempt,
                        url,
                        e
                    );
                    if !self.retry_delay.is_zero() {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }
    }

    /// Fetch a page body as text.
    pub async fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String> {
        Ok(self.get(url, query).await?.text().await?)
    }

    /// Fetch and decode a JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let body = self.get(url, query).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

impl Drop for HttpSession {
    fn drop(&mut self) {
        log::debug!("{}: HTTP session released", self.label);
    }
}

/// Pick a user agent from the configured pool.
pub fn random_user_agent(config: &HttpConfig) -> String {
    let candidates: Vec<&String> = config
        .user_agents
        .iter()
        .filter(|ua| !ua.trim().is_empty())
        .collect();
    candidates
        .choose(&mut rand::thread_rng())
        .map(|ua| ua.to_string())
        .unwrap_or_else(|| format!("job-aggregator/{}", env!("CARGO_PKG_VERSION")))
}

/// Randomized identity headers for one session.
pub fn identity_headers(config: &HttpConfig) -> HeaderMap {
    let mut rng = rand::thread_rng();
    let mut headers = HeaderMap::new();
    if let Ok(ua) = HeaderValue::from_str(&random_user_agent(config)) {
        headers.insert(USER_AGENT, ua);
    }
    if let Some(lang) = ACCEPT_LANGUAGES.choose(&mut rng) {
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(*lang));
    }
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/json;q=0.9,*/*;q=0.8"),
    );
    headers
}

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &HttpConfig) -> Result<Client> {
    let client = Client::builder()
        .default_headers(identity_headers(config))
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Classify a transport error into the session error taxonomy.
pub fn classify(error: &reqwest::Error) -> ErrorKind {
    if error.is_timeout() {
        return ErrorKind::Timeout;
    }
    if let Some(status) = error.status() {
        return classify_status(status);
    }
    if error.is_decode() {
        return ErrorKind::Parsing;
    }
    ErrorKind::Network
}

/// Classify an HTTP status code.
pub fn classify_status(status: StatusCode) -> ErrorKind {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
            ErrorKind::Blocked
        }
        StatusCode::NOT_FOUND | StatusCode::GONE => ErrorKind::NotFound,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ErrorKind::Timeout,
        _ => ErrorKind::Network,
    }
}
