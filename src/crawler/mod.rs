pub mod cache;
pub mod extractor;

#[cfg(test)]
mod tests;

use std::collections::HashSet;
use std::fmt;
use std::ops::ControlFlow;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, warn};
use ureq::Agent;
use url::Url;

use self::cache::ContentCache;
use self::extractor::extract_text;
use crate::config::FetchConfig;
use crate::progress::step_bar;

pub(crate) const FAILED_STATUS_MESSAGE: &str = "Failed to retrieve the webpage";
pub(crate) const TRANSPORT_ERROR_PREFIX: &str = "Error fetching page: ";

/// Why a page could not be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// The server answered with a non-success status
    Status(u16),
    /// The request never produced a usable response
    Transport(String),
}

impl fmt::Display for FetchFailure {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(_) => f.write_str(FAILED_STATUS_MESSAGE),
            Self::Transport(message) => write!(f, "{}{}", TRANSPORT_ERROR_PREFIX, message),
        }
    }
}

/// Result of fetching one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Fetched(String),
    Failed(FetchFailure),
}

/// Blocking HTTP client for documentation pages
#[derive(Debug)]
pub struct HttpClient {
    agent: Agent,
}

impl HttpClient {
    #[inline]
    pub fn new(config: &FetchConfig) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .into();

        Self { agent }
    }

    /// Perform a single HTTP GET request and return the response body
    #[inline]
    pub fn get(&self, url: &str) -> Result<String, FetchFailure> {
        if let Err(e) = validate_url(url) {
            return Err(FetchFailure::Transport(e.to_string()));
        }

        debug!("Making HTTP GET request to: {}", url);
        match self.agent.get(url).call() {
            Ok(mut response) => {
                let text = response
                    .body_mut()
                    .read_to_string()
                    .map_err(|e| FetchFailure::Transport(e.to_string()))?;
                debug!("Successfully read {} bytes from {}", text.len(), url);
                Ok(text)
            }
            Err(ureq::Error::StatusCode(code)) => {
                debug!("HTTP request failed with status {}: {}", code, url);
                Err(FetchFailure::Status(code))
            }
            Err(e) => {
                debug!("HTTP request failed with transport error: {}", e);
                Err(FetchFailure::Transport(e.to_string()))
            }
        }
    }
}

impl Default for HttpClient {
    #[inline]
    fn default() -> Self {
        Self::new(&FetchConfig::default())
    }
}

/// Validate and normalize a URL
#[inline]
pub fn validate_url(url_str: &str) -> Result<Url> {
    let url = Url::parse(url_str).with_context(|| format!("Invalid URL format: {}", url_str))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(anyhow!("URL must use HTTP or HTTPS scheme: {}", url_str));
    }

    if url.host_str().is_none() {
        return Err(anyhow!("URL must have a valid host: {}", url_str));
    }

    Ok(url)
}

/// Fetches pages and memoizes their cleaned text in a [`ContentCache`]
#[derive(Debug)]
pub struct PageFetcher {
    client: HttpClient,
    cache: ContentCache,
}

/// Counters for a [`PageFetcher::fetch_all`] run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub fetched: usize,
    pub cached: usize,
    pub failed: usize,
}

impl PageFetcher {
    #[inline]
    pub fn new(client: HttpClient, cache: ContentCache) -> Self {
        Self { client, cache }
    }

    /// Fetch a page's cleaned text, consulting the cache first.
    ///
    /// Failures are returned but never cached, so the next run retries them.
    #[inline]
    pub fn fetch(&mut self, url: &str) -> FetchOutcome {
        if let Some(text) = self.cache.get(url) {
            debug!("Cache hit for {}", url);
            return FetchOutcome::Fetched(text.to_string());
        }

        match self.client.get(url) {
            Ok(html) => {
                let text = extract_text(&html);
                self.cache.insert(url, text.clone());
                FetchOutcome::Fetched(text)
            }
            Err(failure) => {
                warn!("Failed to fetch {}: {}", url, failure);
                FetchOutcome::Failed(failure)
            }
        }
    }

    /// Fetch each link in order, skipping duplicates and stopping after
    /// `limit` distinct links when one is given. `on_page` receives every
    /// outcome as it is produced and can end the run early with
    /// [`ControlFlow::Break`].
    #[inline]
    pub fn fetch_all<F>(&mut self, links: &[String], limit: Option<usize>, mut on_page: F) -> FetchStats
    where
        F: FnMut(&str, &FetchOutcome) -> ControlFlow<()>,
    {
        let mut seen = HashSet::new();
        let unique: Vec<&String> = links
            .iter()
            .filter(|link| seen.insert(link.as_str()))
            .take(limit.unwrap_or(usize::MAX))
            .collect();
        let total = unique.len();

        let bar = step_bar(total, "Fetching");
        let mut stats = FetchStats::default();

        for (i, url) in unique.into_iter().enumerate() {
            bar.set_message(url.clone());
            let was_cached = self.cache.get(url).is_some();
            let outcome = self.fetch(url);

            match &outcome {
                FetchOutcome::Fetched(_) if was_cached => stats.cached += 1,
                FetchOutcome::Fetched(_) => stats.fetched += 1,
                FetchOutcome::Failed(_) => stats.failed += 1,
            }

            let flow = on_page(url, &outcome);
            info!("Processed {}/{}: {}", i + 1, total, url);
            bar.inc(1);
            if flow.is_break() {
                warn!("Stopping after {} of {} links", i + 1, total);
                break;
            }
        }

        bar.finish_and_clear();
        stats
    }

    #[inline]
    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    /// Persist the content cache
    #[inline]
    pub fn save_cache(&mut self) -> crate::Result<()> {
        debug!(
            "Saving {} cached pages to {}",
            self.cache.len(),
            self.cache.path().display()
        );
        self.cache.save()
    }
}
