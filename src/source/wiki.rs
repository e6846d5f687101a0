use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use url::Url;

use super::LinkSource;
use crate::config::WikiConfig;
use crate::page::normalize_title;
use crate::{Result, WikipathError};

const ARTICLE_PREFIX: &str = "/wiki/";

/// Fetches article HTML over HTTP and pulls out links to other articles.
pub struct WikiScraper {
    client: Client,
    base_url: Url,
}

impl WikiScraper {
    /// `base_url` is the prefix a title is appended to and must end with `/`.
    pub fn new(base_url: &str, timeout: Duration, user_agent: &str) -> Result<Self> {
        if !base_url.ends_with('/') {
            return Err(WikipathError::InvalidInput(format!(
                "base URL must end with '/': {base_url}"
            )));
        }
        let parsed = Url::parse(base_url)
            .map_err(|e| WikipathError::InvalidInput(format!("invalid base URL {base_url}: {e}")))?;
        if parsed.cannot_be_a_base() {
            return Err(WikipathError::InvalidInput(format!(
                "base URL cannot carry a path: {base_url}"
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| WikipathError::Fetch(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: parsed,
        })
    }

    pub fn from_config(config: &WikiConfig) -> Result<Self> {
        Self::new(
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
            &config.user_agent,
        )
    }

    /// Article URL for a canonical title.
    ///
    /// The title is appended as a single percent-encoded path segment, so
    /// `?`, `#` and `/` stay part of the title. `Url::join` is avoided since
    /// it would read "Foo:Bar" as a scheme.
    pub fn page_url(&self, title: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| WikipathError::InvalidInput(format!("cannot build URL for {title}")))?
            .pop_if_empty()
            .push(title);
        Ok(url)
    }
}

#[async_trait]
impl LinkSource for WikiScraper {
    async fn fetch_links(&self, title: &str) -> Result<Vec<String>> {
        let url = self.page_url(title)?;
        log::debug!("Fetching {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| WikipathError::Fetch(format!("Network error for {url}: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(WikipathError::PageNotFound(title.to_string()));
        }
        if !status.is_success() {
            return Err(WikipathError::Fetch(format!("{url} returned {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| WikipathError::Fetch(format!("Failed to read {url}: {e}")))?;

        let links = extract_links(&body);
        log::debug!("{} links on {}", links.len(), title);
        Ok(links)
    }
}

/// Article links in document order. Duplicates are kept; the graph store
/// collapses them.
pub fn extract_links(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let link_selector = Selector::parse("a[href]").expect("Invalid selector");

    doc.select(&link_selector)
        .filter_map(|e| e.value().attr("href"))
        .filter_map(article_title)
        .collect()
}

/// Canonical title for an in-wiki article href. Namespaced pages
/// (`File:`, `Help:`, ...) and external links yield `None`.
///
/// The target is percent-decoded before normalizing, so `/wiki/Z%C3%BCrich`
/// and a typed `Zürich` name the same page.
fn article_title(href: &str) -> Option<String> {
    let rest = href.strip_prefix(ARTICLE_PREFIX)?;
    let target = rest.split(&['#', '?'][..]).next().unwrap_or_default();
    let decoded = percent_decode_str(target).decode_utf8_lossy();
    if rest.contains(':') || decoded.contains(':') {
        return None;
    }
    let title = normalize_title(&decoded);
    (!title.is_empty()).then_some(title)
}
