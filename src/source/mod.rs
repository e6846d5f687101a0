//! Where outgoing links come from.

mod wiki;

pub use wiki::{extract_links, WikiScraper};

use async_trait::async_trait;

use crate::Result;

/// Produces the linked-page titles of a page.
///
/// A missing or unreachable page is an `Err` (`PageNotFound` or `Fetch`),
/// never an empty list.
#[async_trait]
pub trait LinkSource: Send + Sync {
    async fn fetch_links(&self, title: &str) -> Result<Vec<String>>;
}
