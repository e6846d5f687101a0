use crate::graph::GraphStore;
use crate::source::LinkSource;
use crate::{Result, WikipathError};

/// Makes sure a page, its linked pages, and the links between them are stored.
pub struct GraphExpander<'a> {
    source: &'a dyn LinkSource,
    store: &'a dyn GraphStore,
    skip_expanded: bool,
}

impl<'a> GraphExpander<'a> {
    pub fn new(source: &'a dyn LinkSource, store: &'a dyn GraphStore) -> Self {
        Self {
            source,
            store,
            skip_expanded: false,
        }
    }

    /// Serve pages already expanded in an earlier run from the store.
    pub fn skip_expanded(mut self, skip: bool) -> Self {
        self.skip_expanded = skip;
        self
    }

    /// Fetch and persist the links of `title`.
    ///
    /// Returns the neighbors as fetched (document order, duplicates kept).
    /// A missing or unreachable page, or a store failure, is an
    /// `Expansion` error, which is distinct from a page with no links.
    /// Re-expanding a page adds no duplicate pages or links.
    pub async fn expand(&self, title: &str) -> Result<Vec<String>> {
        if self.skip_expanded
            && self
                .store
                .is_expanded(title)
                .await
                .map_err(|e| WikipathError::expansion(title, e))?
        {
            log::debug!("{} already expanded, reading links from store", title);
            return self
                .store
                .list_successors(title)
                .await
                .map_err(|e| WikipathError::expansion(title, e));
        }

        let neighbors = self
            .source
            .fetch_links(title)
            .await
            .map_err(|e| WikipathError::expansion(title, e))?;

        self.store
            .record_expansion(title, &neighbors)
            .await
            .map_err(|e| WikipathError::expansion(title, e))?;

        log::debug!("Expanded {} ({} links)", title, neighbors.len());
        Ok(neighbors)
    }
}
