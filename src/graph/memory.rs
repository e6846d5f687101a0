use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use super::GraphStore;
use crate::Result;

#[derive(Default)]
struct Inner {
    /// Successors in first-recorded order.
    successors: HashMap<String, Vec<String>>,
    links: HashSet<(String, String)>,
    expanded: HashSet<String>,
}

/// Process-local graph store.
#[derive(Default)]
pub struct InMemoryGraphStore {
    inner: Mutex<Inner>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page_count(&self) -> usize {
        self.inner.lock().unwrap().successors.len()
    }

    pub fn link_count(&self) -> usize {
        self.inner.lock().unwrap().links.len()
    }

    pub fn contains_page(&self, title: &str) -> bool {
        self.inner.lock().unwrap().successors.contains_key(title)
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn upsert_page(&self, title: &str) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .successors
            .entry(title.to_string())
            .or_default();
        Ok(())
    }

    async fn upsert_link(&self, from: &str, to: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.successors.entry(to.to_string()).or_default();
        if inner.links.insert((from.to_string(), to.to_string())) {
            inner
                .successors
                .entry(from.to_string())
                .or_default()
                .push(to.to_string());
        } else {
            inner.successors.entry(from.to_string()).or_default();
        }
        Ok(())
    }

    async fn list_successors(&self, title: &str) -> Result<Vec<String>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .successors
            .get(title)
            .cloned()
            .unwrap_or_default())
    }

    async fn is_expanded(&self, title: &str) -> Result<bool> {
        Ok(self.inner.lock().unwrap().expanded.contains(title))
    }

    async fn mark_expanded(&self, title: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.successors.entry(title.to_string()).or_default();
        inner.expanded.insert(title.to_string());
        Ok(())
    }
}
