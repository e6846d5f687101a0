//! In-memory collaborators for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::embeddings::Embedder;
use crate::source::LinkSource;
use crate::{Result, WikipathError};

/// Embedder backed by a fixed table; unknown texts fail. Counts calls per text
/// and records the size of every batch request.
#[derive(Default)]
pub struct CountingEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    calls: Mutex<HashMap<String, usize>>,
    batches: Mutex<Vec<usize>>,
}

impl CountingEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, text: &str, vector: &[f32]) -> Self {
        self.vectors.insert(text.to_string(), vector.to_vec());
        self
    }

    pub fn calls(&self, text: &str) -> usize {
        self.calls.lock().unwrap().get(text).copied().unwrap_or(0)
    }

    pub fn all_calls(&self) -> HashMap<String, usize> {
        self.calls.lock().unwrap().clone()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl Embedder for CountingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        *self.calls.lock().unwrap().entry(text.to_string()).or_default() += 1;
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| WikipathError::Embedding(format!("no vector for {text}")))
    }

    async fn embed_batch(&self, texts: &[String]) -> Vec<Result<Vec<f32>>> {
        self.batches.lock().unwrap().push(texts.len());
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await);
        }
        results
    }
}

/// Link source backed by a fixed adjacency table. Titles missing from the
/// table are reported as not found. Records every fetch in order.
#[derive(Default)]
pub struct MapLinkSource {
    pages: HashMap<String, Vec<String>>,
    fetched: Mutex<Vec<String>>,
}

impl MapLinkSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, title: &str, links: &[&str]) -> Self {
        self.pages
            .insert(title.to_string(), links.iter().map(|l| l.to_string()).collect());
        self
    }

    pub fn fetch_count(&self, title: &str) -> usize {
        self.fetched.lock().unwrap().iter().filter(|t| *t == title).count()
    }
}

#[async_trait]
impl LinkSource for MapLinkSource {
    async fn fetch_links(&self, title: &str) -> Result<Vec<String>> {
        self.fetched.lock().unwrap().push(title.to_string());
        self.pages
            .get(title)
            .cloned()
            .ok_or_else(|| WikipathError::PageNotFound(title.to_string()))
    }
}
