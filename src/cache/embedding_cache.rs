use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::embeddings::Embedder;
use crate::page::display_title;
use crate::{Result, WikipathError};

/// Page title → embedding memo table for one run
///
/// Entries are write-once and never evicted; a run only ever embeds the pages
/// it visits plus their ranked neighbors. Failed lookups are not stored, so a
/// later call for the same page asks the embedder again.
#[derive(Default)]
pub struct EmbeddingCache {
    entries: Mutex<HashMap<String, Arc<Vec<f32>>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl EmbeddingCache {
    /// Create an empty cache with zeroed hit and miss counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached embedding for `title`, if any
    ///
    /// # Arguments
    ///
    /// * `title` - Normalized page title (underscores, not spaces)
    ///
    /// # Returns
    ///
    /// The shared vector, or `None` if the page has not been embedded yet.
    /// Does not touch the hit/miss counters.
    pub fn get(&self, title: &str) -> Option<Arc<Vec<f32>>> {
        self.entries.lock().unwrap().get(title).cloned()
    }

    /// Store an embedding unless one is already present
    ///
    /// # Arguments
    ///
    /// * `title` - Normalized page title
    /// * `embedding` - Vector to store; dropped if `title` already has one
    ///
    /// # Returns
    ///
    /// The vector now held for `title`, which is the earlier one on a repeat insert
    pub fn insert(&self, title: &str, embedding: Vec<f32>) -> Arc<Vec<f32>> {
        self.entries
            .lock()
            .unwrap()
            .entry(title.to_string())
            .or_insert_with(|| Arc::new(embedding))
            .clone()
    }

    /// Embedding for `title`, calling `embedder` only on a miss
    ///
    /// The embedder sees the display form of the title (`Albert Einstein`,
    /// not `Albert_Einstein`).
    ///
    /// # Arguments
    ///
    /// * `title` - Normalized page title, used as the cache key
    /// * `embedder` - Backend asked on a miss
    ///
    /// # Returns
    ///
    /// The cached or freshly computed vector. Embedder errors are returned
    /// as-is and nothing is stored.
    pub async fn get_or_embed(&self, title: &str, embedder: &dyn Embedder) -> Result<Arc<Vec<f32>>> {
        if let Some(cached) = self.get(title) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            log::debug!("Embedding cache hit for {}", title);
            return Ok(cached);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        log::debug!("Embedding cache miss for {}", title);
        // Lock is not held across the backend call.
        let embedding = embedder.embed(&display_title(title)).await?;
        Ok(self.insert(title, embedding))
    }

    /// Embeddings for several titles, sending all misses in one batch
    ///
    /// Repeated titles are embedded once. A failure only affects the titles it
    /// belongs to and is not cached.
    ///
    /// # Arguments
    ///
    /// * `titles` - Normalized page titles, possibly with repeats
    /// * `embedder` - Backend asked once, via `embed_batch`, for the distinct misses
    ///
    /// # Returns
    ///
    /// One result per entry of `titles`, in the same order
    pub async fn get_or_embed_many(
        &self,
        titles: &[String],
        embedder: &dyn Embedder,
    ) -> Vec<Result<Arc<Vec<f32>>>> {
        let mut cached: Vec<Option<Arc<Vec<f32>>>> = Vec::with_capacity(titles.len());
        let mut pending: Vec<&str> = Vec::new();
        for title in titles {
            let hit = self.get(title);
            if hit.is_some() {
                self.hits.fetch_add(1, Ordering::Relaxed);
            } else if !pending.contains(&title.as_str()) {
                self.misses.fetch_add(1, Ordering::Relaxed);
                pending.push(title);
            }
            cached.push(hit);
        }

        let mut fetched: HashMap<&str, std::result::Result<Arc<Vec<f32>>, String>> = HashMap::new();
        if !pending.is_empty() {
            log::debug!("Embedding {} uncached titles in one batch", pending.len());
            let texts: Vec<String> = pending.iter().map(|t| display_title(t)).collect();
            let mut results = embedder.embed_batch(&texts).await.into_iter();
            for &title in &pending {
                let outcome = match results.next() {
                    Some(Ok(embedding)) => Ok(self.insert(title, embedding)),
                    Some(Err(e)) => Err(e.to_string()),
                    None => Err(format!("No embedding returned for {}", title)),
                };
                fetched.insert(title, outcome);
            }
        }

        titles
            .iter()
            .zip(cached)
            .map(|(title, hit)| match hit {
                Some(vector) => Ok(vector),
                None => match fetched.get(title.as_str()) {
                    Some(Ok(vector)) => Ok(Arc::clone(vector)),
                    Some(Err(message)) => Err(WikipathError::Embedding(message.clone())),
                    None => Err(WikipathError::Embedding(format!("No embedding returned for {}", title))),
                },
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CountingEmbedder;

    #[test]
    fn test_insert_and_get() {
        let cache = EmbeddingCache::new();
        cache.insert("Physics", vec![1.0, 2.0, 3.0]);

        let retrieved = cache.get("Physics");
        assert_eq!(retrieved.as_deref(), Some(&vec![1.0, 2.0, 3.0]));
        assert!(cache.get("Chemistry").is_none());
    }

    #[test]
    fn test_insert_is_write_once() {
        let cache = EmbeddingCache::new();
        cache.insert("Physics", vec![1.0]);
        let stored = cache.insert("Physics", vec![2.0]);

        assert_eq!(*stored, vec![1.0]);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_get_or_embed_calls_backend_once() {
        let cache = EmbeddingCache::new();
        let embedder = CountingEmbedder::new().with("Albert Einstein", &[0.1, 0.9]);

        let first = cache.get_or_embed("Albert_Einstein", &embedder).await.unwrap();
        let second = cache.get_or_embed("Albert_Einstein", &embedder).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(embedder.calls("Albert Einstein"), 1);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let cache = EmbeddingCache::new();
        let embedder = CountingEmbedder::new();

        assert!(cache.get_or_embed("Unknown", &embedder).await.is_err());
        assert!(cache.get_or_embed("Unknown", &embedder).await.is_err());

        assert!(cache.is_empty());
        assert_eq!(embedder.calls("Unknown"), 2);
    }

    #[tokio::test]
    async fn test_get_or_embed_many_batches_only_misses() {
        let cache = EmbeddingCache::new();
        let embedder = CountingEmbedder::new()
            .with("Physics", &[1.0, 0.0])
            .with("Albert Einstein", &[0.5, 0.5])
            .with("Chemistry", &[0.0, 1.0]);
        cache.get_or_embed("Physics", &embedder).await.unwrap();

        let titles: Vec<String> = ["Physics", "Albert_Einstein", "Chemistry", "Albert_Einstein"]
            .iter()
            .map(|t| t.to_string())
            .collect();
        let results = cache.get_or_embed_many(&titles, &embedder).await;

        let vectors: Vec<Vec<f32>> = results.into_iter().map(|r| r.unwrap().to_vec()).collect();
        assert_eq!(
            vectors,
            vec![vec![1.0, 0.0], vec![0.5, 0.5], vec![0.0, 1.0], vec![0.5, 0.5]]
        );
        assert_eq!(embedder.batch_sizes(), vec![2]);
        assert_eq!(embedder.calls("Physics"), 1);
        assert_eq!(embedder.calls("Albert Einstein"), 1);
        assert_eq!(cache.len(), 3);
    }

    #[tokio::test]
    async fn test_get_or_embed_many_keeps_failures_per_title() {
        let cache = EmbeddingCache::new();
        let embedder = CountingEmbedder::new().with("Physics", &[1.0]);

        let titles = vec!["Unknown".to_string(), "Physics".to_string()];
        let results = cache.get_or_embed_many(&titles, &embedder).await;

        assert!(matches!(results[0], Err(WikipathError::Embedding(_))));
        assert_eq!(results[1].as_ref().unwrap().as_slice(), &[1.0]);
        assert!(cache.get("Unknown").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_get_or_embed_many_all_cached_skips_backend() {
        let cache = EmbeddingCache::new();
        let embedder = CountingEmbedder::new();
        cache.insert("Physics", vec![1.0]);

        let results = cache.get_or_embed_many(&["Physics".to_string()], &embedder).await;

        assert!(results[0].is_ok());
        assert!(embedder.batch_sizes().is_empty());
        assert_eq!(cache.hits(), 1);
    }
}
