//! Goal-directed distance estimates used to order exploration.

use std::sync::Arc;

use serde::Serialize;

use crate::cache::EmbeddingCache;
use crate::embeddings::Embedder;
use crate::{Result, WikipathError};

/// A candidate page and its distance to the goal (lower is closer).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredPage {
    pub title: String,
    pub score: f32,
}

/// Scores pages by `1 - cosine_similarity` against the goal's embedding.
///
/// The score is not admissible; it only reorders a depth-first search.
pub struct HeuristicEvaluator<'a> {
    cache: &'a EmbeddingCache,
    embedder: &'a dyn Embedder,
}

impl<'a> HeuristicEvaluator<'a> {
    pub fn new(cache: &'a EmbeddingCache, embedder: &'a dyn Embedder) -> Self {
        Self { cache, embedder }
    }

    /// Embedding for `title`, served from the run's cache when possible.
    pub async fn embedding(&self, title: &str) -> Result<Arc<Vec<f32>>> {
        self.cache.get_or_embed(title, self.embedder).await
    }

    /// Distance in `[0, 2]` from `candidate` to `goal`.
    pub async fn estimate(&self, candidate: &str, goal: &str) -> Result<f32> {
        let goal_vec = self.embedding(goal).await?;
        let candidate_vec = self.embedding(candidate).await?;
        distance(&candidate_vec, &goal_vec)
    }

    /// Score `candidates` against `goal_vec`, best first, keeping at most `top_n`.
    ///
    /// Uncached candidates are embedded in one batch. Candidates whose
    /// embedding cannot be computed are logged and left out.
    /// The sort is stable, so equal scores keep their input order.
    pub async fn rank(&self, candidates: &[String], goal_vec: &[f32], top_n: usize) -> Vec<ScoredPage> {
        let embeddings = self.cache.get_or_embed_many(candidates, self.embedder).await;
        let mut scored = Vec::with_capacity(candidates.len());

        for (title, embedding) in candidates.iter().zip(embeddings) {
            let score = embedding.and_then(|vector| distance(&vector, goal_vec));
            match score {
                Ok(score) => scored.push(ScoredPage {
                    title: title.clone(),
                    score,
                }),
                Err(e) => log::warn!("Dropping {} from ranking: {}", title, e),
            }
        }

        scored.sort_by(|a, b| a.score.total_cmp(&b.score));
        scored.truncate(top_n);
        scored
    }
}

/// `1 - cosine_similarity(a, b)`.
///
/// Fails on mismatched dimensions or non-finite input, so a bad vector drops
/// one candidate instead of corrupting the ordering.
pub fn distance(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(WikipathError::Embedding(format!(
            "Dimension mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    let score = 1.0 - cosine_similarity(a, b);
    if !score.is_finite() {
        return Err(WikipathError::Embedding("Non-finite similarity score".to_string()));
    }
    Ok(score.clamp(0.0, 2.0))
}

/// Cosine similarity of two equal-length vectors; 0.0 if either has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}
