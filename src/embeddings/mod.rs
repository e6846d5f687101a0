pub mod openai;

pub use openai::OpenAIEmbedder;

use async_trait::async_trait;

use crate::Result;

/// Turns text into a fixed-length vector.
///
/// Must be deterministic for a given input and model.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, one result per input in the same order.
    ///
    /// A failure for one text must not fail the others. The default embeds
    /// one text at a time; backends with a batch endpoint override it.
    async fn embed_batch(&self, texts: &[String]) -> Vec<Result<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await);
        }
        results
    }
}
