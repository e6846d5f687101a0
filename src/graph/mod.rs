//! Persistent link graph: pages and the directed links between them.

mod memory;
mod sqlite;

pub use memory::InMemoryGraphStore;
pub use sqlite::{GraphStats, SearchRunRecord, SqliteGraphStore};

use async_trait::async_trait;

use crate::Result;

/// Storage for discovered pages and links.
///
/// Implementations must read their own writes: `list_successors` called right
/// after `record_expansion` sees every link just written.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Create the page if it does not exist.
    async fn upsert_page(&self, title: &str) -> Result<()>;

    /// Create the link (and both endpoint pages) if it does not exist.
    async fn upsert_link(&self, from: &str, to: &str) -> Result<()>;

    /// Direct successors of `title`. Empty if the page is unknown.
    async fn list_successors(&self, title: &str) -> Result<Vec<String>>;

    /// Whether `title` has been expanded before.
    async fn is_expanded(&self, title: &str) -> Result<bool>;

    /// Flag `title` as expanded.
    async fn mark_expanded(&self, title: &str) -> Result<()>;

    /// Store `title`, every neighbor, and an edge to each, then flag `title`
    /// as expanded.
    async fn record_expansion(&self, title: &str, neighbors: &[String]) -> Result<()> {
        self.upsert_page(title).await?;
        for neighbor in neighbors {
            self.upsert_link(title, neighbor).await?;
        }
        self.mark_expanded(title).await
    }
}
