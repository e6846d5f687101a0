pub mod cache;
pub mod config;
pub mod db;
pub mod embeddings;
pub mod error;
pub mod graph;
pub mod page;
pub mod search;
pub mod source;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{Result, WikipathError};
pub use page::normalize_title;
pub use search::{SearchEngine, SearchOptions, SearchOutcome, SearchReport};
