use thiserror::Error;

/// Main error type for wikipath
#[derive(Error, Debug)]
pub enum WikipathError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding errors (search run log)
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Embedding backend errors
    #[error("Embedding API error: {0}")]
    Embedding(String),

    /// Network or HTTP errors while fetching a page
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// The page source reports that a page does not exist
    #[error("Page not found: {0}")]
    PageNotFound(String),

    /// A page could not be expanded into stored neighbors
    #[error("Expansion of {page} failed: {reason}")]
    Expansion { page: String, reason: String },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl WikipathError {
    /// Wrap any error as an expansion failure for `page`.
    pub fn expansion(page: &str, err: impl std::fmt::Display) -> Self {
        WikipathError::Expansion {
            page: page.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Convenient Result type using WikipathError
pub type Result<T> = std::result::Result<T, WikipathError>;
