use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::search::SearchOptions;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub wikipath: WikipathConfig,
    #[serde(default)]
    pub wiki: WikiConfig,
    pub embeddings: EmbeddingsConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

/// Storage and logging settings
#[derive(Debug, Clone, Deserialize)]
pub struct WikipathConfig {
    /// SQLite file holding the discovered link graph.
    pub db_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Page source settings
#[derive(Debug, Clone, Deserialize)]
pub struct WikiConfig {
    /// Prefix that a page title is appended to, e.g. `https://en.wikipedia.org/wiki/`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Embeddings configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingsConfig {
    pub provider: String,
    pub model: String,
    pub api_key_env: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Titles sent per embeddings request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    pub dimensions: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

/// Search limits
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Serve already-expanded pages from the store instead of refetching them.
    #[serde(default)]
    pub skip_expanded: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            top_n: default_top_n(),
            skip_expanded: false,
        }
    }
}

impl SearchConfig {
    pub fn options(&self) -> SearchOptions {
        SearchOptions {
            max_depth: self.max_depth,
            top_n: self.top_n,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    "https://en.wikipedia.org/wiki/".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("wikipath/{}", env!("CARGO_PKG_VERSION"))
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_batch_size() -> usize {
    100
}

fn default_max_retries() -> usize {
    3
}

fn default_max_depth() -> usize {
    6
}

fn default_top_n() -> usize {
    10
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in WIKIPATH_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config_path = std::env::var("WIKIPATH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config = Self::from_toml(&config_str)?;
        config.validate()?;

        Ok(config)
    }

    /// Parse configuration text without validating it
    pub fn from_toml(config_str: &str) -> Result<Self> {
        toml::from_str(config_str).context("Failed to parse config.toml")
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        std::env::var(&self.embeddings.api_key_env).with_context(|| {
            format!(
                "Environment variable {} not set. Set it in your .env file or as an environment variable.",
                self.embeddings.api_key_env
            )
        })?;

        if self.embeddings.dimensions == 0 {
            anyhow::bail!("embeddings.dimensions must be greater than 0");
        }

        if self.search.top_n == 0 {
            anyhow::bail!("search.top_n must be greater than 0");
        }

        url::Url::parse(&self.wiki.base_url)
            .with_context(|| format!("wiki.base_url is not a valid URL: {}", self.wiki.base_url))?;
        if !self.wiki.base_url.ends_with('/') {
            anyhow::bail!("wiki.base_url must end with '/': {}", self.wiki.base_url);
        }

        Ok(())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.wikipath.db_path
    }

    /// Read the embeddings API key named by `embeddings.api_key_env`
    pub fn api_key(&self) -> Result<String> {
        std::env::var(&self.embeddings.api_key_env).with_context(|| {
            format!("Environment variable {} not set", self.embeddings.api_key_env)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize config tests that mutate process-wide cwd and env so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    const TEST_CONFIG: &str = r#"
[wikipath]
db_path = "./test.db"
log_level = "debug"

[embeddings]
provider = "openai"
model = "text-embedding-3-small"
api_key_env = "WIKIPATH_TEST_KEY"
dimensions = 1536

[search]
max_depth = 4
top_n = 5
"#;

    /// Restores cwd when dropped (e.g. on panic).
    struct CwdGuard(std::path::PathBuf);
    impl Drop for CwdGuard {
        fn drop(&mut self) {
            let _ = std::env::set_current_dir(&self.0);
        }
    }

    fn with_config_env(config_path: &Path, api_key: Option<&str>, f: impl FnOnce()) {
        let original_config = std::env::var("WIKIPATH_CONFIG").ok();
        std::env::set_var("WIKIPATH_CONFIG", config_path.to_str().unwrap());
        match api_key {
            Some(k) => std::env::set_var("WIKIPATH_TEST_KEY", k),
            None => std::env::remove_var("WIKIPATH_TEST_KEY"),
        }
        f();
        std::env::remove_var("WIKIPATH_CONFIG");
        std::env::remove_var("WIKIPATH_TEST_KEY");
        if let Some(val) = original_config {
            std::env::set_var("WIKIPATH_CONFIG", val);
        }
    }

    fn write_config(temp_dir: &TempDir, content: &str) -> PathBuf {
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, content).unwrap();
        config_path.canonicalize().unwrap()
    }

    #[test]
    fn test_config_load_success() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = write_config(&temp_dir, TEST_CONFIG);
        let _cwd = CwdGuard(std::env::current_dir().unwrap());
        std::env::set_current_dir(temp_dir.path()).unwrap();
        with_config_env(&config_path, Some("test-key"), || {
            let config = Config::load();
            assert!(config.is_ok(), "Config::load() failed: {:?}", config.err());
            let config = config.unwrap();
            assert_eq!(config.wikipath.log_level, "debug");
            assert_eq!(config.search.max_depth, 4);
            assert_eq!(config.search.top_n, 5);
            assert!(!config.search.skip_expanded);
            assert_eq!(config.wiki.base_url, "https://en.wikipedia.org/wiki/");
            assert_eq!(config.embeddings.max_retries, 3);
        });
    }

    #[test]
    fn test_config_missing_api_key() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = write_config(&temp_dir, TEST_CONFIG);
        let _cwd = CwdGuard(std::env::current_dir().unwrap());
        std::env::set_current_dir(temp_dir.path()).unwrap();
        with_config_env(&config_path, None, || {
            let config = Config::load();
            assert!(config.is_err(), "Expected missing API key error");
            assert!(config.unwrap_err().to_string().contains("WIKIPATH_TEST_KEY"));
        });
    }

    #[test]
    fn test_config_rejects_zero_top_n() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let content = TEST_CONFIG.replace("top_n = 5", "top_n = 0");
        let config_path = write_config(&temp_dir, &content);
        let _cwd = CwdGuard(std::env::current_dir().unwrap());
        std::env::set_current_dir(temp_dir.path()).unwrap();
        with_config_env(&config_path, Some("test-key"), || {
            let err = Config::load().unwrap_err();
            assert!(err.to_string().contains("top_n"));
        });
    }

    #[test]
    fn test_config_rejects_base_url_without_slash() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let content = format!("{TEST_CONFIG}\n[wiki]\nbase_url = \"https://en.wikipedia.org/wiki\"\n");
        let config_path = write_config(&temp_dir, &content);
        let _cwd = CwdGuard(std::env::current_dir().unwrap());
        std::env::set_current_dir(temp_dir.path()).unwrap();
        with_config_env(&config_path, Some("test-key"), || {
            let err = Config::load().unwrap_err();
            assert!(err.to_string().contains("must end with '/'"));
        });
    }

    #[test]
    fn test_config_invalid_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let original = std::env::var("WIKIPATH_CONFIG").ok();
        std::env::set_var("WIKIPATH_CONFIG", "nonexistent.toml");
        let config = Config::load();
        assert!(config.is_err());
        std::env::remove_var("WIKIPATH_CONFIG");
        if let Some(v) = original {
            std::env::set_var("WIKIPATH_CONFIG", v);
        }
    }

    #[test]
    fn test_search_defaults() {
        let config = Config::from_toml(
            r#"
[wikipath]
db_path = "graph.db"

[embeddings]
provider = "openai"
model = "m"
api_key_env = "K"
dimensions = 3
"#,
        )
        .unwrap();
        let options = config.search.options();
        assert_eq!(options.max_depth, 6);
        assert_eq!(options.top_n, 10);
        assert_eq!(config.embeddings.batch_size, 100);
        assert_eq!(config.embeddings.max_retries, 3);
    }
}
