//! Repository tuning knobs, loadable from the `[repository]` table of a TOML
//! file.

use crate::{RepoError, RepoResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

fn default_cache_capacity() -> usize {
    1000
}

fn default_cache_ttl_ms() -> u64 {
    10 * 60 * 1000
}

fn default_page_size() -> usize {
    100
}

fn default_original_timeout_ms() -> u64 {
    60 * 1000
}

fn default_modified_timeout_ms() -> u64 {
    5 * 60 * 1000
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Maximum number of cached records.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Cached records expire after going unread this long.
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
    /// Rows fetched per storage round trip while listing.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// How long an update context waits for the original record to load.
    #[serde(default = "default_original_timeout_ms")]
    pub original_timeout_ms: u64,
    /// How long an update context waits for the modified record.
    #[serde(default = "default_modified_timeout_ms")]
    pub modified_timeout_ms: u64,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
            cache_ttl_ms: default_cache_ttl_ms(),
            page_size: default_page_size(),
            original_timeout_ms: default_original_timeout_ms(),
            modified_timeout_ms: default_modified_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    repository: Option<RepositoryConfig>,
}

impl RepositoryConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn original_timeout(&self) -> Duration {
        Duration::from_millis(self.original_timeout_ms)
    }

    pub fn modified_timeout(&self) -> Duration {
        Duration::from_millis(self.modified_timeout_ms)
    }

    pub fn validate(&self) -> RepoResult<()> {
        if self.cache_capacity == 0 {
            return Err(RepoError::Config("cache_capacity must be at least 1".into()));
        }
        if self.page_size == 0 {
            return Err(RepoError::Config("page_size must be at least 1".into()));
        }
        if self.original_timeout_ms == 0 || self.modified_timeout_ms == 0 {
            return Err(RepoError::Config("timeouts must be positive".into()));
        }
        Ok(())
    }

    /// Parses the `[repository]` table of a TOML document. A document
    /// without the table yields the defaults.
    pub fn from_toml_str(contents: &str) -> RepoResult<Self> {
        let file: ConfigFile = toml::from_str(contents)
            .map_err(|e| RepoError::Config(format!("invalid repository config: {e}")))?;
        let config = file.repository.unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    /// Loads from `path`, falling back to the defaults if the file is
    /// missing or invalid.
    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("No repository config found at {:?}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(config) => {
                    info!("Loaded repository config from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("{e} in {:?}. Falling back to defaults.", path);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read repository config {:?}: {}", path, e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let c = RepositoryConfig::default();
        assert_eq!(c.cache_capacity, 1000);
        assert_eq!(c.cache_ttl(), Duration::from_secs(600));
        assert_eq!(c.page_size, 100);
        assert_eq!(c.original_timeout(), Duration::from_secs(60));
        assert_eq!(c.modified_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn partial_table_keeps_other_defaults() {
        let c = RepositoryConfig::from_toml_str(
            r#"
            [repository]
            cache_capacity = 5
            page_size = 2
            "#,
        )
        .unwrap();
        assert_eq!(
            c,
            RepositoryConfig {
                cache_capacity: 5,
                page_size: 2,
                ..RepositoryConfig::default()
            }
        );
    }

    #[test]
    fn missing_table_is_default() {
        let c = RepositoryConfig::from_toml_str("[other]\nkey = 1\n").unwrap();
        assert_eq!(c, RepositoryConfig::default());
    }

    #[test]
    fn rejects_zero_capacity() {
        let err = RepositoryConfig::from_toml_str("[repository]\ncache_capacity = 0\n").unwrap_err();
        assert!(matches!(err, RepoError::Config(_)));
    }

    #[test]
    fn load_from_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let c = RepositoryConfig::load_from(dir.path().join("nope.toml"));
        assert_eq!(c, RepositoryConfig::default());
    }

    #[test]
    fn load_from_invalid_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folio.toml");
        std::fs::write(&path, "[repository\ncache_capacity = ").unwrap();
        assert_eq!(RepositoryConfig::load_from(&path), RepositoryConfig::default());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folio.toml");
        std::fs::write(&path, "[repository]\nmodified_timeout_ms = 250\n").unwrap();
        assert_eq!(RepositoryConfig::load_from(&path).modified_timeout_ms, 250);
    }
}
