use crate::error::CacheError;
use std::path::PathBuf;

/// Environment variable overriding the default cache root.
pub const CACHE_DIR_ENV: &str = "BOOT_INDEX_CACHE_DIR";

/// Configuration for selecting the on-disk cache root.
#[derive(Clone, Debug, Default)]
pub struct CacheConfig {
    /// Override the global cache directory.
    pub cache_root_override: Option<PathBuf>,
}

impl CacheConfig {
    pub fn from_env() -> Self {
        Self {
            cache_root_override: std::env::var_os(CACHE_DIR_ENV)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Resolves the directory symbol caches live in: the override if set, otherwise
    /// `~/.boot-index/cache/symbols`.
    pub fn symbols_dir(&self) -> Result<PathBuf, CacheError> {
        let base = match &self.cache_root_override {
            Some(root) => root.clone(),
            None => default_cache_root()?,
        };
        Ok(base.join("symbols"))
    }
}

pub(crate) fn default_cache_root() -> Result<PathBuf, CacheError> {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .ok_or(CacheError::MissingHomeDir)?;

    Ok(home.join(".boot-index").join("cache"))
}
