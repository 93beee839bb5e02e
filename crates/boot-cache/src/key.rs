use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// File extension of on-disk cache artifacts (without the dot).
pub const CACHE_FILE_EXTENSION: &str = "json";

const SEPARATOR: char = '-';

/// Identifies one logical index (typically one project) plus a version tag.
///
/// The string form is `<primary_identifier>-<version>`. Because parsing splits at the
/// *last* separator, the identifier may contain `-` but the version may not.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CacheKey {
    primary_identifier: String,
    version: String,
}

impl CacheKey {
    pub fn new(primary_identifier: impl Into<String>, version: impl Into<String>) -> Result<Self> {
        let primary_identifier = primary_identifier.into();
        let version = version.into();

        let invalid = |reason| CacheError::InvalidKey {
            key: format!("{primary_identifier}{SEPARATOR}{version}"),
            reason,
        };
        if version.is_empty() {
            return Err(invalid("version is empty"));
        }
        if version.contains(SEPARATOR) {
            return Err(invalid("version contains the key separator"));
        }
        if version
            .strip_suffix(CACHE_FILE_EXTENSION)
            .is_some_and(|rest| rest.ends_with('.'))
        {
            return Err(invalid("version ends with the cache file extension"));
        }
        if contains_path_separator(&primary_identifier) || contains_path_separator(&version) {
            return Err(invalid("key contains a path separator"));
        }

        Ok(Self {
            primary_identifier,
            version,
        })
    }

    /// Parses the string form of a key, accepting a trailing cache file extension.
    ///
    /// Returns `None` for anything that is not a key (no separator, empty version, ...),
    /// which lets callers feed arbitrary directory entries through it.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s
            .strip_suffix(CACHE_FILE_EXTENSION)
            .and_then(|rest| rest.strip_suffix('.'))
            .unwrap_or(s);
        let (primary_identifier, version) = s.rsplit_once(SEPARATOR)?;
        Self::new(primary_identifier, version).ok()
    }

    pub fn primary_identifier(&self) -> &str {
        &self.primary_identifier
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns `true` if `other` names a different version of the same index.
    pub fn is_sibling_of(&self, other: &CacheKey) -> bool {
        self.primary_identifier == other.primary_identifier && self.version != other.version
    }

    /// File name of this key's on-disk artifact.
    pub fn file_name(&self) -> String {
        format!("{self}.{CACHE_FILE_EXTENSION}")
    }
}

fn contains_path_separator(s: &str) -> bool {
    s.contains('/') || s.contains('\\') || s.contains('\0')
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SEPARATOR}{}",
            self.primary_identifier, self.version
        )
    }
}

impl TryFrom<String> for CacheKey {
    type Error = CacheError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value).ok_or(CacheError::InvalidKey {
            key: value,
            reason: "expected `<identifier>-<version>`",
        })
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.to_string()
    }
}
