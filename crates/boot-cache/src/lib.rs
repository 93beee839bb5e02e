//! Persistent, dependency-aware symbol cache.
//!
//! This crate holds the storage half of the indexer:
//! - [`CacheKey`]: names one index (one project) plus a version tag
//! - [`SymbolRecord`] / [`AddOn`]: the cached symbol model with typed, forward
//!   compatible metadata
//! - [`DependencyGraph`]: per-file dependency tokens used for transitive invalidation
//! - [`SymbolStore`]: the backend contract, with [`VoidStore`], [`OnDiskStore`] and
//!   [`TimestampStore`] implementations
//! - [`MemoCache`]: explicit TTL memoization for expensive derived values
//!
//! ## On-disk layout
//!
//! Symbol caches live under `<cache_root>/symbols/` (see [`CacheConfig`]):
//! - `<identifier>-<version>.json`: a JSON-lines delta log per key, schema
//!   [`DISK_STORE_SCHEMA_VERSION`]; only one version per identifier is retained
//! - `.locks/<identifier>.lock`: cross-process lock files guarding the logs

mod add_on;
mod cache_dir;
mod deps;
mod disk_store;
mod error;
mod fs;
mod key;
mod lock;
mod memo;
mod record;
mod store;
mod symbol;
mod timestamp_store;
mod util;
mod void_store;

pub use add_on::{
    AddOn, AddOnDecoder, AddOnRegistry, BeanInfo, RequestMappingInfo, WebfluxElementsInfo,
    WebfluxHandlerInfo, BEAN_TAG, REQUEST_MAPPING_TAG, WEBFLUX_ELEMENTS_TAG,
    WEBFLUX_HANDLER_TAG,
};
pub use cache_dir::{CacheConfig, CACHE_DIR_ENV};
pub use deps::DependencyGraph;
pub use disk_store::{
    ArtifactInfo, DiskStorePolicy, OnDiskStore, DEFAULT_COMPACTION_THRESHOLD,
    DISK_STORE_SCHEMA_VERSION,
};
pub use error::{CacheError, Result};
pub use fs::{FileSystem, LocalFs};
pub use key::{CacheKey, CACHE_FILE_EXTENSION};
pub use lock::CacheLock;
pub use memo::{MemoCache, MemoPolicy};
pub use record::CacheRecord;
pub use store::{current_timestamps, CachedSymbols, FileTimestamp, SymbolStore};
pub use symbol::{Location, Position, Range, Symbol, SymbolKind, SymbolRecord};
pub use timestamp_store::TimestampStore;
pub use util::{atomic_write, now_millis, system_time_millis, CACHE_FILE_LIMIT_BYTES};
pub use void_store::VoidStore;
