//! Incremental symbol indexing for Spring-style Java projects.
//!
//! - [`JavaAnnotationScanner`] turns one source file into symbols (beans, request
//!   mappings, other annotations) plus the types the file depends on
//! - [`Indexer`] keeps every registered [`ProjectDescriptor`] current, backed by a
//!   [`boot_cache::SymbolStore`] so a restart only rescans what changed
//! - [`SymbolQuery`] is the workspace-symbol query language
//! - [`IndexerConfig`] loads `boot-index.toml` and wires logging and the cache backend
//!
//! ```no_run
//! # async fn demo() -> boot_index::Result<()> {
//! use boot_index::{Indexer, IndexerConfig, ProjectDescriptor};
//!
//! let indexer = Indexer::from_config(&IndexerConfig::default())?;
//! indexer
//!     .add_project(ProjectDescriptor::maven_layout("demo", "/work/demo"))
//!     .join()
//!     .await?;
//! for symbol in indexer.all_symbols("@/") {
//!     println!("{}", symbol.name);
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod indexer;
mod java_scanner;
mod progress;
mod project;
mod query;
mod queue;
mod registry;
mod scanner;
mod view;

pub use config::{
    init_tracing, CacheBackend, CacheSection, ConfigError, IndexSection, IndexerConfig,
    LoggingConfig,
};
pub use error::{IndexError, Result};
pub use indexer::{
    FileFailure, Indexer, IndexerOptions, LoadReport, ProjectStats, UpdateReport,
};
pub use java_scanner::JavaAnnotationScanner;
pub use progress::{Progress, ProgressEvent, ProgressId, ProgressReceiver, ProgressSender};
pub use project::{
    owning_project, path_to_uri, uri_to_path, ProjectDescriptor, SourceFolder, SourceKind,
    JAVA_EXTENSION,
};
pub use query::{SymbolQuery, LOCATION_PREFIX_PARAM};
pub use queue::IndexTask;
pub use registry::IndexRegistry;
pub use scanner::{
    IndexSettings, ScanCounter, ScanError, ScanInput, ScanListener, ScanOutput, Scanner,
};
