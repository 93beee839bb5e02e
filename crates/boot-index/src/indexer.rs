//! The incremental indexer.
//!
//! Every mutation (project registration, document changes, settings changes) runs on
//! one worker thread in submission order. Queries read the last published view of
//! each project and never wait for the worker.
//!
//! A project starts *cold*. The first operation that needs its symbols loads it: a
//! cache hit restores the stored record without scanning, a miss scans every source
//! file and stores the result. From then on the project is *warm* and only files whose
//! timestamp moved are scanned again, together with every file that depends on a type
//! one of them declares.

use crate::config::IndexerConfig;
use crate::error::{IndexError, Result};
use crate::java_scanner::JavaAnnotationScanner;
use crate::progress::{ProgressReceiver, ProgressSender};
use crate::project::{owning_project, path_to_uri, uri_to_path, ProjectDescriptor, SourceKind};
use crate::query::SymbolQuery;
use crate::queue::{panic_payload_to_str, IndexTask, UpdateQueue};
use crate::scanner::{IndexSettings, ScanError, ScanInput, ScanListener, ScanOutput, Scanner};
use crate::view::ProjectView;
use boot_cache::{
    AddOn, BeanInfo, CacheKey, DependencyGraph, FileSystem, FileTimestamp, LocalFs, MemoCache,
    MemoPolicy, Symbol, SymbolRecord, SymbolStore,
};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug)]
pub struct IndexerOptions {
    pub settings: IndexSettings,
    /// Cap on [`Indexer::all_symbols`] results; `None` means unlimited.
    pub max_query_results: Option<usize>,
    /// Lifetime of memoized cache keys.
    pub memo: MemoPolicy,
    pub progress_capacity: usize,
}

impl Default for IndexerOptions {
    fn default() -> Self {
        Self {
            settings: IndexSettings::default(),
            max_query_results: None,
            memo: MemoPolicy::default(),
            progress_capacity: 64,
        }
    }
}

impl IndexerOptions {
    pub fn from_config(config: &IndexerConfig) -> Self {
        Self {
            settings: config.settings(),
            max_query_results: config.index.max_query_results,
            memo: config.memo_policy(),
            ..Self::default()
        }
    }
}

/// A file that could not be indexed. Its previous symbols, if any, are kept.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub message: String,
}

impl FileFailure {
    fn new(path: &Path, err: &IndexError) -> Self {
        Self {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

/// Outcome of bringing a project from cold to warm.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub project: String,
    pub files: usize,
    pub symbols: usize,
    /// `true` if the stored record was reused without scanning.
    pub from_cache: bool,
    pub failed: Vec<FileFailure>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    /// Requested files that changed and were rescanned.
    pub scanned: Vec<PathBuf>,
    /// Files rescanned because a type they depend on was rescanned.
    pub affected: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
    /// Files outside every project or active source folder.
    pub ignored: Vec<PathBuf>,
    pub failed: Vec<FileFailure>,
    /// Projects that were loaded before the update could be applied.
    pub loaded: Vec<LoadReport>,
}

impl UpdateReport {
    /// Number of scanner invocations the update caused, including project loads.
    pub fn scan_count(&self) -> usize {
        self.scanned.len()
            + self.affected.len()
            + self
                .loaded
                .iter()
                .filter(|load| !load.from_cache)
                .map(|load| load.files + load.failed.len())
                .sum::<usize>()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProjectStats {
    pub name: String,
    pub root: PathBuf,
    pub warm: bool,
    pub files: usize,
    pub symbols: usize,
}

struct WarmState {
    key: CacheKey,
    view: ProjectView,
}

struct ProjectState {
    descriptor: ProjectDescriptor,
    warm: Option<WarmState>,
}

struct ScannedFile {
    last_modified: u64,
    output: ScanOutput,
}

struct Shared {
    store: Arc<dyn SymbolStore>,
    fs: Arc<dyn FileSystem>,
    scanner: Arc<dyn Scanner>,
    listener: RwLock<Option<Arc<dyn ScanListener>>>,
    projects: RwLock<BTreeMap<String, ProjectState>>,
    settings: RwLock<IndexSettings>,
    keys: MemoCache<CacheKey>,
    progress: ProgressSender,
    max_query_results: Option<usize>,
}

/// Keeps the symbols of every registered project current.
pub struct Indexer {
    shared: Arc<Shared>,
    queue: UpdateQueue,
}

impl Indexer {
    pub fn new(
        store: Arc<dyn SymbolStore>,
        fs: Arc<dyn FileSystem>,
        scanner: Arc<dyn Scanner>,
        options: IndexerOptions,
    ) -> Result<Self> {
        let shared = Arc::new(Shared {
            store,
            fs,
            scanner,
            listener: RwLock::new(None),
            projects: RwLock::new(BTreeMap::new()),
            settings: RwLock::new(options.settings),
            keys: MemoCache::new(options.memo),
            progress: ProgressSender::new(options.progress_capacity),
            max_query_results: options.max_query_results,
        });
        Ok(Self {
            shared,
            queue: UpdateQueue::new("worker")?,
        })
    }

    /// An indexer over the local file system using the Java annotation scanner and the
    /// store selected by `config`.
    pub fn from_config(config: &IndexerConfig) -> Result<Self> {
        let fs: Arc<dyn FileSystem> = Arc::new(LocalFs::new());
        let store = config.open_store(fs.clone())?;
        Self::new(
            store,
            fs,
            Arc::new(JavaAnnotationScanner::new()),
            IndexerOptions::from_config(config),
        )
    }

    pub fn set_scan_listener(&self, listener: Option<Arc<dyn ScanListener>>) {
        *self.shared.listener.write() = listener;
    }

    pub fn subscribe_progress(&self) -> ProgressReceiver {
        self.shared.progress.subscribe()
    }

    pub fn settings(&self) -> IndexSettings {
        *self.shared.settings.read()
    }

    /// Registers (or re-registers) a project and loads it.
    pub fn add_project(&self, descriptor: ProjectDescriptor) -> IndexTask<LoadReport> {
        self.add_project_with_token(descriptor, CancellationToken::new())
    }

    /// Like [`Self::add_project`]; cancelling `token` aborts a full scan before anything
    /// is stored, leaving the project registered but cold.
    pub fn add_project_with_token(
        &self,
        descriptor: ProjectDescriptor,
        token: CancellationToken,
    ) -> IndexTask<LoadReport> {
        let shared = self.shared.clone();
        self.queue.submit("add_project", token, move |token| {
            let name = descriptor.name.clone();
            shared.register(descriptor);
            shared.load_project(&name, token)
        })
    }

    /// Forgets a project and deletes its stored record. Resolves to `false` if no such
    /// project was registered.
    pub fn remove_project(&self, name: &str) -> IndexTask<bool> {
        let shared = self.shared.clone();
        let name = name.to_string();
        self.queue.submit("remove_project", CancellationToken::new(), move |_| {
            shared.delete_project(&name)
        })
    }

    pub fn update_document(&self, path: impl Into<PathBuf>) -> IndexTask<UpdateReport> {
        self.update_documents(vec![path.into()])
    }

    /// New files go through the same path as changed ones.
    pub fn create_document(&self, path: impl Into<PathBuf>) -> IndexTask<UpdateReport> {
        self.update_document(path)
    }

    /// Rescans the given files if their timestamps moved, plus everything that
    /// depends on them. All files of one project are committed as one batch.
    pub fn update_documents(&self, paths: Vec<PathBuf>) -> IndexTask<UpdateReport> {
        let shared = self.shared.clone();
        self.queue.submit("update_documents", CancellationToken::new(), move |token| {
            shared.update_documents(&paths, token)
        })
    }

    pub fn delete_document(&self, path: impl Into<PathBuf>) -> IndexTask<UpdateReport> {
        self.delete_documents(vec![path.into()])
    }

    /// Drops the given files, or every tracked file below a given folder.
    pub fn delete_documents(&self, paths: Vec<PathBuf>) -> IndexTask<UpdateReport> {
        let shared = self.shared.clone();
        self.queue.submit("delete_documents", CancellationToken::new(), move |token| {
            shared.delete_documents(&paths, token)
        })
    }

    /// Applies new settings to every warm project: enabling test sources scans them,
    /// disabling drops them.
    pub fn configure(&self, settings: IndexSettings) -> IndexTask<UpdateReport> {
        let shared = self.shared.clone();
        self.queue.submit("configure", CancellationToken::new(), move |token| {
            shared.reconfigure(settings, token)
        })
    }

    /// Resolves once every operation submitted before it has completed.
    pub fn wait_operation(&self) -> IndexTask<()> {
        self.queue
            .submit("wait_operation", CancellationToken::new(), |_| Ok(()))
    }

    /// Stops accepting operations; queued ones still run.
    pub fn close(&self) {
        self.queue.close();
    }

    pub fn projects(&self) -> Vec<ProjectStats> {
        self.shared
            .projects
            .read()
            .values()
            .map(ProjectState::stats)
            .collect()
    }

    pub fn project_stats(&self, name: &str) -> Option<ProjectStats> {
        self.shared.projects.read().get(name).map(ProjectState::stats)
    }

    /// Symbols of one document, in source order. Empty for unknown documents.
    pub fn symbols(&self, uri: &str) -> Vec<Symbol> {
        self.with_records(uri, |records| {
            records.iter().map(|record| record.symbol.clone()).collect()
        })
    }

    /// Symbols of every warm project matching `query`, see [`SymbolQuery`].
    pub fn all_symbols(&self, query: &str) -> Vec<Symbol> {
        let query = SymbolQuery::parse(query);
        let limit = query.limit(self.shared.max_query_results);
        let projects = self.shared.projects.read();
        let matches = projects
            .values()
            .filter_map(|state| state.warm.as_ref())
            .flat_map(|warm| warm.view.symbols())
            .map(|record| &record.symbol)
            .filter(|symbol| query.matches(symbol))
            .cloned();
        match limit {
            Some(limit) => matches.take(limit).collect(),
            None => matches.collect(),
        }
    }

    pub fn add_ons(&self, uri: &str) -> Vec<AddOn> {
        self.with_records(uri, |records| {
            records
                .iter()
                .flat_map(|record| record.add_ons().iter().cloned())
                .collect()
        })
    }

    pub fn beans_of_document(&self, uri: &str) -> Vec<BeanInfo> {
        self.add_ons(uri)
            .iter()
            .filter_map(AddOn::as_bean)
            .cloned()
            .collect()
    }

    /// Every add-on of every warm project accepted by `filter`.
    pub fn all_add_ons(&self, filter: impl Fn(&AddOn) -> bool) -> Vec<AddOn> {
        let projects = self.shared.projects.read();
        let add_ons = projects
            .values()
            .filter_map(|state| state.warm.as_ref())
            .flat_map(|warm| warm.view.symbols())
            .flat_map(|record| record.add_ons().iter())
            .filter(|add_on| filter(add_on))
            .cloned()
            .collect();
        add_ons
    }

    fn with_records<T: Default>(&self, uri: &str, f: impl FnOnce(&[SymbolRecord]) -> T) -> T {
        let Some(path) = uri_to_path(uri) else {
            return T::default();
        };
        let projects = self.shared.projects.read();
        let records = projects
            .values()
            .filter_map(|state| state.warm.as_ref())
            .map(|warm| warm.view.symbols_of(&path))
            .find(|records| !records.is_empty())
            .unwrap_or_default();
        f(records)
    }
}

impl Drop for Indexer {
    fn drop(&mut self) {
        self.queue.close();
    }
}

impl std::fmt::Debug for Indexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Indexer")
            .field("projects", &self.projects())
            .field("settings", &self.settings())
            .finish_non_exhaustive()
    }
}

impl ProjectState {
    fn stats(&self) -> ProjectStats {
        let (files, symbols) = self
            .warm
            .as_ref()
            .map(|warm| (warm.view.file_count(), warm.view.symbol_count()))
            .unwrap_or_default();
        ProjectStats {
            name: self.descriptor.name.clone(),
            root: self.descriptor.root.clone(),
            warm: self.warm.is_some(),
            files,
            symbols,
        }
    }
}

// Everything below runs on the worker thread.
impl Shared {
    fn register(&self, descriptor: ProjectDescriptor) {
        tracing::debug!(
            target = "boot.index",
            project = %descriptor.name,
            root = %descriptor.root.display(),
            "registering project"
        );
        self.projects.write().insert(
            descriptor.name.clone(),
            ProjectState {
                descriptor,
                warm: None,
            },
        );
    }

    fn descriptor(&self, name: &str) -> Result<ProjectDescriptor> {
        self.projects
            .read()
            .get(name)
            .map(|state| state.descriptor.clone())
            .ok_or_else(|| IndexError::UnknownProject(name.to_string()))
    }

    fn is_warm(&self, name: &str) -> bool {
        self.projects
            .read()
            .get(name)
            .is_some_and(|state| state.warm.is_some())
    }

    /// A private copy of a warm project's view to edit.
    fn warm_copy(&self, name: &str) -> Result<(CacheKey, ProjectView)> {
        self.projects
            .read()
            .get(name)
            .and_then(|state| state.warm.as_ref())
            .map(|warm| (warm.key.clone(), warm.view.clone()))
            .ok_or_else(|| IndexError::UnknownProject(name.to_string()))
    }

    fn publish(&self, name: &str, key: &CacheKey, view: ProjectView) {
        if let Some(state) = self.projects.write().get_mut(name) {
            state.warm = Some(WarmState {
                key: key.clone(),
                view,
            });
        }
    }

    fn cache_key(&self, descriptor: &ProjectDescriptor) -> Result<CacheKey> {
        let args = format!(
            "{}|{}",
            descriptor.name,
            descriptor
                .classpath
                .iter()
                .map(|entry| entry.display().to_string())
                .collect::<Vec<_>>()
                .join(",")
        );
        Ok(self.keys.get_or_try_insert_with("cache_key", &args, || {
            descriptor.cache_key(self.fs.as_ref())
        })?)
    }

    /// Scans one file. `Ok(None)` means the file no longer exists.
    fn scan_file(&self, path: &Path, settings: IndexSettings) -> Result<Option<ScannedFile>> {
        let last_modified = match self.fs.last_modified_millis(path) {
            Ok(millis) => millis,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(IndexError::io(path, err)),
        };
        let content = match self.fs.read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(IndexError::io(path, err)),
        };
        let uri = path_to_uri(path);
        let input = ScanInput {
            path,
            uri: &uri,
            content: &content,
            last_modified,
            settings,
        };
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.scanner.scan(&input)
        }))
        .unwrap_or_else(|panic| {
            Err(ScanError::new(format!(
                "scanner panicked: {}",
                panic_payload_to_str(&*panic)
            )))
        });
        if let Some(listener) = self.listener.read().as_ref() {
            listener.file_scanned(&uri);
        }
        let output = result.map_err(|source| IndexError::Scan {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(ScannedFile {
            last_modified,
            output,
        }))
    }

    fn load_project(&self, name: &str, token: &CancellationToken) -> Result<LoadReport> {
        let descriptor = self.descriptor(name)?;
        let settings = *self.settings.read();
        let key = self.cache_key(&descriptor)?;
        let files = descriptor.java_files(settings.scan_test_sources);

        if let Some(cached) = self.store.retrieve(&key, &files) {
            let timestamps = files
                .iter()
                .map(|file| (file.clone(), self.store.modification_timestamp(&key, file)))
                .collect();
            let view = ProjectView::from_cache(timestamps, cached);
            let report = LoadReport {
                project: name.to_string(),
                files: view.file_count(),
                symbols: view.symbol_count(),
                from_cache: true,
                failed: Vec::new(),
            };
            tracing::info!(
                target = "boot.index",
                project = name,
                key = %key,
                files = report.files,
                symbols = report.symbols,
                "restored project from cache"
            );
            self.publish(name, &key, view);
            return Ok(report);
        }

        tracing::info!(
            target = "boot.index",
            project = name,
            key = %key,
            files = files.len(),
            "cache miss; scanning project"
        );
        let progress = self.progress.start(name, files.len());
        let mut view = ProjectView::default();
        let mut tracked = Vec::with_capacity(files.len());
        let mut failed = Vec::new();
        for (done, file) in files.iter().enumerate() {
            if token.is_cancelled() {
                progress.finish(Some("cancelled".to_string()));
                return Err(IndexError::Cancelled);
            }
            match self.scan_file(file, settings) {
                Ok(Some(scanned)) => {
                    view.replace_file(
                        file,
                        scanned.last_modified,
                        scanned.output.symbols,
                        &scanned.output.dependencies,
                    );
                    tracked.push(file.clone());
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(target = "boot.index", project = name, error = %err, "failed to index file");
                    failed.push(FileFailure::new(file, &err));
                }
            }
            progress.report(done + 1);
        }
        if token.is_cancelled() {
            progress.finish(Some("cancelled".to_string()));
            return Err(IndexError::Cancelled);
        }

        let symbols: Vec<SymbolRecord> = view.symbols().cloned().collect();
        self.store
            .store(&key, &tracked, &symbols, view.dependencies())?;

        let report = LoadReport {
            project: name.to_string(),
            files: view.file_count(),
            symbols: view.symbol_count(),
            from_cache: false,
            failed,
        };
        progress.finish(Some(format!(
            "{} symbols in {} files",
            report.symbols, report.files
        )));
        self.publish(name, &key, view);
        Ok(report)
    }

    fn ensure_warm(
        &self,
        name: &str,
        token: &CancellationToken,
        report: &mut UpdateReport,
    ) -> Result<()> {
        if !self.is_warm(name) {
            report.loaded.push(self.load_project(name, token)?);
        }
        Ok(())
    }

    fn group_by_project(
        &self,
        paths: &[PathBuf],
        report: &mut UpdateReport,
    ) -> BTreeMap<String, Vec<PathBuf>> {
        let projects = self.projects.read();
        let mut groups: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        for path in paths {
            match owning_project(projects.values().map(|state| &state.descriptor), path) {
                Some(project) => groups
                    .entry(project.name.clone())
                    .or_default()
                    .push(path.clone()),
                None => report.ignored.push(path.clone()),
            }
        }
        groups
    }

    fn update_documents(&self, paths: &[PathBuf], token: &CancellationToken) -> Result<UpdateReport> {
        let settings = *self.settings.read();
        let mut report = UpdateReport::default();
        for (name, paths) in self.group_by_project(paths, &mut report) {
            self.ensure_warm(&name, token, &mut report)?;
            self.update_project(&name, &paths, settings, token, &mut report)?;
        }
        tracing::debug!(
            target = "boot.index",
            scanned = report.scanned.len(),
            affected = report.affected.len(),
            unchanged = report.unchanged.len(),
            removed = report.removed.len(),
            failed = report.failed.len(),
            "documents updated"
        );
        Ok(report)
    }

    fn update_project(
        &self,
        name: &str,
        paths: &[PathBuf],
        settings: IndexSettings,
        token: &CancellationToken,
        report: &mut UpdateReport,
    ) -> Result<()> {
        let descriptor = self.descriptor(name)?;
        let (key, mut view) = self.warm_copy(name)?;
        let mut batch: BTreeMap<PathBuf, ScannedFile> = BTreeMap::new();
        let mut removed = Vec::new();
        let mut changed_types = BTreeSet::new();
        let mut visited = BTreeSet::new();

        for path in paths {
            if !visited.insert(path.clone()) {
                continue;
            }
            if !descriptor.is_indexable(path, settings.scan_test_sources) {
                report.ignored.push(path.clone());
                continue;
            }
            if token.is_cancelled() {
                return Err(IndexError::Cancelled);
            }
            match self.fs.last_modified_millis(path) {
                Ok(millis) if view.last_modified(path) == Some(millis) => {
                    report.unchanged.push(path.clone());
                    continue;
                }
                Ok(_) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    if view.contains(path) {
                        removed.push(path.clone());
                    }
                    continue;
                }
                Err(err) => {
                    report
                        .failed
                        .push(FileFailure::new(path, &IndexError::io(path, err)));
                    continue;
                }
            }
            match self.scan_file(path, settings) {
                Ok(Some(scanned)) => {
                    changed_types.extend(scanned.output.declared_types.iter().cloned());
                    report.scanned.push(path.clone());
                    batch.insert(path.clone(), scanned);
                }
                Ok(None) => {
                    if view.contains(path) {
                        removed.push(path.clone());
                    }
                }
                Err(err) => {
                    tracing::warn!(target = "boot.index", project = name, error = %err, "failed to index file");
                    report.failed.push(FileFailure::new(path, &err));
                }
            }
        }

        // Rescanning a dependent may change the types it declares in turn.
        while !changed_types.is_empty() {
            let affected = view.dependents_of(&changed_types, &visited);
            changed_types.clear();
            for path in affected {
                visited.insert(path.clone());
                if token.is_cancelled() {
                    return Err(IndexError::Cancelled);
                }
                match self.scan_file(&path, settings) {
                    Ok(Some(scanned)) => {
                        changed_types.extend(scanned.output.declared_types.iter().cloned());
                        report.affected.push(path.clone());
                        batch.insert(path, scanned);
                    }
                    Ok(None) => removed.push(path),
                    Err(err) => {
                        tracing::warn!(target = "boot.index", project = name, error = %err, "failed to reindex dependent file");
                        report.failed.push(FileFailure::new(&path, &err));
                    }
                }
            }
        }

        if token.is_cancelled() {
            return Err(IndexError::Cancelled);
        }

        let mut dirty = false;
        if !batch.is_empty() {
            let mut timestamps = Vec::with_capacity(batch.len());
            let mut symbols = Vec::new();
            let mut dependencies = DependencyGraph::new();
            for (path, scanned) in &batch {
                timestamps.push(FileTimestamp::new(path.clone(), scanned.last_modified));
                symbols.extend(scanned.output.symbols.iter().cloned());
                dependencies.set(path.clone(), scanned.output.dependencies.iter().cloned());
            }
            self.store
                .update_files(&key, &timestamps, &symbols, &dependencies)?;
            for (path, scanned) in batch {
                view.replace_file(
                    &path,
                    scanned.last_modified,
                    scanned.output.symbols,
                    &scanned.output.dependencies,
                );
            }
            dirty = true;
        }
        if !removed.is_empty() {
            if let Err(err) = self.store.remove_files(&key, &removed) {
                if dirty {
                    self.publish(name, &key, view);
                }
                return Err(err.into());
            }
            for path in &removed {
                view.remove_file(path);
            }
            report.removed.extend(removed);
            dirty = true;
        }
        if dirty {
            self.publish(name, &key, view);
        }
        Ok(())
    }

    fn delete_documents(&self, paths: &[PathBuf], token: &CancellationToken) -> Result<UpdateReport> {
        let mut report = UpdateReport::default();
        for (name, paths) in self.group_by_project(paths, &mut report) {
            self.ensure_warm(&name, token, &mut report)?;
            let (_, view) = self.warm_copy(&name)?;
            let tracked: Vec<PathBuf> = view
                .files()
                .filter(|file| paths.iter().any(|path| file.starts_with(path)))
                .map(Path::to_path_buf)
                .collect();
            report.removed.extend(self.drop_files(&name, tracked)?);
        }
        Ok(report)
    }

    fn drop_files(&self, name: &str, files: Vec<PathBuf>) -> Result<Vec<PathBuf>> {
        if files.is_empty() {
            return Ok(files);
        }
        let (key, mut view) = self.warm_copy(name)?;
        self.store.remove_files(&key, &files)?;
        for file in &files {
            view.remove_file(file);
        }
        tracing::debug!(target = "boot.index", project = name, files = files.len(), "dropped files from index");
        self.publish(name, &key, view);
        Ok(files)
    }

    fn reconfigure(&self, settings: IndexSettings, token: &CancellationToken) -> Result<UpdateReport> {
        let previous = std::mem::replace(&mut *self.settings.write(), settings);
        let mut report = UpdateReport::default();
        if previous.scan_test_sources == settings.scan_test_sources {
            return Ok(report);
        }
        tracing::info!(
            target = "boot.index",
            scan_test_sources = settings.scan_test_sources,
            "test source indexing toggled"
        );

        let warm: Vec<String> = self
            .projects
            .read()
            .iter()
            .filter(|(_, state)| state.warm.is_some())
            .map(|(name, _)| name.clone())
            .collect();
        for name in warm {
            let descriptor = self.descriptor(&name)?;
            if settings.scan_test_sources {
                let files = descriptor.test_java_files();
                self.update_project(&name, &files, settings, token, &mut report)?;
            } else {
                let (_, view) = self.warm_copy(&name)?;
                let tests: Vec<PathBuf> = view
                    .files()
                    .filter(|file| descriptor.source_kind_of(file) == Some(SourceKind::Test))
                    .map(Path::to_path_buf)
                    .collect();
                report.removed.extend(self.drop_files(&name, tests)?);
            }
        }
        Ok(report)
    }

    fn delete_project(&self, name: &str) -> Result<bool> {
        let Some(state) = self.projects.write().remove(name) else {
            return Ok(false);
        };
        let key = match &state.warm {
            Some(warm) => Ok(warm.key.clone()),
            None => self.cache_key(&state.descriptor),
        };
        let result = key.and_then(|key| Ok(self.store.remove(&key)?));
        if let Err(err) = result {
            self.projects.write().insert(name.to_string(), state);
            return Err(err);
        }
        self.keys.invalidate_operation("cache_key");
        tracing::info!(target = "boot.index", project = name, "project removed");
        Ok(true)
    }
}
