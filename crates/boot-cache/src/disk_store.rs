use crate::deps::DependencyGraph;
use crate::error::{CacheError, Result};
use crate::fs::FileSystem;
use crate::key::{CacheKey, CACHE_FILE_EXTENSION};
use crate::lock::CacheLock;
use crate::record::{validate_batch, CacheRecord};
use crate::store::{
    current_timestamps, existing_timestamps, CachedSymbols, FileTimestamp, SymbolStore,
};
use crate::symbol::SymbolRecord;
use crate::util::{append_line, atomic_write, read_file_limited, remove_file_best_effort};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

pub const DISK_STORE_SCHEMA_VERSION: u32 = 1;

/// Number of appended deltas after which the log is rewritten as one snapshot.
pub const DEFAULT_COMPACTION_THRESHOLD: u32 = 20;

const LOCK_DIR: &str = ".locks";

#[derive(Clone, Copy, Debug)]
pub struct DiskStorePolicy {
    /// Rewrite the log once more than this many deltas follow the last snapshot.
    pub compaction_threshold: u32,
}

impl Default for DiskStorePolicy {
    fn default() -> Self {
        Self {
            compaction_threshold: DEFAULT_COMPACTION_THRESHOLD,
        }
    }
}

/// Durable symbol store: one JSON-lines artifact per [`CacheKey`].
///
/// The artifact `<key>.json` is a log of deltas. `store` writes a fresh snapshot
/// atomically; `update_*` and `remove_files` append one line each. Readers replay the
/// log, so a crash mid-append costs at most the last (truncated, ignored) line.
///
/// Writes for one index identifier are serialized through a [`CacheLock`], which also
/// excludes other processes sharing the cache directory. Reads take the same lock
/// shared.
pub struct OnDiskStore {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    policy: DiskStorePolicy,
    state: Mutex<HashMap<CacheKey, KeyState>>,
}

/// What this process knows about an artifact without re-reading it.
///
/// Only valid while the artifact on disk still matches `artifact`; another store
/// sharing the directory may have written since.
#[derive(Clone, Debug, Default)]
struct KeyState {
    timestamps: BTreeMap<PathBuf, u64>,
    deltas_since_snapshot: u32,
    artifact: Option<ArtifactStamp>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ArtifactStamp {
    len: u64,
    modified: Option<SystemTime>,
}

fn artifact_stamp(path: &Path) -> Option<ArtifactStamp> {
    let meta = std::fs::metadata(path).ok()?;
    if !meta.is_file() {
        return None;
    }
    Some(ArtifactStamp {
        len: meta.len(),
        modified: meta.modified().ok(),
    })
}

/// One cache artifact found on disk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ArtifactInfo {
    pub key: CacheKey,
    pub path: PathBuf,
    pub bytes: u64,
}

impl OnDiskStore {
    pub fn new(root: impl AsRef<Path>, fs: Arc<dyn FileSystem>) -> Result<Self> {
        Self::new_with_policy(root, fs, DiskStorePolicy::default())
    }

    pub fn new_with_policy(
        root: impl AsRef<Path>,
        fs: Arc<dyn FileSystem>,
        policy: DiskStorePolicy,
    ) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            fs,
            policy,
            state: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artifact_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    fn lock_path(&self, key: &CacheKey) -> PathBuf {
        self.root
            .join(LOCK_DIR)
            .join(format!("{}.lock", key.primary_identifier()))
    }

    /// Lists the artifacts currently in the cache directory.
    pub fn artifacts(&self) -> Result<Vec<ArtifactInfo>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut out = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(key) = artifact_key(&path) else {
                continue;
            };
            let Ok(meta) = entry.metadata() else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }
            out.push(ArtifactInfo {
                key,
                path,
                bytes: meta.len(),
            });
        }
        out.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(out)
    }

    /// Deletes every artifact in the cache directory.
    pub fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for artifact in self.artifacts()? {
            let _lock = CacheLock::lock_exclusive(&self.lock_path(&artifact.key))?;
            if remove_file_best_effort(&artifact.path, "clear") {
                removed += 1;
            }
        }
        self.state.lock().clear();
        Ok(removed)
    }

    /// Number of deltas appended since the last snapshot, as seen by this process.
    pub fn pending_deltas(&self, key: &CacheKey) -> u32 {
        self.state
            .lock()
            .get(key)
            .map(|state| state.deltas_since_snapshot)
            .unwrap_or(0)
    }

    fn write_snapshot(&self, key: &CacheKey, record: &CacheRecord) -> Result<()> {
        let mut line = serde_json::to_vec(&DeltaLineRef {
            schema_version: DISK_STORE_SCHEMA_VERSION,
            delta: DeltaRef::Snapshot(record),
        })?;
        line.push(b'\n');
        atomic_write(&self.artifact_path(key), &line)
    }

    fn append(&self, key: &CacheKey, delta: DeltaRef<'_>) -> Result<()> {
        let line = serde_json::to_vec(&DeltaLineRef {
            schema_version: DISK_STORE_SCHEMA_VERSION,
            delta,
        })?;
        append_line(&self.artifact_path(key), &line)
    }

    /// Reads the state for `key` if it still describes the artifact on disk.
    fn fresh_state<T>(&self, key: &CacheKey, read: impl FnOnce(&KeyState) -> T) -> Option<T> {
        let current = artifact_stamp(&self.artifact_path(key));
        let states = self.state.lock();
        let state = states.get(key)?;
        (state.artifact == current).then(|| read(state))
    }

    /// Replays the artifact for `key` and remembers the result. Caller holds the
    /// key's lock.
    fn replay(&self, key: &CacheKey) -> Option<ReplayedLog> {
        let path = self.artifact_path(key);
        let replayed = read_log(&path);
        let state = match &replayed {
            Some(replayed) => KeyState {
                timestamps: replayed.record.timestamps.clone(),
                deltas_since_snapshot: replayed.deltas_since_snapshot,
                artifact: artifact_stamp(&path),
            },
            None => KeyState {
                artifact: artifact_stamp(&path),
                ..KeyState::default()
            },
        };
        self.state.lock().insert(key.clone(), state);
        replayed
    }

    /// Makes sure the in-memory state for `key` matches the artifact, replaying it
    /// if this process has not seen it yet or someone else wrote since. Caller holds
    /// the key's lock.
    fn ensure_state(&self, key: &CacheKey) {
        if self.fresh_state(key, |_| ()).is_none() {
            self.replay(key);
        }
    }

    /// Records one appended delta and compacts once the threshold is exceeded. Caller
    /// holds the key's exclusive lock.
    fn after_append(&self, key: &CacheKey, apply: impl FnOnce(&mut BTreeMap<PathBuf, u64>)) {
        let artifact = artifact_stamp(&self.artifact_path(key));
        let pending = {
            let mut states = self.state.lock();
            let state = states.entry(key.clone()).or_default();
            apply(&mut state.timestamps);
            state.artifact = artifact;
            state.deltas_since_snapshot = state.deltas_since_snapshot.saturating_add(1);
            state.deltas_since_snapshot
        };
        if pending > self.policy.compaction_threshold {
            self.compact_locked(key);
        }
    }

    fn compact_locked(&self, key: &CacheKey) {
        let path = self.artifact_path(key);
        let Some(replayed) = read_log(&path) else {
            return;
        };
        tracing::debug!(
            target = "boot.cache",
            key = %key,
            deltas = replayed.deltas_since_snapshot,
            "compacting symbol cache"
        );
        match self.write_snapshot(key, &replayed.record) {
            Ok(()) => {
                let artifact = artifact_stamp(&path);
                let mut states = self.state.lock();
                let state = states.entry(key.clone()).or_default();
                state.timestamps = replayed.record.timestamps;
                state.deltas_since_snapshot = 0;
                state.artifact = artifact;
            }
            // The log itself is still intact; compaction is retried on the next append.
            Err(err) => tracing::debug!(
                target = "boot.cache",
                key = %key,
                error = %err,
                "failed to compact symbol cache"
            ),
        }
    }

    /// Deletes artifacts of other versions of `key`'s index. Caller holds the lock.
    fn delete_siblings(&self, key: &CacheKey) {
        let Ok(artifacts) = self.artifacts() else {
            return;
        };
        for artifact in artifacts {
            if artifact.key.is_sibling_of(key) {
                tracing::debug!(
                    target = "boot.cache",
                    path = %artifact.path.display(),
                    "deleting outdated symbol cache version"
                );
                remove_file_best_effort(&artifact.path, "store.outdated_version");
                self.state.lock().remove(&artifact.key);
            }
        }
    }
}

impl std::fmt::Debug for OnDiskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnDiskStore")
            .field("root", &self.root)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl SymbolStore for OnDiskStore {
    fn store(
        &self,
        key: &CacheKey,
        files: &[PathBuf],
        symbols: &[SymbolRecord],
        dependencies: &DependencyGraph,
    ) -> Result<()> {
        let record = CacheRecord::new(
            existing_timestamps(self.fs.as_ref(), files),
            symbols.to_vec(),
            dependencies.clone(),
        );

        let _lock = CacheLock::lock_exclusive(&self.lock_path(key))?;
        self.write_snapshot(key, &record)?;
        let artifact = artifact_stamp(&self.artifact_path(key));
        self.state.lock().insert(
            key.clone(),
            KeyState {
                timestamps: record.timestamps,
                deltas_since_snapshot: 0,
                artifact,
            },
        );
        self.delete_siblings(key);
        Ok(())
    }

    fn retrieve(&self, key: &CacheKey, files: &[PathBuf]) -> Option<CachedSymbols> {
        let current = current_timestamps(self.fs.as_ref(), files)?;

        let replayed = {
            let _lock = match CacheLock::lock_shared(&self.lock_path(key)) {
                Ok(lock) => lock,
                Err(err) => {
                    tracing::debug!(
                        target = "boot.cache",
                        key = %key,
                        error = %err,
                        "failed to lock symbol cache for reading"
                    );
                    return None;
                }
            };
            self.replay(key)
        };
        let replayed = replayed?;

        if !replayed.record.matches(&current) {
            tracing::debug!(
                target = "boot.cache",
                key = %key,
                stored = replayed.record.timestamps.len(),
                requested = current.len(),
                "symbol cache is stale"
            );
            return None;
        }

        if replayed.deltas_since_snapshot > self.policy.compaction_threshold {
            match CacheLock::lock_exclusive(&self.lock_path(key)) {
                Ok(_lock) => self.compact_locked(key),
                Err(err) => tracing::debug!(
                    target = "boot.cache",
                    key = %key,
                    error = %err,
                    "skipping compaction; lock unavailable"
                ),
            }
        }

        Some(replayed.record.into_cached())
    }

    fn update_files(
        &self,
        key: &CacheKey,
        files: &[FileTimestamp],
        symbols: &[SymbolRecord],
        dependencies: &DependencyGraph,
    ) -> Result<()> {
        validate_batch(files, symbols)?;
        if files.is_empty() {
            return Ok(());
        }

        let mut batch_dependencies = DependencyGraph::new();
        for stamp in files {
            batch_dependencies.set(
                stamp.file.clone(),
                dependencies.tokens(&stamp.file).map(str::to_string),
            );
        }
        let timestamps: BTreeMap<&Path, u64> = files
            .iter()
            .map(|stamp| (stamp.file.as_path(), stamp.last_modified))
            .collect();

        let _lock = CacheLock::lock_exclusive(&self.lock_path(key))?;
        self.ensure_state(key);
        self.append(
            key,
            DeltaRef::Update {
                timestamps,
                symbols,
                dependencies: &batch_dependencies,
            },
        )?;
        self.after_append(key, |table| {
            for stamp in files {
                table.insert(stamp.file.clone(), stamp.last_modified);
            }
        });
        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> Result<()> {
        let _lock = CacheLock::lock_exclusive(&self.lock_path(key))?;
        match std::fs::remove_file(self.artifact_path(key)) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        self.state.lock().remove(key);
        Ok(())
    }

    fn remove_files(&self, key: &CacheKey, files: &[PathBuf]) -> Result<()> {
        if files.is_empty() {
            return Ok(());
        }
        let _lock = CacheLock::lock_exclusive(&self.lock_path(key))?;
        if !self.artifact_path(key).exists() {
            self.state.lock().remove(key);
            return Ok(());
        }
        self.ensure_state(key);
        self.append(key, DeltaRef::Delete { files })?;
        self.after_append(key, |table| {
            for file in files {
                table.remove(file);
            }
        });
        Ok(())
    }

    fn modification_timestamp(&self, key: &CacheKey, file: &Path) -> u64 {
        let lookup = |state: &KeyState| state.timestamps.get(file).copied().unwrap_or(0);
        if let Some(timestamp) = self.fresh_state(key, lookup) {
            return timestamp;
        }

        let Ok(_lock) = CacheLock::lock_shared(&self.lock_path(key)) else {
            return 0;
        };
        self.replay(key);
        self.fresh_state(key, lookup).unwrap_or(0)
    }
}

fn artifact_key(path: &Path) -> Option<CacheKey> {
    if path.extension().and_then(|ext| ext.to_str()) != Some(CACHE_FILE_EXTENSION) {
        return None;
    }
    CacheKey::parse(path.file_name()?.to_str()?)
}

#[derive(Serialize)]
struct DeltaLineRef<'a> {
    schema_version: u32,
    delta: DeltaRef<'a>,
}

#[derive(Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
enum DeltaRef<'a> {
    Snapshot(&'a CacheRecord),
    Update {
        timestamps: BTreeMap<&'a Path, u64>,
        symbols: &'a [SymbolRecord],
        dependencies: &'a DependencyGraph,
    },
    Delete {
        files: &'a [PathBuf],
    },
}

#[derive(Deserialize)]
struct DeltaLine {
    schema_version: u32,
    delta: Delta,
}

#[derive(Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
enum Delta {
    Snapshot(CacheRecord),
    Update {
        timestamps: BTreeMap<PathBuf, u64>,
        symbols: Vec<SymbolRecord>,
        #[serde(default)]
        dependencies: DependencyGraph,
    },
    Delete {
        files: Vec<PathBuf>,
    },
}

struct ReplayedLog {
    record: CacheRecord,
    deltas_since_snapshot: u32,
}

/// Replays the artifact at `path`.
///
/// Returns `None` if there is no artifact or it cannot be trusted; untrusted artifacts
/// (unparseable lines, foreign schema versions) are deleted so the next full scan
/// starts clean.
fn read_log(path: &Path) -> Option<ReplayedLog> {
    let bytes = read_file_limited(path)?;

    let mut record = CacheRecord::default();
    let mut deltas_since_snapshot = 0u32;
    let mut lines = bytes.split(|b| *b == b'\n').peekable();
    while let Some(line) = lines.next() {
        if lines.peek().is_none() {
            // The final segment is either empty (log ends with '\n') or an append that
            // never completed.
            if !line.is_empty() {
                tracing::debug!(
                    target = "boot.cache",
                    path = %path.display(),
                    "ignoring truncated trailing symbol cache entry"
                );
            }
            break;
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let entry: DeltaLine = match serde_json::from_slice(line) {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(
                    target = "boot.cache",
                    path = %path.display(),
                    error = %CacheError::from(err),
                    "discarding unreadable symbol cache"
                );
                remove_file_best_effort(path, "read_log.corrupt");
                return None;
            }
        };
        if entry.schema_version != DISK_STORE_SCHEMA_VERSION {
            tracing::debug!(
                target = "boot.cache",
                path = %path.display(),
                error = %CacheError::IncompatibleSchemaVersion {
                    expected: DISK_STORE_SCHEMA_VERSION,
                    found: entry.schema_version,
                },
                "discarding symbol cache written by another schema version"
            );
            remove_file_best_effort(path, "read_log.schema_version");
            return None;
        }

        match entry.delta {
            Delta::Snapshot(snapshot) => {
                record = snapshot;
                deltas_since_snapshot = 0;
                continue;
            }
            Delta::Update {
                timestamps,
                symbols,
                dependencies,
            } => {
                let files: Vec<FileTimestamp> = timestamps
                    .into_iter()
                    .map(|(file, last_modified)| FileTimestamp {
                        file,
                        last_modified,
                    })
                    .collect();
                record.apply_update(&files, &symbols, &dependencies);
            }
            Delta::Delete { files } => record.apply_delete(&files),
        }
        deltas_since_snapshot = deltas_since_snapshot.saturating_add(1);
    }

    Some(ReplayedLog {
        record,
        deltas_since_snapshot,
    })
}
