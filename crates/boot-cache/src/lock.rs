use crate::error::CacheError;
use fs2::FileExt as _;
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// A lock on one cache artifact that is safe to share across threads and processes.
///
/// Writers hold it exclusively for the duration of a snapshot or append; readers hold
/// it shared while replaying the artifact so they never observe a half-written
/// snapshot. The lock is released when the value is dropped.
#[derive(Debug)]
pub struct CacheLock {
    file: File,
    path: PathBuf,
    // `fs2` locks coordinate processes but not threads of the same process, so an
    // in-process reader/writer lock keyed by path is held alongside the file lock.
    _guard: ProcessGuard,
}

#[derive(Debug)]
enum ProcessGuard {
    Shared(#[allow(dead_code)] RwLockReadGuard<'static, ()>),
    Exclusive(#[allow(dead_code)] RwLockWriteGuard<'static, ()>),
}

impl CacheLock {
    /// Acquire an exclusive lock on `path`, creating the lockfile if needed.
    ///
    /// This call blocks until the lock is available.
    pub fn lock_exclusive(path: &Path) -> Result<Self, CacheError> {
        let guard = ProcessGuard::Exclusive(process_lock_for_path(path).write());
        let file = open_lock_file(path)?;
        file.lock_exclusive()?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
            _guard: guard,
        })
    }

    /// Acquire a shared lock on `path`; any number of readers may hold it at once.
    pub fn lock_shared(path: &Path) -> Result<Self, CacheError> {
        let guard = ProcessGuard::Shared(process_lock_for_path(path).read());
        let file = open_lock_file(path)?;
        file.lock_shared()?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
            _guard: guard,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn open_lock_file(path: &Path) -> Result<File, CacheError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(path)?)
}

fn process_lock_for_path(path: &Path) -> &'static RwLock<()> {
    static PROCESS_LOCKS: OnceLock<Mutex<HashMap<PathBuf, &'static RwLock<()>>>> =
        OnceLock::new();
    let mut map = PROCESS_LOCKS
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock();
    if let Some(existing) = map.get(path) {
        return existing;
    }

    let lock: &'static RwLock<()> = Box::leak(Box::new(RwLock::new(())));
    map.insert(path.to_path_buf(), lock);
    lock
}
