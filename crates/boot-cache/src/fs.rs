use crate::util::system_time_millis;
use std::io;
use std::path::Path;

/// File system view used for every staleness decision.
///
/// Caches and indexers never call `std::fs` for source files directly; tests and
/// editors substitute their own implementation (in-memory overlays, fixed clocks).
pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    /// Last modification time of `path` in milliseconds since the unix epoch.
    fn last_modified_millis(&self, path: &Path) -> io::Result<u64>;

    fn read_bytes(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Reads the file contents as UTF-8 text.
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = self.read_bytes(path)?;
        String::from_utf8(bytes).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }
}

/// Local OS file system implementation.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalFs;

impl LocalFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn last_modified_millis(&self, path: &Path) -> io::Result<u64> {
        let meta = std::fs::metadata(path)?;
        Ok(system_time_millis(meta.modified()?))
    }

    fn read_bytes(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}
