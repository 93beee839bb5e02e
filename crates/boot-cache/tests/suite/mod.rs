use boot_cache::{Location, Position, Range, Symbol, SymbolKind, SymbolRecord};
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};

mod cache_key;
mod timestamp_store;

pub(crate) const T0: u64 = 1_700_000_000_000;

/// Writes `contents` to `path` and pins its modification time to `millis`.
pub(crate) fn write_at(path: &Path, contents: &str, millis: u64) -> PathBuf {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
    touch(path, millis);
    path.to_path_buf()
}

pub(crate) fn touch(path: &Path, millis: u64) {
    std::fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(UNIX_EPOCH + Duration::from_millis(millis))
        .unwrap();
}

pub(crate) fn symbol(file: &Path, name: &str, line: u32) -> SymbolRecord {
    SymbolRecord::new(
        file,
        T0,
        Symbol::new(
            name,
            SymbolKind::Annotation,
            Location {
                uri: format!("file://{}", file.display()),
                range: Range::new(Position::new(line, 0), Position::new(line, 10)),
            },
        ),
    )
}

pub(crate) fn names(symbols: &[SymbolRecord]) -> Vec<&str> {
    let mut names: Vec<_> = symbols.iter().map(|s| s.symbol.name.as_str()).collect();
    names.sort();
    names
}
