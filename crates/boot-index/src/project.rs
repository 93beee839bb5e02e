//! Projects: named source trees with a classpath.
//!
//! A project owns every `.java` file below one of its source folders. The cache key of
//! a project changes whenever its classpath does, so a dependency upgrade starts from
//! a clean index.

use boot_cache::{CacheError, CacheKey, FileSystem};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const JAVA_EXTENSION: &str = "java";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Main,
    Test,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFolder {
    /// Absolute, or relative to the project root.
    pub path: PathBuf,
    pub kind: SourceKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDescriptor {
    pub name: String,
    pub root: PathBuf,
    #[serde(default)]
    pub source_folders: Vec<SourceFolder>,
    /// Binary classpath roots (jars, class directories).
    #[serde(default)]
    pub classpath: Vec<PathBuf>,
}

impl ProjectDescriptor {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            source_folders: Vec::new(),
            classpath: Vec::new(),
        }
    }

    /// A project with the conventional `src/main/java` and `src/test/java` folders.
    pub fn maven_layout(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self::new(name, root)
            .with_source_folder("src/main/java", SourceKind::Main)
            .with_source_folder("src/test/java", SourceKind::Test)
    }

    pub fn with_source_folder(mut self, path: impl Into<PathBuf>, kind: SourceKind) -> Self {
        self.source_folders.push(SourceFolder {
            path: path.into(),
            kind,
        });
        self
    }

    pub fn with_classpath_entry(mut self, entry: impl Into<PathBuf>) -> Self {
        self.classpath.push(entry.into());
        self
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.root)
    }

    /// The source folder `path` lives in, preferring the innermost one.
    pub fn source_kind_of(&self, path: &Path) -> Option<SourceKind> {
        self.source_folders
            .iter()
            .map(|folder| (self.resolve(&folder.path), folder.kind))
            .filter(|(folder, _)| path.starts_with(folder))
            .max_by_key(|(folder, _)| folder.components().count())
            .map(|(_, kind)| kind)
    }

    /// Whether `path` is a Java source the index should track.
    pub fn is_indexable(&self, path: &Path, scan_test_sources: bool) -> bool {
        if path.extension().and_then(|ext| ext.to_str()) != Some(JAVA_EXTENSION) {
            return false;
        }
        match self.source_kind_of(path) {
            Some(SourceKind::Main) => true,
            Some(SourceKind::Test) => scan_test_sources,
            None => false,
        }
    }

    /// All Java files in the active source folders, sorted.
    pub fn java_files(&self, scan_test_sources: bool) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self
            .source_folders
            .iter()
            .filter(|folder| folder.kind == SourceKind::Main || scan_test_sources)
            .flat_map(|folder| walk_java_files(&self.resolve(&folder.path)))
            // Nested source folders would otherwise contribute the same file twice.
            .filter(|path| self.is_indexable(path, scan_test_sources))
            .collect();
        files.sort();
        files.dedup();
        files
    }

    /// Java files in test source folders only.
    pub fn test_java_files(&self) -> Vec<PathBuf> {
        self.java_files(true)
            .into_iter()
            .filter(|path| self.source_kind_of(path) == Some(SourceKind::Test))
            .collect()
    }

    /// `path#mtime` of every existing classpath entry, comma separated.
    pub fn classpath_identity(&self, fs: &dyn FileSystem) -> String {
        self.classpath
            .iter()
            .map(|entry| self.resolve(entry))
            .filter_map(|entry| {
                let millis = fs.last_modified_millis(&entry).ok()?;
                Some(format!("{}#{millis}", entry.display()))
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    /// `<name>-java-<HEX>`, where `HEX` hashes [`Self::classpath_identity`].
    pub fn cache_key(&self, fs: &dyn FileSystem) -> Result<CacheKey, CacheError> {
        let digest = Sha256::digest(self.classpath_identity(fs).as_bytes());
        CacheKey::new(
            format!("{}-java", self.name),
            hex::encode_upper(digest),
        )
    }
}

fn walk_java_files(folder: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(folder)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::debug!(
                    target = "boot.index",
                    error = %err,
                    "skipping unreadable source entry"
                );
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some(JAVA_EXTENSION))
}

/// The project whose root is the longest prefix of `path`.
pub fn owning_project<'a>(
    projects: impl IntoIterator<Item = &'a ProjectDescriptor>,
    path: &Path,
) -> Option<&'a ProjectDescriptor> {
    projects
        .into_iter()
        .filter(|project| project.contains(path))
        .max_by_key(|project| project.root.components().count())
}

pub fn path_to_uri(path: &Path) -> String {
    match url::Url::from_file_path(path) {
        Ok(url) => url.to_string(),
        Err(()) => format!("file://{}", path.display()),
    }
}

pub fn uri_to_path(uri: &str) -> Option<PathBuf> {
    url::Url::parse(uri).ok()?.to_file_path().ok()
}
