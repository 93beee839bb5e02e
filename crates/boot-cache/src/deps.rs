use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Per-file dependency tokens observed by the last scan of each file.
///
/// Tokens are opaque to the cache (typically fully-qualified type names). Setting a
/// file's tokens replaces whatever was recorded before; an empty set removes the file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyGraph {
    edges: BTreeMap<PathBuf, BTreeSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the tokens recorded for `file`.
    pub fn set(&mut self, file: impl Into<PathBuf>, tokens: impl IntoIterator<Item = String>) {
        let file = file.into();
        let tokens: BTreeSet<String> = tokens.into_iter().collect();
        if tokens.is_empty() {
            self.edges.remove(&file);
        } else {
            self.edges.insert(file, tokens);
        }
    }

    pub fn insert(&mut self, file: impl Into<PathBuf>, token: impl Into<String>) {
        self.edges
            .entry(file.into())
            .or_default()
            .insert(token.into());
    }

    pub fn remove(&mut self, file: &Path) -> Option<BTreeSet<String>> {
        self.edges.remove(file)
    }

    pub fn get(&self, file: &Path) -> Option<&BTreeSet<String>> {
        self.edges.get(file)
    }

    pub fn tokens(&self, file: &Path) -> impl Iterator<Item = &str> {
        self.edges
            .get(file)
            .into_iter()
            .flat_map(|tokens| tokens.iter().map(String::as_str))
    }

    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.edges.keys().map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &BTreeSet<String>)> {
        self.edges.iter().map(|(file, tokens)| (file.as_path(), tokens))
    }

    /// Files (other than those in `exclude`) that depend on any of `tokens`.
    pub fn dependents_of<'a>(
        &'a self,
        tokens: &'a BTreeSet<String>,
        exclude: &'a BTreeSet<PathBuf>,
    ) -> impl Iterator<Item = &'a Path> + 'a {
        self.edges
            .iter()
            .filter(move |(file, _)| !exclude.contains(*file))
            .filter(move |(_, deps)| !deps.is_disjoint(tokens))
            .map(|(file, _)| file.as_path())
    }

    pub fn retain_files(&mut self, mut keep: impl FnMut(&Path) -> bool) {
        self.edges.retain(|file, _| keep(file));
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

impl FromIterator<(PathBuf, String)> for DependencyGraph {
    fn from_iter<T: IntoIterator<Item = (PathBuf, String)>>(iter: T) -> Self {
        let mut graph = DependencyGraph::new();
        for (file, token) in iter {
            graph.insert(file, token);
        }
        graph
    }
}
