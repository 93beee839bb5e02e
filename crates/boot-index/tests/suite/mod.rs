use boot_cache::{LocalFs, OnDiskStore, Symbol, SymbolStore};
use boot_index::{
    path_to_uri, Indexer, IndexerOptions, JavaAnnotationScanner, ProjectDescriptor, ScanCounter,
    Scanner,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};
use tempfile::TempDir;

mod dependencies;
mod lifecycle;
mod persistence;
mod queries;

pub(crate) const T0: u64 = 1_700_000_000_000;

pub(crate) const MAIN_CLASS: &str = "package com.example;

import org.springframework.boot.autoconfigure.SpringBootApplication;

@SpringBootApplication
public class MainClass {
}
";

pub(crate) const HELLO_CONTROLLER: &str = "package com.example.web;

import org.springframework.web.bind.annotation.GetMapping;
import org.springframework.web.bind.annotation.RestController;

@RestController
public class HelloController {

\t@GetMapping(\"/hello\")
\tpublic String hello() {
\t\treturn \"hello\";
\t}
}
";

/// A `demo` project with the Maven layout inside a temporary directory.
pub(crate) struct Fixture {
    pub tmp: TempDir,
    pub root: PathBuf,
    pub counter: Arc<ScanCounter>,
}

impl Fixture {
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("demo");
        std::fs::create_dir_all(&root).unwrap();
        Self {
            tmp,
            root,
            counter: Arc::new(ScanCounter::new()),
        }
    }

    pub fn project(&self) -> ProjectDescriptor {
        ProjectDescriptor::maven_layout("demo", &self.root)
    }

    pub fn main_file(&self, relative: &str) -> PathBuf {
        self.root.join("src/main/java").join(relative)
    }

    pub fn test_file(&self, relative: &str) -> PathBuf {
        self.root.join("src/test/java").join(relative)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.tmp.path().join("cache/symbols")
    }

    pub fn disk_store(&self) -> Arc<dyn SymbolStore> {
        Arc::new(OnDiskStore::new(self.cache_dir(), Arc::new(LocalFs)).unwrap())
    }

    pub fn indexer(&self, store: Arc<dyn SymbolStore>) -> Indexer {
        self.indexer_with_scanner(store, Arc::new(JavaAnnotationScanner::new()))
    }

    pub fn indexer_with_scanner(
        &self,
        store: Arc<dyn SymbolStore>,
        scanner: Arc<dyn Scanner>,
    ) -> Indexer {
        let indexer =
            Indexer::new(store, Arc::new(LocalFs), scanner, IndexerOptions::default()).unwrap();
        indexer.set_scan_listener(Some(self.counter.clone()));
        indexer
    }
}

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

pub(crate) fn uri(path: &Path) -> String {
    path_to_uri(path)
}

pub(crate) fn labels(symbols: &[Symbol]) -> Vec<String> {
    let mut labels: Vec<String> = symbols.iter().map(|symbol| symbol.name.clone()).collect();
    labels.sort();
    labels
}

/// `@Component public class <name> extends <base> {}` in package `com.example`.
pub(crate) fn component(name: &str, base: Option<&str>) -> String {
    let extends = base.map(|base| format!(" extends {base}")).unwrap_or_default();
    format!(
        "package com.example;\n\nimport org.springframework.stereotype.Component;\n\n@Component\npublic class {name}{extends} {{\n}}\n"
    )
}
