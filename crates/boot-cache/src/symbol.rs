use crate::add_on::AddOn;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Zero-based line/character position inside a document.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub uri: String,
    pub range: Range,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Class,
    Interface,
    Method,
    Field,
    Constructor,
    Constant,
    Key,
    Annotation,
}

/// A symbol as shown to users: a label, a kind and where it lives.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub location: Location,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, location: Location) -> Self {
        Self {
            name: name.into(),
            kind,
            location,
        }
    }
}

/// One discovered symbol together with the file it was discovered in.
///
/// The owning file is what ties a record to the per-file timestamp table: replacing a
/// file's data replaces exactly the records whose `owner_file` is that file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub owner_file: PathBuf,
    pub last_modified: u64,
    pub symbol: Symbol,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_ons: Option<Vec<AddOn>>,
}

impl SymbolRecord {
    pub fn new(owner_file: impl Into<PathBuf>, last_modified: u64, symbol: Symbol) -> Self {
        Self {
            owner_file: owner_file.into(),
            last_modified,
            symbol,
            add_ons: None,
        }
    }

    pub fn with_add_ons(mut self, add_ons: Vec<AddOn>) -> Self {
        self.add_ons = if add_ons.is_empty() {
            None
        } else {
            Some(add_ons)
        };
        self
    }

    pub fn add_ons(&self) -> &[AddOn] {
        self.add_ons.as_deref().unwrap_or(&[])
    }

    pub fn uri(&self) -> &str {
        &self.symbol.location.uri
    }
}
