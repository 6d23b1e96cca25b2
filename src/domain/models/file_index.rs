//! Context index entities: file nodes, dependency edges, and search results.
//!
//! These types are shared by [`crate::domain::ports::context_store`] (the
//! persistence port) and [`crate::services::context_filter`] (the scoring
//! engine). Neither module depends on the other directly; both depend only
//! on this neutral data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Coarse file classification used for semantic relevance scoring and
/// AST/structural extraction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Source,
    Test,
    Markdown,
    Json,
    Yaml,
    Config,
    Other,
}

impl FileType {
    /// Classifies a path by extension and naming convention, mirroring the
    /// teacher's dependency tracker's `naming_conventions` heuristic.
    pub fn classify(path: &std::path::Path) -> Self {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        if name.contains("test_") || name.ends_with("_test") || name.contains(".test.") {
            return Self::Test;
        }
        match ext {
            "md" | "markdown" => Self::Markdown,
            "json" => Self::Json,
            "yaml" | "yml" => Self::Yaml,
            "toml" | "ini" | "cfg" | "conf" => Self::Config,
            "rs" | "py" | "js" | "ts" | "go" | "java" => Self::Source,
            _ => Self::Other,
        }
    }
}

/// A single file's extracted metadata and structure, keyed by path in the
/// context store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileNode {
    pub path: String,
    pub file_type: FileType,
    pub size: u64,
    pub modified_at: DateTime<Utc>,
    pub content_hash: String,
    pub imports: Vec<String>,
    pub exports: Vec<String>,
    pub classes: Vec<String>,
    pub functions: Vec<String>,
    pub forward_deps: HashSet<String>,
    pub reverse_deps: HashSet<String>,
    pub access_count: u64,
    pub last_accessed: Option<DateTime<Utc>>,
}

impl FileNode {
    pub fn new(path: impl Into<String>, file_type: FileType, size: u64, content_hash: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            file_type,
            size,
            modified_at: Utc::now(),
            content_hash: content_hash.into(),
            imports: Vec::new(),
            exports: Vec::new(),
            classes: Vec::new(),
            functions: Vec::new(),
            forward_deps: HashSet::new(),
            reverse_deps: HashSet::new(),
            access_count: 0,
            last_accessed: None,
        }
    }

    /// Incrementally up to date iff neither mtime nor content hash changed.
    pub fn matches_scan(&self, mtime: DateTime<Utc>, hash: &str) -> bool {
        self.modified_at == mtime && self.content_hash == hash
    }

    pub fn track_access(&mut self) {
        self.access_count += 1;
        self.last_accessed = Some(Utc::now());
    }
}

/// One recorded dependency relationship: `source` imports/references
/// `target`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub source: String,
    pub target: String,
    pub import_kind: String,
    pub line: u32,
    /// Confidence the edge is a genuine dependency, in `[0, 1]`.
    pub strength: f64,
}

/// Kind of search requested against the inverted indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    Functions,
    Classes,
    Imports,
    Content,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Exact,
    Partial,
    Semantic,
    Fuzzy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub file_path: String,
    pub score: f64,
    pub match_type: MatchType,
    pub matches: Vec<String>,
    pub context: Option<String>,
}

/// How two files are related, for `find_related_files`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    Dependency,
    ReverseDependency,
    SimilarStructure,
    SharedImports,
}

/// The five independently-weighted relevance signals. Weights
/// are asserted to sum to 1.0 in [`crate::services::context_filter`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RelevanceSignals {
    pub direct_mention: f64,
    pub dependency: f64,
    pub historical: f64,
    pub semantic: f64,
    pub tdd_phase: f64,
}

impl RelevanceSignals {
    pub const WEIGHTS: (f64, f64, f64, f64, f64) = (0.40, 0.25, 0.20, 0.10, 0.05);

    pub fn total(self) -> f64 {
        let (w1, w2, w3, w4, w5) = Self::WEIGHTS;
        self.direct_mention * w1
            + self.dependency * w2
            + self.historical * w3
            + self.semantic * w4
            + self.tdd_phase * w5
    }
}
