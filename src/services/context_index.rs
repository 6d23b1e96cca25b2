//! Durable file index: build protocol and query surface.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::domain::errors::OrchardResult;
use crate::domain::models::{FileNode, FileType, MatchType, RelationType, SearchKind, SearchResult};
use crate::domain::ports::ContextStore;

const IGNORE_DIRS: &[&str] = &["__pycache__", ".git", ".hg", ".svn", "target", "node_modules", "venv", ".venv"];
const MAX_FILE_SIZE: u64 = 1024 * 1024;

pub struct ContextIndex {
    store: Arc<dyn ContextStore>,
    root: PathBuf,
    state_dir_name: String,
}

impl ContextIndex {
    pub fn new(store: Arc<dyn ContextStore>, root: PathBuf, state_dir_name: impl Into<String>) -> Self {
        Self {
            store,
            root,
            state_dir_name: state_dir_name.into(),
        }
    }

    fn is_ignored(&self, path: &Path) -> bool {
        for component in path.components() {
            let Some(name) = component.as_os_str().to_str() else { continue };
            if name == self.state_dir_name {
                continue;
            }
            if name.starts_with('.') || IGNORE_DIRS.contains(&name) {
                return true;
            }
        }
        false
    }

    /// Walks the project root, indexing files that pass the build-protocol
    /// filters. Unchanged files (same mtime+hash) are skipped; files that
    /// disappeared since the last scan are removed.
    pub async fn build(&self, force: bool) -> OrchardResult<usize> {
        let mut seen = std::collections::HashSet::new();
        let mut indexed = 0usize;

        for entry in walk(&self.root) {
            let relative = entry.strip_prefix(&self.root).unwrap_or(&entry).to_path_buf();
            if self.is_ignored(&relative) {
                continue;
            }
            let Ok(metadata) = std::fs::metadata(&entry) else { continue };
            if !metadata.is_file() || metadata.len() > MAX_FILE_SIZE {
                continue;
            }

            let path_str = relative.to_string_lossy().to_string();
            seen.insert(path_str.clone());

            let mtime: DateTime<Utc> = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());
            let Ok(content) = std::fs::read(&entry) else { continue };
            let hash = content_hash(&content);

            if !force {
                if let Some(existing) = self.store.get_file(&path_str).await? {
                    if existing.matches_scan(mtime, &hash) {
                        continue;
                    }
                }
            }

            let file_type = FileType::classify(&relative);
            let mut node = FileNode::new(path_str.clone(), file_type, metadata.len(), hash);
            node.modified_at = mtime;
            extract_structure(&mut node, &content, file_type);

            self.store.upsert_file(&node).await?;
            indexed += 1;
        }

        for existing in self.store.all_files().await? {
            if !seen.contains(&existing.path) {
                self.store.remove_file(&existing.path).await?;
                debug!(path = %existing.path, "removed stale index entry");
            }
        }

        self.store.record_scan(Utc::now()).await?;
        info!(indexed, "context index build complete");
        Ok(indexed)
    }

    pub async fn search(
        &self,
        query: &str,
        kind: SearchKind,
        max_results: usize,
        include_content: bool,
    ) -> OrchardResult<Vec<SearchResult>> {
        let needle = query.to_lowercase();
        if needle.len() <= 2 && kind == SearchKind::Content {
            return Ok(Vec::new());
        }

        let mut results = Vec::new();
        for file in self.store.all_files().await? {
            let (score, match_type, matches) = match kind {
                SearchKind::Functions => match_names(&needle, &file.functions),
                SearchKind::Classes => match_names(&needle, &file.classes),
                SearchKind::Imports => match_names(&needle, &file.imports),
                SearchKind::Content | SearchKind::All => {
                    let path_match = match_names(&needle, std::slice::from_ref(&file.path));
                    if path_match.0 > 0.0 {
                        path_match
                    } else {
                        match_names(
                            &needle,
                            &[file.functions.clone(), file.classes.clone(), file.imports.clone()].concat(),
                        )
                    }
                }
            };
            if score <= 0.0 {
                continue;
            }
            results.push(SearchResult {
                file_path: file.path.clone(),
                score,
                match_type,
                matches,
                context: include_content.then(|| format!("{} matches", file.path)),
            });
        }

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(max_results);
        Ok(results)
    }

    pub async fn get_file_dependencies(
        &self,
        path: &str,
        depth: usize,
        include_reverse: bool,
    ) -> OrchardResult<Vec<String>> {
        let mut frontier = vec![path.to_string()];
        let mut visited = std::collections::HashSet::new();
        let mut out = Vec::new();

        for _ in 0..depth.max(1) {
            let mut next = Vec::new();
            for node in &frontier {
                for edge in self.store.forward_dependencies(node).await? {
                    if visited.insert(edge.target.clone()) {
                        out.push(edge.target.clone());
                        next.push(edge.target);
                    }
                }
                if include_reverse {
                    for edge in self.store.reverse_dependencies(node).await? {
                        if visited.insert(edge.source.clone()) {
                            out.push(edge.source.clone());
                            next.push(edge.source);
                        }
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
        Ok(out)
    }

    pub async fn get_file_structure(&self, path: &str) -> OrchardResult<Option<FileNode>> {
        self.store.get_file(path).await
    }

    /// Every indexed file, for callers (e.g. the context filter) that need
    /// the full candidate set rather than a search result.
    pub async fn all_files(&self) -> OrchardResult<Vec<FileNode>> {
        self.store.all_files().await
    }

    pub async fn find_related_files(
        &self,
        path: &str,
        relation_types: &[RelationType],
        max_results: usize,
    ) -> OrchardResult<Vec<String>> {
        let mut related = Vec::new();
        let Some(node) = self.store.get_file(path).await? else {
            return Ok(related);
        };

        for relation in relation_types {
            match relation {
                RelationType::Dependency => related.extend(node.forward_deps.iter().cloned()),
                RelationType::ReverseDependency => related.extend(node.reverse_deps.iter().cloned()),
                RelationType::SimilarStructure | RelationType::SharedImports => {
                    for other in self.store.all_files().await? {
                        if other.path == path {
                            continue;
                        }
                        let matches = match relation {
                            RelationType::SimilarStructure => other.file_type == node.file_type,
                            RelationType::SharedImports => other.imports.iter().any(|i| node.imports.contains(i)),
                            _ => false,
                        };
                        if matches {
                            related.push(other.path);
                        }
                    }
                }
            }
        }

        related.sort();
        related.dedup();
        related.truncate(max_results);
        Ok(related)
    }

    pub async fn track_file_access(&self, path: &str) -> OrchardResult<()> {
        self.store.track_access(path).await
    }
}

fn content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

fn match_names(needle: &str, haystack: &[String]) -> (f64, MatchType, Vec<String>) {
    let mut matches = Vec::new();
    let mut best = (0.0, MatchType::Fuzzy);
    for candidate in haystack {
        let lowered = candidate.to_lowercase();
        if lowered == needle {
            matches.push(candidate.clone());
            best = (1.0, MatchType::Exact);
        } else if lowered.contains(needle) {
            matches.push(candidate.clone());
            if best.0 < 0.6 {
                best = (0.6, MatchType::Partial);
            }
        }
    }
    (best.0, best.1, matches)
}

fn extract_structure(node: &mut FileNode, content: &[u8], file_type: FileType) {
    let Ok(text) = std::str::from_utf8(content) else {
        return;
    };
    match file_type {
        FileType::Source | FileType::Test => {
            for line in text.lines() {
                let trimmed = line.trim();
                if let Some(rest) = trimmed.strip_prefix("use ").or_else(|| trimmed.strip_prefix("import ")) {
                    node.imports.push(rest.trim_end_matches(';').to_string());
                } else if let Some(rest) = trimmed.strip_prefix("fn ").or_else(|| trimmed.strip_prefix("pub fn ")) {
                    if let Some(name) = rest.split('(').next() {
                        node.functions.push(name.trim().to_string());
                    }
                } else if let Some(rest) = trimmed
                    .strip_prefix("struct ")
                    .or_else(|| trimmed.strip_prefix("pub struct "))
                    .or_else(|| trimmed.strip_prefix("class "))
                {
                    if let Some(name) = rest.split(|c: char| c.is_whitespace() || c == '{' || c == '(').next() {
                        node.classes.push(name.trim().to_string());
                    }
                }
            }
        }
        FileType::Json => {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(text) {
                if let Some(obj) = value.as_object() {
                    node.exports = obj.keys().take(20).cloned().collect();
                }
            }
        }
        FileType::Yaml => {
            if let Ok(value) = serde_yaml::from_str::<serde_yaml::Value>(text) {
                if let Some(mapping) = value.as_mapping() {
                    node.exports = mapping.keys().filter_map(|k| k.as_str()).take(20).map(str::to_string).collect();
                }
            }
        }
        FileType::Markdown | FileType::Config | FileType::Other => {}
    }
}

fn walk(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else { continue };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                out.push(path);
            }
        }
    }
    out
}
