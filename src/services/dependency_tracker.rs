//! Forward-dependency discovery and debounced file watching.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use crate::domain::errors::OrchardResult;
use crate::domain::models::DependencyEdge;
use crate::domain::ports::ContextStore;

/// How a related file should be reconciled once its counterpart changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateRecommendation {
    CreateTest,
    UpdateTest,
    UpdateDocumentation,
    Manual,
}

#[derive(Debug, Clone, Default)]
pub struct RelatedFiles {
    pub tests: Vec<String>,
    pub docs: Vec<String>,
    pub code: Vec<String>,
    pub config: Vec<String>,
}

/// Convention-based path mappings, e.g. `tests/unit/test_<name>.py <->
/// lib/<name>.py`. Grounded on the original tracker's `naming_conventions`
/// table; generalized here to source-extension-agnostic stems.
pub struct DependencyTracker {
    store: Arc<dyn ContextStore>,
    root: PathBuf,
}

impl DependencyTracker {
    pub fn new(store: Arc<dyn ContextStore>, root: PathBuf) -> Self {
        Self { store, root }
    }

    /// Scans the whole tree once, extracting forward edges per file and
    /// persisting them via the context store.
    pub async fn scan(&self) -> OrchardResult<usize> {
        let mut edges = 0usize;
        for path in walk(&self.root) {
            if let Some(found) = self.extract_edges(&path) {
                let relative = path.strip_prefix(&self.root).unwrap_or(&path).to_string_lossy().to_string();
                edges += found.len();
                self.store.replace_dependencies(&relative, found).await?;
            }
        }
        Ok(edges)
    }

    fn extract_edges(&self, path: &Path) -> Option<Vec<DependencyEdge>> {
        let content = std::fs::read_to_string(path).ok()?;
        let relative = path.strip_prefix(&self.root).unwrap_or(path).to_string_lossy().to_string();
        let mut edges = Vec::new();

        for (line_no, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if let Some(rest) = trimmed.strip_prefix("use ").or_else(|| trimmed.strip_prefix("import ")) {
                let target = rest.trim_end_matches(';').split("::").next().unwrap_or(rest).to_string();
                edges.push(DependencyEdge {
                    source: relative.clone(),
                    target,
                    import_kind: "import".to_string(),
                    line: line_no as u32 + 1,
                    strength: 0.9,
                });
            }
        }

        if let Some(convention_target) = convention_counterpart(&relative) {
            edges.push(DependencyEdge {
                source: relative.clone(),
                target: convention_target,
                import_kind: "convention".to_string(),
                line: 0,
                strength: 0.6,
            });
        }

        Some(edges)
    }

    /// Categorizes a file's related files and recommends an action for
    /// each. The tracker never applies recommendations itself.
    pub async fn find_related_files(&self, path: &str) -> OrchardResult<(RelatedFiles, HashMap<String, UpdateRecommendation>)> {
        let mut related = RelatedFiles::default();
        let mut recommendations = HashMap::new();

        let forward = self.store.forward_dependencies(path).await?;
        let reverse = self.store.reverse_dependencies(path).await?;

        for edge in forward.iter().chain(reverse.iter()) {
            let other = if edge.source == path { &edge.target } else { &edge.source };
            classify_into(other, &mut related);
        }

        if let Some(counterpart) = convention_counterpart(path) {
            let exists = self.root.join(&counterpart).exists();
            let recommendation = if counterpart.contains("test") {
                if exists {
                    UpdateRecommendation::UpdateTest
                } else {
                    UpdateRecommendation::CreateTest
                }
            } else if counterpart.ends_with(".md") {
                UpdateRecommendation::UpdateDocumentation
            } else {
                UpdateRecommendation::Manual
            };
            recommendations.insert(counterpart.clone(), recommendation);
            classify_into(&counterpart, &mut related);
        }

        Ok((related, recommendations))
    }

    /// Spawns the debounced watcher. `on_change` fires once per coalesced
    /// batch of source-path edits, after waiting `debounce` with no new
    /// events for that path.
    pub fn spawn_watcher(
        self: Arc<Self>,
        debounce: Duration,
    ) -> OrchardResult<mpsc::Receiver<Vec<String>>> {
        use notify::{RecursiveMode, Watcher};

        let (raw_tx, mut raw_rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                let _ = raw_tx.send(event);
            }
        })
        .map_err(|e| crate::domain::errors::OrchardError::ContextBackgroundError(e.to_string()))?;
        watcher
            .watch(&self.root, RecursiveMode::Recursive)
            .map_err(|e| crate::domain::errors::OrchardError::ContextBackgroundError(e.to_string()))?;

        let (batch_tx, batch_rx) = mpsc::channel(16);
        let pending: Arc<Mutex<HashMap<String, ()>>> = Arc::new(Mutex::new(HashMap::new()));

        tokio::spawn(async move {
            // Keep the watcher alive for the lifetime of the task.
            let _watcher = watcher;
            loop {
                let Some(event) = raw_rx.recv().await else { break };
                let mut paths = Vec::new();
                for path in event.paths {
                    if let Ok(relative) = path.strip_prefix(&self.root) {
                        paths.push(relative.to_string_lossy().to_string());
                    }
                }
                if paths.is_empty() {
                    continue;
                }

                {
                    let mut guard = pending.lock().await;
                    for p in &paths {
                        guard.insert(p.clone(), ());
                    }
                }

                let pending = pending.clone();
                let batch_tx = batch_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(debounce).await;
                    let mut guard = pending.lock().await;
                    if guard.is_empty() {
                        return;
                    }
                    let batch: Vec<String> = guard.drain().map(|(k, _)| k).collect();
                    drop(guard);
                    if batch_tx.send(batch).await.is_err() {
                        debug!("watcher receiver dropped");
                    }
                });
            }
            warn!("dependency tracker watcher stream ended");
        });

        Ok(batch_rx)
    }
}

fn classify_into(path: &str, related: &mut RelatedFiles) {
    if path.contains("test") {
        related.tests.push(path.to_string());
    } else if path.ends_with(".md") {
        related.docs.push(path.to_string());
    } else if path.ends_with(".toml") || path.ends_with(".yaml") || path.ends_with(".yml") {
        related.config.push(path.to_string());
    } else {
        related.code.push(path.to_string());
    }
}

/// `tests/unit/test_<name>.<ext> <-> src/<name>.<ext>`, `docs/<name>.md <->
/// src/<name>.<ext>`. Returns the counterpart path for whichever side
/// `path` is on.
fn convention_counterpart(path: &str) -> Option<String> {
    let p = Path::new(path);
    let stem = p.file_stem()?.to_str()?;
    let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("rs");

    if let Some(name) = stem.strip_prefix("test_") {
        return Some(format!("src/{name}.{ext}"));
    }
    if path.starts_with("tests/") {
        return Some(format!("src/{stem}.{ext}"));
    }
    if path.starts_with("docs/") && ext == "md" {
        return Some(format!("src/{stem}.rs"));
    }
    if path.starts_with("src/") {
        return Some(format!("tests/test_{stem}.{ext}"));
    }
    None
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_maps_to_src_counterpart() {
        assert_eq!(convention_counterpart("tests/test_widget.rs"), Some("src/widget.rs".to_string()));
    }

    #[test]
    fn src_file_maps_to_test_counterpart() {
        assert_eq!(convention_counterpart("src/widget.rs"), Some("tests/test_widget.rs".to_string()));
    }

    #[test]
    fn classify_into_buckets_by_extension_and_naming() {
        let mut related = RelatedFiles::default();
        classify_into("tests/test_widget.rs", &mut related);
        classify_into("docs/widget.md", &mut related);
        classify_into("Cargo.toml", &mut related);
        classify_into("src/widget.rs", &mut related);
        assert_eq!(related.tests.len(), 1);
        assert_eq!(related.docs.len(), 1);
        assert_eq!(related.config.len(), 1);
        assert_eq!(related.code.len(), 1);
    }
}
