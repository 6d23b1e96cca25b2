//! Relevance scoring engine.
//!
//! Consumes [`RelevanceSignals`] only — it never touches the context
//! store directly, so scoring stays decoupled from how files got indexed.

use std::collections::HashMap;

use crate::domain::models::{AgentType, FileNode, FileType, RelevanceSignals, TddState};

/// One agent request against the index.
#[derive(Debug, Clone)]
pub struct RelevanceRequest {
    pub agent_type: AgentType,
    pub story_id: uuid::Uuid,
    pub search_terms: Vec<String>,
    pub focus_areas: Vec<String>,
    pub tdd_phase: Option<TddState>,
}

/// A file scored against a [`RelevanceRequest`], carrying its signal
/// breakdown for diagnostics.
#[derive(Debug, Clone)]
pub struct ScoredFile {
    pub path: String,
    pub signals: RelevanceSignals,
    pub total: f64,
}

/// `(agent_type, story_id) -> recent context file lists`, most recent last.
/// Populated from agent-memory snapshots; the filter only reads it.
pub type HistoricalContexts = HashMap<(AgentType, uuid::Uuid), Vec<Vec<String>>>;

#[derive(Debug, Clone)]
pub struct ContextFilterConfig {
    pub min_score_threshold: f64,
    pub max_files: usize,
    pub core_patterns: Vec<String>,
}

impl Default for ContextFilterConfig {
    fn default() -> Self {
        Self {
            min_score_threshold: 0.1,
            max_files: 25,
            core_patterns: vec!["main".to_string(), "lib".to_string(), "mod".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContextFilter {
    config: ContextFilterConfig,
}

impl ContextFilter {
    pub fn new(config: ContextFilterConfig) -> Self {
        assert_weights_sum_to_one();
        Self { config }
    }

    /// Scores every candidate file and returns the ones that clear
    /// `min_score_threshold`, sorted by score descending, ties broken by
    /// path lexicographically, capped at `max_files`.
    pub fn select(
        &self,
        request: &RelevanceRequest,
        candidates: &[FileNode],
        history: &HistoricalContexts,
    ) -> Vec<ScoredFile> {
        let mut scored: Vec<ScoredFile> = candidates
            .iter()
            .map(|file| self.score(request, file, history))
            .filter(|s| s.total >= self.config.min_score_threshold)
            .collect();

        scored.sort_by(|a, b| {
            b.total
                .partial_cmp(&a.total)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.path.cmp(&b.path))
        });
        scored.truncate(self.config.max_files);
        scored
    }

    fn score(&self, request: &RelevanceRequest, file: &FileNode, history: &HistoricalContexts) -> ScoredFile {
        let signals = RelevanceSignals {
            direct_mention: direct_mention_score(request, file),
            dependency: dependency_score(request, file, &self.config.core_patterns),
            historical: historical_score(request, file, history),
            semantic: semantic_score(request.agent_type, file.file_type),
            tdd_phase: tdd_phase_score(request.tdd_phase, file),
        };
        ScoredFile {
            path: file.path.clone(),
            total: signals.total(),
            signals,
        }
    }
}

fn assert_weights_sum_to_one() {
    let (w1, w2, w3, w4, w5) = RelevanceSignals::WEIGHTS;
    assert!((w1 + w2 + w3 + w4 + w5 - 1.0).abs() < 1e-3, "relevance weights must sum to 1.0");
}

/// direct_mention: keyword frequency in path/name and content, capped per
/// term at 0.5, plus a bonus for exact `class X`/`def y` definitions.
fn direct_mention_score(request: &RelevanceRequest, file: &FileNode) -> f64 {
    if request.search_terms.is_empty() {
        return 0.0;
    }
    let haystack = file.path.to_lowercase();
    let mut score = 0.0;
    for term in &request.search_terms {
        let term = term.to_lowercase();
        if term.is_empty() {
            continue;
        }
        let occurrences = haystack.matches(&term).count();
        score += (occurrences as f64 * 0.25).min(0.5);
        if file.classes.iter().any(|c| c.to_lowercase() == term) || file.functions.iter().any(|f| f.to_lowercase() == term) {
            score += 0.2;
        }
    }
    (score / request.search_terms.len() as f64).min(1.0)
}

/// dependency: 1.0 if the file imports a focus term or is imported by a
/// file matching the request focus; +0.1 if it matches a "core" pattern.
fn dependency_score(request: &RelevanceRequest, file: &FileNode, core_patterns: &[String]) -> f64 {
    let mut score = 0.0;
    let imports_focus = file
        .imports
        .iter()
        .any(|imp| request.focus_areas.iter().any(|f| imp.contains(f.as_str())));
    let imported_by_focus = file
        .reverse_deps
        .iter()
        .any(|dep| request.focus_areas.iter().any(|f| dep.contains(f.as_str())));
    if imports_focus || imported_by_focus {
        score = 1.0;
    }
    if core_patterns.iter().any(|p| file.path.contains(p.as_str())) {
        score = (score + 0.1).min(1.0);
    }
    score
}

/// historical: fraction of recent contexts for `(agent_type, story_id)`
/// that included this file, with a bonus if it appeared in the last five.
fn historical_score(request: &RelevanceRequest, file: &FileNode, history: &HistoricalContexts) -> f64 {
    let Some(contexts) = history.get(&(request.agent_type, request.story_id)) else {
        return 0.0;
    };
    if contexts.is_empty() {
        return 0.0;
    }
    let hits = contexts.iter().filter(|c| c.iter().any(|p| p == &file.path)).count();
    let fraction = hits as f64 / contexts.len() as f64;
    let recent = contexts.iter().rev().take(5);
    let recent_bonus = if recent.clone().any(|c| c.iter().any(|p| p == &file.path)) {
        0.2
    } else {
        0.0
    };
    (fraction + recent_bonus).min(1.0)
}

/// semantic: fit between `FileType` and `agent_type`.
fn semantic_score(agent_type: AgentType, file_type: FileType) -> f64 {
    match (agent_type, file_type) {
        (AgentType::Qa, FileType::Test) => 1.0,
        (AgentType::Design, FileType::Markdown) => 1.0,
        (AgentType::Code, FileType::Source) => 1.0,
        (AgentType::Data, FileType::Json | FileType::Yaml) => 1.0,
        _ => 0.2,
    }
}

/// tdd_phase: `TEST_RED` favors tests, `CODE_GREEN` favors implementations,
/// `REFACTOR` weighs both; bonus for `refactor`/`cleanup`/`optimize` names.
fn tdd_phase_score(phase: Option<TddState>, file: &FileNode) -> f64 {
    let Some(phase) = phase else { return 0.0 };
    let base = match phase {
        TddState::TestRed => {
            if file.file_type == FileType::Test {
                1.0
            } else {
                0.0
            }
        }
        TddState::CodeGreen => {
            if file.file_type == FileType::Source {
                1.0
            } else {
                0.0
            }
        }
        TddState::Refactor => match file.file_type {
            FileType::Test | FileType::Source => 0.7,
            _ => 0.0,
        },
        TddState::Design | TddState::Commit => 0.0,
    };

    let lowered = file.path.to_lowercase();
    let name_bonus = if phase == TddState::Refactor
        && ["refactor", "cleanup", "optimize"].iter().any(|kw| lowered.contains(kw))
    {
        0.8
    } else {
        0.0
    };
    (base + name_bonus).min(1.0)
}

const TRUNCATION_MARKER: &str = "[content truncated]";

/// Result of narrowing a single file's content to a token budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredContent {
    pub text: String,
    pub truncated: bool,
}

/// Extracts the most relevant substructures of `content` for `request`,
/// keeping the result within `token_budget` whitespace-delimited tokens.
/// Source/test files rank top-level nodes and annotate each with its local
/// score; markdown is scored by heading section; anything else (and any
/// source file an AST scan can't find nodes in) falls back to a plain
/// word-budget cut.
pub fn filter_content(request: &RelevanceRequest, file: &FileNode, content: &str, token_budget: usize) -> FilteredContent {
    match file.file_type {
        FileType::Source | FileType::Test => filter_source_content(request, file.file_type, content, token_budget),
        FileType::Markdown => filter_markdown_content(request, content, token_budget),
        FileType::Json | FileType::Yaml | FileType::Config | FileType::Other => truncate_to_budget(content, token_budget),
    }
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn local_node_score(name: &str, search_terms: &[String]) -> f64 {
    if search_terms.is_empty() {
        return 0.0;
    }
    let lowered = name.to_lowercase();
    if search_terms.iter().any(|t| t.to_lowercase() == lowered) {
        return 1.0;
    }
    let hits = search_terms.iter().filter(|t| !t.is_empty() && lowered.contains(t.to_lowercase().as_str())).count();
    (hits as f64 * 0.5).min(1.0)
}

/// Splits source text into a leading import block plus a sequence of
/// top-level `fn`/`struct`/`class` nodes, each spanning from its header
/// line to the line before the next node (or EOF).
fn parse_source_nodes(content: &str) -> (Vec<String>, Vec<(String, String)>) {
    let lines: Vec<&str> = content.lines().collect();
    let mut imports = Vec::new();
    let mut nodes = Vec::new();
    let mut current: Option<(String, usize)> = None;

    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("use ").or_else(|| trimmed.strip_prefix("import ")) {
            imports.push(format!("use {};", rest.trim_end_matches(';')));
            continue;
        }
        let header = trimmed
            .strip_prefix("pub fn ")
            .or_else(|| trimmed.strip_prefix("fn "))
            .or_else(|| trimmed.strip_prefix("pub struct "))
            .or_else(|| trimmed.strip_prefix("struct "))
            .or_else(|| trimmed.strip_prefix("class "));
        if let Some(rest) = header {
            if let Some((name, start)) = current.take() {
                nodes.push((name, lines[start..i].join("\n")));
            }
            let name = rest
                .split(|c: char| c == '(' || c == '{' || c == ':' || c.is_whitespace())
                .next()
                .unwrap_or(rest)
                .trim()
                .to_string();
            current = Some((name, i));
        }
    }
    if let Some((name, start)) = current {
        nodes.push((name, lines[start..].join("\n")));
    }
    (imports, nodes)
}

fn filter_source_content(request: &RelevanceRequest, file_type: FileType, content: &str, token_budget: usize) -> FilteredContent {
    let (imports, nodes) = parse_source_nodes(content);
    if nodes.is_empty() {
        return truncate_to_budget(content, token_budget);
    }
    let relevance_label = if file_type == FileType::Test { "Test relevance" } else { "Relevance" };

    let mut scored: Vec<(f64, String)> = nodes
        .into_iter()
        .map(|(name, text)| (local_node_score(&name, &request.search_terms), text))
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut out = String::new();
    let mut budget_used = 0usize;
    for line in &imports {
        out.push_str(line);
        out.push('\n');
        budget_used += word_count(line);
    }
    if !imports.is_empty() {
        out.push('\n');
    }

    let mut truncated = false;
    for (score, text) in scored {
        let cost = word_count(&text);
        if budget_used > 0 && budget_used + cost > token_budget {
            truncated = true;
            break;
        }
        out.push_str(&text);
        out.push('\n');
        out.push_str(&format!("// {relevance_label}: {score:.2}\n\n"));
        budget_used += cost;
    }

    if truncated {
        append_truncation_marker(&mut out);
    }
    FilteredContent { text: out, truncated }
}

fn split_markdown_sections(content: &str) -> Vec<String> {
    let mut sections = Vec::new();
    let mut current = String::new();
    for line in content.lines() {
        if line.trim_start().starts_with('#') && !current.trim().is_empty() {
            sections.push(std::mem::take(&mut current));
        }
        current.push_str(line);
        current.push('\n');
    }
    if !current.trim().is_empty() {
        sections.push(current);
    }
    sections
}

fn section_score(section: &str, search_terms: &[String]) -> f64 {
    if search_terms.is_empty() {
        return 0.0;
    }
    let lowered = section.to_lowercase();
    let hits = search_terms.iter().filter(|t| !t.is_empty() && lowered.contains(t.to_lowercase().as_str())).count();
    (hits as f64 / search_terms.len() as f64).min(1.0)
}

fn filter_markdown_content(request: &RelevanceRequest, content: &str, token_budget: usize) -> FilteredContent {
    let sections = split_markdown_sections(content);
    if sections.is_empty() {
        return truncate_to_budget(content, token_budget);
    }
    let mut scored: Vec<(f64, String)> = sections.into_iter().map(|s| (section_score(&s, &request.search_terms), s)).collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut out = String::new();
    let mut budget_used = 0usize;
    let mut truncated = false;
    for (_, section) in scored {
        let cost = word_count(&section);
        if budget_used > 0 && budget_used + cost > token_budget {
            truncated = true;
            break;
        }
        out.push_str(&section);
        out.push('\n');
        budget_used += cost;
    }
    if truncated {
        append_truncation_marker(&mut out);
    }
    FilteredContent { text: out, truncated }
}

fn append_truncation_marker(out: &mut String) {
    while out.ends_with('\n') {
        out.pop();
    }
    out.push('\n');
    out.push_str(TRUNCATION_MARKER);
    out.push('\n');
}

/// Plain word-budget cut for content an AST/section scan can't narrow.
/// Prefers the last whole-word boundary; a budget of zero forces a hard
/// cut down to the marker alone.
fn truncate_to_budget(content: &str, token_budget: usize) -> FilteredContent {
    if word_count(content) <= token_budget {
        return FilteredContent { text: content.to_string(), truncated: false };
    }
    if token_budget == 0 {
        return FilteredContent { text: TRUNCATION_MARKER.to_string(), truncated: true };
    }
    let mut kept = String::new();
    for word in content.split_whitespace().take(token_budget) {
        if !kept.is_empty() {
            kept.push(' ');
        }
        kept.push_str(word);
    }
    kept.push(' ');
    kept.push_str(TRUNCATION_MARKER);
    FilteredContent { text: kept, truncated: true }
}
