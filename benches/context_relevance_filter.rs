//! Scoring throughput of [`ContextFilter::select`] as the
//! candidate file set grows.

use std::collections::HashMap;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use orchard::domain::models::{AgentType, FileNode, FileType, TddState};
use orchard::services::{ContextFilter, ContextFilterConfig, RelevanceRequest};

fn candidate_set(count: usize) -> Vec<FileNode> {
    (0..count)
        .map(|i| {
            let file_type = match i % 4 {
                0 => FileType::Source,
                1 => FileType::Test,
                2 => FileType::Markdown,
                _ => FileType::Other,
            };
            let mut node = FileNode::new(format!("module_{i}/file_{i}.py"), file_type, 1024, format!("hash-{i}"));
            node.classes.push(format!("Service{i}"));
            node.functions.push(format!("handle_{i}"));
            if i > 0 {
                node.imports.push(format!("module_{}", i - 1));
            }
            node
        })
        .collect()
}

fn bench_select_scales_with_candidate_count(c: &mut Criterion) {
    let filter = ContextFilter::new(ContextFilterConfig::default());
    let request = RelevanceRequest {
        agent_type: AgentType::Code,
        story_id: uuid::Uuid::new_v4(),
        search_terms: vec!["service".to_string(), "handle".to_string()],
        focus_areas: vec!["module_5".to_string()],
        tdd_phase: Some(TddState::CodeGreen),
    };
    let history = HashMap::new();

    let mut group = c.benchmark_group("select_by_candidate_count");
    for count in [50, 500, 5_000] {
        let candidates = candidate_set(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &candidates, |b, candidates| {
            b.iter(|| filter.select(&request, candidates, &history));
        });
    }
    group.finish();
}

fn bench_select_with_historical_contexts(c: &mut Criterion) {
    let filter = ContextFilter::new(ContextFilterConfig::default());
    let story_id = uuid::Uuid::new_v4();
    let request = RelevanceRequest {
        agent_type: AgentType::Qa,
        story_id,
        search_terms: vec!["handle".to_string()],
        focus_areas: vec![],
        tdd_phase: Some(TddState::TestRed),
    };
    let candidates = candidate_set(1_000);

    let mut history = HashMap::new();
    let recent_contexts: Vec<Vec<String>> =
        (0..20).map(|i| vec![candidates[i % candidates.len()].path.clone()]).collect();
    history.insert((AgentType::Qa, story_id), recent_contexts);

    c.bench_function("select_1000_candidates_with_history", |b| {
        b.iter(|| filter.select(&request, &candidates, &history));
    });
}

criterion_group!(benches, bench_select_scales_with_candidate_count, bench_select_with_historical_contexts);
criterion_main!(benches);
