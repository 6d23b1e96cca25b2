//! Relevance scoring: an implementation file should outrank its own test
//! file once the cycle reaches CODE_GREEN, and the signal weights used
//! to get there must sum to one.

use std::collections::HashMap;

use orchard::domain::models::{AgentType, FileNode, FileType, RelevanceSignals, TddState};
use orchard::services::context_filter::{ContextFilter, ContextFilterConfig, RelevanceRequest};

fn user_service() -> FileNode {
    let mut node = FileNode::new("user_service.py", FileType::Source, 512, "hash-1");
    node.classes.push("UserService".to_string());
    node.functions.push("create_user".to_string());
    node.functions.push("authenticate_user".to_string());
    node
}

fn test_user_service() -> FileNode {
    FileNode::new("test_user_service.py", FileType::Test, 256, "hash-2")
}

fn readme() -> FileNode {
    FileNode::new("README.md", FileType::Markdown, 128, "hash-3")
}

#[test]
fn implementation_outranks_its_test_file_in_code_green() {
    let filter = ContextFilter::new(ContextFilterConfig::default());
    let request = RelevanceRequest {
        agent_type: AgentType::Code,
        story_id: uuid::Uuid::new_v4(),
        search_terms: vec!["create_user".to_string(), "UserService".to_string()],
        focus_areas: vec![],
        tdd_phase: Some(TddState::CodeGreen),
    };
    let candidates = vec![user_service(), test_user_service(), readme()];

    let ranked = filter.select(&request, &candidates, &HashMap::new());

    assert_eq!(ranked[0].path, "user_service.py");
    assert!(ranked[0].total > 0.5, "expected total score > 0.5, got {}", ranked[0].total);

    let test_rank = ranked.iter().position(|f| f.path == "test_user_service.py");
    let impl_rank = ranked.iter().position(|f| f.path == "user_service.py").unwrap();
    if let Some(test_rank) = test_rank {
        assert!(test_rank > impl_rank, "test file should rank below the implementation for CODE_GREEN");
    }
}

#[test]
fn relevance_weights_sum_to_one_within_tolerance() {
    let (w1, w2, w3, w4, w5) = RelevanceSignals::WEIGHTS;
    assert!((w1 + w2 + w3 + w4 + w5 - 1.0).abs() < 1e-3);
}

#[test]
fn files_below_the_minimum_score_threshold_are_dropped() {
    let filter = ContextFilter::new(ContextFilterConfig { min_score_threshold: 0.9, max_files: 25, core_patterns: vec![] });
    let request = RelevanceRequest {
        agent_type: AgentType::Code,
        story_id: uuid::Uuid::new_v4(),
        search_terms: vec![],
        focus_areas: vec![],
        tdd_phase: None,
    };
    let ranked = filter.select(&request, &[readme()], &HashMap::new());
    assert!(ranked.is_empty());
}
