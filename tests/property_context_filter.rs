//! Property tests for the relevance-scoring engine's ordering and
//! threshold guarantees, independent of any fixed example set.

use std::collections::HashMap;

use orchard::domain::models::{AgentType, FileNode, FileType, TddState};
use orchard::services::{ContextFilter, ContextFilterConfig, RelevanceRequest};
use proptest::prelude::*;

fn arb_file_type() -> impl Strategy<Value = FileType> {
    prop_oneof![
        Just(FileType::Source),
        Just(FileType::Test),
        Just(FileType::Markdown),
        Just(FileType::Other),
    ]
}

proptest! {
    /// Property: results are always sorted by descending score, and every
    /// surviving file clears the configured minimum threshold.
    #[test]
    fn prop_select_is_sorted_and_respects_threshold(
        count in 1usize..40,
        threshold in 0.0f64..0.5,
        seed_tags in prop::collection::vec(arb_file_type(), 1..40),
    ) {
        let config = ContextFilterConfig { min_score_threshold: threshold, max_files: 100, ..ContextFilterConfig::default() };
        let filter = ContextFilter::new(config);

        let candidates: Vec<FileNode> = (0..count)
            .map(|i| {
                let file_type = seed_tags[i % seed_tags.len()];
                let mut node = FileNode::new(format!("pkg_{i}/file_{i}.py"), file_type, 512, format!("hash-{i}"));
                node.classes.push(format!("Thing{i}"));
                node
            })
            .collect();

        let request = RelevanceRequest {
            agent_type: AgentType::Code,
            story_id: uuid::Uuid::new_v4(),
            search_terms: vec!["thing".to_string()],
            focus_areas: vec![],
            tdd_phase: Some(TddState::CodeGreen),
        };

        let history = HashMap::new();
        let results = filter.select(&request, &candidates, &history);

        for pair in results.windows(2) {
            prop_assert!(pair[0].total >= pair[1].total);
        }
        for scored in &results {
            prop_assert!(scored.total >= threshold);
        }
    }
}
