//! Tree-shaped CLI output: the Epic -> Story backlog hierarchy, and a
//! linear diagram of the Scrum state machine for `/state --diagram`.

use crate::domain::models::{Epic, ScrumState, Story};
use crate::services::scrum_fsm::ScrumFsm;

/// Unicode box-drawing characters for tree visualization
const TREE_BRANCH: &str = "├── ";
const TREE_LAST: &str = "└── ";

/// Render each epic with its stories nested underneath. Stories with no
/// `epic_id` are grouped under a synthetic "(no epic)" heading.
pub fn render_backlog_tree(epics: &[Epic], stories: &[Story]) -> String {
    let mut output = String::new();

    for epic in epics {
        output.push_str(&format!("{} [{}]\n", epic.title, truncate_uuid(epic.id)));
        let children: Vec<&Story> = stories.iter().filter(|s| s.epic_id == Some(epic.id)).collect();
        render_story_children(&children, &mut output);
    }

    let orphans: Vec<&Story> = stories.iter().filter(|s| s.epic_id.is_none()).collect();
    if !orphans.is_empty() {
        output.push_str("(no epic)\n");
        render_story_children(&orphans, &mut output);
    }

    output
}

fn render_story_children(stories: &[&Story], output: &mut String) {
    for (i, story) in stories.iter().enumerate() {
        let is_last = i == stories.len() - 1;
        let connector = if is_last { TREE_LAST } else { TREE_BRANCH };
        output.push_str(&format!(
            "{connector}{:?} {} [{}] (p{})\n",
            story.status,
            story.title,
            truncate_uuid(story.id),
            story.priority
        ));
    }
}

/// Render the Scrum state machine as a left-to-right diagram, marking the
/// project's current state and listing the commands allowed from it.
pub fn render_scrum_diagram(current: ScrumState) -> String {
    const ORDER: &[ScrumState] = &[
        ScrumState::Idle,
        ScrumState::BacklogReady,
        ScrumState::SprintPlanned,
        ScrumState::SprintActive,
        ScrumState::SprintPaused,
        ScrumState::SprintReview,
        ScrumState::Blocked,
    ];

    let mut output = String::new();
    let states: Vec<String> = ORDER
        .iter()
        .map(|state| if *state == current { format!("[{state}]") } else { state.to_string() })
        .collect();
    output.push_str(&states.join(" -> "));
    output.push('\n');
    output.push_str("allowed commands: ");
    output.push_str(&ScrumFsm::allowed_commands(current).join(", "));
    output.push('\n');
    output
}

fn truncate_uuid(id: uuid::Uuid) -> String {
    id.to_string()[..8].to_string()
}
