// Fixed stage vocabulary exposed by the orchestrator. This layer never
// interprets it beyond progress display and deciding when to poll for a
// pending review gate.
pub const STAGES: [&str; 11] = [
    "pending",
    "ba",
    "hitl_ba",
    "product",
    "hitl_product",
    "analyst",
    "hitl_analyst",
    "qa",
    "design",
    "hitl_final",
    "done",
];

pub const STATUS_WAITING_HITL: &str = "waiting_hitl";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageProgress {
    Completed,
    Current,
    Upcoming,
}

pub fn stage_index(stage: &str) -> Option<usize> {
    STAGES.iter().position(|known| *known == stage)
}

// Unknown stages mark nothing as completed or current, matching the upstream
// progress bar's behavior for out-of-vocabulary values.
pub fn stage_progress(current_stage: &str) -> Vec<(&'static str, StageProgress)> {
    let current = stage_index(current_stage);
    STAGES
        .iter()
        .enumerate()
        .map(|(index, stage)| {
            let progress = match current {
                Some(at) if index < at => StageProgress::Completed,
                Some(at) if index == at => StageProgress::Current,
                _ => StageProgress::Upcoming,
            };
            (*stage, progress)
        })
        .collect()
}

pub fn is_waiting_for_review(status: &str) -> bool {
    status == STATUS_WAITING_HITL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_splits_completed_current_upcoming() {
        let progress = stage_progress("analyst");
        let current: Vec<&str> = progress
            .iter()
            .filter(|(_, p)| *p == StageProgress::Current)
            .map(|(s, _)| *s)
            .collect();
        assert_eq!(current, vec!["analyst"]);
        assert_eq!(progress[0], ("pending", StageProgress::Completed));
        assert_eq!(progress[10], ("done", StageProgress::Upcoming));
    }

    #[test]
    fn unknown_stage_highlights_nothing() {
        let progress = stage_progress("mystery_stage");
        assert!(progress.iter().all(|(_, p)| *p == StageProgress::Upcoming));
    }
}
