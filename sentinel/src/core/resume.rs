//! Deterministic task resolution from the trajectory alone.
//!
//! Nothing here consults a separate completion set: a mission restarted with only
//! its trajectory persisted resolves the same next task as the process that wrote it.

use std::collections::HashSet;

use crate::core::status::MissionStatus;
use crate::core::types::{ActionType, LogEntry, TaskDescriptor};

/// Task ids with a `TASK_COMPLETE` entry anywhere in the trajectory.
pub fn completed_task_ids(trajectory: &[LogEntry]) -> HashSet<&str> {
    trajectory
        .iter()
        .filter(|entry| entry.action == ActionType::TaskComplete)
        .filter_map(LogEntry::task_id)
        .collect()
}

/// First task in plan order whose id has not completed.
///
/// Plan order wins over log order, so completions recorded out of order still
/// resolve to the same next task.
pub fn next_pending_task<'a>(
    plan: &'a [TaskDescriptor],
    trajectory: &[LogEntry],
) -> Option<&'a TaskDescriptor> {
    let completed = completed_task_ids(trajectory);
    plan.iter()
        .find(|task| !completed.contains(task.task_id.as_str()))
}

/// Status reported by the worker of the most recently completed task.
pub fn last_worker_status(trajectory: &[LogEntry]) -> Option<MissionStatus> {
    trajectory
        .iter()
        .rev()
        .find(|entry| entry.action == ActionType::TaskComplete)
        .and_then(LogEntry::worker_status)
}

/// Number of revision plans installed so far.
pub fn revision_count(trajectory: &[LogEntry]) -> u32 {
    let count = trajectory
        .iter()
        .filter(|entry| entry.action == ActionType::RevisionLoopStart)
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Every task id the trajectory has mentioned (delegated or completed).
pub fn seen_task_ids(trajectory: &[LogEntry]) -> HashSet<&str> {
    trajectory
        .iter()
        .filter(|entry| {
            matches!(
                entry.action,
                ActionType::TaskComplete | ActionType::DelegatingTask
            )
        })
        .filter_map(LogEntry::task_id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::status::WorkerKind;
    use serde_json::json;

    fn plan() -> Vec<TaskDescriptor> {
        vec![
            TaskDescriptor::new("T1", WorkerKind::Retrieval, "q"),
            TaskDescriptor::new("T2", WorkerKind::Synthesis, ""),
            TaskDescriptor::new("T3", WorkerKind::Filter, ""),
        ]
    }

    fn completion(id: &str, status: &str) -> LogEntry {
        LogEntry::new(
            "RC-0",
            ActionType::TaskComplete,
            "done",
            Some(json!({ "task_id": id, "worker_status": status })),
        )
    }

    #[test]
    fn next_task_is_first_in_plan_order() {
        let plan = plan();
        assert_eq!(next_pending_task(&plan, &[]).map(|t| t.task_id.as_str()), Some("T1"));

        let trajectory = vec![completion("T1", "RETRIEVAL_COMPLETE")];
        assert_eq!(
            next_pending_task(&plan, &trajectory).map(|t| t.task_id.as_str()),
            Some("T2")
        );
    }

    #[test]
    fn out_of_order_completions_resolve_by_plan_order() {
        let plan = plan();
        let trajectory = vec![
            completion("T3", "FILTER_COMPLETE"),
            completion("T1", "RETRIEVAL_COMPLETE"),
        ];
        assert_eq!(
            next_pending_task(&plan, &trajectory).map(|t| t.task_id.as_str()),
            Some("T2")
        );
    }

    #[test]
    fn delegation_without_completion_is_still_pending() {
        let plan = plan();
        let trajectory = vec![LogEntry::new(
            "RC-0",
            ActionType::DelegatingTask,
            "delegate",
            Some(json!({ "task_id": "T1" })),
        )];
        assert_eq!(
            next_pending_task(&plan, &trajectory).map(|t| t.task_id.as_str()),
            Some("T1")
        );
        assert!(seen_task_ids(&trajectory).contains("T1"));
    }

    #[test]
    fn fully_completed_plan_has_no_next_task() {
        let plan = plan();
        let trajectory = vec![
            completion("T1", "RETRIEVAL_COMPLETE"),
            completion("T2", "SYNTHESIS_COMPLETE"),
            completion("T3", "FILTER_COMPLETE"),
        ];
        assert!(next_pending_task(&plan, &trajectory).is_none());
        assert_eq!(
            last_worker_status(&trajectory),
            Some(MissionStatus::FilterComplete)
        );
    }

    #[test]
    fn revision_count_tracks_installed_revisions() {
        let trajectory = vec![
            LogEntry::new("RC-0", ActionType::RevisionLoopStart, "r1", None),
            completion("REV-1-1", "SYNTHESIS_COMPLETE"),
            LogEntry::new("RC-0", ActionType::RevisionLoopStart, "r2", None),
        ];
        assert_eq!(revision_count(&trajectory), 2);
        assert_eq!(revision_count(&[]), 0);
    }
}
