//! Semantic invariants over plans and trajectories.

use std::collections::HashSet;

use crate::core::types::{ActionType, LogEntry, TaskDescriptor};

/// Check plan-contract invariants:
/// - At least one task
/// - No empty task ids
/// - No duplicate task ids
pub fn validate_plan(tasks: &[TaskDescriptor]) -> Vec<String> {
    let mut errors = Vec::new();
    if tasks.is_empty() {
        errors.push("plan has no tasks".to_string());
    }

    let mut seen = HashSet::new();
    for (index, task) in tasks.iter().enumerate() {
        if task.task_id.trim().is_empty() {
            errors.push(format!("task {index}: empty task_id"));
            continue;
        }
        if !seen.insert(task.task_id.as_str()) {
            errors.push(format!("duplicate task_id '{}'", task.task_id));
        }
    }
    errors
}

/// Check that every completion recorded since the latest plan install belongs to
/// `plan`. Completions from before a revision splice are superseded and ignored.
pub fn validate_completions(plan: &[TaskDescriptor], trajectory: &[LogEntry]) -> Vec<String> {
    let since = trajectory
        .iter()
        .rposition(|entry| entry.action == ActionType::RevisionLoopStart)
        .map_or(0, |index| index + 1);

    let plan_ids: HashSet<&str> = plan.iter().map(|task| task.task_id.as_str()).collect();
    let mut errors = Vec::new();
    for entry in &trajectory[since..] {
        if entry.action != ActionType::TaskComplete {
            continue;
        }
        match entry.task_id() {
            Some(id) if plan_ids.contains(id) => {}
            Some(id) => errors.push(format!("completion for '{id}' is not in the current plan")),
            None => errors.push("completion entry without task_id".to_string()),
        }
    }
    errors
}
