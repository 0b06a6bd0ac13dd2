//! Fixed revision sub-plan installed after a critical verification failure.

use std::collections::HashSet;

use crate::core::resume::seen_task_ids;
use crate::core::status::WorkerKind;
use crate::core::types::{LogEntry, TaskDescriptor};
use crate::mission::{Plan, PlanError};

const REVISION_STEPS: [(WorkerKind, &str); 3] = [
    (
        WorkerKind::Synthesis,
        "Revise the draft report to address the verifier critique.",
    ),
    (
        WorkerKind::Filter,
        "Re-apply output filtering to the revised draft.",
    ),
    (WorkerKind::Verification, "Verify the revised draft."),
];

/// Build the three-task revision plan (re-synthesize, re-filter, re-verify).
///
/// `attempt` is 1-based. Ids take the form `REV-<attempt>-<k>`; if any of them is
/// already used by `current` or mentioned in the trajectory, the attempt number is
/// bumped until all three are unused.
pub fn build_revision_plan(
    current: Option<&Plan>,
    trajectory: &[LogEntry],
    attempt: u32,
) -> Result<Plan, PlanError> {
    let mut taken: HashSet<&str> = seen_task_ids(trajectory);
    if let Some(plan) = current {
        taken.extend(plan.tasks().iter().map(|task| task.task_id.as_str()));
    }

    let mut number = attempt.max(1);
    loop {
        let ids: Vec<String> = (1..=REVISION_STEPS.len())
            .map(|k| format!("REV-{number}-{k}"))
            .collect();
        if ids.iter().all(|id| !taken.contains(id.as_str())) {
            let tasks = ids
                .into_iter()
                .zip(REVISION_STEPS)
                .map(|(id, (worker, input))| TaskDescriptor::new(id, worker, input))
                .collect();
            return Plan::new(tasks);
        }
        number = number.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ActionType;
    use serde_json::json;

    #[test]
    fn revision_plan_has_fixed_shape() {
        let plan = build_revision_plan(None, &[], 1).expect("plan");
        let shape: Vec<(&str, WorkerKind)> = plan
            .tasks()
            .iter()
            .map(|task| (task.task_id.as_str(), task.worker))
            .collect();
        assert_eq!(
            shape,
            vec![
                ("REV-1-1", WorkerKind::Synthesis),
                ("REV-1-2", WorkerKind::Filter),
                ("REV-1-3", WorkerKind::Verification),
            ]
        );
    }

    #[test]
    fn revision_ids_avoid_existing_plan_and_trajectory_ids() {
        let current = Plan::new(vec![TaskDescriptor::new(
            "REV-2-1",
            WorkerKind::Synthesis,
            "",
        )])
        .expect("plan");
        let trajectory = vec![LogEntry::new(
            "RC-0",
            ActionType::TaskComplete,
            "done",
            Some(json!({ "task_id": "REV-3-3" })),
        )];

        let plan = build_revision_plan(Some(&current), &trajectory, 2).expect("plan");
        assert_eq!(plan.tasks()[0].task_id, "REV-4-1");
    }
}
