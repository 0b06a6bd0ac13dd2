//! Plan-driven mission coordinator: one deterministic step per call.
//!
//! A step is a pure function of the record's status and trajectory:
//! 1. `INITIALIZED`/`PLANNING`: run the planner, then fall through to execution.
//! 2. `VERIFICATION_FAIL_CRITICAL`: install a revision plan (bounded), then execute.
//! 3. `PLANNING_SUCCESS`/`TASK_COMPLETE`: delegate the next pending task, or close
//!    out the plan when none is left.
//! Terminal statuses come back unchanged; anything else is a contract violation.

use serde_json::json;
use tracing::{error, info, instrument, warn};

use crate::agents::planner::Planner;
use crate::agents::{Worker, WorkerRegistry};
use crate::core::invariants::validate_completions;
use crate::core::resume::{last_worker_status, next_pending_task, revision_count};
use crate::core::revision::build_revision_plan;
use crate::core::status::MissionStatus;
use crate::core::transition::{Event, transition};
use crate::core::types::{ActionType, DriveMode, TaskDescriptor};
use crate::looping::MissionDriver;
use crate::mission::{COORDINATOR_ID, MissionRecord};

/// Result of a single coordinator step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub record: MissionRecord,
    pub from: MissionStatus,
    pub to: MissionStatus,
    /// Task id handed to a worker during this step, if any.
    pub delegated: Option<String>,
}

impl StepOutcome {
    pub fn new(record: MissionRecord, from: MissionStatus, delegated: Option<String>) -> Self {
        Self {
            to: record.status,
            record,
            from,
            delegated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Revision plans allowed before `REVISION_EXHAUSTED`.
    pub max_revisions: u32,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self { max_revisions: 2 }
    }
}

/// Outcome of handing one task to a worker.
pub(crate) enum Dispatch {
    /// Worker returned; the record carries the status it reported.
    Reported(MissionRecord),
    /// Worker wrote state only coordinators may write.
    Violation(MissionRecord, String),
}

/// Run `worker` on `task` and check it left coordinator-owned state alone.
pub(crate) fn dispatch(worker: &dyn Worker, record: MissionRecord, task: &TaskDescriptor) -> Dispatch {
    let plan_before = record.plan().cloned();
    let report_before = record.artifacts.final_report.clone();
    let entries_before = record.trajectory().len();

    let record = worker.execute(record, task);

    if record.plan() != plan_before.as_ref() {
        return Dispatch::Violation(record, format!("{} replaced the plan", worker.agent_id()));
    }
    if record.artifacts.final_report != report_before {
        return Dispatch::Violation(
            record,
            format!("{} wrote the final report", worker.agent_id()),
        );
    }
    if record.trajectory().len() < entries_before {
        return Dispatch::Violation(
            record,
            format!("{} truncated the trajectory", worker.agent_id()),
        );
    }
    Dispatch::Reported(record)
}

/// Stop the mission: `TERMINATED` plus a `CONTRACT_VIOLATION` entry.
pub(crate) fn terminate(
    mut record: MissionRecord,
    from: MissionStatus,
    detail: &str,
    delegated: Option<String>,
) -> StepOutcome {
    error!(
        mission_id = record.mission_id(),
        status = %record.status,
        detail,
        "contract violation"
    );
    let observed = record.status;
    record.status = MissionStatus::Terminated;
    record.log(
        COORDINATOR_ID,
        ActionType::ContractViolation,
        format!("Contract violation: {detail}"),
        Some(json!({ "status": observed.to_string(), "detail": detail })),
    );
    StepOutcome::new(record, from, delegated)
}

/// Orchestrator for `mode = plan` missions.
pub struct Coordinator {
    planner: Box<dyn Planner>,
    registry: WorkerRegistry,
    config: CoordinatorConfig,
}

enum Flow {
    Continue(MissionRecord),
    Done(StepOutcome),
}

impl Coordinator {
    pub fn new(planner: Box<dyn Planner>, registry: WorkerRegistry, config: CoordinatorConfig) -> Self {
        Self {
            planner,
            registry,
            config,
        }
    }

    /// Advance `record` by one step.
    #[instrument(skip_all, fields(mission_id = %record.mission_id(), status = %record.status))]
    pub fn step(&self, record: MissionRecord) -> StepOutcome {
        let from = record.status;
        if record.mode() != DriveMode::Plan {
            return terminate(record, from, "record belongs to the pipeline drive path", None);
        }
        if DriveMode::Plan.is_terminal(from) {
            return StepOutcome::new(record, from, None);
        }

        let flow = match from {
            MissionStatus::Initialized | MissionStatus::Planning => self.plan(record, from),
            MissionStatus::VerificationFailCritical => self.revise(record, from),
            MissionStatus::PlanningSuccess | MissionStatus::TaskComplete => Flow::Continue(record),
            _ => Flow::Done(terminate(
                record,
                from,
                &format!("no plan step accepts status {from}"),
                None,
            )),
        };
        match flow {
            Flow::Continue(record) => self.execute(record, from),
            Flow::Done(outcome) => outcome,
        }
    }

    fn plan(&self, mut record: MissionRecord, from: MissionStatus) -> Flow {
        if let Err(err) = record.apply(Event::PlanningStarted) {
            return Flow::Done(terminate(record, from, &err.to_string(), None));
        }
        record.log(
            COORDINATOR_ID,
            ActionType::PlanningStart,
            "Requesting plan.",
            Some(json!({ "query": record.query() })),
        );

        match self.planner.plan(record.query()) {
            Ok(plan) => {
                let task_ids: Vec<&str> = plan.tasks().iter().map(|t| t.task_id.as_str()).collect();
                let data = json!({ "plan_length": plan.len(), "task_ids": task_ids });
                record.install_plan(plan);
                if let Err(err) = record.apply(Event::PlanAccepted) {
                    return Flow::Done(terminate(record, from, &err.to_string(), None));
                }
                record.log(
                    COORDINATOR_ID,
                    ActionType::PlanningSuccess,
                    "Plan accepted.",
                    Some(data),
                );
                Flow::Continue(record)
            }
            Err(failure) => {
                warn!(error = %failure, "planning failed");
                if let Err(err) = record.apply(Event::PlanRejected) {
                    return Flow::Done(terminate(record, from, &err.to_string(), None));
                }
                record.log(
                    COORDINATOR_ID,
                    ActionType::PlanningFailed,
                    "Planner produced no usable plan.",
                    Some(json!({ "error": failure.to_string() })),
                );
                Flow::Done(StepOutcome::new(record, from, None))
            }
        }
    }

    fn revise(&self, mut record: MissionRecord, from: MissionStatus) -> Flow {
        let used = revision_count(record.trajectory().entries());
        if used >= self.config.max_revisions {
            if let Err(err) = record.apply(Event::RevisionDenied) {
                return Flow::Done(terminate(record, from, &err.to_string(), None));
            }
            record.log(
                COORDINATOR_ID,
                ActionType::RevisionExhausted,
                format!("Revision budget of {} spent.", self.config.max_revisions),
                Some(json!({ "revisions": used })),
            );
            return Flow::Done(StepOutcome::new(record, from, None));
        }

        let attempt = used + 1;
        let plan = match build_revision_plan(record.plan(), record.trajectory().entries(), attempt) {
            Ok(plan) => plan,
            Err(err) => return Flow::Done(terminate(record, from, &err.to_string(), None)),
        };
        let task_ids: Vec<&str> = plan.tasks().iter().map(|t| t.task_id.as_str()).collect();
        let data = json!({ "attempt": attempt, "task_ids": task_ids });
        record.install_plan(plan);
        record.log(
            COORDINATOR_ID,
            ActionType::RevisionLoopStart,
            format!("Verification failed critically; starting revision {attempt}."),
            Some(data),
        );
        if let Err(err) = record.apply(Event::RevisionInstalled) {
            return Flow::Done(terminate(record, from, &err.to_string(), None));
        }
        Flow::Continue(record)
    }

    fn execute(&self, mut record: MissionRecord, from: MissionStatus) -> StepOutcome {
        let Some(plan) = record.plan() else {
            return terminate(record, from, "no plan installed", None);
        };
        let violations = validate_completions(plan.tasks(), record.trajectory().entries());
        if !violations.is_empty() {
            let detail = violations.join("; ");
            return terminate(record, from, &detail, None);
        }
        let Some(task) = next_pending_task(plan.tasks(), record.trajectory().entries()).cloned()
        else {
            return self.close_out(record, from);
        };

        let kind = task.worker;
        record.log(
            COORDINATOR_ID,
            ActionType::DelegatingTask,
            format!("Delegating {} to the {kind} worker.", task.task_id),
            Some(json!({ "task_id": task.task_id, "worker": kind.as_str() })),
        );
        if let Err(err) = record.apply(Event::Delegated(kind)) {
            return terminate(record, from, &err.to_string(), Some(task.task_id));
        }

        let Some(worker) = self.registry.get(kind) else {
            let failed = MissionStatus::StageFailed(kind);
            if let Err(err) = record.apply(Event::WorkerReported(failed)) {
                return terminate(record, from, &err.to_string(), Some(task.task_id));
            }
            record.log(
                COORDINATOR_ID,
                ActionType::MissionFailure,
                format!("No {kind} worker registered."),
                Some(json!({ "task_id": task.task_id, "worker_status": failed.to_string() })),
            );
            return StepOutcome::new(record, from, Some(task.task_id));
        };
        info!(task_id = %task.task_id, worker = worker.agent_id(), "delegating task");

        let mut record = match dispatch(worker, record, &task) {
            Dispatch::Reported(record) => record,
            Dispatch::Violation(record, detail) => {
                return terminate(record, from, &detail, Some(task.task_id));
            }
        };
        let reported = record.status;
        let next = match transition(
            DriveMode::Plan,
            MissionStatus::Executing(kind),
            Event::WorkerReported(reported),
        ) {
            Ok(next) => next,
            Err(err) => return terminate(record, from, &err.to_string(), Some(task.task_id)),
        };

        record.status = next;
        let data = json!({ "task_id": task.task_id, "worker_status": reported.to_string() });
        if next.is_failure() {
            record.log(
                COORDINATOR_ID,
                ActionType::MissionFailure,
                format!("Task {} failed with {reported}.", task.task_id),
                Some(data),
            );
        } else {
            record.log(
                COORDINATOR_ID,
                ActionType::TaskComplete,
                format!("Task {} finished with {reported}.", task.task_id),
                Some(data),
            );
        }
        StepOutcome::new(record, from, Some(task.task_id))
    }

    /// No pending task: report only if the last completed task verified the draft.
    fn close_out(&self, mut record: MissionRecord, from: MissionStatus) -> StepOutcome {
        if let Err(err) = record.apply(Event::PlanExhausted) {
            return terminate(record, from, &err.to_string(), None);
        }
        record.log(
            COORDINATOR_ID,
            ActionType::PlanComplete,
            "All planned tasks completed.",
            None,
        );

        let last = last_worker_status(record.trajectory().entries());
        let verified = last == Some(MissionStatus::VerificationPass);
        match record.artifacts.draft.clone() {
            Some(draft) if verified => {
                if let Err(err) = record.apply(Event::Verified) {
                    return terminate(record, from, &err.to_string(), None);
                }
                record.artifacts.final_report = Some(draft);
                record.log(
                    COORDINATOR_ID,
                    ActionType::MissionComplete,
                    "Final report ready.",
                    None,
                );
            }
            _ => {
                if let Err(err) = record.apply(Event::Unverified) {
                    return terminate(record, from, &err.to_string(), None);
                }
                let last = last.map(|status| status.to_string());
                record.log(
                    COORDINATOR_ID,
                    ActionType::MissionHalted,
                    "Plan finished without a verified draft.",
                    Some(json!({ "last_worker_status": last })),
                );
            }
        }
        StepOutcome::new(record, from, None)
    }
}

impl MissionDriver for Coordinator {
    fn step(&self, record: MissionRecord) -> StepOutcome {
        Coordinator::step(self, record)
    }
}
