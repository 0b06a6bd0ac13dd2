//! Fixed-phase drive path: retrieval, synthesis, filter, verification, in that order.
//!
//! The pipeline owns its own status domain. Each step delegates the phase implied by
//! the current status; there is no plan and no revision loop.

use serde_json::json;
use tracing::{info, instrument, warn};

use crate::agents::WorkerRegistry;
use crate::core::status::{MissionStatus, WorkerKind};
use crate::core::transition::{Event, pipeline_worker_for, transition};
use crate::core::types::{ActionType, DriveMode, TaskDescriptor};
use crate::looping::MissionDriver;
use crate::mission::{COORDINATOR_ID, MissionRecord};
use crate::step::{Dispatch, StepOutcome, dispatch, terminate};

/// Synthesis input when retrieval came back empty.
pub const NO_FINDINGS_INSTRUCTION: &str =
    "No relevant data was retrieved. State plainly that there are no findings for the query.";
/// Synthesis input when retrieval found sources.
pub const SYNTHESIS_INSTRUCTION: &str = "Synthesize a briefing from the retrieved data.";

pub struct Pipeline {
    registry: WorkerRegistry,
}

impl Pipeline {
    pub fn new(registry: WorkerRegistry) -> Self {
        Self { registry }
    }

    #[instrument(skip_all, fields(mission_id = %record.mission_id(), status = %record.status))]
    pub fn step(&self, record: MissionRecord) -> StepOutcome {
        let from = record.status;
        if record.mode() != DriveMode::Pipeline {
            return terminate(record, from, "record belongs to the plan drive path", None);
        }
        if DriveMode::Pipeline.is_terminal(from) {
            return StepOutcome::new(record, from, None);
        }
        if from == MissionStatus::VerificationPass {
            return finish(record, from);
        }
        match pipeline_worker_for(from) {
            Some(kind) => self.delegate(record, from, kind),
            None => end(record, from, format!("Pipeline cannot continue from {from}.")),
        }
    }

    fn delegate(&self, mut record: MissionRecord, from: MissionStatus, kind: WorkerKind) -> StepOutcome {
        let input = match phase_input(&record, from) {
            Some(input) => input,
            None => return end(record, from, format!("No draft to hand to the {kind} worker.")),
        };
        if from == MissionStatus::RetrievalEmpty {
            record.log(
                COORDINATOR_ID,
                ActionType::CoordinatorContinue,
                "Retrieval empty; synthesizing a no-findings report.",
                None,
            );
        }

        let task = TaskDescriptor::new(next_task_id(&record), kind, input);
        record.log(
            COORDINATOR_ID,
            ActionType::CoordinatorDelegate,
            format!("Delegating {} to the {kind} worker.", task.task_id),
            Some(json!({ "task_id": task.task_id, "worker": kind.as_str() })),
        );
        if let Err(err) = record.apply(Event::Delegated(kind)) {
            return terminate(record, from, &err.to_string(), Some(task.task_id));
        }

        let Some(worker) = self.registry.get(kind) else {
            warn!(worker = kind.as_str(), "no worker registered");
            return end(record, from, format!("No {kind} worker registered."));
        };
        info!(task_id = %task.task_id, worker = worker.agent_id(), "delegating phase");

        let mut record = match dispatch(worker, record, &task) {
            Dispatch::Reported(record) => record,
            Dispatch::Violation(record, detail) => {
                return terminate(record, from, &detail, Some(task.task_id));
            }
        };
        let reported = record.status;
        match transition(
            DriveMode::Pipeline,
            MissionStatus::Executing(kind),
            Event::PhaseReported(reported),
        ) {
            Ok(next) => {
                record.status = next;
                StepOutcome::new(record, from, Some(task.task_id))
            }
            Err(err) => terminate(record, from, &err.to_string(), Some(task.task_id)),
        }
    }
}

impl MissionDriver for Pipeline {
    fn step(&self, record: MissionRecord) -> StepOutcome {
        Pipeline::step(self, record)
    }
}

/// `PIPE-<n>`, numbered by the delegations already in the trajectory.
fn next_task_id(record: &MissionRecord) -> String {
    let delegated = record
        .trajectory()
        .iter()
        .filter(|entry| entry.action == ActionType::CoordinatorDelegate)
        .count();
    format!("PIPE-{}", delegated + 1)
}

fn phase_input(record: &MissionRecord, from: MissionStatus) -> Option<String> {
    match from {
        MissionStatus::RetrievalEmpty => Some(NO_FINDINGS_INSTRUCTION.to_string()),
        MissionStatus::RetrievalComplete => Some(SYNTHESIS_INSTRUCTION.to_string()),
        MissionStatus::SynthesisComplete | MissionStatus::FilterComplete => {
            record.artifacts.draft.clone()
        }
        _ => Some(record.query().to_string()),
    }
}

fn finish(mut record: MissionRecord, from: MissionStatus) -> StepOutcome {
    let Some(draft) = record.artifacts.draft.clone() else {
        return end(record, from, "Verification passed without a draft.".to_string());
    };
    if let Err(err) = record.apply(Event::PipelineFinished) {
        return terminate(record, from, &err.to_string(), None);
    }
    record.artifacts.final_report = Some(draft);
    record.log(
        COORDINATOR_ID,
        ActionType::MissionComplete,
        "Final report ready.",
        None,
    );
    StepOutcome::new(record, from, None)
}

fn end(mut record: MissionRecord, from: MissionStatus, reasoning: String) -> StepOutcome {
    record.status = MissionStatus::Terminated;
    record.log(
        COORDINATOR_ID,
        ActionType::CoordinatorEnd,
        reasoning,
        Some(json!({ "status": from.to_string() })),
    );
    StepOutcome::new(record, from, None)
}
