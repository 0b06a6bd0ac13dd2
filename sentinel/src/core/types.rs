//! Shared deterministic types for the orchestration core.
//!
//! These types define stable contracts between the coordinators, workers and
//! planner. They serialize to the persisted mission snapshot and trajectory log,
//! so field names and tags must stay stable across releases.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::status::{MissionStatus, WorkerKind};

/// Which drive path owns a mission. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriveMode {
    /// Plan-driven coordinator (task list resolved against the trajectory).
    Plan,
    /// Fixed-phase pipeline (retrieval, synthesis, filter, verification).
    Pipeline,
}

impl DriveMode {
    /// True once the run loop must stop stepping a mission in this mode.
    pub fn is_terminal(self, status: MissionStatus) -> bool {
        match self {
            DriveMode::Plan => matches!(
                status,
                MissionStatus::PlanningFailed
                    | MissionStatus::StageFailed(_)
                    | MissionStatus::FinalReportReady
                    | MissionStatus::MissionHalted
                    | MissionStatus::RevisionExhausted
                    | MissionStatus::Terminated
            ),
            DriveMode::Pipeline => {
                matches!(status, MissionStatus::Completed | MissionStatus::Terminated)
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DriveMode::Plan => "plan",
            DriveMode::Pipeline => "pipeline",
        }
    }
}

/// One planned unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub task_id: String,
    #[serde(alias = "agent")]
    pub worker: WorkerKind,
    /// Opaque payload meaningful only to the target worker.
    #[serde(default)]
    pub input: String,
}

impl TaskDescriptor {
    pub fn new(task_id: impl Into<String>, worker: WorkerKind, input: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            worker,
            input: input.into(),
        }
    }
}

/// Closed vocabulary of trajectory actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    MissionStart,
    PlanningStart,
    PlanningSuccess,
    PlanningFailed,
    DelegatingTask,
    TaskComplete,
    MissionFailure,
    RevisionLoopStart,
    RevisionExhausted,
    PlanComplete,
    MissionComplete,
    MissionHalted,
    ContractViolation,
    CoordinatorDelegate,
    CoordinatorContinue,
    CoordinatorEnd,
    RetrievalStart,
    RetrievalEmpty,
    RetrievalSuccess,
    RetrievalFailed,
    SynthesisNoData,
    SynthesisStart,
    SynthesisComplete,
    SynthesisFailed,
    FilterSkip,
    FilterStart,
    FilterComplete,
    VerificationStart,
    VerificationScore,
    VerificationPass,
    VerificationFailCritical,
    VerificationFailed,
    VerificationFailedParse,
}

impl ActionType {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::MissionStart => "MISSION_START",
            ActionType::PlanningStart => "PLANNING_START",
            ActionType::PlanningSuccess => "PLANNING_SUCCESS",
            ActionType::PlanningFailed => "PLANNING_FAILED",
            ActionType::DelegatingTask => "DELEGATING_TASK",
            ActionType::TaskComplete => "TASK_COMPLETE",
            ActionType::MissionFailure => "MISSION_FAILURE",
            ActionType::RevisionLoopStart => "REVISION_LOOP_START",
            ActionType::RevisionExhausted => "REVISION_EXHAUSTED",
            ActionType::PlanComplete => "PLAN_COMPLETE",
            ActionType::MissionComplete => "MISSION_COMPLETE",
            ActionType::MissionHalted => "MISSION_HALTED",
            ActionType::ContractViolation => "CONTRACT_VIOLATION",
            ActionType::CoordinatorDelegate => "COORDINATOR_DELEGATE",
            ActionType::CoordinatorContinue => "COORDINATOR_CONTINUE",
            ActionType::CoordinatorEnd => "COORDINATOR_END",
            ActionType::RetrievalStart => "RETRIEVAL_START",
            ActionType::RetrievalEmpty => "RETRIEVAL_EMPTY",
            ActionType::RetrievalSuccess => "RETRIEVAL_SUCCESS",
            ActionType::RetrievalFailed => "RETRIEVAL_FAILED",
            ActionType::SynthesisNoData => "SYNTHESIS_NO_DATA",
            ActionType::SynthesisStart => "SYNTHESIS_START",
            ActionType::SynthesisComplete => "SYNTHESIS_COMPLETE",
            ActionType::SynthesisFailed => "SYNTHESIS_FAILED",
            ActionType::FilterSkip => "FILTER_SKIP",
            ActionType::FilterStart => "FILTER_START",
            ActionType::FilterComplete => "FILTER_COMPLETE",
            ActionType::VerificationStart => "VERIFICATION_START",
            ActionType::VerificationScore => "VERIFICATION_SCORE",
            ActionType::VerificationPass => "VERIFICATION_PASS",
            ActionType::VerificationFailCritical => "VERIFICATION_FAIL_CRITICAL",
            ActionType::VerificationFailed => "VERIFICATION_FAILED",
            ActionType::VerificationFailedParse => "VERIFICATION_FAILED_PARSE",
        }
    }
}

/// A single trajectory entry. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub agent_id: String,
    pub action: ActionType,
    /// Diagnostic free text.
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl LogEntry {
    pub fn new(
        agent_id: impl Into<String>,
        action: ActionType,
        reasoning: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            agent_id: agent_id.into(),
            action,
            reasoning: reasoning.into(),
            data,
        }
    }

    /// `data.task_id`, present on completion and delegation entries.
    pub fn task_id(&self) -> Option<&str> {
        self.data.as_ref()?.get("task_id")?.as_str()
    }

    /// `data.worker_status`, the status the worker reported for a completed task.
    pub fn worker_status(&self) -> Option<MissionStatus> {
        self.data
            .as_ref()?
            .get("worker_status")?
            .as_str()?
            .parse()
            .ok()
    }
}

/// One retrieved snippet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedItem {
    pub source: String,
    pub timestamp: String,
    pub snippet: String,
    pub relevance_score: f64,
}

/// Verifier judgment over the current draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Overall score on the 1.0–5.0 scale.
    pub score: f64,
    pub passed: bool,
    #[serde(default)]
    pub critique: String,
}

/// Intermediate products. Each field has exactly one writer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Artifacts {
    /// Retriever output; rewritten in place by the filter.
    #[serde(default)]
    pub retrieved: Vec<RetrievedItem>,
    /// Synthesizer output; rewritten in place by the filter.
    #[serde(default)]
    pub draft: Option<String>,
    /// Verifier output.
    #[serde(default)]
    pub verdict: Option<Verdict>,
    /// Set by a coordinator on the verified-success path only.
    #[serde(default)]
    pub final_report: Option<String>,
}

impl Artifacts {
    pub fn verification_score(&self) -> Option<f64> {
        self.verdict.as_ref().map(|verdict| verdict.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plan_mode_terminal_set_excludes_resumable_statuses() {
        assert!(DriveMode::Plan.is_terminal(MissionStatus::FinalReportReady));
        assert!(DriveMode::Plan.is_terminal(MissionStatus::StageFailed(WorkerKind::Filter)));
        assert!(!DriveMode::Plan.is_terminal(MissionStatus::TaskComplete));
        assert!(!DriveMode::Plan.is_terminal(MissionStatus::VerificationFailCritical));
        assert!(!DriveMode::Plan.is_terminal(MissionStatus::Completed));
    }

    #[test]
    fn pipeline_mode_stops_only_on_completed_or_terminated() {
        assert!(DriveMode::Pipeline.is_terminal(MissionStatus::Completed));
        assert!(DriveMode::Pipeline.is_terminal(MissionStatus::Terminated));
        assert!(!DriveMode::Pipeline.is_terminal(MissionStatus::StageFailed(WorkerKind::Retrieval)));
    }

    #[test]
    fn task_descriptor_accepts_agent_field_name() {
        let task: TaskDescriptor = serde_json::from_value(json!({
            "task_id": "T1",
            "agent": "DataRetrievalAgent",
            "input": "network outage"
        }))
        .expect("task");
        assert_eq!(task, TaskDescriptor::new("T1", WorkerKind::Retrieval, "network outage"));
    }

    #[test]
    fn log_entry_exposes_completion_payload() {
        let entry = LogEntry::new(
            "RC-0",
            ActionType::TaskComplete,
            "done",
            Some(json!({"task_id": "T2", "worker_status": "SYNTHESIS_COMPLETE"})),
        );
        assert_eq!(entry.task_id(), Some("T2"));
        assert_eq!(entry.worker_status(), Some(MissionStatus::SynthesisComplete));

        let serialized = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(serialized["action"], "TASK_COMPLETE");
    }

    #[test]
    fn log_entry_without_data_has_no_task_id() {
        let entry = LogEntry::new("RC-0", ActionType::PlanningStart, "start", None);
        assert_eq!(entry.task_id(), None);
        assert_eq!(entry.worker_status(), None);
    }
}
