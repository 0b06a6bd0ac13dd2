//! The mission record shared between coordinators and workers.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::core::invariants::validate_plan;
use crate::core::status::MissionStatus;
use crate::core::transition::{Event, TransitionError, transition};
use crate::core::types::{ActionType, Artifacts, DriveMode, LogEntry, TaskDescriptor};

/// Agent id used by both coordinators for their own trajectory entries.
pub const COORDINATOR_ID: &str = "RC-0";

/// A plan rejected at construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid plan: {}", violations.join("; "))]
pub struct PlanError {
    pub violations: Vec<String>,
}

/// Ordered, validated task list. Replaced as a whole, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TaskDescriptor>", into = "Vec<TaskDescriptor>")]
pub struct Plan {
    tasks: Vec<TaskDescriptor>,
}

impl Plan {
    /// Build a plan, rejecting empty plans and empty or duplicate task ids.
    pub fn new(tasks: Vec<TaskDescriptor>) -> Result<Self, PlanError> {
        let violations = validate_plan(&tasks);
        if !violations.is_empty() {
            return Err(PlanError { violations });
        }
        Ok(Self { tasks })
    }

    pub fn tasks(&self) -> &[TaskDescriptor] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.tasks.iter().any(|task| task.task_id == task_id)
    }
}

impl TryFrom<Vec<TaskDescriptor>> for Plan {
    type Error = PlanError;

    fn try_from(tasks: Vec<TaskDescriptor>) -> Result<Self, Self::Error> {
        Plan::new(tasks)
    }
}

impl From<Plan> for Vec<TaskDescriptor> {
    fn from(plan: Plan) -> Self {
        plan.tasks
    }
}

/// Append-only chronological log of a mission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trajectory(Vec<LogEntry>);

impl Trajectory {
    pub fn push(&mut self, entry: LogEntry) {
        self.0.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LogEntry> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.0.last()
    }
}

impl From<Vec<LogEntry>> for Trajectory {
    fn from(entries: Vec<LogEntry>) -> Self {
        Self(entries)
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a LogEntry;
    type IntoIter = std::slice::Iter<'a, LogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Mutable shared document passed by value through every step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionRecord {
    mission_id: String,
    query: String,
    mode: DriveMode,
    pub status: MissionStatus,
    #[serde(default)]
    plan: Option<Plan>,
    #[serde(default)]
    pub artifacts: Artifacts,
    #[serde(default)]
    trajectory: Trajectory,
}

impl MissionRecord {
    /// Create a fresh mission with a random id.
    pub fn new(query: impl Into<String>, mode: DriveMode) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), query, mode)
    }

    /// Create a fresh mission with a caller-provided id (tests, replays).
    pub fn with_id(mission_id: impl Into<String>, query: impl Into<String>, mode: DriveMode) -> Self {
        let mut record = Self {
            mission_id: mission_id.into(),
            query: query.into(),
            mode,
            status: MissionStatus::Initialized,
            plan: None,
            artifacts: Artifacts::default(),
            trajectory: Trajectory::default(),
        };
        let data = json!({ "query": record.query, "mode": mode.as_str() });
        record.log(
            COORDINATOR_ID,
            ActionType::MissionStart,
            "Mission created.",
            Some(data),
        );
        record
    }

    pub fn mission_id(&self) -> &str {
        &self.mission_id
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn mode(&self) -> DriveMode {
        self.mode
    }

    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    /// Replace the whole plan. Coordinators are the only callers.
    pub(crate) fn install_plan(&mut self, plan: Plan) {
        self.plan = Some(plan);
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    /// Move `status` through the transition table for this record's mode.
    pub(crate) fn apply(&mut self, event: Event) -> Result<MissionStatus, TransitionError> {
        self.status = transition(self.mode, self.status, event)?;
        Ok(self.status)
    }

    /// Append a trajectory entry and mirror it as a structured tracing event.
    pub fn log(
        &mut self,
        agent_id: &str,
        action: ActionType,
        reasoning: impl Into<String>,
        data: Option<Value>,
    ) {
        let reasoning = reasoning.into();
        info!(
            mission_id = %self.mission_id,
            agent_id,
            action = action.as_str(),
            reasoning = %reasoning,
            "agent action"
        );
        self.trajectory
            .push(LogEntry::new(agent_id, action, reasoning, data));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::status::WorkerKind;

    #[test]
    fn plan_rejects_duplicate_task_ids() {
        let err = Plan::new(vec![
            TaskDescriptor::new("T1", WorkerKind::Retrieval, "a"),
            TaskDescriptor::new("T1", WorkerKind::Synthesis, "b"),
        ])
        .expect_err("duplicate");
        assert!(err.to_string().contains("duplicate task_id 'T1'"));
    }

    #[test]
    fn plan_deserialization_enforces_invariants() {
        let err = serde_json::from_str::<Plan>("[]").expect_err("empty plan");
        assert!(err.to_string().contains("plan has no tasks"));

        let plan: Plan = serde_json::from_str(
            r#"[{"task_id":"T1","worker":"retrieval","input":"q"}]"#,
        )
        .expect("plan");
        assert_eq!(plan.len(), 1);
        assert!(plan.contains("T1"));
    }

    #[test]
    fn new_record_starts_initialized_with_start_entry() {
        let record = MissionRecord::new("network outage", DriveMode::Plan);
        assert_eq!(record.status, MissionStatus::Initialized);
        assert_eq!(record.query(), "network outage");
        assert!(record.plan().is_none());
        assert_eq!(record.trajectory().len(), 1);
        assert_eq!(
            record.trajectory().entries()[0].action,
            ActionType::MissionStart
        );
        assert!(Uuid::parse_str(record.mission_id()).is_ok());
    }

    #[test]
    fn record_snapshot_round_trips_through_json() {
        let mut record = MissionRecord::with_id("m-1", "q", DriveMode::Pipeline);
        record.status = MissionStatus::SynthesisComplete;
        record.artifacts.draft = Some("draft".to_string());

        let json = serde_json::to_string(&record).expect("serialize");
        let loaded: MissionRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(loaded, record);
    }
}
