//! Planners: turn a mission query into an ordered task list.

use std::rc::Rc;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::core::extract::extract_json_array;
use crate::core::status::WorkerKind;
use crate::core::types::TaskDescriptor;
use crate::io::backend::{CompletionRequest, ModelBackend};
use crate::io::prompt::PromptEngine;
use crate::io::schema::{PLAN_SCHEMA, validate_schema};
use crate::mission::Plan;

/// Why a planning attempt produced no plan. Never retried by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanningFailure {
    /// Backend error or timeout.
    #[error("planner backend unavailable: {0}")]
    Unavailable(String),
    /// No JSON array in the answer, or it did not parse.
    #[error("planner output malformed: {0}")]
    Malformed(String),
    /// Schema or plan-invariant violation.
    #[error("planner output invalid: {0}")]
    Invalid(String),
}

pub trait Planner {
    fn plan(&self, query: &str) -> Result<Plan, PlanningFailure>;
}

/// Parse planner output into a validated plan.
pub fn plan_from_output(answer: &str) -> Result<Plan, PlanningFailure> {
    let raw = extract_json_array(answer)
        .ok_or_else(|| PlanningFailure::Malformed("no JSON array in answer".to_string()))?;
    let value: Value =
        serde_json::from_str(raw).map_err(|err| PlanningFailure::Malformed(err.to_string()))?;
    validate_schema(PLAN_SCHEMA, &value)
        .map_err(|err| PlanningFailure::Invalid(format!("{err:#}")))?;
    let tasks: Vec<TaskDescriptor> =
        serde_json::from_value(value).map_err(|err| PlanningFailure::Invalid(err.to_string()))?;
    Plan::new(tasks).map_err(|err| PlanningFailure::Invalid(err.to_string()))
}

/// Asks the model backend for a JSON plan.
pub struct ModelPlanner {
    backend: Rc<dyn ModelBackend>,
}

impl ModelPlanner {
    pub fn new(backend: Rc<dyn ModelBackend>) -> Self {
        Self { backend }
    }
}

impl Planner for ModelPlanner {
    fn plan(&self, query: &str) -> Result<Plan, PlanningFailure> {
        let prompt = PromptEngine::new()
            .and_then(|engine| engine.render_planner(query))
            .map_err(|err| PlanningFailure::Unavailable(format!("{err:#}")))?;
        let answer = self
            .backend
            .complete(&CompletionRequest::new("planner", prompt))
            .map_err(|err| PlanningFailure::Unavailable(format!("{err:#}")))?;
        let plan = plan_from_output(&answer)?;
        debug!(tasks = plan.len(), "model plan accepted");
        Ok(plan)
    }
}

/// The canonical four-step plan, no model involved.
pub struct StaticPlanner;

impl Planner for StaticPlanner {
    fn plan(&self, query: &str) -> Result<Plan, PlanningFailure> {
        Plan::new(vec![
            TaskDescriptor::new("T1", WorkerKind::Retrieval, query),
            TaskDescriptor::new(
                "T2",
                WorkerKind::Synthesis,
                "Synthesize a briefing from the retrieved data.",
            ),
            TaskDescriptor::new("T3", WorkerKind::Filter, "Mask sensitive data in the draft."),
            TaskDescriptor::new(
                "T4",
                WorkerKind::Verification,
                "Verify the filtered draft.",
            ),
        ])
        .map_err(|err| PlanningFailure::Invalid(err.to_string()))
    }
}
