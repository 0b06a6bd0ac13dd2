//! Explicit transition table for both drive paths.
//!
//! `transition` is total over `(mode, status, event)`: every combination either
//! yields the next status or a `TransitionError`. The coordinators never assign a
//! status that did not come out of this table.

use thiserror::Error;

use crate::core::status::{MissionStatus, WorkerKind};
use crate::core::types::DriveMode;

/// Something that happened during a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Planner invoked for a fresh or interrupted planning phase.
    PlanningStarted,
    PlanAccepted,
    PlanRejected,
    /// Revision plan installed after a critical verification failure.
    RevisionInstalled,
    /// Revision budget spent.
    RevisionDenied,
    /// Task handed to a worker of this kind.
    Delegated(WorkerKind),
    /// Worker returned with a status (plan path: collapses successes to `TASK_COMPLETE`).
    WorkerReported(MissionStatus),
    /// Worker returned with a status (pipeline path: the status becomes the next phase).
    PhaseReported(MissionStatus),
    /// No pending task left in the plan.
    PlanExhausted,
    /// Plan exhausted and the last worker reported `VERIFICATION_PASS`.
    Verified,
    /// Plan exhausted without a terminal success signal.
    Unverified,
    /// Pipeline verification passed.
    PipelineFinished,
    /// Stop the mission (contract violation or pipeline rejection).
    Abort,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no {mode} transition from {from} on {event:?}", mode = mode.as_str())]
pub struct TransitionError {
    pub mode: DriveMode,
    pub from: MissionStatus,
    pub event: Event,
}

/// Worker that the fixed pipeline runs next from `status`, if any.
pub fn pipeline_worker_for(status: MissionStatus) -> Option<WorkerKind> {
    match status {
        MissionStatus::Initialized => Some(WorkerKind::Retrieval),
        MissionStatus::RetrievalEmpty | MissionStatus::RetrievalComplete => {
            Some(WorkerKind::Synthesis)
        }
        MissionStatus::SynthesisComplete => Some(WorkerKind::Filter),
        MissionStatus::FilterComplete => Some(WorkerKind::Verification),
        _ => None,
    }
}

/// Resolve the next status.
pub fn transition(
    mode: DriveMode,
    from: MissionStatus,
    event: Event,
) -> Result<MissionStatus, TransitionError> {
    let next = match mode {
        DriveMode::Plan => plan_transition(from, event),
        DriveMode::Pipeline => pipeline_transition(from, event),
    };
    next.ok_or(TransitionError { mode, from, event })
}

fn plan_transition(from: MissionStatus, event: Event) -> Option<MissionStatus> {
    match (from, event) {
        (_, Event::Abort) => Some(MissionStatus::Terminated),
        (MissionStatus::Initialized | MissionStatus::Planning, Event::PlanningStarted) => {
            Some(MissionStatus::Planning)
        }
        (MissionStatus::Planning, Event::PlanAccepted) => Some(MissionStatus::PlanningSuccess),
        (MissionStatus::Planning, Event::PlanRejected) => Some(MissionStatus::PlanningFailed),
        (MissionStatus::VerificationFailCritical, Event::RevisionInstalled) => {
            Some(MissionStatus::TaskComplete)
        }
        (MissionStatus::VerificationFailCritical, Event::RevisionDenied) => {
            Some(MissionStatus::RevisionExhausted)
        }
        (
            MissionStatus::PlanningSuccess | MissionStatus::TaskComplete,
            Event::Delegated(kind),
        ) => Some(MissionStatus::Executing(kind)),
        (MissionStatus::Executing(kind), Event::WorkerReported(reported)) => {
            if !kind.reports(reported) {
                return None;
            }
            match reported {
                MissionStatus::StageFailed(_) | MissionStatus::VerificationFailCritical => {
                    Some(reported)
                }
                _ => Some(MissionStatus::TaskComplete),
            }
        }
        (
            MissionStatus::PlanningSuccess | MissionStatus::TaskComplete,
            Event::PlanExhausted,
        ) => Some(MissionStatus::CompletedPlan),
        (MissionStatus::CompletedPlan, Event::Verified) => Some(MissionStatus::FinalReportReady),
        (MissionStatus::CompletedPlan, Event::Unverified) => Some(MissionStatus::MissionHalted),
        _ => None,
    }
}

fn pipeline_transition(from: MissionStatus, event: Event) -> Option<MissionStatus> {
    match (from, event) {
        (_, Event::Abort) => Some(MissionStatus::Terminated),
        (phase, Event::Delegated(kind)) if pipeline_worker_for(phase) == Some(kind) => {
            Some(MissionStatus::Executing(kind))
        }
        (MissionStatus::Executing(kind), Event::PhaseReported(reported))
            if kind.reports(reported) =>
        {
            Some(reported)
        }
        (MissionStatus::VerificationPass, Event::PipelineFinished) => {
            Some(MissionStatus::Completed)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(from: MissionStatus, event: Event) -> Result<MissionStatus, TransitionError> {
        transition(DriveMode::Plan, from, event)
    }

    #[test]
    fn plan_happy_path_transitions() {
        assert_eq!(
            plan(MissionStatus::Initialized, Event::PlanningStarted),
            Ok(MissionStatus::Planning)
        );
        assert_eq!(
            plan(MissionStatus::Planning, Event::PlanAccepted),
            Ok(MissionStatus::PlanningSuccess)
        );
        assert_eq!(
            plan(
                MissionStatus::PlanningSuccess,
                Event::Delegated(WorkerKind::Retrieval)
            ),
            Ok(MissionStatus::Executing(WorkerKind::Retrieval))
        );
        assert_eq!(
            plan(
                MissionStatus::Executing(WorkerKind::Retrieval),
                Event::WorkerReported(MissionStatus::RetrievalEmpty)
            ),
            Ok(MissionStatus::TaskComplete)
        );
        assert_eq!(
            plan(MissionStatus::TaskComplete, Event::PlanExhausted),
            Ok(MissionStatus::CompletedPlan)
        );
        assert_eq!(
            plan(MissionStatus::CompletedPlan, Event::Verified),
            Ok(MissionStatus::FinalReportReady)
        );
    }

    #[test]
    fn worker_failures_and_critical_verification_are_kept() {
        let failed = MissionStatus::StageFailed(WorkerKind::Synthesis);
        assert_eq!(
            plan(
                MissionStatus::Executing(WorkerKind::Synthesis),
                Event::WorkerReported(failed)
            ),
            Ok(failed)
        );
        assert_eq!(
            plan(
                MissionStatus::Executing(WorkerKind::Verification),
                Event::WorkerReported(MissionStatus::VerificationFailCritical)
            ),
            Ok(MissionStatus::VerificationFailCritical)
        );
    }

    #[test]
    fn worker_reporting_foreign_status_is_rejected() {
        let err = plan(
            MissionStatus::Executing(WorkerKind::Filter),
            Event::WorkerReported(MissionStatus::VerificationPass),
        )
        .expect_err("foreign status");
        assert_eq!(err.from, MissionStatus::Executing(WorkerKind::Filter));
        assert!(err.to_string().contains("no plan transition from EXECUTING_FILTER"));

        assert!(
            plan(
                MissionStatus::Executing(WorkerKind::Filter),
                Event::WorkerReported(MissionStatus::Executing(WorkerKind::Filter))
            )
            .is_err()
        );
    }

    #[test]
    fn revision_transitions_leave_critical_failure() {
        assert_eq!(
            plan(MissionStatus::VerificationFailCritical, Event::RevisionInstalled),
            Ok(MissionStatus::TaskComplete)
        );
        assert_eq!(
            plan(MissionStatus::VerificationFailCritical, Event::RevisionDenied),
            Ok(MissionStatus::RevisionExhausted)
        );
        assert!(plan(MissionStatus::TaskComplete, Event::RevisionInstalled).is_err());
    }

    #[test]
    fn plan_path_rejects_pipeline_only_events() {
        assert!(plan(MissionStatus::VerificationPass, Event::PipelineFinished).is_err());
        assert!(plan(MissionStatus::Initialized, Event::Delegated(WorkerKind::Retrieval)).is_err());
    }

    #[test]
    fn pipeline_follows_fixed_phase_order() {
        let pipe = |from, event| transition(DriveMode::Pipeline, from, event);
        assert_eq!(
            pipe(MissionStatus::Initialized, Event::Delegated(WorkerKind::Retrieval)),
            Ok(MissionStatus::Executing(WorkerKind::Retrieval))
        );
        assert!(pipe(MissionStatus::Initialized, Event::Delegated(WorkerKind::Filter)).is_err());
        assert_eq!(
            pipe(
                MissionStatus::Executing(WorkerKind::Retrieval),
                Event::PhaseReported(MissionStatus::RetrievalEmpty)
            ),
            Ok(MissionStatus::RetrievalEmpty)
        );
        assert_eq!(
            pipe(MissionStatus::VerificationPass, Event::PipelineFinished),
            Ok(MissionStatus::Completed)
        );
        assert_eq!(
            pipe(MissionStatus::VerificationFailCritical, Event::Abort),
            Ok(MissionStatus::Terminated)
        );
        assert!(pipe(MissionStatus::PlanningSuccess, Event::PlanExhausted).is_err());
    }

    #[test]
    fn pipeline_worker_mapping_is_single_valued() {
        assert_eq!(
            pipeline_worker_for(MissionStatus::RetrievalEmpty),
            Some(WorkerKind::Synthesis)
        );
        assert_eq!(
            pipeline_worker_for(MissionStatus::FilterComplete),
            Some(WorkerKind::Verification)
        );
        assert_eq!(pipeline_worker_for(MissionStatus::VerificationPass), None);
    }
}
