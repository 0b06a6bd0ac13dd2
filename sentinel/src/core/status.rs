//! Closed status vocabulary for missions.
//!
//! Statuses serialize as stable SCREAMING_SNAKE_CASE tags (`TASK_COMPLETE`,
//! `EXECUTING_SYNTHESIS`, `RETRIEVAL_FAILED`, ...). Parsing an unknown tag is an
//! error, so a persisted record can never carry a status outside this set.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The four interchangeable processing stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerKind {
    #[serde(alias = "DataRetrievalAgent")]
    Retrieval,
    #[serde(alias = "SynthesisAgent")]
    Synthesis,
    #[serde(alias = "OutputFilterAgent")]
    Filter,
    #[serde(alias = "VerificationAgent")]
    Verification,
}

impl WorkerKind {
    pub const ALL: [WorkerKind; 4] = [
        WorkerKind::Retrieval,
        WorkerKind::Synthesis,
        WorkerKind::Filter,
        WorkerKind::Verification,
    ];

    /// Lowercase name used in plans and config.
    pub fn as_str(self) -> &'static str {
        match self {
            WorkerKind::Retrieval => "retrieval",
            WorkerKind::Synthesis => "synthesis",
            WorkerKind::Filter => "filter",
            WorkerKind::Verification => "verification",
        }
    }

    /// Uppercase stage tag used inside parameterized statuses.
    pub fn tag(self) -> &'static str {
        match self {
            WorkerKind::Retrieval => "RETRIEVAL",
            WorkerKind::Synthesis => "SYNTHESIS",
            WorkerKind::Filter => "FILTER",
            WorkerKind::Verification => "VERIFICATION",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        WorkerKind::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// True if a worker of this kind is allowed to report `status` after `execute`.
    pub fn reports(self, status: MissionStatus) -> bool {
        match status {
            MissionStatus::StageFailed(kind) => kind == self,
            MissionStatus::RetrievalComplete | MissionStatus::RetrievalEmpty => {
                self == WorkerKind::Retrieval
            }
            MissionStatus::SynthesisComplete => self == WorkerKind::Synthesis,
            MissionStatus::FilterComplete => self == WorkerKind::Filter,
            MissionStatus::VerificationPass | MissionStatus::VerificationFailCritical => {
                self == WorkerKind::Verification
            }
            _ => false,
        }
    }
}

impl fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mission status. Drives every transition of both coordinators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MissionStatus {
    Initialized,
    Planning,
    PlanningSuccess,
    PlanningFailed,
    TaskComplete,
    /// Transient: a task has been handed to a worker of this kind.
    Executing(WorkerKind),
    /// Kind-specific worker failure; halts the mission.
    StageFailed(WorkerKind),
    RetrievalComplete,
    RetrievalEmpty,
    SynthesisComplete,
    FilterComplete,
    VerificationPass,
    VerificationFailCritical,
    CompletedPlan,
    FinalReportReady,
    MissionHalted,
    RevisionExhausted,
    /// Terminal success of the fixed-phase pipeline.
    Completed,
    Terminated,
}

impl MissionStatus {
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            MissionStatus::StageFailed(_) | MissionStatus::PlanningFailed
        )
    }

    fn fixed_tag(self) -> Option<&'static str> {
        let tag = match self {
            MissionStatus::Initialized => "INITIALIZED",
            MissionStatus::Planning => "PLANNING",
            MissionStatus::PlanningSuccess => "PLANNING_SUCCESS",
            MissionStatus::PlanningFailed => "PLANNING_FAILED",
            MissionStatus::TaskComplete => "TASK_COMPLETE",
            MissionStatus::RetrievalComplete => "RETRIEVAL_COMPLETE",
            MissionStatus::RetrievalEmpty => "RETRIEVAL_EMPTY",
            MissionStatus::SynthesisComplete => "SYNTHESIS_COMPLETE",
            MissionStatus::FilterComplete => "FILTER_COMPLETE",
            MissionStatus::VerificationPass => "VERIFICATION_PASS",
            MissionStatus::VerificationFailCritical => "VERIFICATION_FAIL_CRITICAL",
            MissionStatus::CompletedPlan => "COMPLETED_PLAN",
            MissionStatus::FinalReportReady => "FINAL_REPORT_READY",
            MissionStatus::MissionHalted => "MISSION_HALTED",
            MissionStatus::RevisionExhausted => "REVISION_EXHAUSTED",
            MissionStatus::Completed => "COMPLETED",
            MissionStatus::Terminated => "TERMINATED",
            MissionStatus::Executing(_) | MissionStatus::StageFailed(_) => return None,
        };
        Some(tag)
    }

    const FIXED: [MissionStatus; 17] = [
        MissionStatus::Initialized,
        MissionStatus::Planning,
        MissionStatus::PlanningSuccess,
        MissionStatus::PlanningFailed,
        MissionStatus::TaskComplete,
        MissionStatus::RetrievalComplete,
        MissionStatus::RetrievalEmpty,
        MissionStatus::SynthesisComplete,
        MissionStatus::FilterComplete,
        MissionStatus::VerificationPass,
        MissionStatus::VerificationFailCritical,
        MissionStatus::CompletedPlan,
        MissionStatus::FinalReportReady,
        MissionStatus::MissionHalted,
        MissionStatus::RevisionExhausted,
        MissionStatus::Completed,
        MissionStatus::Terminated,
    ];
}

impl fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissionStatus::Executing(kind) => write!(f, "EXECUTING_{}", kind.tag()),
            MissionStatus::StageFailed(kind) => write!(f, "{}_FAILED", kind.tag()),
            other => f.write_str(other.fixed_tag().unwrap_or_default()),
        }
    }
}

/// Raised when a status tag is outside the closed vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown mission status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for MissionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(status) = MissionStatus::FIXED
            .into_iter()
            .find(|status| status.fixed_tag() == Some(s))
        {
            return Ok(status);
        }
        if let Some(kind) = s.strip_prefix("EXECUTING_").and_then(WorkerKind::from_tag) {
            return Ok(MissionStatus::Executing(kind));
        }
        if let Some(kind) = s.strip_suffix("_FAILED").and_then(WorkerKind::from_tag) {
            return Ok(MissionStatus::StageFailed(kind));
        }
        Err(UnknownStatus(s.to_string()))
    }
}

impl TryFrom<String> for MissionStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MissionStatus> for String {
    fn from(status: MissionStatus) -> Self {
        status.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameterized_statuses_render_with_stage_tag() {
        assert_eq!(
            MissionStatus::Executing(WorkerKind::Synthesis).to_string(),
            "EXECUTING_SYNTHESIS"
        );
        assert_eq!(
            MissionStatus::StageFailed(WorkerKind::Retrieval).to_string(),
            "RETRIEVAL_FAILED"
        );
    }

    #[test]
    fn every_status_tag_parses_back() {
        let mut all: Vec<MissionStatus> = MissionStatus::FIXED.to_vec();
        for kind in WorkerKind::ALL {
            all.push(MissionStatus::Executing(kind));
            all.push(MissionStatus::StageFailed(kind));
        }
        for status in all {
            assert_eq!(status.to_string().parse::<MissionStatus>(), Ok(status));
        }
    }

    #[test]
    fn unknown_tags_are_rejected() {
        assert!("RETRIEVING".parse::<MissionStatus>().is_err());
        assert!("EXECUTING_DataRetrievalAgent".parse::<MissionStatus>().is_err());
        assert!("PARSE_FAILED".parse::<MissionStatus>().is_err());

        let err = serde_json::from_str::<MissionStatus>("\"VERIFIED\"").unwrap_err();
        assert!(err.to_string().contains("unknown mission status"));
    }

    #[test]
    fn status_serializes_as_plain_tag() {
        let json = serde_json::to_string(&MissionStatus::FinalReportReady).expect("serialize");
        assert_eq!(json, "\"FINAL_REPORT_READY\"");
    }

    #[test]
    fn worker_kind_accepts_agent_name_aliases() {
        let kind: WorkerKind = serde_json::from_str("\"OutputFilterAgent\"").expect("alias");
        assert_eq!(kind, WorkerKind::Filter);
        let kind: WorkerKind = serde_json::from_str("\"verification\"").expect("name");
        assert_eq!(kind, WorkerKind::Verification);
    }

    #[test]
    fn workers_only_report_their_own_statuses() {
        assert!(WorkerKind::Retrieval.reports(MissionStatus::RetrievalEmpty));
        assert!(WorkerKind::Filter.reports(MissionStatus::StageFailed(WorkerKind::Filter)));
        assert!(!WorkerKind::Filter.reports(MissionStatus::StageFailed(WorkerKind::Synthesis)));
        assert!(!WorkerKind::Synthesis.reports(MissionStatus::VerificationPass));
        assert!(!WorkerKind::Verification.reports(MissionStatus::TaskComplete));
    }
}
