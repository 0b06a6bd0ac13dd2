//! Multi-step run loop shared by both drive paths.

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::core::status::MissionStatus;
use crate::io::mission_store::MissionStore;
use crate::mission::MissionRecord;
use crate::step::StepOutcome;

/// A coordinator that advances a mission by exactly one step per call.
pub trait MissionDriver {
    fn step(&self, record: MissionRecord) -> StepOutcome;
}

/// Reason why `run_mission` stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStop {
    /// The mission reached a terminal status for its drive path.
    Terminal(MissionStatus),
    /// The step budget ran out first; the mission can be resumed.
    MaxStepsExceeded { max_steps: u32 },
}

/// Summary of a loop invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopOutcome {
    pub record: MissionRecord,
    pub steps_executed: u32,
    pub stop: LoopStop,
}

/// Step `record` until its status is terminal for its mode or `max_steps` steps ran.
///
/// With a store, the record is persisted after every step, before `on_step` sees it.
/// A persistence failure stops the loop with an error.
#[instrument(skip_all, fields(mission_id = %record.mission_id(), max_steps))]
pub fn run_mission<D, F>(
    driver: &D,
    mut record: MissionRecord,
    mut store: Option<&mut MissionStore>,
    max_steps: u32,
    mut on_step: F,
) -> Result<LoopOutcome>
where
    D: MissionDriver + ?Sized,
    F: FnMut(&StepOutcome),
{
    let mut steps_executed = 0u32;
    loop {
        if record.mode().is_terminal(record.status) {
            info!(status = %record.status, steps_executed, "mission reached terminal status");
            let stop = LoopStop::Terminal(record.status);
            return Ok(LoopOutcome {
                record,
                steps_executed,
                stop,
            });
        }
        if steps_executed >= max_steps {
            info!(status = %record.status, "step budget exhausted");
            return Ok(LoopOutcome {
                record,
                steps_executed,
                stop: LoopStop::MaxStepsExceeded { max_steps },
            });
        }

        let outcome = driver.step(record);
        steps_executed += 1;
        if let Some(store) = store.as_deref_mut() {
            store
                .persist(&outcome.record)
                .with_context(|| format!("persist after step {steps_executed}"))?;
        }
        on_step(&outcome);
        record = outcome.record;
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::core::types::{ActionType, DriveMode};
    use crate::mission::COORDINATOR_ID;

    /// Driver that walks PLANNING_SUCCESS -> TASK_COMPLETE -> FINAL_REPORT_READY.
    struct CountingDriver {
        calls: Cell<u32>,
    }

    impl MissionDriver for CountingDriver {
        fn step(&self, mut record: MissionRecord) -> StepOutcome {
            self.calls.set(self.calls.get() + 1);
            let from = record.status;
            record.status = match from {
                MissionStatus::Initialized => MissionStatus::PlanningSuccess,
                MissionStatus::PlanningSuccess => MissionStatus::TaskComplete,
                _ => MissionStatus::FinalReportReady,
            };
            record.log(COORDINATOR_ID, ActionType::TaskComplete, "step", None);
            StepOutcome::new(record, from, None)
        }
    }

    #[test]
    fn stops_on_terminal_status() {
        let driver = CountingDriver {
            calls: Cell::new(0),
        };
        let record = MissionRecord::with_id("m-1", "q", DriveMode::Plan);
        let mut seen = Vec::new();
        let outcome = run_mission(&driver, record, None, 10, |step| seen.push(step.to))
            .expect("run");
        assert_eq!(
            outcome.stop,
            LoopStop::Terminal(MissionStatus::FinalReportReady)
        );
        assert_eq!(outcome.steps_executed, 3);
        assert_eq!(seen.len(), 3);
        assert_eq!(driver.calls.get(), 3);
    }

    #[test]
    fn stops_when_step_budget_runs_out() {
        let driver = CountingDriver {
            calls: Cell::new(0),
        };
        let record = MissionRecord::with_id("m-1", "q", DriveMode::Plan);
        let outcome = run_mission(&driver, record, None, 1, |_| {}).expect("run");
        assert_eq!(outcome.stop, LoopStop::MaxStepsExceeded { max_steps: 1 });
        assert_eq!(outcome.record.status, MissionStatus::PlanningSuccess);
    }

    #[test]
    fn terminal_record_is_not_stepped() {
        let driver = CountingDriver {
            calls: Cell::new(0),
        };
        let mut record = MissionRecord::with_id("m-1", "q", DriveMode::Plan);
        record.status = MissionStatus::MissionHalted;
        let outcome = run_mission(&driver, record, None, 5, |_| {}).expect("run");
        assert_eq!(outcome.steps_executed, 0);
        assert_eq!(driver.calls.get(), 0);
    }

    #[test]
    fn persists_after_every_step() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut store = MissionStore::open(temp.path()).expect("open");
        let driver = CountingDriver {
            calls: Cell::new(0),
        };
        let record = MissionRecord::with_id("m-1", "q", DriveMode::Plan);
        let outcome =
            run_mission(&driver, record, Some(&mut store), 10, |_| {}).expect("run");

        let mut reopened = MissionStore::open(temp.path()).expect("open");
        let loaded = reopened.load().expect("load").expect("record");
        assert_eq!(loaded, outcome.record);
    }
}
