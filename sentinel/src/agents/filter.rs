//! Output filter: masks sensitive spans in the draft and retrieved snippets.

use serde_json::json;

use crate::agents::Worker;
use crate::core::scrub::scrub;
use crate::core::status::{MissionStatus, WorkerKind};
use crate::core::types::{ActionType, TaskDescriptor};
use crate::mission::MissionRecord;

pub const AGENT_ID: &str = "FILTER-1";

pub struct OutputFilter;

impl Worker for OutputFilter {
    fn kind(&self) -> WorkerKind {
        WorkerKind::Filter
    }

    fn agent_id(&self) -> &str {
        AGENT_ID
    }

    fn execute(&self, mut record: MissionRecord, _task: &TaskDescriptor) -> MissionRecord {
        record.log(AGENT_ID, ActionType::FilterStart, "Scrubbing outputs.", None);

        let mut masks_applied = 0;
        match record.artifacts.draft.take() {
            Some(draft) => {
                let (scrubbed, applied) = scrub(&draft);
                masks_applied += applied;
                record.artifacts.draft = Some(scrubbed);
            }
            None => record.log(
                AGENT_ID,
                ActionType::FilterSkip,
                "No draft to filter; scrubbing snippets only.",
                None,
            ),
        }
        for item in &mut record.artifacts.retrieved {
            let (scrubbed, applied) = scrub(&item.snippet);
            masks_applied += applied;
            item.snippet = scrubbed;
        }

        record.log(
            AGENT_ID,
            ActionType::FilterComplete,
            format!("Applied {masks_applied} masks."),
            Some(json!({ "masks_applied": masks_applied })),
        );
        record.status = MissionStatus::FilterComplete;
        record
    }
}
