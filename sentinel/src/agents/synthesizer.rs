//! Synthesis worker: drafts the briefing from retrieved snippets.

use std::rc::Rc;

use anyhow::{Result, bail};
use serde_json::json;

use crate::agents::Worker;
use crate::core::status::{MissionStatus, WorkerKind};
use crate::core::types::{ActionType, TaskDescriptor};
use crate::io::backend::{CompletionRequest, ModelBackend};
use crate::io::prompt::PromptEngine;
use crate::mission::MissionRecord;

pub const AGENT_ID: &str = "SYN-1";

/// Draft written when retrieval found nothing.
pub const NO_DATA_REPORT: &str = "No relevant data found for the query.";

pub struct Synthesizer {
    backend: Rc<dyn ModelBackend>,
}

impl Synthesizer {
    pub fn new(backend: Rc<dyn ModelBackend>) -> Self {
        Self { backend }
    }

    fn draft(&self, record: &MissionRecord, task: &TaskDescriptor) -> Result<String> {
        // A failed verdict on the record means this is a revision pass.
        let critique = record
            .artifacts
            .verdict
            .as_ref()
            .filter(|verdict| !verdict.passed)
            .map(|verdict| verdict.critique.as_str());
        let prompt = PromptEngine::new()?.render_synthesis(
            record.query(),
            &task.input,
            &record.artifacts.retrieved,
            critique,
        )?;
        let answer = self
            .backend
            .complete(&CompletionRequest::new("synthesis", prompt))?;
        if answer.trim().is_empty() {
            bail!("model returned an empty draft");
        }
        Ok(answer.trim().to_string())
    }
}

impl Worker for Synthesizer {
    fn kind(&self) -> WorkerKind {
        WorkerKind::Synthesis
    }

    fn agent_id(&self) -> &str {
        AGENT_ID
    }

    fn execute(&self, mut record: MissionRecord, task: &TaskDescriptor) -> MissionRecord {
        if record.artifacts.retrieved.is_empty() {
            record.artifacts.draft = Some(NO_DATA_REPORT.to_string());
            record.log(
                AGENT_ID,
                ActionType::SynthesisNoData,
                "No source data; wrote the no-findings report.",
                None,
            );
            record.status = MissionStatus::SynthesisComplete;
            return record;
        }

        record.log(
            AGENT_ID,
            ActionType::SynthesisStart,
            "Drafting report from retrieved data.",
            Some(json!({ "sources": record.artifacts.retrieved.len() })),
        );
        match self.draft(&record, task) {
            Ok(draft) => {
                let chars = draft.chars().count();
                record.artifacts.draft = Some(draft);
                record.log(
                    AGENT_ID,
                    ActionType::SynthesisComplete,
                    "Draft written.",
                    Some(json!({ "draft_chars": chars })),
                );
                record.status = MissionStatus::SynthesisComplete;
            }
            Err(err) => {
                record.log(
                    AGENT_ID,
                    ActionType::SynthesisFailed,
                    "Model call failed.",
                    Some(json!({ "error": format!("{err:#}") })),
                );
                record.status = MissionStatus::StageFailed(WorkerKind::Synthesis);
            }
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{DriveMode, Verdict};
    use crate::test_support::{ScriptedBackend, sample_item};

    fn record_with_data() -> MissionRecord {
        let mut record = MissionRecord::with_id("m-1", "network outage", DriveMode::Plan);
        record.artifacts.retrieved.push(sample_item("Policy-Doc-B"));
        record
    }

    fn task() -> TaskDescriptor {
        TaskDescriptor::new("T2", WorkerKind::Synthesis, "")
    }

    #[test]
    fn no_data_writes_literal_report_without_calling_backend() {
        let backend = Rc::new(ScriptedBackend::new(Vec::<String>::new()));
        let synthesizer = Synthesizer::new(backend.clone());
        let record = MissionRecord::with_id("m-1", "q", DriveMode::Plan);

        let record = synthesizer.execute(record, &task());
        assert_eq!(record.status, MissionStatus::SynthesisComplete);
        assert_eq!(record.artifacts.draft.as_deref(), Some(NO_DATA_REPORT));
        assert!(backend.requests().is_empty());
    }

    #[test]
    fn model_answer_becomes_draft() {
        let backend = Rc::new(ScriptedBackend::new(["  Outage reported by Policy-Doc-B. \n"]));
        let synthesizer = Synthesizer::new(backend.clone());

        let record = synthesizer.execute(record_with_data(), &task());
        assert_eq!(record.status, MissionStatus::SynthesisComplete);
        assert_eq!(
            record.artifacts.draft.as_deref(),
            Some("Outage reported by Policy-Doc-B.")
        );
        let requests = backend.requests();
        assert_eq!(requests[0].label, "synthesis");
        assert!(requests[0].prompt.contains("network outage"));
    }

    #[test]
    fn revision_prompt_carries_failed_critique() {
        let backend = Rc::new(ScriptedBackend::new(["Revised draft."]));
        let synthesizer = Synthesizer::new(backend.clone());
        let mut record = record_with_data();
        record.artifacts.verdict = Some(Verdict {
            score: 2.0,
            passed: false,
            critique: "Claims are unsupported.".to_string(),
        });

        synthesizer.execute(record, &task());
        assert!(backend.requests()[0].prompt.contains("Claims are unsupported."));
    }

    #[test]
    fn backend_error_or_empty_answer_fails_the_stage() {
        for backend in [ScriptedBackend::failing("model offline"), ScriptedBackend::new(["   "])] {
            let record = Synthesizer::new(Rc::new(backend)).execute(record_with_data(), &task());
            assert_eq!(
                record.status,
                MissionStatus::StageFailed(WorkerKind::Synthesis)
            );
            assert!(record.artifacts.draft.is_none());
        }
    }
}
