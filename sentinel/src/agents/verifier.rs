//! Verification worker: model-scored critique of the filtered draft.
//!
//! Rubric: hallucination 40%, bias and tone 30%, sensitive data 30%. The model's own
//! `passed` flag is necessary but not sufficient; the score must reach the configured
//! threshold and the draft must contain no unmasked sensitive span.

use std::rc::Rc;

use anyhow::{Context, Result, anyhow};
use serde_json::{Value, json};

use crate::agents::Worker;
use crate::core::extract::extract_json_object;
use crate::core::scrub::contains_sensitive;
use crate::core::status::{MissionStatus, WorkerKind};
use crate::core::types::{ActionType, TaskDescriptor, Verdict};
use crate::io::backend::{CompletionRequest, ModelBackend};
use crate::io::prompt::PromptEngine;
use crate::io::schema::{VERDICT_SCHEMA, validate_schema};
use crate::mission::MissionRecord;

pub const AGENT_ID: &str = "VER-1";

pub struct Verifier {
    backend: Rc<dyn ModelBackend>,
    pass_threshold: f64,
}

/// Raw model verdict, validated against `verdict.schema.json`.
pub fn parse_verdict(answer: &str) -> Result<Verdict> {
    let raw = extract_json_object(answer).ok_or_else(|| anyhow!("no JSON object in answer"))?;
    let value: Value = serde_json::from_str(raw).context("parse verdict json")?;
    validate_schema(VERDICT_SCHEMA, &value)?;
    serde_json::from_value(value).context("deserialize verdict")
}

impl Verifier {
    pub fn new(backend: Rc<dyn ModelBackend>, pass_threshold: f64) -> Self {
        Self {
            backend,
            pass_threshold,
        }
    }

    fn fail(
        mut record: MissionRecord,
        action: ActionType,
        reasoning: &str,
        error: String,
    ) -> MissionRecord {
        record.log(AGENT_ID, action, reasoning, Some(json!({ "error": error })));
        record.status = MissionStatus::StageFailed(WorkerKind::Verification);
        record
    }
}

impl Worker for Verifier {
    fn kind(&self) -> WorkerKind {
        WorkerKind::Verification
    }

    fn agent_id(&self) -> &str {
        AGENT_ID
    }

    fn execute(&self, mut record: MissionRecord, _task: &TaskDescriptor) -> MissionRecord {
        record.log(
            AGENT_ID,
            ActionType::VerificationStart,
            "Scoring draft against rubric.",
            None,
        );

        let draft = match record.artifacts.draft.as_deref() {
            Some(draft) if !draft.trim().is_empty() => draft.to_string(),
            _ => {
                return Self::fail(
                    record,
                    ActionType::VerificationFailed,
                    "Nothing to verify.",
                    "missing draft".to_string(),
                );
            }
        };
        if record.artifacts.retrieved.is_empty() {
            return Self::fail(
                record,
                ActionType::VerificationFailed,
                "No source data to verify against.",
                "missing retrieved data".to_string(),
            );
        }

        let answer = PromptEngine::new()
            .and_then(|engine| {
                engine.render_verification(record.query(), &draft, &record.artifacts.retrieved)
            })
            .and_then(|prompt| {
                self.backend
                    .complete(&CompletionRequest::new("verification", prompt))
            });
        let answer = match answer {
            Ok(answer) => answer,
            Err(err) => {
                return Self::fail(
                    record,
                    ActionType::VerificationFailed,
                    "Model call failed.",
                    format!("{err:#}"),
                );
            }
        };
        let model = match parse_verdict(&answer) {
            Ok(model) => model,
            Err(err) => {
                return Self::fail(
                    record,
                    ActionType::VerificationFailedParse,
                    "Verifier answer was not a valid verdict.",
                    format!("{err:#}"),
                );
            }
        };

        let sensitive_leak = contains_sensitive(&draft);
        let passed = model.passed && model.score >= self.pass_threshold && !sensitive_leak;
        record.log(
            AGENT_ID,
            ActionType::VerificationScore,
            format!("Score {:.1}/5.0.", model.score),
            Some(json!({
                "score": model.score,
                "model_passed": model.passed,
                "sensitive_leak": sensitive_leak,
                "pass_threshold": self.pass_threshold,
            })),
        );
        record.artifacts.verdict = Some(Verdict {
            score: model.score,
            passed,
            critique: model.critique,
        });

        if passed {
            record.log(AGENT_ID, ActionType::VerificationPass, "Draft approved.", None);
            record.status = MissionStatus::VerificationPass;
        } else {
            record.log(
                AGENT_ID,
                ActionType::VerificationFailCritical,
                "Draft rejected; revision required.",
                None,
            );
            record.status = MissionStatus::VerificationFailCritical;
        }
        record
    }
}
