//! Test doubles for model backends, search indexes and workers.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use anyhow::{Result, anyhow};

use crate::agents::Worker;
use crate::core::status::{MissionStatus, WorkerKind};
use crate::core::types::{RetrievedItem, TaskDescriptor};
use crate::io::backend::{CompletionRequest, ModelBackend};
use crate::io::knowledge_base::SearchIndex;
use crate::mission::MissionRecord;

/// Backend that replays queued answers in order and records every request.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    answers: RefCell<VecDeque<String>>,
    fail_with: Option<String>,
    requests: RefCell<Vec<CompletionRequest>>,
}

impl ScriptedBackend {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: RefCell::new(answers.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Backend whose every call fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.borrow().clone()
    }

    pub fn remaining(&self) -> usize {
        self.answers.borrow().len()
    }
}

impl ModelBackend for ScriptedBackend {
    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.requests.borrow_mut().push(request.clone());
        if let Some(message) = &self.fail_with {
            return Err(anyhow!("{message}"));
        }
        self.answers
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted backend has no answer for '{}'", request.label))
    }
}

/// Index returning a fixed result set and recording each topic.
#[derive(Debug, Default)]
pub struct ScriptedSearchIndex {
    items: Vec<RetrievedItem>,
    topics: RefCell<Vec<String>>,
}

impl ScriptedSearchIndex {
    pub fn new(items: Vec<RetrievedItem>) -> Self {
        Self {
            items,
            topics: RefCell::default(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn topics(&self) -> Vec<String> {
        self.topics.borrow().clone()
    }
}

impl SearchIndex for ScriptedSearchIndex {
    fn search(&self, topic: &str) -> Result<Vec<RetrievedItem>> {
        self.topics.borrow_mut().push(topic.to_string());
        Ok(self.items.clone())
    }
}

/// Index that always errors, e.g. to stand in for a timed-out search service.
#[derive(Debug)]
pub struct FailingSearchIndex {
    message: String,
}

impl FailingSearchIndex {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl SearchIndex for FailingSearchIndex {
    fn search(&self, _topic: &str) -> Result<Vec<RetrievedItem>> {
        Err(anyhow!("{}", self.message))
    }
}

/// Task ids a [`ScriptedWorker`] has executed, shared with the test.
pub type ExecutionLog = Rc<RefCell<Vec<String>>>;

/// Worker that reports queued statuses, then its kind's default success.
pub struct ScriptedWorker {
    kind: WorkerKind,
    reports: RefCell<VecDeque<MissionStatus>>,
    executed: ExecutionLog,
}

impl ScriptedWorker {
    pub fn new(kind: WorkerKind, reports: impl IntoIterator<Item = MissionStatus>) -> Self {
        Self {
            kind,
            reports: RefCell::new(reports.into_iter().collect()),
            executed: ExecutionLog::default(),
        }
    }

    pub fn execution_log(&self) -> ExecutionLog {
        Rc::clone(&self.executed)
    }
}

/// Success status a worker of `kind` reports when nothing else is scripted.
pub fn default_success(kind: WorkerKind) -> MissionStatus {
    match kind {
        WorkerKind::Retrieval => MissionStatus::RetrievalComplete,
        WorkerKind::Synthesis => MissionStatus::SynthesisComplete,
        WorkerKind::Filter => MissionStatus::FilterComplete,
        WorkerKind::Verification => MissionStatus::VerificationPass,
    }
}

impl Worker for ScriptedWorker {
    fn kind(&self) -> WorkerKind {
        self.kind
    }

    fn agent_id(&self) -> &str {
        "SCRIPTED"
    }

    fn execute(&self, mut record: MissionRecord, task: &TaskDescriptor) -> MissionRecord {
        self.executed.borrow_mut().push(task.task_id.clone());
        if self.kind == WorkerKind::Synthesis {
            record.artifacts.draft = Some(format!("draft from {}", task.task_id));
        }
        record.status = self
            .reports
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| default_success(self.kind));
        record
    }
}

/// A clean retrieved snippet (no sensitive spans).
pub fn sample_item(source: &str) -> RetrievedItem {
    RetrievedItem {
        source: source.to_string(),
        timestamp: "2025-11-20T08:00:00Z".to_string(),
        snippet: "regional fiber lines were disrupted near the capital".to_string(),
        relevance_score: 0.9,
    }
}

/// Verifier answer in the JSON shape the verdict schema expects.
pub fn verdict_json(score: f64, passed: bool, critique: &str) -> String {
    serde_json::json!({ "score": score, "passed": passed, "critique": critique }).to_string()
}
