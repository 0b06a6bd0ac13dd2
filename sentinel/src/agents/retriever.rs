//! Retrieval worker: keyword search for the task topic.

use std::rc::Rc;

use serde_json::json;

use crate::agents::Worker;
use crate::core::status::{MissionStatus, WorkerKind};
use crate::core::types::{ActionType, TaskDescriptor};
use crate::io::knowledge_base::SearchIndex;
use crate::mission::MissionRecord;

pub const AGENT_ID: &str = "DR-1";

pub struct Retriever {
    index: Rc<dyn SearchIndex>,
}

impl Retriever {
    pub fn new(index: Rc<dyn SearchIndex>) -> Self {
        Self { index }
    }
}

impl Worker for Retriever {
    fn kind(&self) -> WorkerKind {
        WorkerKind::Retrieval
    }

    fn agent_id(&self) -> &str {
        AGENT_ID
    }

    /// Searches for the task input, or the mission query when the input is blank.
    fn execute(&self, mut record: MissionRecord, task: &TaskDescriptor) -> MissionRecord {
        let topic = match task.input.trim() {
            "" => record.query().to_string(),
            input => input.to_string(),
        };
        record.log(
            AGENT_ID,
            ActionType::RetrievalStart,
            format!("Searching knowledge base for '{topic}'."),
            Some(json!({ "topic": topic })),
        );

        match self.index.search(&topic) {
            Err(err) => {
                record.log(
                    AGENT_ID,
                    ActionType::RetrievalFailed,
                    "Search index failed.",
                    Some(json!({ "error": format!("{err:#}") })),
                );
                record.status = MissionStatus::StageFailed(WorkerKind::Retrieval);
            }
            Ok(items) if items.is_empty() => {
                record.log(
                    AGENT_ID,
                    ActionType::RetrievalEmpty,
                    "No relevant data found.",
                    Some(json!({ "retrieved_count": 0 })),
                );
                record.status = MissionStatus::RetrievalEmpty;
            }
            Ok(items) => {
                let count = items.len();
                record.artifacts.retrieved.extend(items);
                record.log(
                    AGENT_ID,
                    ActionType::RetrievalSuccess,
                    format!("Retrieved {count} snippets."),
                    Some(json!({ "retrieved_count": count })),
                );
                record.status = MissionStatus::RetrievalComplete;
            }
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DriveMode;
    use crate::test_support::{FailingSearchIndex, ScriptedSearchIndex, sample_item};

    fn record() -> MissionRecord {
        MissionRecord::with_id("m-1", "network outage", DriveMode::Plan)
    }

    #[test]
    fn results_are_appended_and_counted() {
        let index = Rc::new(ScriptedSearchIndex::new(vec![sample_item("A"), sample_item("B")]));
        let retriever = Retriever::new(index.clone());
        let task = TaskDescriptor::new("T1", WorkerKind::Retrieval, "");

        let record = retriever.execute(record(), &task);
        assert_eq!(record.status, MissionStatus::RetrievalComplete);
        assert_eq!(record.artifacts.retrieved.len(), 2);
        assert_eq!(index.topics(), vec!["network outage"]);
        let last = record.trajectory().last().expect("entry");
        assert_eq!(last.action, ActionType::RetrievalSuccess);
        assert_eq!(last.data.as_ref().expect("data")["retrieved_count"], 2);
    }

    #[test]
    fn task_input_overrides_query_as_topic() {
        let index = Rc::new(ScriptedSearchIndex::empty());
        let retriever = Retriever::new(index.clone());
        let task = TaskDescriptor::new("T1", WorkerKind::Retrieval, "fiber lines");

        let record = retriever.execute(record(), &task);
        assert_eq!(record.status, MissionStatus::RetrievalEmpty);
        assert_eq!(index.topics(), vec!["fiber lines"]);
    }

    #[test]
    fn index_error_is_a_stage_failure() {
        let retriever = Retriever::new(Rc::new(FailingSearchIndex::new("search timed out")));
        let task = TaskDescriptor::new("T1", WorkerKind::Retrieval, "");

        let record = retriever.execute(record(), &task);
        assert_eq!(
            record.status,
            MissionStatus::StageFailed(WorkerKind::Retrieval)
        );
        assert!(record.artifacts.retrieved.is_empty());
        assert_eq!(
            record.trajectory().last().map(|entry| entry.action),
            Some(ActionType::RetrievalFailed)
        );
    }
}
