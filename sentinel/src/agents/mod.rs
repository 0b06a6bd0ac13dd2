//! Planner and worker implementations behind the coordinator seams.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::core::status::WorkerKind;
use crate::core::types::TaskDescriptor;
use crate::io::backend::ModelBackend;
use crate::io::knowledge_base::SearchIndex;
use crate::mission::MissionRecord;

pub mod filter;
pub mod planner;
pub mod retriever;
pub mod synthesizer;
pub mod verifier;

pub use filter::OutputFilter;
pub use retriever::Retriever;
pub use synthesizer::Synthesizer;
pub use verifier::Verifier;

/// One processing stage.
///
/// `execute` never fails with `Err`: the outcome is the status the worker leaves on
/// the record (its success tag or `<STAGE>_FAILED`) plus the entries it appended.
pub trait Worker {
    fn kind(&self) -> WorkerKind;

    /// Id recorded as `agent_id` on this worker's trajectory entries.
    fn agent_id(&self) -> &str;

    fn execute(&self, record: MissionRecord, task: &TaskDescriptor) -> MissionRecord;
}

/// Workers keyed by kind. Built once per process and handed to the coordinators.
#[derive(Default)]
pub struct WorkerRegistry {
    workers: BTreeMap<WorkerKind, Box<dyn Worker>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The four standard workers over shared collaborators.
    pub fn standard(
        backend: Rc<dyn ModelBackend>,
        index: Rc<dyn SearchIndex>,
        pass_threshold: f64,
    ) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(Retriever::new(index)));
        registry.register(Box::new(Synthesizer::new(Rc::clone(&backend))));
        registry.register(Box::new(OutputFilter));
        registry.register(Box::new(Verifier::new(backend, pass_threshold)));
        registry
    }

    /// Register `worker` under its kind, returning the worker it replaced.
    pub fn register(&mut self, worker: Box<dyn Worker>) -> Option<Box<dyn Worker>> {
        self.workers.insert(worker.kind(), worker)
    }

    pub fn get(&self, kind: WorkerKind) -> Option<&dyn Worker> {
        self.workers.get(&kind).map(Box::as_ref)
    }

    pub fn kinds(&self) -> impl Iterator<Item = WorkerKind> + '_ {
        self.workers.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedBackend, ScriptedSearchIndex};

    #[test]
    fn standard_registry_covers_every_kind() {
        let registry = WorkerRegistry::standard(
            Rc::new(ScriptedBackend::new(Vec::<String>::new())),
            Rc::new(ScriptedSearchIndex::empty()),
            4.0,
        );
        assert_eq!(registry.kinds().collect::<Vec<_>>(), WorkerKind::ALL.to_vec());
        assert_eq!(
            registry.get(WorkerKind::Filter).map(|worker| worker.agent_id()),
            Some("FILTER-1")
        );
    }

    #[test]
    fn register_replaces_existing_worker() {
        let mut registry = WorkerRegistry::new();
        assert!(registry.get(WorkerKind::Filter).is_none());
        assert!(registry.register(Box::new(OutputFilter)).is_none());
        assert!(registry.register(Box::new(OutputFilter)).is_some());
    }
}
