//! Mission orchestration core.
//!
//! A mission is a query driven to a verified report by four workers (retrieval,
//! synthesis, filter, verification) under one of two coordinators:
//!
//! - **[`step::Coordinator`]**: plan-driven. A planner produces an ordered task list;
//!   each step delegates one task, and critical verification failures install a
//!   bounded revision plan.
//! - **[`pipeline::Pipeline`]**: fixed phases in a fixed order.
//!
//! The architecture keeps a strict split:
//!
//! - **[`core`]**: pure, deterministic logic (statuses, transitions, resume, scrub).
//! - **[`io`]**: side effects (config, model backend process, knowledge base, persistence).
//!
//! [`looping::run_mission`] drives either coordinator until its status is terminal.

pub mod agents;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod looping;
pub mod mission;
pub mod pipeline;
pub mod step;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
