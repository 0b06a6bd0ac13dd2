//! Deterministic, pure logic shared by both coordinators.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod extract;
pub mod invariants;
pub mod resume;
pub mod revision;
pub mod scrub;
pub mod status;
pub mod transition;
pub mod types;
