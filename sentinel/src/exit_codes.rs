//! Stable exit codes for the `sentinel` CLI.

/// The mission ran (any final status) or help/version was printed.
pub const OK: i32 = 0;
/// Bad arguments, invalid config, a state directory for another query, or another error.
pub const INVALID: i32 = 1;
