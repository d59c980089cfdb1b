//! Stable exit codes for wizard CLI commands.

/// Command succeeded; for `validate`, every field passed.
pub const OK: i32 = 0;
/// Unreadable input, bad config or catalog, or any other error.
pub const ERROR: i32 = 1;
/// At least one field failed validation; nothing was dispatched.
pub const INVALID_FORM: i32 = 2;
/// `replay` ended with the deployment in the rejected phase.
pub const REJECTED: i32 = 3;
