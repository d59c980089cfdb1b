//! Core of a multi-step deployment wizard for derivative contracts.
//!
//! The user fills in a form across several pages; every field is checked by a
//! declarative rule set, edits re-check dependent fields, and the final page
//! hands the form to an external deployer whose progress is mapped onto a
//! three-step indicator.
//!
//! - **[`core`]**: Pure, deterministic logic (field rules, cross-field
//!   validation, expiration window, deployment progress). No I/O.
//! - **[`io`]**: Side-effecting operations (config and catalog files, form
//!   files, clock, deploy dispatch). Isolated behind traits for tests.
//!
//! Orchestration modules ([`wizard`], [`replay`]) coordinate the two to
//! implement CLI commands.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod replay;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod wizard;
