//! Deterministic, pure logic for the deployment wizard.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! form snapshots and reported deployment state, and return data that the
//! orchestration layer logs and renders.

pub mod explorer;
pub mod expiration;
pub mod progress;
pub mod registry;
pub mod rules;
pub mod types;
pub mod validation;
