//! I/O helpers for wizard commands.

pub mod catalog;
pub mod clock;
pub mod config;
pub mod deployer;
pub mod form_store;
