//! scowatch daemon library.
//!
//! Exposes the daemon internals for integration testing. In production,
//! the `scowatch` binary (main.rs) is used.

pub mod cli;
pub mod logging;
pub mod orchestrator;
