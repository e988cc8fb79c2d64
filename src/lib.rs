//! HiL test sequencer
//!
//! Core of a hardware-in-the-loop test dashboard: a catalog of test suites,
//! a single-flight sequencer that steps through a suite on a timer, and the
//! result sink interface through which a host observes the run.

pub mod catalog;
pub mod cli;
pub mod commands;
pub mod common;
pub mod profile;
pub mod sequencer;
pub mod sink;

// Re-export commonly used types for tests
pub use common::{Error, Result};
