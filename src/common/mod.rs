//! Common utilities shared by the sequencer and its hosts

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Error, Result};
