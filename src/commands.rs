//! CLI command definitions
//!
//! Defines the clap commands for the HiL sequencer CLI.

use std::path::PathBuf;

use clap::{Args, Subcommand};

#[derive(Subcommand)]
pub enum Commands {
    /// Run a test suite and watch its progress
    Run {
        #[command(flatten)]
        params: RunParams,

        /// Start from a saved configuration profile
        #[arg(long)]
        profile: Option<String>,

        /// Seed for the simulated timing, for reproducible runs
        #[arg(long)]
        seed: Option<u64>,
    },

    /// List available test suites
    Suites {
        /// Also list the test cases of each suite
        #[arg(long)]
        tests: bool,
    },

    /// Saved configuration profiles
    #[command(subcommand)]
    Profile(ProfileCommands),
}

/// Run parameters that override the defaults or a loaded profile
#[derive(Args, Debug, Default, Clone)]
pub struct RunParams {
    /// Test suite to run (unknown names run the default suite)
    #[arg(long, short)]
    pub suite: Option<String>,

    /// Target device address
    #[arg(long)]
    pub device_address: Option<String>,

    /// Communication port
    #[arg(long, short)]
    pub port: Option<String>,

    /// Timeout in seconds
    #[arg(long, short)]
    pub timeout: Option<String>,

    /// Enable verbose run logging
    #[arg(long, short)]
    pub verbose: bool,

    /// Stop the run at the first failing test
    #[arg(long)]
    pub stop_on_first_failure: bool,
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Save run parameters as a named profile
    Save {
        /// Profile name or path (".json" is added when missing)
        name: String,

        #[command(flatten)]
        params: RunParams,
    },

    /// Show a saved profile
    Show {
        /// Profile name or path
        name: String,
    },

    /// List saved profiles
    List,

    /// Delete a saved profile
    Delete {
        /// Profile name or path
        name: String,
    },
}

/// Options accepted by every command
#[derive(Args, Debug, Default, Clone)]
pub struct GlobalArgs {
    /// Settings file (defaults to the platform config path)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// YAML test catalog replacing the built-in suites
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Write diagnostics to a file (defaults to the platform log directory)
    #[arg(long, global = true)]
    pub log_file: Option<Option<PathBuf>>,
}
