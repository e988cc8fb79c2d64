//! CLI command handling
//!
//! Resolves settings, catalog and run configuration, drives the sequencer
//! and formats output.

mod console;

use std::process::ExitCode;
use std::sync::Arc;

use colored::Colorize;

use crate::catalog::{Catalog, ExpectedOutcome};
use crate::commands::{Commands, GlobalArgs, ProfileCommands, RunParams};
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::profile::{ProfileStore, RunConfig};
use crate::sequencer::{driver, Sequencer, StartOutcome, Timing, STATUS_ALL_PASSED};

pub use console::ConsoleSink;

/// Dispatch a CLI command
pub async fn dispatch(global: &GlobalArgs, command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Run {
            params,
            profile,
            seed,
        } => run(global, &params, profile.as_deref(), seed).await,

        Commands::Suites { tests } => {
            let settings = load_settings(global)?;
            let catalog = load_catalog(global, &settings)?;
            print_suites(&catalog, tests);
            Ok(ExitCode::SUCCESS)
        }

        Commands::Profile(cmd) => {
            let store = ProfileStore::default_location()?;
            match cmd {
                ProfileCommands::Save { name, params } => {
                    let settings = load_settings(global)?;
                    let mut config = settings.defaults.to_run_config();
                    apply_params(&mut config, &params);
                    config.validate()?;
                    let path = store.save(&name, &config)?;
                    println!("Saved profile to {}", path.display());
                }

                ProfileCommands::Show { name } => {
                    let envelope = store.load_envelope(&name)?;
                    println!("Profile: {}", store.path_for(&name).display());
                    if let Some(saved_at) = &envelope.saved_at {
                        println!("  Saved at:   {}", saved_at);
                    }
                    if let Some(version) = &envelope.version {
                        println!("  Version:    {}", version);
                    }
                    print_run_config(&envelope.config);
                }

                ProfileCommands::List => {
                    let names = store.list()?;
                    if names.is_empty() {
                        println!("No saved profiles in {}", store.dir().display());
                    } else {
                        for name in names {
                            println!("  {}", name);
                        }
                    }
                }

                ProfileCommands::Delete { name } => {
                    store.delete(&name)?;
                    println!("Deleted profile {}", name);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Run one suite to completion on the terminal
async fn run(
    global: &GlobalArgs,
    params: &RunParams,
    profile: Option<&str>,
    seed: Option<u64>,
) -> Result<ExitCode> {
    let settings = load_settings(global)?;
    let catalog = Arc::new(load_catalog(global, &settings)?);
    let timing = Timing::try_from(&settings.timing)?;

    let mut config = match profile {
        Some(name) => ProfileStore::default_location()?.load(name)?,
        None => settings.defaults.to_run_config(),
    };
    apply_params(&mut config, params);
    config.validate()?;

    let mut sequencer = Sequencer::new(catalog, ConsoleSink::new(), timing);
    if let Some(seed) = seed {
        sequencer = sequencer.with_seed(seed);
    }

    let (mut handle, task) = driver::spawn(sequencer);
    let run_id = match handle.start(config).await? {
        StartOutcome::Started { run_id } => run_id,
        StartOutcome::Rejected => {
            return Err(Error::Internal(
                "Fresh sequencer rejected the start request".to_string(),
            ))
        }
    };
    let snapshot = handle.wait_finished(run_id).await?;
    tracing::debug!(?snapshot, "Run finished");

    // Dropping the last handle lets the driver return the sequencer
    drop(handle);
    let sequencer = task
        .await
        .map_err(|e| Error::Internal(format!("Sequencer task failed: {}", e)))?;
    let sink = sequencer.into_sink();
    sink.finish();
    sink.print_table();

    if sink.status() == STATUS_ALL_PASSED {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn load_settings(global: &GlobalArgs) -> Result<Config> {
    match &global.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

fn load_catalog(global: &GlobalArgs, settings: &Config) -> Result<Catalog> {
    match global.catalog.as_ref().or(settings.catalog.path.as_ref()) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Loading test catalog");
            Catalog::load(path)
        }
        None => Ok(Catalog::builtin()),
    }
}

/// Overlay command-line parameters onto a base configuration
fn apply_params(config: &mut RunConfig, params: &RunParams) {
    if let Some(suite) = &params.suite {
        config.suite_id = suite.clone();
    }
    if let Some(address) = &params.device_address {
        config.device_address = address.clone();
    }
    if let Some(port) = &params.port {
        config.port = port.clone();
    }
    if let Some(timeout) = &params.timeout {
        config.timeout_seconds = timeout.clone();
    }
    config.verbose |= params.verbose;
    config.stop_on_first_failure |= params.stop_on_first_failure;
}

fn print_run_config(config: &RunConfig) {
    println!("  Suite:      {}", config.suite_id);
    println!("  Device:     {}:{}", config.device_address, config.port);
    println!("  Timeout:    {}s", config.timeout_seconds);
    println!("  Verbose:    {}", config.verbose);
    println!("  Stop on first failure: {}", config.stop_on_first_failure);
}

fn print_suites(catalog: &Catalog, with_tests: bool) {
    let default_id = &catalog.default_suite().id;
    for suite in catalog.suites() {
        let marker = if &suite.id == default_id {
            " (default)".dimmed().to_string()
        } else {
            String::new()
        };
        println!(
            "{}{}  {} tests, {} expected to fail",
            suite.id.bold(),
            marker,
            suite.tests.len(),
            suite.expected_failures()
        );

        if with_tests {
            for test in &suite.tests {
                match test.expected_outcome {
                    ExpectedOutcome::Pass => println!("  {} {}", "✓".green(), test.name),
                    ExpectedOutcome::Fail => println!(
                        "  {} {}: {}",
                        "✗".red(),
                        test.name,
                        test.failure_message.dimmed()
                    ),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_override_base() {
        let mut config = RunConfig::default();
        let params = RunParams {
            suite: Some("GPIO Tests".to_string()),
            port: Some("9000".to_string()),
            verbose: true,
            ..RunParams::default()
        };
        apply_params(&mut config, &params);

        assert_eq!(config.suite_id, "GPIO Tests");
        assert_eq!(config.port, "9000");
        assert!(config.verbose);
        // Untouched fields keep the base values
        assert_eq!(config.device_address, RunConfig::default().device_address);
        assert!(!config.stop_on_first_failure);
    }

    #[test]
    fn test_flags_do_not_clear_profile_switches() {
        let mut config = RunConfig {
            stop_on_first_failure: true,
            ..RunConfig::default()
        };
        apply_params(&mut config, &RunParams::default());
        assert!(config.stop_on_first_failure);
    }

    #[test]
    fn test_catalog_flag_wins_over_settings() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("catalog.yaml");
        std::fs::write(
            &path,
            "suites:\n  - name: Smoke\n    tests:\n      - name: Boot\n        expect: pass\n",
        )
        .unwrap();

        let global = GlobalArgs {
            catalog: Some(path),
            ..GlobalArgs::default()
        };
        let catalog = load_catalog(&global, &Config::default()).unwrap();
        assert_eq!(catalog.default_suite().id, "Smoke");

        let builtin = load_catalog(&GlobalArgs::default(), &Config::default()).unwrap();
        assert_eq!(builtin, Catalog::builtin());
    }
}
