//! CLI command handling
//!
//! Loads configuration and scenarios, runs them, and prints reports.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use colored::Colorize;
use serde_json::Value;

use crate::commands::{Commands, RunOptions};
use crate::common::config::Config;
use crate::common::Result;
use crate::executor::ScenarioExecutor;
use crate::http::ReqwestClient;
use crate::report::{self, Report};
use crate::scenario::{self, builtin, LoadOptions, Scenario};

/// Dispatch a CLI command
///
/// Returns whether everything passed, which decides the exit code.
pub async fn dispatch(
    command: Commands,
    config_path: Option<PathBuf>,
    verbose: bool,
) -> Result<bool> {
    let mut config = match config_path {
        Some(path) => Config::load_from(&path)?,
        None => Config::load()?,
    };

    match command {
        Commands::Run {
            paths,
            json,
            options,
        } => {
            apply_overrides(&mut config, &options);
            let load_options = load_options(&config, &options);
            let scenarios = paths
                .iter()
                .map(|path| scenario::load(path, &load_options))
                .collect::<Result<Vec<_>>>()?;

            let reports = run_scenarios(&config, &scenarios).await?;
            output(&reports, json, verbose)
        }

        Commands::Validate { paths, options } => {
            apply_overrides(&mut config, &options);
            let load_options = load_options(&config, &options);
            // Every file is reported; the first failure decides the error
            let mut first_error = None;
            for path in &paths {
                if let Err(e) = validate_file(path, &load_options) {
                    first_error.get_or_insert(e);
                }
            }
            match first_error {
                Some(e) => Err(e),
                None => Ok(true),
            }
        }

        Commands::Objects {
            expected_count,
            json,
            options,
        } => {
            apply_overrides(&mut config, &options);
            let mut scenario = builtin::objects_crud(&config.defaults.base_url, expected_count)?;
            for (name, value) in &options.vars {
                scenario.set_variable(name.clone(), value.clone());
            }
            if let Some(retry) = config.retry.policy() {
                scenario = scenario.with_retry(retry)?;
            }

            let reports = run_scenarios(&config, &[scenario]).await?;
            output(&reports, json, verbose)
        }
    }
}

fn apply_overrides(config: &mut Config, options: &RunOptions) {
    if let Some(base_url) = &options.base_url {
        config.defaults.base_url = base_url.clone();
    }
    if let Some(timeout) = options.timeout {
        config.http.timeout_secs = timeout;
    }
}

fn load_options(config: &Config, options: &RunOptions) -> LoadOptions {
    let mut load = LoadOptions {
        retry: config.retry.policy(),
        ..LoadOptions::default()
    };
    load.defaults.insert(
        "base_url".to_string(),
        Value::String(config.defaults.base_url.clone()),
    );
    if options.base_url.is_some() {
        load.overrides.insert(
            "base_url".to_string(),
            Value::String(config.defaults.base_url.clone()),
        );
    }
    load.overrides.extend(options.vars.iter().cloned());
    load
}

fn validate_file(path: &Path, options: &LoadOptions) -> Result<()> {
    match scenario::load(path, options) {
        Ok(scenario) => {
            println!(
                "  {} {} ({} steps)",
                "✓".green(),
                scenario.name(),
                scenario.steps().len()
            );
            if let Some(description) = scenario.description() {
                println!("      {}", description.dimmed());
            }
            Ok(())
        }
        Err(e) => {
            println!("  {} {}: {}", "✗".red(), path.display(), e);
            Err(e)
        }
    }
}

/// Run scenarios concurrently, cancelling them on Ctrl-C
async fn run_scenarios(config: &Config, scenarios: &[Scenario]) -> Result<Vec<Report>> {
    let client = ReqwestClient::new(&config.http)?;
    let executor = ScenarioExecutor::new(Arc::new(client));

    let handle = executor.cancel_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling running scenarios");
            handle.cancel();
        }
    });

    let reports = executor.run_all(scenarios).await;
    interrupt.abort();
    Ok(reports)
}

fn output(reports: &[Report], json: bool, verbose: bool) -> Result<bool> {
    if json {
        println!("{}", report::to_json(reports)?);
    } else {
        for entry in reports {
            report::print_report(entry, verbose);
        }
    }
    Ok(reports.iter().all(Report::passed))
}
