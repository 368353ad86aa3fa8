//! Inspect command handler

use anyhow::{Context, Result};
use colored::*;
use relay_action::config::{ARTIFACTS_DIR_VAR, JOB_PREFIX_VAR};
use relay_action::{Aggregate, DeployConfig, Error, aggregate};
use serde_json::Value as JsonValue;
use std::path::PathBuf;

/// Handle the inspect command
///
/// Each flag falls back to the deploy variable of the same meaning.
pub async fn handle_inspect_command(
    artifacts_dir: Option<PathBuf>,
    prefix: Option<String>,
    build_output: Option<String>,
) -> Result<()> {
    let config = deploy_config(artifacts_dir, prefix, build_output)?;

    let result: Aggregate<JsonValue> = aggregate(&config).await.with_context(|| {
        format!(
            "Failed to gather build results from {}",
            config.artifacts_dir.display()
        )
    })?;

    print_aggregate(&config, &result)
}

fn deploy_config(
    artifacts_dir: Option<PathBuf>,
    prefix: Option<String>,
    build_output: Option<String>,
) -> relay_action::Result<DeployConfig> {
    let artifacts_dir = artifacts_dir.ok_or(Error::MissingDeployVariable(ARTIFACTS_DIR_VAR))?;
    let prefix = prefix
        .filter(|prefix| !prefix.is_empty())
        .ok_or(Error::MissingDeployVariable(JOB_PREFIX_VAR))?;

    let config = DeployConfig::new(artifacts_dir, prefix);
    Ok(match build_output.filter(|raw| !raw.is_empty()) {
        Some(raw) => config.with_build_output(raw),
        None => config,
    })
}

fn print_aggregate(config: &DeployConfig, result: &Aggregate<JsonValue>) -> Result<()> {
    println!(
        "{}",
        format!(
            "Build results for '{}' in {}:",
            config.job_prefix,
            config.artifacts_dir.display()
        )
        .bold()
    );
    println!("  Units:    {}", result.units.to_string().cyan());
    println!();

    if result.payloads.is_empty() {
        println!("{}", "No payloads found.".yellow());
    } else {
        println!("{}", format!("Payloads ({}):", result.payloads.len()).bold());
        for payload in &result.payloads {
            println!("  {} {}", "▸".cyan(), serde_json::to_string(payload)?);
        }
    }
    println!();

    if result.artifacts.is_empty() {
        println!("{}", "No artifacts found.".yellow());
    } else {
        println!(
            "{}",
            format!("Artifacts ({}):", result.artifacts.len()).bold()
        );
        for (name, path) in &result.artifacts {
            let marker = if path.exists() {
                "✓".green()
            } else {
                "✗".red()
            };
            println!("  {} {} {}", marker, name, path.display().to_string().dimmed());
        }
    }

    Ok(())
}
