//! Shared helpers for command handlers.

use std::io::IsTerminal;

use secrecy::SecretString;
use tabled::Tabled;
use tracing::{debug, info};

use semprov_config::Settings;
use semprov_core::{Cluster, Guard, ShutdownMode, StepReport, Workflow};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

// ── Settings & connections ──────────────────────────────────────────

/// Load the settings file named by `--settings`, or the first one found.
pub fn load_settings(global: &GlobalOpts) -> Result<Settings, CliError> {
    Ok(semprov_config::load_settings(global.settings.as_deref())?)
}

/// The environments selected with `-e`; at least one is required.
pub fn environments(global: &GlobalOpts) -> Result<&[String], CliError> {
    if global.envs.is_empty() {
        return Err(CliError::NoEnvironment);
    }
    Ok(&global.envs)
}

/// Connect to an environment's appliance pair. `--testmode` connects with
/// the read-only account.
pub async fn connect(settings: &Settings, env: &str, global: &GlobalOpts) -> Result<Cluster, CliError> {
    let config = settings.cluster_config(env, global.testmode)?;
    let cluster = Cluster::connect(&config).await?;
    info!(
        environment = env,
        primary = %cluster.primary_host(),
        backup = cluster.backup_host().as_deref().unwrap_or("-"),
        version = %cluster.version(),
        "connected"
    );
    Ok(cluster)
}

pub fn guard(global: &GlobalOpts, shutdown: ShutdownMode) -> Guard {
    Guard::new(global.force, shutdown)
}

// ── Prompts ─────────────────────────────────────────────────────────

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.to_owned(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Use the given secret, or prompt for it without echo.
pub fn secret(value: Option<&str>, prompt: &str) -> Result<SecretString, CliError> {
    match value {
        Some(v) => Ok(SecretString::from(v.to_owned())),
        None => Ok(SecretString::from(rpassword::prompt_password(prompt)?)),
    }
}

// ── Plans ───────────────────────────────────────────────────────────

#[derive(Tabled)]
struct StepRow {
    #[tabled(rename = "Step")]
    description: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Outcome")]
    outcome: String,
}

/// Print what planning decided for each step.
pub fn print_steps(environment: &str, steps: &[StepReport], global: &GlobalOpts) {
    if steps.is_empty() {
        return;
    }
    let color = matches!(global.output, OutputFormat::Table) && output::should_color(&global.color);
    if matches!(global.output, OutputFormat::Table) && !global.quiet {
        eprintln!("{environment}:");
    }
    let out = output::render_list(
        &global.output,
        steps,
        |s| StepRow {
            description: s.description.clone(),
            target: s.target.map_or_else(|| "-".into(), |t| t.to_string()),
            outcome: output::outcome_label(s.outcome, color),
        },
        |s| s.description.clone(),
    );
    output::print_output(&out, global.quiet);
}

/// Plan a workflow, report the steps, and send what survived.
///
/// Destructive workflows ask for confirmation before anything is sent.
/// Read-only clusters stop after the report.
pub async fn apply<W: Workflow>(
    cluster: &Cluster,
    workflow: &W,
    shutdown: ShutdownMode,
    global: &GlobalOpts,
    destructive: bool,
) -> Result<(), CliError> {
    let mut guard = guard(global, shutdown);
    let plan = workflow.plan(cluster, &mut guard).await?;
    print_steps(cluster.name(), plan.steps(), global);

    for cmd in plan.commands() {
        debug!(route = %cmd.target(), xml = cmd.xml(), "{}", cmd.description());
    }

    if plan.is_empty() {
        info!(environment = cluster.name(), "{}: nothing to send", workflow.label());
        return Ok(());
    }
    if cluster.read_only() {
        summary(global, &format!("{}: testmode, {} command(s) not sent", cluster.name(), plan.len()));
        return Ok(());
    }
    if destructive {
        let prompt = format!("{} in {}?", workflow.label(), cluster.name());
        if !confirm(&prompt, global.yes)? {
            return Ok(());
        }
    }

    plan.execute(cluster).await?;
    summary(global, &format!("{}: {} command(s) sent", cluster.name(), plan.len()));
    Ok(())
}

/// One-line result on stderr.
pub fn summary(global: &GlobalOpts, line: &str) {
    if !global.quiet {
        eprintln!("{line}");
    }
}
