//! Config subcommand handlers.

use serde::Serialize;
use tabled::Tabled;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Clone, Serialize, Tabled)]
struct EnvRow {
    #[tabled(rename = "Environment")]
    name: String,
    #[tabled(rename = "Endpoints")]
    endpoints: String,
    #[tabled(rename = "Username")]
    username: String,
    #[tabled(rename = "Read-only")]
    read_only: String,
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match &args.command {
        ConfigCommand::Path => {
            let found = semprov_config::settings_path(global.settings.as_deref())?;
            let mut lines = vec![match found {
                Some(path) => path.display().to_string(),
                None => "(no settings file found)".into(),
            }];
            if !global.quiet {
                lines.push(String::new());
                lines.push("Search order:".into());
                lines.extend(
                    semprov_config::search_paths(global.settings.as_deref())
                        .iter()
                        .map(|p| format!("  {}", p.display())),
                );
            }
            println!("{}", lines.join("\n"));
            Ok(())
        }

        ConfigCommand::Show => {
            let settings = util::load_settings(global)?;
            let yaml = settings.to_redacted_yaml()?;
            let out = match global.output {
                OutputFormat::Json | OutputFormat::JsonCompact => {
                    let value: serde_json::Value =
                        serde_yaml::from_str(&yaml).map_err(|e| CliError::Internal {
                            message: format!("failed to render settings: {e}"),
                        })?;
                    let rendered = if matches!(global.output, OutputFormat::JsonCompact) {
                        serde_json::to_string(&value)
                    } else {
                        serde_json::to_string_pretty(&value)
                    };
                    rendered.map_err(|e| CliError::Internal {
                        message: format!("failed to render settings: {e}"),
                    })?
                }
                _ => yaml.trim_end().to_owned(),
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Envs => {
            let settings = util::load_settings(global)?;
            let rows: Vec<EnvRow> = settings
                .environments
                .iter()
                .map(|(name, env)| EnvRow {
                    name: name.clone(),
                    endpoints: env.endpoints.join(", "),
                    username: env.username.clone(),
                    read_only: env
                        .read_only
                        .as_ref()
                        .or(settings.defaults.read_only.as_ref())
                        .map_or_else(|| "-".into(), |a| a.username.clone()),
                })
                .collect();
            let out = output::render_list(&global.output, &rows, Clone::clone, |r| r.name.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::SetPassword {
            environment,
            read_only,
        } => {
            let settings = util::load_settings(global)?;
            settings.environment(environment)?;

            let account = if *read_only { "read-only password" } else { "password" };
            let password = rpassword::prompt_password(format!("{environment} {account}: "))?;
            if password.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "password cannot be empty".into(),
                });
            }
            semprov_config::store_password(environment, *read_only, &password)?;
            util::summary(
                global,
                &format!(
                    "stored as '{}' in the system keyring",
                    semprov_config::keyring_user(environment, *read_only)
                ),
            );
            Ok(())
        }
    }
}
