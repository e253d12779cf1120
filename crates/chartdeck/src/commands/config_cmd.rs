//! Config subcommand handlers.

use std::io::IsTerminal;

use dialoguer::Input;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config::{self, Profile};
use crate::error::CliError;
use crate::output;

const DEFAULT_URL: &str = "http://localhost:8082";

fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Prompt(e.to_string())
}

/// URL for `config init`: `--url`, or a prompt when there is a terminal.
fn init_url(global: &GlobalOpts, existing: Option<&str>) -> Result<String, CliError> {
    if let Some(ref url) = global.url {
        return Ok(url.clone());
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::Validation {
            field: "url".into(),
            reason: "pass --url when not running interactively".into(),
        });
    }
    Input::new()
        .with_prompt("Chart service URL")
        .default(existing.unwrap_or(DEFAULT_URL).to_owned())
        .interact_text()
        .map_err(prompt_err)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), false);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            let out = match global.output {
                OutputFormat::Table | OutputFormat::Plain => toml::to_string_pretty(&cfg)
                    .map_err(|e| CliError::Render(e.to_string()))?,
                format => output::render_single(format, &cfg, |_| String::new(), |_| String::new())?,
            };
            output::print_output(out.trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::Init => {
            let mut cfg = config::load_config_or_default();
            let name = config::active_profile_name(global, &cfg);
            let existing = cfg.profiles.get(&name).map(|p| p.url.clone());
            let url = init_url(global, existing.as_deref())?;

            let profile = cfg
                .profiles
                .entry(name.clone())
                .or_insert_with(|| Profile::new(url.clone()));
            profile.url = url;
            chartdeck_config::profile_to_console_config(profile, &cfg.defaults)?;
            if cfg.default_profile.is_none() {
                cfg.default_profile = Some(name.clone());
            }

            let path = config::save_config(&cfg)?;
            output::notice(
                &format!("Profile {name} written to {}", path.display()),
                global.quiet,
            );
            Ok(())
        }
    }
}
