//! CLI configuration: thin wrapper around `chartdeck_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides (--url,
//! --insecure, --timeout).

use std::time::Duration;

use chartdeck_core::{ConsoleConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use chartdeck_config::{
    Config, Profile, config_path, load_config_or_default, save_config, select_profile,
};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `ConsoleConfig` from the config file, profile, and CLI overrides.
///
/// `--url` works without any config file; the profile still contributes
/// its timing policy when one resolves.
pub fn build_console_config(global: &GlobalOpts) -> Result<ConsoleConfig, CliError> {
    let cfg = load_config_or_default();

    let profile = match select_profile(&cfg, global.profile.as_deref()) {
        Ok((_, profile)) => profile.clone(),
        Err(err) => match global.url {
            Some(_) if global.profile.is_none() => Profile::default(),
            _ => return Err(err.into()),
        },
    };
    let profile = match global.url {
        Some(ref url) => Profile {
            url: url.clone(),
            ..profile
        },
        None => profile,
    };

    let mut console = chartdeck_config::profile_to_console_config(&profile, &cfg.defaults)?;
    if global.insecure {
        console.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(timeout) = global.timeout {
        console.timeout = Duration::from_secs(timeout);
    }
    Ok(console)
}
