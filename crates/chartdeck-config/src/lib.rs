//! Shared configuration for the chartdeck console.
//!
//! TOML profiles layered with environment overrides, and translation to
//! `chartdeck_core::ConsoleConfig`. The CLI adds flag-aware wrappers on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use chartdeck_core::config::{
    DEFAULT_CHANGE_EPSILON, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_MIN_RESTART_WINDOW,
    DEFAULT_POLL_INTERVAL, DEFAULT_RESTART_WINDOW,
};
use chartdeck_core::{ConsoleConfig, TlsVerification, UploadPolicy};

/// Prefix of environment overrides; nested keys are separated by `__`.
pub const ENV_PREFIX: &str = "CHARTDECK_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found (available: {available})")]
    ProfileNotFound { name: String, available: String },

    #[error("no profile configured")]
    NoProfiles,

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named service profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named chart service profile. Unset values fall back to `Defaults`
/// and then to the built-in timing policy.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// Service root (e.g., "http://localhost:8082").
    pub url: String,

    /// Path to custom CA certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    /// Override request timeout (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart_window_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_restart_window_ms: Option<u64>,

    /// Tolerance when comparing a default against the current value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_epsilon: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_upload_bytes: Option<u64>,
}

impl Profile {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("", "", "chartdeck").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("chartdeck");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file path + environment. A missing file is fine.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Profile resolution ──────────────────────────────────────────────

/// Pick a profile: the explicit name, else `default_profile`, else the
/// only profile there is.
pub fn select_profile<'a>(
    cfg: &'a Config,
    name: Option<&str>,
) -> Result<(&'a str, &'a Profile), ConfigError> {
    let wanted = name.or(cfg.default_profile.as_deref());
    if let Some(wanted) = wanted {
        if let Some((key, profile)) = cfg.profiles.get_key_value(wanted) {
            return Ok((key.as_str(), profile));
        }
        if name.is_some() || cfg.profiles.len() != 1 {
            return Err(if cfg.profiles.is_empty() {
                ConfigError::NoProfiles
            } else {
                ConfigError::ProfileNotFound {
                    name: wanted.into(),
                    available: cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", "),
                }
            });
        }
    }
    cfg.profiles
        .iter()
        .next()
        .map(|(key, profile)| (key.as_str(), profile))
        .ok_or(ConfigError::NoProfiles)
}

/// Resolve a named profile into a `ConsoleConfig`.
pub fn resolve_profile(cfg: &Config, name: Option<&str>) -> Result<ConsoleConfig, ConfigError> {
    let (_, profile) = select_profile(cfg, name)?;
    profile_to_console_config(profile, &cfg.defaults)
}

/// Build a `ConsoleConfig` from a profile, without CLI flag overrides.
pub fn profile_to_console_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<ConsoleConfig, ConfigError> {
    let url: url::Url = profile.url.parse().map_err(|_| ConfigError::Validation {
        field: "url".into(),
        reason: format!("invalid URL: {}", profile.url),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "url".into(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let change_epsilon = profile.change_epsilon.unwrap_or(DEFAULT_CHANGE_EPSILON);
    if !change_epsilon.is_finite() || change_epsilon < 0.0 {
        return Err(ConfigError::Validation {
            field: "change_epsilon".into(),
            reason: format!("must be a non-negative number, got {change_epsilon}"),
        });
    }

    let restart_window = profile
        .restart_window_ms
        .map_or(DEFAULT_RESTART_WINDOW, Duration::from_millis);
    let min_restart_window = profile
        .min_restart_window_ms
        .map_or(DEFAULT_MIN_RESTART_WINDOW, Duration::from_millis);
    if min_restart_window > restart_window {
        return Err(ConfigError::Validation {
            field: "min_restart_window_ms".into(),
            reason: "must not exceed restart_window_ms".into(),
        });
    }

    let mut config = ConsoleConfig::new(url);
    config.tls = tls;
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.poll_interval = profile
        .poll_interval_ms
        .map_or(DEFAULT_POLL_INTERVAL, Duration::from_millis);
    config.restart_window = restart_window;
    config.min_restart_window = min_restart_window;
    config.change_epsilon = change_epsilon;
    config.upload = UploadPolicy {
        max_bytes: profile.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        ..UploadPolicy::default()
    };
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn single_profile_is_picked_without_default() {
        let mut cfg = Config {
            default_profile: None,
            ..Config::default()
        };
        cfg.profiles.insert("boat".into(), Profile::new("http://boat:8082"));
        let (name, _) = select_profile(&cfg, None).unwrap();
        assert_eq!(name, "boat");
    }

    #[test]
    fn unknown_profile_lists_available() {
        let mut cfg = Config::default();
        cfg.profiles.insert("a".into(), Profile::new("http://a"));
        cfg.profiles.insert("b".into(), Profile::new("http://b"));
        let err = select_profile(&cfg, Some("c")).unwrap_err();
        assert_eq!(err.to_string(), "profile 'c' not found (available: a, b)");
    }

    #[test]
    fn empty_config_has_no_profiles() {
        assert!(matches!(
            select_profile(&Config::default(), None),
            Err(ConfigError::NoProfiles)
        ));
    }

    #[test]
    fn insecure_default_wins_over_ca_cert() {
        let profile = Profile {
            ca_cert: Some("/tmp/ca.pem".into()),
            ..Profile::new("https://chart-box")
        };
        let defaults = Defaults {
            insecure: true,
            ..Defaults::default()
        };
        let config = profile_to_console_config(&profile, &defaults).unwrap();
        assert_eq!(config.tls, TlsVerification::DangerAcceptInvalid);
    }

    #[test]
    fn rejects_non_http_url() {
        let err = profile_to_console_config(&Profile::new("ftp://x"), &Defaults::default());
        assert!(matches!(err, Err(ConfigError::Validation { .. })));
    }
}
