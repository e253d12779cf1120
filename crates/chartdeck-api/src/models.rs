// Wire models for the chart provider's JSON responses.
//
// The service hand-formats its JSON, so several fields arrive in more than
// one shape: flags as `true` or `"true"`, descriptor numbers as `5` or `"5"`,
// and "no value" as an empty string. The helpers at the bottom normalize
// these at the deserialization boundary.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

// ── Envelope ────────────────────────────────────────────────────────

/// The `{status, info, ...}` frame wrapped around every settings response.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub info: Option<String>,
    #[serde(flatten)]
    pub body: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DataBody<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReadyBody {
    #[serde(deserialize_with = "lenient_bool")]
    pub ready: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SetBody {
    #[serde(default, deserialize_with = "lenient_bool")]
    pub has_changed: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnableBody {
    #[serde(default, deserialize_with = "lenient_bool")]
    pub changed: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FingerprintCreated {
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FingerprintData {
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChartSetBody {
    #[serde(default)]
    pub chart_set: Option<String>,
}

// ── Status tree ─────────────────────────────────────────────────────

/// Snapshot of the service served by `status/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    #[serde(default)]
    pub chart_manager: ChartManagerStatus,
    #[serde(default)]
    pub plugins: PluginStatus,
}

impl ServiceStatus {
    /// Look up a chart set by its `info.name` key.
    pub fn find_set(&self, name: &str) -> Option<&ChartSetStatus> {
        self.chart_manager
            .chart_sets
            .iter()
            .find(|set| set.info.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartManagerStatus {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub num_read: u64,
    #[serde(default)]
    pub num_candidates: u64,
    #[serde(default)]
    pub open_charts: u64,
    #[serde(default)]
    pub memory_kb: u64,
    #[serde(default)]
    pub chart_sets: Vec<ChartSetStatus>,
    #[serde(default)]
    pub cache_filler: Option<CacheFillerStatus>,
}

/// One chart set (a named, versioned chart package).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSetStatus {
    #[serde(default)]
    pub info: ChartSetInfo,
    #[serde(default)]
    pub status: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub active: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub ready: bool,
    #[serde(default)]
    pub errors: u64,
    #[serde(default)]
    pub num_valid_charts: u64,
    #[serde(default)]
    pub num_candidates: u64,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub disabled_by: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub can_delete: bool,
}

impl ChartSetStatus {
    /// Status as shown to the user: an active set still in `INIT` is `PENDING`.
    pub fn display_status(&self) -> &str {
        if self.active && self.status == "INIT" {
            "PENDING"
        } else if self.status.is_empty() {
            "INACTIVE"
        } else {
            &self.status
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSetInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub directory: String,
    #[serde(default)]
    pub valid_to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheFillerStatus {
    #[serde(default, deserialize_with = "lenient_bool")]
    pub prefilling: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub started: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub paused: bool,
    #[serde(default)]
    pub current_set: String,
    #[serde(default)]
    pub current_set_index: i64,
    #[serde(default)]
    pub num_sets: i64,
    #[serde(default)]
    pub current_zoom: i64,
    #[serde(default)]
    pub max_zoom: i64,
    #[serde(default)]
    pub prefill_counts: Vec<PrefillCount>,
}

impl CacheFillerStatus {
    pub fn display_state(&self) -> &'static str {
        if self.prefilling {
            "FILLING"
        } else if self.paused {
            "PAUSING"
        } else if self.started {
            "READY"
        } else {
            "WAITING"
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrefillCount {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub levels: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginStatus {
    #[serde(default)]
    pub loaded_plugins: Vec<LoadedPlugin>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedPlugin {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub state: String,
}

// ── Field descriptors (`settings.json`) ─────────────────────────────

/// Static description of every editable setting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldCatalog {
    #[serde(default)]
    pub important: Vec<FieldDescriptor>,
    #[serde(default)]
    pub detail: Vec<FieldDescriptor>,
}

impl FieldCatalog {
    /// All descriptors, `important` first.
    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.important.iter().chain(self.detail.iter())
    }

    pub fn find(&self, name: &str) -> Option<&FieldDescriptor> {
        self.iter().find(|d| d.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub min: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub max: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub default: Option<f64>,
    /// Comma separated enum values, paired with `choices`.
    #[serde(default)]
    pub values: Option<String>,
    #[serde(default)]
    pub choices: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
}

// ── Lenient field helpers ───────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum BoolOrString {
    Bool(bool),
    Int(i64),
    Str(String),
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match BoolOrString::deserialize(deserializer)? {
        BoolOrString::Bool(b) => b,
        BoolOrString::Int(i) => i != 0,
        BoolOrString::Str(s) => matches!(s.trim(), "true" | "1"),
    })
}

fn empty_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Str(String),
}

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value: Option<NumberOrString> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(NumberOrString::Number(n)) => Some(n),
        Some(NumberOrString::Str(s)) => s.trim().parse().ok(),
        None => None,
    })
}
