// ── Settings field model ──
//
// Domain view of `settings.json`: typed field kinds, enum options, display
// groups, and the depth unit conversion. Values are always stored and
// submitted in canonical units (meters for depth fields); only display and
// edit input are scaled.

use chartdeck_api::{FieldCatalog, FieldDescriptor};
use serde::Serialize;
use strum::{Display, EnumIter, EnumString};

use crate::error::CoreError;
use crate::pending::{PendingChangeSet, Snapshot};

/// Selector that re-scales every depth field.
pub const DEPTH_UNIT_FIELD: &str = "S52_DEPTH_UNIT_SHOW";

const FEET_TO_METERS: f64 = 0.3048;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Bool,
    Enum,
    Int,
    Float,
    Depth,
    Other,
}

impl FieldKind {
    fn sort_rank(self) -> u8 {
        match self {
            Self::Bool => 0,
            Self::Enum => 1,
            Self::Depth => 2,
            Self::Int | Self::Float | Self::Other => 3,
        }
    }

    fn is_integral(self) -> bool {
        matches!(self, Self::Bool | Self::Enum | Self::Int)
    }
}

/// Display unit for depth fields. The discriminant is the selector value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumIter, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DepthUnit {
    Feet,
    #[default]
    Meters,
    Fathoms,
}

impl DepthUnit {
    /// Unknown selector values fall back to meters.
    pub fn from_code(code: f64) -> Self {
        let code = code.round();
        if code == 0.0 {
            Self::Feet
        } else if (code - 2.0).abs() < f64::EPSILON {
            Self::Fathoms
        } else {
            Self::Meters
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Feet => 0,
            Self::Meters => 1,
            Self::Fathoms => 2,
        }
    }

    /// Multiply a value in this unit by the factor to get meters.
    pub fn factor(self) -> f64 {
        match self {
            Self::Feet => FEET_TO_METERS,
            Self::Meters => 1.0,
            Self::Fathoms => 6.0 * FEET_TO_METERS,
        }
    }

    pub fn short(self) -> &'static str {
        match self {
            Self::Feet => "ft",
            Self::Meters => "m",
            Self::Fathoms => "fat",
        }
    }

    pub fn from_meters(self, meters: f64) -> f64 {
        meters / self.factor()
    }

    pub fn to_meters(self, value: f64) -> f64 {
        value * self.factor()
    }
}

/// Settings page a field is listed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, Serialize)]
#[strum(ascii_case_insensitive)]
pub enum SettingsGroup {
    Main,
    Display,
    Depth,
    Detail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumOption {
    pub value: i64,
    pub label: String,
}

/// One editable setting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    pub title: String,
    pub kind: FieldKind,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub default: Option<f64>,
    pub options: Vec<EnumOption>,
    pub group: Option<String>,
}

impl From<FieldDescriptor> for Field {
    fn from(d: FieldDescriptor) -> Self {
        let kind = d.field_type.parse().unwrap_or(FieldKind::Other);
        let options = enum_options(d.values.as_deref(), d.choices.as_deref());
        Self {
            title: if d.title.is_empty() {
                d.name.clone()
            } else {
                d.title
            },
            name: d.name,
            kind,
            min: d.min,
            max: d.max,
            default: d.default,
            options,
            group: d.group,
        }
    }
}

impl Field {
    /// Parse user input given in display units, returning the canonical value.
    ///
    /// Integral kinds must parse as integers. The `[min, max]` range is
    /// checked in display units for depth fields.
    pub fn parse_input(&self, text: &str, unit: DepthUnit) -> Result<f64, CoreError> {
        let text = text.trim();
        let value = if self.kind.is_integral() {
            text.parse::<i32>().ok().map(f64::from)
        } else {
            text.parse::<f64>().ok()
        };
        let value = match value {
            Some(v) if v.is_finite() => v,
            _ => {
                return Err(CoreError::validation(format!(
                    "{}: {text:?} is not a valid {} value",
                    self.title, self.kind
                )));
            }
        };

        if self.kind == FieldKind::Bool && !(value == 0.0 || (value - 1.0).abs() < f64::EPSILON) {
            return Err(CoreError::validation(format!("{}: expected 0 or 1", self.title)));
        }
        if self.kind == FieldKind::Enum
            && !self.options.is_empty()
            && !self.options.iter().any(|o| (to_f64(o.value) - value).abs() < f64::EPSILON)
        {
            return Err(CoreError::validation(format!(
                "{}: {text} is not one of the allowed choices",
                self.title
            )));
        }

        let (min, max) = self.display_range(unit);
        if min.is_some_and(|min| value < min) || max.is_some_and(|max| value > max) {
            return Err(CoreError::validation(format!(
                "{}: {text} is outside {}...{}",
                self.title,
                min.map_or_else(|| "-".into(), |v| v.to_string()),
                max.map_or_else(|| "-".into(), |v| v.to_string()),
            )));
        }

        Ok(self.to_canonical(value, unit))
    }

    /// Valid edit range in display units.
    pub fn display_range(&self, unit: DepthUnit) -> (Option<f64>, Option<f64>) {
        (
            self.min.map(|v| self.to_display(v, unit)),
            self.max.map(|v| self.to_display(v, unit)),
        )
    }

    pub fn to_display(&self, canonical: f64, unit: DepthUnit) -> f64 {
        if self.kind == FieldKind::Depth {
            unit.from_meters(canonical)
        } else {
            canonical
        }
    }

    pub fn to_canonical(&self, display: f64, unit: DepthUnit) -> f64 {
        if self.kind == FieldKind::Depth {
            unit.to_meters(display)
        } else {
            display
        }
    }

    /// Human readable value: checkbox state, enum label, or a scaled number.
    pub fn format_value(&self, canonical: f64, unit: DepthUnit) -> String {
        match self.kind {
            FieldKind::Bool => (if canonical == 0.0 { "off" } else { "on" }).to_owned(),
            FieldKind::Enum => self
                .options
                .iter()
                .find(|o| (to_f64(o.value) - canonical).abs() < f64::EPSILON)
                .map_or_else(|| "unknown".to_owned(), |o| o.label.clone()),
            FieldKind::Depth => {
                let value = unit.from_meters(canonical);
                format!("{} {}", trim_float(value), unit.short())
            }
            FieldKind::Int | FieldKind::Float | FieldKind::Other => trim_float(canonical),
        }
    }
}

/// Descriptors split the way the console shows them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Catalog {
    pub important: Vec<Field>,
    pub detail: Vec<Field>,
}

impl From<FieldCatalog> for Catalog {
    fn from(c: FieldCatalog) -> Self {
        let mut important: Vec<Field> = c.important.into_iter().map(Field::from).collect();
        important.sort_by_key(|f| f.kind.sort_rank());
        Self {
            important,
            detail: c.detail.into_iter().map(Field::from).collect(),
        }
    }
}

impl Catalog {
    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.important.iter().chain(self.detail.iter())
    }

    pub fn find(&self, name: &str) -> Option<&Field> {
        self.iter().find(|f| f.name == name)
    }

    /// Fields listed on one settings page.
    pub fn group(&self, group: SettingsGroup) -> Vec<&Field> {
        match group {
            SettingsGroup::Detail => self.detail.iter().collect(),
            other => {
                let name = other.to_string();
                self.important
                    .iter()
                    .filter(|f| f.group.as_deref() == Some(name.as_str()))
                    .collect()
            }
        }
    }

    /// `(name, default)` for every field that declares one.
    pub fn defaults(&self) -> impl Iterator<Item = (&str, f64)> {
        self.iter()
            .filter_map(|f| f.default.map(|d| (f.name.as_str(), d)))
    }
}

/// Effective depth unit: pending selector value if present, else the snapshot.
pub fn depth_unit(baseline: &Snapshot, pending: &PendingChangeSet) -> DepthUnit {
    pending
        .effective(DEPTH_UNIT_FIELD, baseline)
        .map_or(DepthUnit::default(), DepthUnit::from_code)
}

/// Pair comma separated `values` with `choices`; the shorter list wins.
fn enum_options(values: Option<&str>, choices: Option<&str>) -> Vec<EnumOption> {
    let (Some(values), Some(choices)) = (values, choices) else {
        return Vec::new();
    };
    values
        .split(',')
        .map(str::trim)
        .zip(choices.split(',').map(str::trim))
        .filter_map(|(value, label)| {
            value.parse().ok().map(|value| EnumOption {
                value,
                label: label.to_owned(),
            })
        })
        .collect()
}

#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn to_f64(v: i64) -> f64 {
    v as f64
}

fn trim_float(v: f64) -> String {
    let s = format!("{v:.4}");
    s.trim_end_matches('0').trim_end_matches('.').to_owned()
}

#[cfg(test)]
#[allow(clippy::float_cmp, clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use pretty_assertions::assert_eq;

    fn descriptor(name: &str, field_type: &str) -> FieldDescriptor {
        FieldDescriptor {
            name: name.into(),
            title: name.into(),
            field_type: field_type.into(),
            ..FieldDescriptor::default()
        }
    }

    fn depth_field() -> Field {
        Field::from(FieldDescriptor {
            min: Some(0.0),
            max: Some(30.0),
            default: Some(3.0),
            ..descriptor("S52_MAR_SAFETY_CONTOUR", "depth")
        })
    }

    #[test]
    fn catalog_sorts_important_by_kind() {
        let catalog = Catalog::from(FieldCatalog {
            important: vec![
                descriptor("f", "float"),
                descriptor("d", "depth"),
                descriptor("b", "bool"),
                descriptor("e", "enum"),
                descriptor("i", "int"),
            ],
            detail: vec![descriptor("x", "float")],
        });
        let order: Vec<&str> = catalog.important.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(order, vec!["b", "e", "d", "f", "i"]);
        assert_eq!(catalog.group(SettingsGroup::Detail).len(), 1);
    }

    #[test]
    fn enum_options_pair_values_and_choices() {
        let field = Field::from(FieldDescriptor {
            values: Some("0, 1,2".into()),
            choices: Some("feet,meters".into()),
            ..descriptor(DEPTH_UNIT_FIELD, "enum")
        });
        assert_eq!(field.options.len(), 2);
        assert_eq!(field.format_value(1.0, DepthUnit::Meters), "meters");
        assert_eq!(field.format_value(7.0, DepthUnit::Meters), "unknown");
    }

    #[test]
    fn depth_input_converts_to_meters() {
        let field = depth_field();
        let meters = field.parse_input("10", DepthUnit::Feet).unwrap();
        assert!((meters - 3.048).abs() < 1e-9);
        assert_eq!(field.format_value(3.048, DepthUnit::Feet), "10 ft");
    }

    #[test]
    fn depth_range_scales_with_unit() {
        let field = depth_field();
        // 30 m is about 98.4 ft
        assert!(field.parse_input("95", DepthUnit::Feet).is_ok());
        assert!(field.parse_input("95", DepthUnit::Meters).is_err());
        let (_, max) = field.display_range(DepthUnit::Fathoms);
        assert!((max.unwrap() - 30.0 / (6.0 * 0.3048)).abs() < 1e-9);
    }

    #[test]
    fn invalid_input_is_validation_error() {
        let field = Field::from(FieldDescriptor {
            min: Some(1.0),
            max: Some(10.0),
            ..descriptor("scale.min", "int")
        });
        let err = field.parse_input("abc", DepthUnit::Meters).unwrap_err();
        assert_eq!(err.kind(), chartdeck_api::ErrorKind::Validation);
        assert!(field.parse_input("2.5", DepthUnit::Meters).is_err());
        assert!(field.parse_input("11", DepthUnit::Meters).is_err());
        assert_eq!(field.parse_input(" 10 ", DepthUnit::Meters).unwrap(), 10.0);
    }

    #[test]
    fn bool_accepts_only_zero_or_one() {
        let field = Field::from(descriptor("S52_SHOW_TEXT", "bool"));
        assert_eq!(field.parse_input("1", DepthUnit::Meters).unwrap(), 1.0);
        assert!(field.parse_input("2", DepthUnit::Meters).is_err());
    }

    #[test]
    fn depth_unit_prefers_pending_selector() {
        let baseline = BTreeMap::from([(DEPTH_UNIT_FIELD.to_owned(), 1.0)]);
        let mut pending = PendingChangeSet::default();
        assert_eq!(depth_unit(&baseline, &pending), DepthUnit::Meters);
        pending.set(DEPTH_UNIT_FIELD, 2.0, &baseline);
        assert_eq!(depth_unit(&baseline, &pending), DepthUnit::Fathoms);
        pending.set(DEPTH_UNIT_FIELD, 9.0, &baseline);
        assert_eq!(depth_unit(&baseline, &pending), DepthUnit::Meters);
    }
}
