//! Settings command handlers.

use chartdeck_core::fields::DEPTH_UNIT_FIELD;
use chartdeck_core::{
    ChartClient, ConsoleConfig, Field, FieldKind, SettingsGroup, SettingsView, View,
};
use serde::Serialize;
use tabled::Tabled;

use crate::cli::{GlobalOpts, SettingsArgs, SettingsCommand};
use crate::error::CliError;
use crate::output;
use crate::presenter::Presenter;

use super::util;

// ── Rows ────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct SettingEntry {
    group: SettingsGroup,
    name: String,
    title: String,
    kind: FieldKind,
    value: Option<f64>,
    display: String,
    range: String,
    default: Option<String>,
}

#[derive(Tabled)]
struct SettingRow {
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Range")]
    range: String,
    #[tabled(rename = "Default")]
    default: String,
}

impl From<&SettingEntry> for SettingRow {
    fn from(e: &SettingEntry) -> Self {
        Self {
            group: e.group.to_string(),
            name: e.name.clone(),
            title: e.title.clone(),
            value: e.display.clone(),
            range: e.range.clone(),
            default: e.default.clone().unwrap_or_default(),
        }
    }
}

#[derive(Serialize)]
struct ChangeEntry {
    name: String,
    title: String,
    from: String,
    to: String,
    value: f64,
}

#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Current")]
    from: String,
    #[tabled(rename = "New")]
    to: String,
}

impl From<&ChangeEntry> for ChangeRow {
    fn from(c: &ChangeEntry) -> Self {
        Self {
            name: c.name.clone(),
            title: c.title.clone(),
            from: c.from.clone(),
            to: c.to.clone(),
        }
    }
}

fn entry(view: &SettingsView, group: SettingsGroup, field: &Field) -> SettingEntry {
    let state = view.state();
    let unit = state.depth_unit();
    let (min, max) = field.display_range(unit);
    let range = match (min, max) {
        (Some(min), Some(max)) => format!("{min} .. {max}"),
        _ => String::new(),
    };
    SettingEntry {
        group,
        name: field.name.clone(),
        title: field.title.clone(),
        kind: field.kind,
        value: state.effective(&field.name),
        display: view.display_value(&field.name).unwrap_or_default(),
        range,
        default: field.default.map(|d| field.format_value(d, unit)),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    client: &ChartClient,
    console: &ConsoleConfig,
    args: SettingsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let view = SettingsView::new(client.clone(), console);
    util::load_settings(client, &view).await?;

    match args.command {
        SettingsCommand::Show { detail, group } => {
            let groups = match group {
                Some(name) => vec![name.parse::<SettingsGroup>().map_err(|_| {
                    CliError::Validation {
                        field: "group".into(),
                        reason: format!("expected main, display, depth or detail, got '{name}'"),
                    }
                })?],
                None if detail => vec![
                    SettingsGroup::Main,
                    SettingsGroup::Display,
                    SettingsGroup::Depth,
                    SettingsGroup::Detail,
                ],
                None => vec![
                    SettingsGroup::Main,
                    SettingsGroup::Display,
                    SettingsGroup::Depth,
                ],
            };
            let entries: Vec<SettingEntry> = groups
                .into_iter()
                .flat_map(|g| {
                    view.fields(g)
                        .iter()
                        .map(|f| entry(&view, g, f))
                        .collect::<Vec<_>>()
                })
                .collect();
            let out = output::render_list(
                global.output,
                &entries,
                |e: &SettingEntry| SettingRow::from(e),
                |e| format!("{}={}", e.name, e.value.map(|v| v.to_string()).unwrap_or_default()),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SettingsCommand::Set { assignments } => {
            let mut pairs = assignments
                .iter()
                .map(|a| {
                    a.split_once('=')
                        .map(|(n, v)| (n.trim(), v.trim()))
                        .ok_or_else(|| CliError::Validation {
                            field: a.clone(),
                            reason: "expected NAME=VALUE".into(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            // Depth values are entered in the unit being set, so stage it first.
            pairs.sort_by_key(|(name, _)| *name != DEPTH_UNIT_FIELD);

            let before = snapshot_display(&view, pairs.iter().map(|(n, _)| *n));
            for (name, value) in &pairs {
                view.edit(name, value)?;
            }
            apply(&view, &before, global).await
        }

        SettingsCommand::Defaults => {
            let names: Vec<String> = view
                .state()
                .catalog
                .map(|c| c.iter().map(|f| f.name.clone()).collect())
                .unwrap_or_default();
            let before = snapshot_display(&view, names.iter().map(String::as_str));
            let staged = view.reset_to_defaults()?;
            if staged == 0 {
                output::notice("All settings are at their defaults", global.quiet);
                return Ok(());
            }
            apply(&view, &before, global).await
        }
    }
}

/// Current display text per field, taken before anything is staged.
fn snapshot_display<'a>(
    view: &SettingsView,
    names: impl Iterator<Item = &'a str>,
) -> Vec<(String, String)> {
    names
        .map(|n| (n.to_owned(), view.display_value(n).unwrap_or_default()))
        .collect()
}

/// Show the staged diff, submit it, and follow the restart offer.
async fn apply(
    view: &SettingsView,
    before: &[(String, String)],
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let state = view.state();
    let changes: Vec<ChangeEntry> = state
        .pending
        .diff()
        .iter()
        .map(|(name, value)| ChangeEntry {
            name: name.clone(),
            title: view.field(name).map(|f| f.title).unwrap_or_default(),
            from: before
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, d)| d.clone())
                .unwrap_or_default(),
            to: view.display_value(name).unwrap_or_default(),
            value: *value,
        })
        .collect();

    if changes.is_empty() {
        output::notice("Nothing to change", global.quiet);
        return Ok(());
    }
    let out = output::render_list(global.output, &changes, |c: &ChangeEntry| ChangeRow::from(c), |c| {
        format!("{}={}", c.name, c.value)
    })?;
    output::print_output(&out, global.quiet);

    let presenter = Presenter::attach(view.dialogs(), util::presenter_options(global));
    let result = view.submit().await;
    view.settle().await;
    presenter.finish().await?;

    if result? {
        output::notice("Settings applied", global.quiet);
    } else {
        output::notice("The service reported no changes", global.quiet);
    }
    if util::restart_pending(view) {
        output::notice("Restart triggered", global.quiet);
    }
    Ok(())
}
