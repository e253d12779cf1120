//! Status command handler.

use std::fmt::Write as _;

use bytesize::ByteSize;
use chartdeck_core::{
    ChartClient, ChartSetStatus, ConsoleConfig, CoreError, LoadedPlugin, ServiceStatus,
    StatusState, StatusView, View,
};
use tabled::Tabled;

use crate::cli::{GlobalOpts, StatusArgs};
use crate::error::CliError;
use crate::output;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
pub(crate) struct ChartSetRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Active")]
    active: String,
    #[tabled(rename = "Charts")]
    charts: String,
    #[tabled(rename = "Errors")]
    errors: u64,
    #[tabled(rename = "Disabled by")]
    disabled_by: String,
}

impl ChartSetRow {
    pub(crate) fn new(set: &ChartSetStatus, color: bool) -> Self {
        Self {
            name: set.info.name.clone(),
            title: set.info.title.clone(),
            version: set.info.version.clone(),
            status: output::paint_state(set.display_status(), color),
            active: if set.active { "yes" } else { "no" }.into(),
            charts: format!("{}/{}", set.num_valid_charts, set.num_candidates),
            errors: set.errors,
            disabled_by: set.disabled_by.clone().unwrap_or_default(),
        }
    }
}

#[derive(Tabled)]
struct PluginRow {
    #[tabled(rename = "Plugin")]
    name: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "State")]
    state: String,
}

impl From<&LoadedPlugin> for PluginRow {
    fn from(p: &LoadedPlugin) -> Self {
        Self {
            name: p.name.clone(),
            version: p.version.clone(),
            state: p.state.clone(),
        }
    }
}

fn detail(state: &StatusState, color: bool) -> String {
    let Some(ref status) = state.status else {
        return "No status received".into();
    };
    let manager = &status.chart_manager;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Chart manager: {}",
        output::paint_state(&manager.state, color)
    );
    let _ = writeln!(
        out,
        "  read {} of {} candidates, {} open, memory {}",
        manager.num_read,
        manager.num_candidates,
        manager.open_charts,
        ByteSize::kib(manager.memory_kb)
    );

    if let Some(ref filler) = manager.cache_filler {
        let _ = writeln!(
            out,
            "Cache filler:  {}",
            output::paint_state(filler.display_state(), color)
        );
        if filler.prefilling {
            let _ = writeln!(
                out,
                "  set {} ({}/{}), zoom {}/{}",
                filler.current_set,
                filler.current_set_index,
                filler.num_sets,
                filler.current_zoom,
                filler.max_zoom
            );
        }
    }

    if let Some(at) = state.updated_at {
        let _ = writeln!(out, "Updated:       {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
    }

    let plugins = &status.plugins.loaded_plugins;
    if !plugins.is_empty() {
        let rows: Vec<PluginRow> = plugins.iter().map(PluginRow::from).collect();
        let _ = writeln!(out, "\n{}", output::render_table(&rows));
    }

    let rows: Vec<ChartSetRow> = manager
        .chart_sets
        .iter()
        .map(|set| ChartSetRow::new(set, color))
        .collect();
    let _ = write!(out, "\n{}", output::render_table(&rows));
    out
}

fn render(state: &StatusState, global: &GlobalOpts) -> Result<String, CliError> {
    let color = output::should_color(global.color);
    output::render_single(
        global.output,
        state,
        |s| detail(s, color),
        |s| {
            s.status
                .as_ref()
                .map(|status| status.chart_manager.state.clone())
                .unwrap_or_default()
        },
    )
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    client: &ChartClient,
    console: &ConsoleConfig,
    args: StatusArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let view = StatusView::new(client.clone());

    if !args.watch {
        let status: ServiceStatus = client.status().await.map_err(CoreError::from)?;
        view.apply(Ok(status));
        output::print_output(&render(&view.state(), global)?, global.quiet);
        return Ok(());
    }

    let _poller = view.mount(console.poll_interval);
    let mut state = view.subscribe();
    let mut errors = view.errors().subscribe();
    loop {
        tokio::select! {
            Some(next) = state.changed() => {
                output::print_output(&render(&next, global)?, global.quiet);
            }
            Some(error) = errors.changed() => {
                if let Some(message) = error {
                    eprintln!("{message}");
                }
            }
            _ = tokio::signal::ctrl_c() => break,
            else => break,
        }
    }
    Ok(())
}
