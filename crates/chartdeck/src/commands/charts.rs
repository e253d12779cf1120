//! Chart set command handlers.

use std::path::Path;
use std::time::Duration;

use bytesize::ByteSize;
use chartdeck_core::{ChartClient, ChartsView, ConsoleConfig, UploadOutcome, View};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::time::Instant;

use crate::cli::{ChartsArgs, ChartsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;
use crate::presenter::{Presenter, PresenterOptions};

use super::status::ChartSetRow;
use super::util;

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    client: &ChartClient,
    console: &ConsoleConfig,
    args: ChartsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let view = ChartsView::new(client.clone(), console);

    match args.command {
        ChartsCommand::List => {
            util::load_charts(client, &view).await?;
            let sets = view
                .state()
                .status
                .map(|s| s.chart_manager.chart_sets)
                .unwrap_or_default();
            let color = output::should_color(global.color);
            let out = output::render_list(
                global.output,
                &sets,
                |s| ChartSetRow::new(s, color),
                |s| s.info.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ChartsCommand::Enable { name } => toggle(client, &view, &name, true, global).await,
        ChartsCommand::Disable { name } => toggle(client, &view, &name, false, global).await,

        ChartsCommand::Delete { name } => {
            util::load_charts(client, &view).await?;
            let presenter = Presenter::attach(view.dialogs(), util::presenter_options(global));
            let result = view.delete_chart_set(&name).await;
            presenter.finish().await?;
            if result? {
                output::notice(&format!("Chart set {name} deleted"), global.quiet);
            } else {
                output::notice("Nothing deleted", global.quiet);
            }
            Ok(())
        }

        ChartsCommand::Upload { file, restart } => {
            let options = PresenterOptions {
                accept_restart: restart,
                ..util::presenter_options(global)
            };
            upload(&view, console, &file, options, global.quiet).await
        }

        ChartsCommand::Restart { wait } => {
            let presenter = Presenter::attach(view.dialogs(), util::presenter_options(global));
            let started = Instant::now();
            let mut result = view.trigger_restart().await.map_err(CliError::from);
            if result.is_ok() && wait {
                result = wait_until_ready(&view, console).await;
            }
            presenter.finish().await?;
            result?;
            if wait {
                let elapsed = Duration::from_secs(started.elapsed().as_secs());
                output::notice(
                    &format!(
                        "Chart service ready after {}",
                        humantime::format_duration(elapsed)
                    ),
                    global.quiet,
                );
            } else {
                output::notice("Restart triggered", global.quiet);
            }
            Ok(())
        }

        ChartsCommand::Fingerprint { dongle, out } => {
            let options = PresenterOptions {
                out_dir: out,
                ..util::presenter_options(global)
            };
            let presenter = Presenter::attach(view.dialogs(), options);
            let result = view.fingerprint(dongle).await;
            presenter.finish().await?;
            let (file_name, data) = result?;
            tracing::info!(file = %file_name, bytes = data.len(), "fingerprint downloaded");
            Ok(())
        }
    }
}

// ── Actions ─────────────────────────────────────────────────────────

async fn toggle(
    client: &ChartClient,
    view: &ChartsView,
    name: &str,
    enable: bool,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    util::load_charts(client, view).await?;
    let presenter = Presenter::attach(view.dialogs(), util::presenter_options(global));
    let result = view.set_enabled(name, enable).await;
    view.settle().await;
    presenter.finish().await?;

    let verb = if enable { "enabled" } else { "disabled" };
    if result? {
        output::notice(&format!("Chart set {name} {verb}"), global.quiet);
    } else {
        output::notice(&format!("Chart set {name} not {verb}"), global.quiet);
    }
    if util::restart_pending(view) {
        output::notice("Restart triggered", global.quiet);
    }
    Ok(())
}

async fn upload(
    view: &ChartsView,
    console: &ConsoleConfig,
    file: &Path,
    options: PresenterOptions,
    quiet: bool,
) -> Result<(), CliError> {
    let session = view.upload(file)?;
    let presenter = Presenter::attach(view.dialogs(), options);

    let total = session.current_progress().total;
    if let Some(total) = total {
        output::notice(
            &format!("Uploading {} ({})", session.file_name(), ByteSize::b(total)),
            quiet,
        );
    }
    let bar = progress_bar(total, quiet);
    let mut progress = session.progress();
    let done = session.outcome();
    tokio::pin!(done);
    let outcome = loop {
        tokio::select! {
            outcome = &mut done => break outcome,
            Some(update) = progress.changed() => bar.set_position(update.loaded),
            _ = tokio::signal::ctrl_c() => {
                session.cancel();
            }
        }
    };
    bar.finish_and_clear();

    view.settle().await;
    presenter.finish().await?;

    match outcome {
        UploadOutcome::Completed(receipt) => {
            let message = match receipt.chart_set {
                Some(set) => format!("Uploaded {}: chart set {set}", session.file_name()),
                None => format!("Uploaded {}", session.file_name()),
            };
            output::notice(&message, quiet);
            if util::restart_pending(view) {
                output::notice("Restart triggered", quiet);
            }
            Ok(())
        }
        UploadOutcome::Failed { kind, message } => {
            Err(util::from_kind(kind, message, console.url.as_str()))
        }
        UploadOutcome::Cancelled => Err(CliError::Cancelled),
    }
}

fn progress_bar(total: Option<u64>, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    match total {
        Some(total) => {
            let bar = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::with_template(
                "{bar:40.cyan/blue} {bytes}/{total_bytes} {bytes_per_sec} eta {eta}",
            ) {
                bar.set_style(style.progress_chars("=> "));
            }
            bar
        }
        None => ProgressBar::new_spinner(),
    }
}

/// Poll until the service is ready and the restart dialog is gone.
///
/// Failures inside the suppression window are swallowed by the view, so the
/// first error that reaches the error line is final.
async fn wait_until_ready(view: &ChartsView, console: &ConsoleConfig) -> Result<(), CliError> {
    let _poller = view.mount(console.poll_interval);
    let mut state = view.subscribe();
    let mut errors = view.errors().subscribe();
    let mut dialogs = view.dialogs().subscribe();
    let limit = console.restart_window * 2;

    let wait = async {
        loop {
            if state.latest().readiness.is_ready() && !util::restart_pending(view) {
                return Ok(());
            }
            if let Some(message) = errors.latest() {
                return Err(CliError::Rejected { message });
            }
            tokio::select! {
                _ = state.changed() => {}
                _ = errors.changed() => {}
                _ = dialogs.changed() => {}
            }
        }
    };
    tokio::time::timeout(limit, wait)
        .await
        .map_err(|_| CliError::RestartTimeout {
            seconds: limit.as_secs(),
        })?
}
