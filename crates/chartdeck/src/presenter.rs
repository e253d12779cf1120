//! Terminal rendering of a view's dialog slot.
//!
//! Follows one `DialogSlot` and answers it: confirms go through
//! `dialoguer` (or are accepted outright with `--yes`), spinners are
//! `indicatif` spinners, alerts are printed, and a fingerprint is written to
//! disk.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chartdeck_core::{Dialog, DialogEntry, DialogSlot, RestartReason};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::CliError;
use crate::output;

#[derive(Debug, Clone, Default)]
pub struct PresenterOptions {
    /// Accept every question.
    pub yes: bool,
    /// Accept restart offers without asking.
    pub accept_restart: bool,
    pub quiet: bool,
    /// Where fingerprint files go.
    pub out_dir: PathBuf,
}

/// Running presenter. Call `finish` before exiting so the last dialog is
/// rendered.
pub struct Presenter {
    stop: CancellationToken,
    task: JoinHandle<Option<CliError>>,
}

impl Presenter {
    pub fn attach(slot: &DialogSlot, options: PresenterOptions) -> Self {
        let stop = CancellationToken::new();
        let task = tokio::spawn(run(slot.clone(), options, stop.clone()));
        Self { stop, task }
    }

    /// Render whatever is showing now, then stop.
    pub async fn finish(self) -> Result<(), CliError> {
        self.stop.cancel();
        match self.task.await {
            Ok(None) => Ok(()),
            Ok(Some(err)) => Err(err),
            Err(e) => Err(CliError::Internal(format!("dialog presenter failed: {e}"))),
        }
    }
}

#[derive(Default)]
struct Rendered {
    last_id: Option<u64>,
    spinner: Option<ProgressBar>,
    failure: Option<CliError>,
}

impl Rendered {
    fn clear_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

async fn run(
    slot: DialogSlot,
    options: PresenterOptions,
    stop: CancellationToken,
) -> Option<CliError> {
    let mut stream = slot.subscribe();
    let mut rendered = Rendered::default();
    let mut entry = stream.current().clone();

    loop {
        present(&slot, &options, &mut rendered, entry).await;
        tokio::select! {
            biased;
            changed = stream.changed() => match changed {
                Some(next) => entry = next,
                None => break,
            },
            () = stop.cancelled() => {
                let latest = slot.current();
                if latest.as_ref().map(|e| e.id) != rendered.last_id {
                    present(&slot, &options, &mut rendered, latest).await;
                }
                break;
            }
        }
    }

    rendered.clear_spinner();
    rendered.failure
}

async fn present(
    slot: &DialogSlot,
    options: &PresenterOptions,
    rendered: &mut Rendered,
    entry: Option<DialogEntry>,
) {
    let id = entry.as_ref().map(|e| e.id);
    if id == rendered.last_id {
        return;
    }
    rendered.last_id = id;
    rendered.clear_spinner();

    let Some(DialogEntry { id, dialog }) = entry else {
        return;
    };
    debug!(id, ?dialog, "presenting dialog");

    match dialog {
        Dialog::Spinner => {
            rendered.spinner = Some(spinner("working...", options.quiet));
        }
        Dialog::RestartTriggered => {
            rendered.spinner = Some(spinner("restarting chart service...", options.quiet));
        }
        Dialog::Alert { message } => {
            output::notice(&message, options.quiet);
            slot.dismiss(id);
        }
        Dialog::Confirm { message, detail } => {
            let prompt = match detail {
                Some(detail) => format!("{message} ({detail})"),
                None => message,
            };
            let accepted = ask(prompt, options.yes).await;
            answer(slot, id, accepted);
        }
        Dialog::RestartRequired { reason } => {
            let accepted = if options.accept_restart {
                true
            } else {
                let prompt = format!("{}. Restart the chart service now?", describe(&reason));
                ask(prompt, options.yes).await
            };
            answer(slot, id, accepted);
        }
        Dialog::DisabledBy { item, other } => {
            let prompt = format!(
                "{} was disabled because {} is active. Enable it anyway?",
                item.title, other.title
            );
            let accepted = ask(prompt, options.yes).await;
            answer(slot, id, accepted);
        }
        Dialog::Fingerprint { file_name, data } => {
            match write_fingerprint(&options.out_dir, &file_name, &data) {
                Ok(path) => {
                    output::notice(&format!("Fingerprint saved to {}", path.display()), options.quiet);
                }
                Err(e) => rendered.failure = Some(e),
            }
            slot.dismiss(id);
        }
    }
}

fn describe(reason: &RestartReason) -> String {
    match reason {
        RestartReason::ChartSetActivated { title } => format!("Chart set {title} was activated"),
        RestartReason::UploadComplete {
            chart_set: Some(name),
        } => format!("Upload complete, chart set {name} installed"),
        RestartReason::UploadComplete { chart_set: None } => "Upload complete".into(),
        RestartReason::SettingsChanged => "Settings changed".into(),
    }
}

fn spinner(message: &'static str, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Yes/no on the terminal. Without a terminal the answer is no unless
/// `--yes` was given.
async fn ask(prompt: String, yes: bool) -> bool {
    if yes {
        return true;
    }
    if !std::io::stdin().is_terminal() {
        eprintln!("{prompt} -> declined (pass --yes to accept)");
        return false;
    }
    let answer = tokio::task::spawn_blocking(move || {
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
    })
    .await;
    match answer {
        Ok(Ok(accepted)) => accepted,
        Ok(Err(e)) => {
            debug!(error = %e, "prompt failed");
            false
        }
        Err(e) => {
            debug!(error = %e, "prompt task failed");
            false
        }
    }
}

/// Answer only if the dialog is still the one that was asked about.
fn answer(slot: &DialogSlot, id: u64, accepted: bool) {
    if slot.current().is_none_or(|entry| entry.id != id) {
        debug!(id, "dialog replaced before the answer");
        return;
    }
    if accepted {
        slot.accept();
    } else {
        slot.cancel();
    }
}

fn write_fingerprint(dir: &Path, file_name: &str, data: &[u8]) -> Result<PathBuf, CliError> {
    let name = Path::new(file_name)
        .file_name()
        .map_or_else(|| "fingerprint".into(), PathBuf::from);
    let path = dir.join(name);
    std::fs::write(&path, data)?;
    Ok(path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chartdeck_core::Rejected;

    #[tokio::test]
    async fn yes_accepts_confirm() {
        let slot = DialogSlot::new();
        let presenter = Presenter::attach(
            &slot,
            PresenterOptions {
                yes: true,
                ..PresenterOptions::default()
            },
        );
        let answer = slot.confirm("Really delete version 2?", None);
        assert_eq!(answer.await, Ok(()));
        presenter.finish().await.unwrap();
    }

    #[tokio::test]
    async fn restart_offer_follows_flag() {
        let slot = DialogSlot::new();
        let presenter = Presenter::attach(
            &slot,
            PresenterOptions {
                accept_restart: true,
                ..PresenterOptions::default()
            },
        );
        let answer = slot.open(Dialog::RestartRequired {
            reason: RestartReason::SettingsChanged,
        });
        assert_eq!(answer.await, Ok(()));
        presenter.finish().await.unwrap();
    }

    #[tokio::test]
    async fn fingerprint_is_written_on_finish() {
        let dir = tempfile::tempdir().unwrap();
        let slot = DialogSlot::new();
        let presenter = Presenter::attach(
            &slot,
            PresenterOptions {
                quiet: true,
                out_dir: dir.path().to_path_buf(),
                ..PresenterOptions::default()
            },
        );
        slot.set_dialog(Dialog::Fingerprint {
            file_name: "../escape/box.fpr".into(),
            data: bytes_of("license"),
        });
        presenter.finish().await.unwrap();

        assert_eq!(std::fs::read(dir.path().join("box.fpr")).unwrap(), b"license");
        assert!(slot.current().is_none());
    }

    #[tokio::test]
    async fn stale_answer_is_dropped() {
        let slot = DialogSlot::new();
        let first = slot.confirm("first?", None);
        let stale = slot.current().unwrap().id;
        let second = slot.confirm("second?", None);

        answer(&slot, stale, true);
        assert_eq!(first.await, Err(Rejected::Superseded));
        assert!(slot.current().is_some());

        slot.cancel();
        assert_eq!(second.await, Err(Rejected::Cancelled));
    }

    fn bytes_of(text: &'static str) -> bytes::Bytes {
        bytes::Bytes::from_static(text.as_bytes())
    }
}
