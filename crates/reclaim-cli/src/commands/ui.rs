use crate::output::Output;
use indicatif::{ProgressBar, ProgressStyle};
use reclaim_core::ReconcileObserver;
use reclaim_models::{EpisodeRecord, WatchEvent};
use reclaim_sources::{DeleteOutcome, DeviceCode, DevicePrompt};
use serde_json::json;
use std::io::IsTerminal;
use std::time::Duration;

pub fn is_interactive() -> bool {
    std::io::stdout().is_terminal() && std::io::stderr().is_terminal()
}

/// Shows the device code and spins while Trakt waits for approval.
pub struct DeviceCodePrompt<'a> {
    output: &'a Output,
    spinner: ProgressBar,
}

impl<'a> DeviceCodePrompt<'a> {
    pub fn new(output: &'a Output) -> Self {
        let spinner = if is_interactive() && output.is_human() {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.blue} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
            );
            spinner
        } else {
            ProgressBar::hidden()
        };
        Self { output, spinner }
    }
}

impl DevicePrompt for DeviceCodePrompt<'_> {
    fn show_code(&self, code: &DeviceCode) {
        tracing::info!(
            operation = "device_code",
            verification_url = %code.verification_url,
            expires_in = code.expires_in,
            "Waiting for device authorization"
        );
        self.output.record(
            "device_code",
            format!(
                "Go to {} and enter the code {}",
                code.verification_url, code.user_code
            ),
            json!({
                "verification_url": code.verification_url,
                "user_code": code.user_code,
                "expires_in": code.expires_in,
            }),
        );
        self.spinner.set_message("Waiting for approval...");
        self.spinner.enable_steady_tick(Duration::from_millis(100));
    }

    fn waiting(&self, attempt: u32) {
        self.spinner
            .set_message(format!("Waiting for approval... (poll {})", attempt));
    }

    fn finished(&self, approved: bool) {
        self.spinner.finish_and_clear();
        if approved {
            self.output.success("Trakt authorization approved");
        }
    }
}

/// Prints one line per watched event, file found and file deleted.
pub struct ConsoleObserver<'a> {
    output: &'a Output,
}

impl<'a> ConsoleObserver<'a> {
    pub fn new(output: &'a Output) -> Self {
        Self { output }
    }
}

fn episode_fields(event: &WatchEvent, episode: &EpisodeRecord) -> serde_json::Value {
    json!({
        "show": event.show_title,
        "episode": event.episode_code(),
        "episode_id": episode.id,
        "episode_file_id": episode.episode_file_id,
    })
}

impl ReconcileObserver for ConsoleObserver<'_> {
    fn watched(&self, event: &WatchEvent) {
        self.output.record(
            "watched",
            format!("Trakt watched: {}", event),
            json!({
                "history_id": event.history_id,
                "show": event.show_title,
                "tvdb_id": event.show_tvdb_id,
                "episode": event.episode_code(),
                "title": event.episode_title,
                "watched_at": event.watched_at.to_rfc3339(),
            }),
        );
    }

    fn file_found(&self, event: &WatchEvent, episode: &EpisodeRecord) {
        self.output.record(
            "file_found",
            format!(
                "Sonarr has file: {} - {} (episode {})",
                event.show_title,
                event.episode_code(),
                episode.id
            ),
            episode_fields(event, episode),
        );
    }

    fn file_deleted(&self, event: &WatchEvent, episode: &EpisodeRecord, outcome: DeleteOutcome) {
        let (kind, verb) = match outcome {
            DeleteOutcome::Deleted => ("file_deleted", "Deleted file"),
            DeleteOutcome::AlreadyGone => ("file_already_gone", "File already gone"),
        };
        self.output.record(
            kind,
            format!("{}: {} - {}", verb, event.show_title, event.episode_code()),
            episode_fields(event, episode),
        );
    }

    fn would_delete(&self, event: &WatchEvent, episode: &EpisodeRecord) {
        self.output.record(
            "would_delete",
            format!(
                "Would delete file: {} - {} (dry run)",
                event.show_title,
                event.episode_code()
            ),
            episode_fields(event, episode),
        );
    }
}
