use super::ui::{ConsoleObserver, DeviceCodePrompt};
use crate::output::Output;
use chrono::Utc;
use color_eyre::eyre::Context;
use color_eyre::Result;
use reclaim_config::{Settings, TokenStore};
use reclaim_core::{acquire_credential, AuthMode, ReconcileOptions, ReconcileSummary, Reconciler};
use reclaim_models::HistoryWindow;
use reclaim_sources::{SonarrClient, TraktClient, WatchHistorySource};
use serde_json::json;
use std::path::Path;

pub async fn run_reclaim(
    config_file: Option<&Path>,
    days: Option<u32>,
    dry_run: bool,
    non_interactive: bool,
    output: &Output,
) -> Result<()> {
    tracing::debug!("Run command started");

    let settings = Settings::load(config_file).wrap_err("Failed to load configuration")?;
    let days = days.unwrap_or(settings.window_days);
    let window = HistoryWindow::trailing_days(Utc::now(), days)
        .wrap_err_with(|| format!("Invalid history window of {} days", days))?;

    let trakt = TraktClient::with_base_url(
        settings.trakt.api_url.as_str(),
        settings.trakt.client_id.clone(),
        settings.trakt.client_secret.clone(),
    );
    let sonarr = SonarrClient::new(settings.sonarr.url.as_str(), settings.sonarr.api_key.clone());

    let store = TokenStore::new(settings.paths().token_file());
    let mode = if non_interactive {
        AuthMode::NonInteractive
    } else {
        AuthMode::Interactive
    };
    let prompt = DeviceCodePrompt::new(output);
    let credential = acquire_credential(&store, &trakt, &prompt, mode)
        .await
        .wrap_err("Failed to obtain Trakt authorization")?;

    tracing::info!(
        operation = "run_start",
        source = trakt.source_name(),
        start = %window.start(),
        end = %window.end(),
        dry_run,
        "Reading watch history"
    );

    let observer = ConsoleObserver::new(output);
    let reconciler = Reconciler::new(&sonarr, &observer, ReconcileOptions { dry_run });
    let summary = reconciler
        .run(trakt.watched_episodes(&credential, window))
        .await
        .wrap_err("Reconciliation aborted")?;

    print_summary(&summary, dry_run, output);
    Ok(())
}

fn print_summary(summary: &ReconcileSummary, dry_run: bool, output: &Output) {
    if !output.is_human() {
        output.json(&json!({ "type": "summary", "summary": summary }));
        return;
    }

    if dry_run {
        output.success(format!(
            "Dry run complete: {} watched episodes, {} files would be deleted",
            summary.events, summary.would_delete
        ));
    } else {
        output.success(format!(
            "Done: {} watched episodes, {} files deleted",
            summary.events, summary.deleted
        ));
    }
    if summary.already_gone > 0 {
        output.info(format!("{} files were already gone", summary.already_gone));
    }
    if summary.unresolved > 0 {
        output.info(format!("{} episodes had no matching series in Sonarr", summary.unresolved));
    }
}
