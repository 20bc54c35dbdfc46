use futures::{Stream, StreamExt};
use reclaim_models::{EpisodeRecord, SeriesRecord, WatchEvent};
use reclaim_sources::{DeleteOutcome, LibraryManager, SourceError};
use serde::Serialize;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ReconcileOptions {
    /// Look everything up but never delete
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub events: usize,
    /// Events with no catalog id or no library series
    pub unresolved: usize,
    pub matched: usize,
    pub without_file: usize,
    pub deleted: usize,
    pub already_gone: usize,
    pub would_delete: usize,
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to read watch history")]
    History(#[source] SourceError),
    #[error("failed to resolve series for TVDB id {tvdb_id}")]
    ResolveSeries {
        tvdb_id: u32,
        #[source]
        source: SourceError,
    },
    #[error("failed to list episodes of series {series_id}")]
    ListEpisodes {
        series_id: u64,
        #[source]
        source: SourceError,
    },
    #[error("failed to delete the file of episode {episode_id}")]
    DeleteEpisodeFile {
        episode_id: u64,
        #[source]
        source: SourceError,
    },
}

/// Receives the human-facing progress of a run.
pub trait ReconcileObserver: Send + Sync {
    fn watched(&self, _event: &WatchEvent) {}

    fn file_found(&self, _event: &WatchEvent, _episode: &EpisodeRecord) {}

    fn file_deleted(&self, _event: &WatchEvent, _episode: &EpisodeRecord, _outcome: DeleteOutcome) {}

    fn would_delete(&self, _event: &WatchEvent, _episode: &EpisodeRecord) {}
}

pub struct NoopObserver;

impl ReconcileObserver for NoopObserver {}

/// Deletes library files of episodes that show up in the watch history.
pub struct Reconciler<'a> {
    library: &'a dyn LibraryManager,
    observer: &'a dyn ReconcileObserver,
    options: ReconcileOptions,
}

impl<'a> Reconciler<'a> {
    pub fn new(library: &'a dyn LibraryManager, observer: &'a dyn ReconcileObserver, options: ReconcileOptions) -> Self {
        Self {
            library,
            observer,
            options,
        }
    }

    /// Consumes `events` in order. The first error from the stream or from
    /// the library aborts the run.
    #[instrument(skip_all, fields(library = self.library.library_name(), dry_run = self.options.dry_run))]
    pub async fn run<S>(&self, events: S) -> Result<ReconcileSummary, ReconcileError>
    where
        S: Stream<Item = Result<WatchEvent, SourceError>>,
    {
        let start = Instant::now();
        let mut summary = ReconcileSummary::default();
        futures::pin_mut!(events);

        info!(operation = "reconcile_start", "Reconciling watch history against library");

        while let Some(event) = events.next().await {
            let event = event.map_err(ReconcileError::History)?;
            self.reconcile_event(&event, &mut summary).await?;
        }

        info!(
            operation = "reconcile_complete",
            duration_ms = start.elapsed().as_millis() as u64,
            events = summary.events,
            deleted = summary.deleted,
            would_delete = summary.would_delete,
            "Reconciliation completed"
        );
        Ok(summary)
    }

    pub async fn reconcile_event(&self, event: &WatchEvent, summary: &mut ReconcileSummary) -> Result<(), ReconcileError> {
        summary.events += 1;
        self.observer.watched(event);
        info!(
            show = %event.show_title,
            episode = %event.episode_code(),
            title = event.episode_title.as_deref().unwrap_or_default(),
            watched_at = %event.watched_at,
            "Trakt watched"
        );

        let Some(series) = self.resolve(event).await? else {
            summary.unresolved += 1;
            return Ok(());
        };

        let episodes = self
            .library
            .list_episodes(series.id)
            .await
            .map_err(|source| ReconcileError::ListEpisodes {
                series_id: series.id,
                source,
            })?;

        // Every match is handled; duplicates in the library each get their own delete.
        for episode in episodes.iter().filter(|e| e.matches(event.season, event.episode)) {
            summary.matched += 1;
            if !episode.has_file {
                debug!(episode_id = episode.id, "Matching episode has no file");
                summary.without_file += 1;
                continue;
            }
            self.remove_file(event, episode, summary).await?;
        }
        Ok(())
    }

    async fn resolve(&self, event: &WatchEvent) -> Result<Option<SeriesRecord>, ReconcileError> {
        let Some(tvdb_id) = event.show_tvdb_id else {
            info!(show = %event.show_title, "Show has no TVDB id, skipping");
            return Ok(None);
        };

        let series = self
            .library
            .resolve_series(tvdb_id)
            .await
            .map_err(|source| ReconcileError::ResolveSeries { tvdb_id, source })?;

        if series.is_none() {
            info!(show = %event.show_title, tvdb_id, "Series not in library, skipping");
        }
        Ok(series)
    }

    async fn remove_file(
        &self,
        event: &WatchEvent,
        episode: &EpisodeRecord,
        summary: &mut ReconcileSummary,
    ) -> Result<(), ReconcileError> {
        self.observer.file_found(event, episode);
        info!(show = %event.show_title, episode_id = episode.id, "Library episode has file");

        if self.options.dry_run {
            summary.would_delete += 1;
            self.observer.would_delete(event, episode);
            info!(episode_id = episode.id, "Dry run, not deleting file");
            return Ok(());
        }

        let outcome = self
            .library
            .delete_episode_file(episode)
            .await
            .map_err(|source| ReconcileError::DeleteEpisodeFile {
                episode_id: episode.id,
                source,
            })?;

        match outcome {
            DeleteOutcome::Deleted => summary.deleted += 1,
            DeleteOutcome::AlreadyGone => summary.already_gone += 1,
        }
        self.observer.file_deleted(event, episode, outcome);
        info!(show = %event.show_title, episode_id = episode.id, ?outcome, "Library episode file deleted");
        Ok(())
    }
}
