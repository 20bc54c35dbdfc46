use crate::error::SourceError;
use crate::trakt::DevicePrompt;
use async_trait::async_trait;
use futures::stream::BoxStream;
use reclaim_models::{Credential, EpisodeRecord, HistoryWindow, SeriesRecord, WatchEvent};

/// Lazy, single-pass sequence of watched episodes. The stream ends after
/// yielding its first error.
pub type WatchEventStream<'a> = BoxStream<'a, Result<WatchEvent, SourceError>>;

pub trait WatchHistorySource: Send + Sync {
    fn source_name(&self) -> &str;

    /// Watched episodes in `window`, fetched page by page as the stream is polled.
    fn watched_episodes<'a>(
        &'a self,
        credential: &Credential,
        window: HistoryWindow,
    ) -> WatchEventStream<'a>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The library no longer had the file
    AlreadyGone,
}

#[async_trait]
pub trait LibraryManager: Send + Sync {
    fn library_name(&self) -> &str;

    /// First series the library reports for `tvdb_id`, or `None` when it has no usable match.
    async fn resolve_series(&self, tvdb_id: u32) -> Result<Option<SeriesRecord>, SourceError>;

    async fn list_episodes(&self, series_id: u64) -> Result<Vec<EpisodeRecord>, SourceError>;

    async fn delete_episode_file(&self, episode: &EpisodeRecord) -> Result<DeleteOutcome, SourceError>;
}

/// Issues OAuth credentials for the tracking service.
#[async_trait]
pub trait CredentialIssuer: Send + Sync {
    /// Interactive device flow; blocks until the user approves or the code expires.
    async fn authorize(&self, prompt: &dyn DevicePrompt) -> Result<Credential, SourceError>;

    async fn refresh(&self, refresh_token: &str) -> Result<Credential, SourceError>;
}
