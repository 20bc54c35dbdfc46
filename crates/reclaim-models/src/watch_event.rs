use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One "watched" entry from the tracking service's history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WatchEvent {
    pub history_id: u64,
    pub show_title: String,
    /// External catalog (TVDB) id of the show, when the tracking service knows it
    pub show_tvdb_id: Option<u32>,
    pub season: u32,
    pub episode: u32,
    pub episode_title: Option<String>,
    pub watched_at: DateTime<Utc>,
}

impl WatchEvent {
    /// `S02E05` style episode code
    pub fn episode_code(&self) -> String {
        format!("S{:02}E{:02}", self.season, self.episode)
    }
}

impl fmt::Display for WatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} - {} on {}",
            self.show_title,
            self.episode_code(),
            self.episode_title.as_deref().unwrap_or("(untitled)"),
            self.watched_at.to_rfc3339()
        )
    }
}
