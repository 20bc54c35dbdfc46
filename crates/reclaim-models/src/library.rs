use serde::{Deserialize, Serialize};

/// A show as the library manager knows it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeriesRecord {
    /// Library-internal id, never zero
    pub id: u64,
    pub title: String,
    pub tvdb_id: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EpisodeRecord {
    pub id: u64,
    pub series_id: u64,
    pub season: u32,
    pub episode: u32,
    pub title: Option<String>,
    pub has_file: bool,
    /// Id of the file resource backing this episode; zero or absent when there is no file
    pub episode_file_id: Option<u64>,
}

impl EpisodeRecord {
    pub fn matches(&self, season: u32, episode: u32) -> bool {
        self.season == season && self.episode == episode
    }
}
