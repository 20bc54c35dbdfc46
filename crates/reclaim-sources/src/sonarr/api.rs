use reclaim_models::{EpisodeRecord, SeriesRecord};
use serde::Deserialize;

/// Subset of Sonarr's `SeriesResource` we rely on
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SonarrSeries {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub title: String,
    pub tvdb_id: Option<u32>,
}

/// Subset of Sonarr's `EpisodeResource`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SonarrEpisode {
    pub id: u64,
    pub series_id: u64,
    pub season_number: u32,
    pub episode_number: u32,
    pub title: Option<String>,
    #[serde(default)]
    pub has_file: bool,
    #[serde(default)]
    pub episode_file_id: u64,
}

impl SonarrSeries {
    /// Sonarr reports id 0 when it has no record of the show.
    pub(crate) fn into_record(self) -> Option<SeriesRecord> {
        if self.id == 0 {
            return None;
        }
        Some(SeriesRecord {
            id: self.id,
            title: self.title,
            tvdb_id: self.tvdb_id,
        })
    }
}

impl From<SonarrEpisode> for EpisodeRecord {
    fn from(episode: SonarrEpisode) -> Self {
        EpisodeRecord {
            id: episode.id,
            series_id: episode.series_id,
            season: episode.season_number,
            episode: episode.episode_number,
            title: episode.title,
            has_file: episode.has_file,
            episode_file_id: Some(episode.episode_file_id).filter(|id| *id != 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_conversion() {
        let raw = r#"{
            "id": 55, "seriesId": 9, "seasonNumber": 2, "episodeNumber": 5,
            "title": "Pilot", "hasFile": true, "episodeFileId": 701, "monitored": true
        }"#;
        let episode: EpisodeRecord = serde_json::from_str::<SonarrEpisode>(raw).unwrap().into();
        assert_eq!(episode.id, 55);
        assert_eq!(episode.series_id, 9);
        assert!(episode.matches(2, 5));
        assert!(episode.has_file);
        assert_eq!(episode.episode_file_id, Some(701));
    }

    #[test]
    fn test_episode_without_file_has_no_file_id() {
        let raw = r#"{"id": 56, "seriesId": 9, "seasonNumber": 2, "episodeNumber": 6, "hasFile": false, "episodeFileId": 0}"#;
        let episode: EpisodeRecord = serde_json::from_str::<SonarrEpisode>(raw).unwrap().into();
        assert_eq!(episode.episode_file_id, None);
        assert_eq!(episode.title, None);
    }

    #[test]
    fn test_series_zero_id_is_no_match() {
        let series: SonarrSeries = serde_json::from_str(r#"{"id": 0, "title": ""}"#).unwrap();
        assert!(series.into_record().is_none());
    }
}
