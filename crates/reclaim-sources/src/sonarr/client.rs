use crate::error::SourceError;
use crate::http;
use crate::sonarr::api::{SonarrEpisode, SonarrSeries};
use crate::traits::{DeleteOutcome, LibraryManager};
use async_trait::async_trait;
use reclaim_models::{EpisodeRecord, SeriesRecord};
use reqwest::{Client, RequestBuilder, StatusCode};
use tracing::{debug, warn};

const SERVICE: &str = "sonarr";

pub struct SonarrClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SonarrClient {
    pub fn new(base_url: &str, api_key: String) -> Self {
        let client = Client::builder()
            .user_agent(concat!("reclaim/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v3{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("X-Api-Key", &self.api_key)
            .header("Accept", "application/json")
    }
}

#[async_trait]
impl LibraryManager for SonarrClient {
    fn library_name(&self) -> &str {
        SERVICE
    }

    async fn resolve_series(&self, tvdb_id: u32) -> Result<Option<SeriesRecord>, SourceError> {
        let url = self.url("/series");
        let request = self
            .authorized(self.client.get(&url))
            .query(&[("tvdbId", tvdb_id.to_string())]);

        let response = http::send(SERVICE, &url, request).await?;
        let candidates: Vec<SonarrSeries> = http::read_json(SERVICE, &url, response).await?;
        debug!(tvdb_id, candidates = candidates.len(), "Sonarr series lookup");

        Ok(candidates.into_iter().next().and_then(SonarrSeries::into_record))
    }

    async fn list_episodes(&self, series_id: u64) -> Result<Vec<EpisodeRecord>, SourceError> {
        let url = self.url("/episode");
        let request = self
            .authorized(self.client.get(&url))
            .query(&[("seriesId", series_id.to_string())]);

        let response = http::send(SERVICE, &url, request).await?;
        let episodes: Vec<SonarrEpisode> = http::read_json(SERVICE, &url, response).await?;
        debug!(series_id, episodes = episodes.len(), "Sonarr episode list");

        Ok(episodes.into_iter().map(EpisodeRecord::from).collect())
    }

    async fn delete_episode_file(&self, episode: &EpisodeRecord) -> Result<DeleteOutcome, SourceError> {
        let file_id = episode
            .episode_file_id
            .ok_or(SourceError::MissingEpisodeFile { episode_id: episode.id })?;
        let url = self.url(&format!("/episodefile/{}", file_id));

        let response = http::send(SERVICE, &url, self.authorized(self.client.delete(&url))).await?;
        if response.status() == StatusCode::NOT_FOUND {
            warn!(episode_id = episode.id, file_id, "Episode file already gone from Sonarr");
            return Ok(DeleteOutcome::AlreadyGone);
        }
        http::ensure_success(SERVICE, &url, response).await?;
        Ok(DeleteOutcome::Deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn client(server: &Server) -> SonarrClient {
        SonarrClient::new(&format!("{}/", server.url()), "api-key".to_string())
    }

    fn episode(file_id: Option<u64>) -> EpisodeRecord {
        EpisodeRecord {
            id: 55,
            series_id: 9,
            season: 2,
            episode: 5,
            title: Some("Pilot".to_string()),
            has_file: file_id.is_some(),
            episode_file_id: file_id,
        }
    }

    #[tokio::test]
    async fn test_resolve_series_uses_first_candidate() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api/v3/series")
            .match_query(Matcher::UrlEncoded("tvdbId".into(), "123".into()))
            .match_header("x-api-key", "api-key")
            .with_status(200)
            .with_body(json!([
                {"id": 9, "title": "Foo", "tvdbId": 123},
                {"id": 10, "title": "Foo (2)", "tvdbId": 123}
            ]).to_string())
            .create_async()
            .await;

        let series = client(&server).resolve_series(123).await.unwrap().unwrap();
        assert_eq!(series.id, 9);
        assert_eq!(series.title, "Foo");
    }

    #[tokio::test]
    async fn test_resolve_series_empty_or_zero_is_none() {
        let mut server = Server::new_async().await;
        let _empty = server
            .mock("GET", "/api/v3/series")
            .match_query(Matcher::UrlEncoded("tvdbId".into(), "1".into()))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;
        let _zero = server
            .mock("GET", "/api/v3/series")
            .match_query(Matcher::UrlEncoded("tvdbId".into(), "2".into()))
            .with_status(200)
            .with_body(r#"[{"id": 0}]"#)
            .create_async()
            .await;

        let sonarr = client(&server);
        assert_eq!(sonarr.resolve_series(1).await.unwrap(), None);
        assert_eq!(sonarr.resolve_series(2).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_resolve_series_server_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api/v3/series")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let err = client(&server).resolve_series(123).await.unwrap_err();
        assert!(matches!(err, SourceError::Status { service: "sonarr", .. }));
    }

    #[tokio::test]
    async fn test_list_episodes() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api/v3/episode")
            .match_query(Matcher::UrlEncoded("seriesId".into(), "9".into()))
            .with_status(200)
            .with_body(json!([
                {"id": 55, "seriesId": 9, "seasonNumber": 2, "episodeNumber": 5, "hasFile": true, "episodeFileId": 701},
                {"id": 56, "seriesId": 9, "seasonNumber": 2, "episodeNumber": 6, "hasFile": false, "episodeFileId": 0}
            ]).to_string())
            .create_async()
            .await;

        let episodes = client(&server).list_episodes(9).await.unwrap();
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].episode_file_id, Some(701));
        assert!(!episodes[1].has_file);
    }

    #[tokio::test]
    async fn test_list_episodes_bad_json_is_decode_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api/v3/episode")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("{not json")
            .create_async()
            .await;

        let err = client(&server).list_episodes(9).await.unwrap_err();
        assert!(matches!(err, SourceError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_delete_episode_file() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("DELETE", "/api/v3/episodefile/701")
            .match_header("x-api-key", "api-key")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let outcome = client(&server).delete_episode_file(&episode(Some(701))).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted);
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_missing_file_is_already_gone() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("DELETE", "/api/v3/episodefile/701")
            .with_status(404)
            .create_async()
            .await;

        let outcome = client(&server).delete_episode_file(&episode(Some(701))).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::AlreadyGone);
    }

    #[tokio::test]
    async fn test_delete_without_file_id_is_error() {
        let server = Server::new_async().await;
        let err = client(&server).delete_episode_file(&episode(None)).await.unwrap_err();
        assert!(matches!(err, SourceError::MissingEpisodeFile { episode_id: 55 }));
    }
}
