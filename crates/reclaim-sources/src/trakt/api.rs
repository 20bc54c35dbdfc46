use crate::error::SourceError;
use crate::http;
use crate::traits::WatchEventStream;
use crate::trakt::client::{TraktClient, SERVICE};
use chrono::{DateTime, SecondsFormat, Utc};
use futures::stream::{self, StreamExt};
use reclaim_models::{Credential, HistoryWindow, WatchEvent};
use serde::Deserialize;
use std::collections::VecDeque;
use tracing::{debug, trace};

pub const HISTORY_PAGE_LIMIT: u32 = 100;
const PAGE_COUNT_HEADER: &str = "X-Pagination-Page-Count";

#[derive(Debug, Deserialize)]
pub(crate) struct TraktIds {
    tvdb: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TraktShow {
    title: String,
    ids: TraktIds,
}

#[derive(Debug, Deserialize)]
struct TraktEpisode {
    season: u32,
    number: u32,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TraktHistoryItem {
    id: u64,
    watched_at: DateTime<Utc>,
    episode: TraktEpisode,
    show: TraktShow,
}

/// Entries are tagged by `type`; anything but an episode is skipped, while a
/// missing or non-string tag fails to decode.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum TraktHistoryEntry {
    Episode(TraktHistoryItem),
    #[serde(other)]
    Other,
}

impl From<TraktHistoryItem> for WatchEvent {
    fn from(item: TraktHistoryItem) -> Self {
        WatchEvent {
            history_id: item.id,
            show_title: item.show.title,
            show_tvdb_id: item.show.ids.tvdb.filter(|id| *id != 0),
            season: item.episode.season,
            episode: item.episode.number,
            episode_title: item.episode.title,
            watched_at: item.watched_at,
        }
    }
}

fn format_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Decodes one raw history entry. Non-episode entries and entries outside
/// `window` yield `None`.
fn decode_item(
    url: &str,
    window: &HistoryWindow,
    raw: serde_json::Value,
) -> Result<Option<WatchEvent>, SourceError> {
    let entry: TraktHistoryEntry = serde_json::from_value(raw).map_err(|source| SourceError::Decode {
        service: SERVICE,
        url: url.to_string(),
        source,
    })?;
    let item = match entry {
        TraktHistoryEntry::Episode(item) => item,
        TraktHistoryEntry::Other => {
            trace!("Skipping non-episode history entry");
            return Ok(None);
        }
    };

    if !window.contains(item.watched_at) {
        trace!(history_id = item.id, watched_at = %item.watched_at, "History entry outside window");
        return Ok(None);
    }
    Ok(Some(item.into()))
}

/// Walks `/sync/history/shows` one page at a time.
pub(crate) struct HistoryPager<'a> {
    trakt: &'a TraktClient,
    credential: Credential,
    window: HistoryWindow,
    url: String,
    next_page: u32,
    page_count: Option<u32>,
    pending: VecDeque<serde_json::Value>,
    finished: bool,
}

impl<'a> HistoryPager<'a> {
    pub(crate) fn new(trakt: &'a TraktClient, credential: Credential, window: HistoryWindow) -> Self {
        Self {
            url: trakt.url("/sync/history/shows"),
            trakt,
            credential,
            window,
            next_page: 1,
            page_count: None,
            pending: VecDeque::new(),
            finished: false,
        }
    }

    pub(crate) fn into_stream(self) -> WatchEventStream<'a> {
        stream::unfold(self, |mut pager| async move {
            let item = pager.next_event().await?;
            Some((item, pager))
        })
        .boxed()
    }

    async fn next_event(&mut self) -> Option<Result<WatchEvent, SourceError>> {
        loop {
            if self.finished {
                return None;
            }

            if let Some(raw) = self.pending.pop_front() {
                match decode_item(&self.url, &self.window, raw) {
                    Ok(Some(event)) => return Some(Ok(event)),
                    Ok(None) => continue,
                    Err(e) => {
                        self.finished = true;
                        return Some(Err(e));
                    }
                }
            }

            if self.page_count.is_some_and(|count| self.next_page > count) {
                self.finished = true;
                return None;
            }

            match self.fetch_page().await {
                Ok(0) => {
                    self.finished = true;
                    return None;
                }
                Ok(_) => continue,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }

    async fn fetch_page(&mut self) -> Result<usize, SourceError> {
        let request = self
            .trakt
            .get_authorized(&self.url, &self.credential)
            .query(&[
                ("start_at", format_time(self.window.start())),
                ("end_at", format_time(self.window.end())),
                ("page", self.next_page.to_string()),
                ("limit", HISTORY_PAGE_LIMIT.to_string()),
            ]);

        let response = http::send(SERVICE, &self.url, request).await?;
        let response = http::ensure_success(SERVICE, &self.url, response).await?;

        let page_count: u32 = response
            .headers()
            .get(PAGE_COUNT_HEADER)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or(1);

        let text = http::body_text(SERVICE, &self.url, response).await?;
        let items: Vec<serde_json::Value> = http::decode(SERVICE, &self.url, &text)?;

        debug!(
            page = self.next_page,
            page_count,
            items = items.len(),
            "Fetched Trakt history page"
        );

        self.page_count = Some(page_count);
        self.next_page += 1;
        let fetched = items.len();
        self.pending.extend(items);
        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::WatchHistorySource;
    use futures::TryStreamExt;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn credential() -> Credential {
        Credential {
            access_token: "token".to_string(),
            token_type: "bearer".to_string(),
            expires_in: 7_776_000,
            refresh_token: "refresh".to_string(),
            scope: "public".to_string(),
            created_at: 1_700_000_000,
        }
    }

    fn window() -> HistoryWindow {
        HistoryWindow::new(
            "2024-01-01T00:00:00Z".parse().unwrap(),
            "2024-01-08T00:00:00Z".parse().unwrap(),
        )
        .unwrap()
    }

    fn episode_item(id: u64, tvdb: Option<u32>, season: u32, number: u32) -> serde_json::Value {
        json!({
            "id": id,
            "watched_at": "2024-01-05T20:00:00.000Z",
            "action": "watch",
            "type": "episode",
            "episode": {
                "season": season,
                "number": number,
                "title": format!("Episode {}", number),
                "ids": { "trakt": id * 10, "tvdb": 999 }
            },
            "show": {
                "title": "Foo",
                "year": 2020,
                "ids": { "trakt": 1, "slug": "foo", "tvdb": tvdb }
            }
        })
    }

    fn page_query(page: &str) -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("page".into(), page.into()),
            Matcher::UrlEncoded("limit".into(), "100".into()),
            Matcher::UrlEncoded("start_at".into(), "2024-01-01T00:00:00.000Z".into()),
            Matcher::UrlEncoded("end_at".into(), "2024-01-08T00:00:00.000Z".into()),
        ])
    }

    #[test]
    fn test_source_name() {
        let trakt = TraktClient::with_base_url("http://localhost", "client-id".into(), "secret".into());
        assert_eq!(trakt.source_name(), "trakt");
    }

    #[test]
    fn test_decode_item_maps_episode_fields() {
        let event = decode_item("u", &window(), episode_item(7, Some(123), 2, 5))
            .unwrap()
            .unwrap();
        assert_eq!(event.history_id, 7);
        assert_eq!(event.show_title, "Foo");
        assert_eq!(event.show_tvdb_id, Some(123));
        assert_eq!((event.season, event.episode), (2, 5));
        assert_eq!(event.episode_title.as_deref(), Some("Episode 5"));
    }

    #[test]
    fn test_decode_item_skips_movies_and_out_of_window() {
        let movie = json!({"id": 1, "watched_at": "2024-01-05T00:00:00Z", "type": "movie", "movie": {}});
        assert!(decode_item("u", &window(), movie).unwrap().is_none());

        let mut late = episode_item(8, Some(1), 1, 1);
        late["watched_at"] = json!("2024-01-08T00:00:00Z");
        assert!(decode_item("u", &window(), late).unwrap().is_none());
    }

    #[test]
    fn test_decode_item_without_string_type_is_an_error() {
        let mut untyped = episode_item(10, Some(123), 2, 5);
        untyped.as_object_mut().unwrap().remove("type");
        assert!(matches!(
            decode_item("u", &window(), untyped),
            Err(SourceError::Decode { .. })
        ));

        let mut numeric = episode_item(11, Some(123), 2, 5);
        numeric["type"] = json!(3);
        assert!(matches!(
            decode_item("u", &window(), numeric),
            Err(SourceError::Decode { .. })
        ));
    }

    #[test]
    fn test_decode_item_zero_tvdb_is_absent() {
        let event = decode_item("u", &window(), episode_item(9, Some(0), 1, 1))
            .unwrap()
            .unwrap();
        assert_eq!(event.show_tvdb_id, None);
    }

    #[test]
    fn test_decode_item_malformed_episode_is_error() {
        let mut item = episode_item(9, Some(1), 1, 1);
        item["episode"]["season"] = json!("two");
        let err = decode_item("u", &window(), item).unwrap_err();
        assert!(matches!(err, SourceError::Decode { service: "trakt", .. }));
    }

    #[tokio::test]
    async fn test_history_follows_page_count() {
        let mut server = Server::new_async().await;
        let page1 = server
            .mock("GET", "/sync/history/shows")
            .match_query(page_query("1"))
            .match_header("authorization", "Bearer token")
            .match_header("trakt-api-key", "client-id")
            .match_header("trakt-api-version", "2")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_header("X-Pagination-Page-Count", "2")
            .with_body(json!([episode_item(1, Some(123), 2, 5), episode_item(2, Some(123), 2, 6)]).to_string())
            .create_async()
            .await;
        let page2 = server
            .mock("GET", "/sync/history/shows")
            .match_query(page_query("2"))
            .with_status(200)
            .with_header("X-Pagination-Page-Count", "2")
            .with_body(json!([episode_item(3, Some(456), 1, 1)]).to_string())
            .create_async()
            .await;

        let trakt = TraktClient::with_base_url(&server.url(), "client-id".into(), "secret".into());
        let events: Vec<WatchEvent> = trakt
            .watched_episodes(&credential(), window())
            .try_collect()
            .await
            .unwrap();

        assert_eq!(events.iter().map(|e| e.history_id).collect::<Vec<_>>(), vec![1, 2, 3]);
        page1.assert_async().await;
        page2.assert_async().await;
    }

    #[tokio::test]
    async fn test_history_is_lazy() {
        let mut server = Server::new_async().await;
        let _page1 = server
            .mock("GET", "/sync/history/shows")
            .match_query(page_query("1"))
            .with_status(200)
            .with_header("X-Pagination-Page-Count", "2")
            .with_body(json!([episode_item(1, Some(123), 2, 5)]).to_string())
            .create_async()
            .await;
        let page2 = server
            .mock("GET", "/sync/history/shows")
            .match_query(page_query("2"))
            .expect(0)
            .create_async()
            .await;

        let trakt = TraktClient::with_base_url(&server.url(), "client-id".into(), "secret".into());
        let mut stream = trakt.watched_episodes(&credential(), window());
        let first = stream.try_next().await.unwrap().unwrap();
        assert_eq!(first.history_id, 1);
        drop(stream);

        page2.assert_async().await;
    }

    #[tokio::test]
    async fn test_history_malformed_item_ends_stream_with_error() {
        let mut server = Server::new_async().await;
        let mut broken = episode_item(2, Some(123), 2, 6);
        broken["show"] = json!(null);
        let _page = server
            .mock("GET", "/sync/history/shows")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("X-Pagination-Page-Count", "1")
            .with_body(json!([episode_item(1, Some(123), 2, 5), broken, episode_item(3, Some(123), 2, 7)]).to_string())
            .create_async()
            .await;

        let trakt = TraktClient::with_base_url(&server.url(), "client-id".into(), "secret".into());
        let results: Vec<_> = trakt.watched_episodes(&credential(), window()).collect().await;

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(SourceError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_history_page_failure_is_status_error() {
        let mut server = Server::new_async().await;
        let _page = server
            .mock("GET", "/sync/history/shows")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body("unauthorized")
            .create_async()
            .await;

        let trakt = TraktClient::with_base_url(&server.url(), "client-id".into(), "secret".into());
        let results: Vec<_> = trakt.watched_episodes(&credential(), window()).collect().await;

        assert_eq!(results.len(), 1);
        match &results[0] {
            Err(SourceError::Status { status, body, .. }) => {
                assert_eq!(status.as_u16(), 401);
                assert_eq!(body, "unauthorized");
            }
            other => panic!("unexpected result: {:?}", other.as_ref().map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_history_empty_page_ends_stream() {
        let mut server = Server::new_async().await;
        let _page = server
            .mock("GET", "/sync/history/shows")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let trakt = TraktClient::with_base_url(&server.url(), "client-id".into(), "secret".into());
        let results: Vec<_> = trakt.watched_episodes(&credential(), window()).collect().await;
        assert!(results.is_empty());
    }
}
