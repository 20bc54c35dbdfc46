use crate::error::SourceError;
use crate::traits::{CredentialIssuer, WatchEventStream, WatchHistorySource};
use crate::trakt::api::HistoryPager;
use crate::trakt::auth::DevicePrompt;
use async_trait::async_trait;
use reclaim_models::{Credential, HistoryWindow};
use reqwest::{Client, RequestBuilder};
use std::sync::Arc;

pub(crate) const SERVICE: &str = "trakt";
const API_VERSION: &str = "2";

/// Create the shared reqwest Client used for every Trakt call
pub fn create_trakt_client() -> Client {
    Client::builder()
        .user_agent(concat!("reclaim/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| Client::new())
}

#[derive(Clone)]
pub struct TraktClient {
    client: Arc<Client>,
    base_url: String,
    client_id: String,
    client_secret: String,
}

impl TraktClient {
    pub fn with_base_url(base_url: &str, client_id: String, client_secret: String) -> Self {
        Self {
            client: Arc::new(create_trakt_client()),
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id,
            client_secret,
        }
    }

    pub(crate) fn client_id(&self) -> &str {
        &self.client_id
    }

    pub(crate) fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST without user authentication (OAuth endpoints)
    pub(crate) fn post(&self, url: &str) -> RequestBuilder {
        self.client
            .post(url)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
    }

    /// GET on behalf of the user owning `credential`
    pub(crate) fn get_authorized(&self, url: &str, credential: &Credential) -> RequestBuilder {
        self.client
            .get(url)
            .header("Authorization", credential.bearer())
            .header("trakt-api-version", API_VERSION)
            .header("trakt-api-key", &self.client_id)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
    }
}

impl WatchHistorySource for TraktClient {
    fn source_name(&self) -> &str {
        SERVICE
    }

    fn watched_episodes<'a>(
        &'a self,
        credential: &Credential,
        window: HistoryWindow,
    ) -> WatchEventStream<'a> {
        HistoryPager::new(self, credential.clone(), window).into_stream()
    }
}

#[async_trait]
impl CredentialIssuer for TraktClient {
    async fn authorize(&self, prompt: &dyn DevicePrompt) -> Result<Credential, SourceError> {
        self.authorize_device(prompt).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Credential, SourceError> {
        self.refresh_credential(refresh_token).await
    }
}
