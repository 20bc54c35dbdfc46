use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{service} request to {url} failed")]
    Http {
        service: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{service} returned {status} for {url}: {body}")]
    Status {
        service: &'static str,
        url: String,
        status: StatusCode,
        body: String,
    },
    #[error("failed to decode {service} response from {url}")]
    Decode {
        service: &'static str,
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("episode {episode_id} reports a file but carries no episode file id")]
    MissingEpisodeFile { episode_id: u64 },
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
}

/// Terminal outcomes of the device authorization poll.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("device code expired before it was approved")]
    Expired,
    #[error("authorization was denied by the user")]
    Denied,
    #[error("device code is invalid")]
    InvalidCode,
    #[error("device code was already used")]
    AlreadyUsed,
}
