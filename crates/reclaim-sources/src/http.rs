use crate::error::SourceError;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{error, trace};

pub(crate) async fn send(
    service: &'static str,
    url: &str,
    request: RequestBuilder,
) -> Result<Response, SourceError> {
    trace!(service, url, "Sending request");
    request.send().await.map_err(|source| SourceError::Http {
        service,
        url: url.to_string(),
        source,
    })
}

pub(crate) async fn body_text(
    service: &'static str,
    url: &str,
    response: Response,
) -> Result<String, SourceError> {
    response.text().await.map_err(|source| SourceError::Http {
        service,
        url: url.to_string(),
        source,
    })
}

/// Fails with `SourceError::Status` unless the response is 2xx.
pub(crate) async fn ensure_success(
    service: &'static str,
    url: &str,
    response: Response,
) -> Result<Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SourceError::Status {
        service,
        url: url.to_string(),
        status,
        body,
    })
}

pub(crate) fn decode<T: DeserializeOwned>(
    service: &'static str,
    url: &str,
    text: &str,
) -> Result<T, SourceError> {
    serde_json::from_str(text).map_err(|source| {
        error!("Failed to parse {} response: {}. Raw response: {}", service, source, text);
        SourceError::Decode {
            service,
            url: url.to_string(),
            source,
        }
    })
}

pub(crate) async fn read_json<T: DeserializeOwned>(
    service: &'static str,
    url: &str,
    response: Response,
) -> Result<T, SourceError> {
    let response = ensure_success(service, url, response).await?;
    let text = body_text(service, url, response).await?;
    decode(service, url, &text)
}
