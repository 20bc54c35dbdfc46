use crate::error::{AuthorizationError, SourceError};
use crate::http;
use crate::trakt::client::{TraktClient, SERVICE};
use reclaim_models::Credential;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration as StdDuration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

const REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Response of `POST /oauth/device/code`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceCode {
    pub device_code: String,
    pub user_code: String,
    pub verification_url: String,
    /// Seconds until `device_code` stops being accepted
    pub expires_in: u64,
    /// Seconds to wait between polls
    pub interval: u64,
}

/// Shows the device code to the operator and reports polling progress.
pub trait DevicePrompt: Send + Sync {
    fn show_code(&self, code: &DeviceCode);

    fn waiting(&self, _attempt: u32) {}

    fn finished(&self, _approved: bool) {}
}

/// Prints nothing; for non-interactive callers and tests.
pub struct SilentPrompt;

impl DevicePrompt for SilentPrompt {
    fn show_code(&self, code: &DeviceCode) {
        info!(
            verification_url = %code.verification_url,
            user_code = %code.user_code,
            "Device authorization requested"
        );
    }
}

enum PollStatus {
    Approved(Credential),
    Pending,
    SlowDown,
}

impl TraktClient {
    /// Runs the whole device flow: request a code, show it, poll until the
    /// user approves it or the code expires.
    pub async fn authorize_device(&self, prompt: &dyn DevicePrompt) -> Result<Credential, SourceError> {
        let code = self.request_device_code().await?;
        prompt.show_code(&code);
        let result = self.poll_device_token(&code, prompt).await;
        prompt.finished(result.is_ok());
        result
    }

    pub async fn request_device_code(&self) -> Result<DeviceCode, SourceError> {
        let url = self.url("/oauth/device/code");
        let payload = serde_json::json!({ "client_id": self.client_id() });

        let response = http::send(SERVICE, &url, self.post(&url).json(&payload)).await?;
        let code: DeviceCode = http::read_json(SERVICE, &url, response).await?;
        debug!(expires_in = code.expires_in, interval = code.interval, "Received device code");
        Ok(code)
    }

    /// Polls `POST /oauth/device/token` every `code.interval` seconds until a
    /// terminal answer arrives or `code.expires_in` elapses.
    pub async fn poll_device_token(
        &self,
        code: &DeviceCode,
        prompt: &dyn DevicePrompt,
    ) -> Result<Credential, SourceError> {
        let deadline = Instant::now() + StdDuration::from_secs(code.expires_in);
        let mut interval = code.interval;
        let mut attempts = 0;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(AuthorizationError::Expired.into());
            }

            // Never poll with a code that has already expired
            sleep(StdDuration::from_secs(interval).min(remaining)).await;
            if Instant::now() >= deadline {
                return Err(AuthorizationError::Expired.into());
            }
            attempts += 1;
            prompt.waiting(attempts);

            match self.poll_once(code).await? {
                PollStatus::Approved(credential) => {
                    info!(attempts, "Device authorization approved");
                    return Ok(credential);
                }
                PollStatus::Pending => {}
                PollStatus::SlowDown => {
                    interval += code.interval.max(1);
                    warn!(interval, "Trakt asked to slow down polling");
                }
            }
        }
    }

    async fn poll_once(&self, code: &DeviceCode) -> Result<PollStatus, SourceError> {
        let url = self.url("/oauth/device/token");
        let payload = serde_json::json!({
            "code": code.device_code,
            "client_id": self.client_id(),
            "client_secret": self.client_secret(),
        });

        let response = http::send(SERVICE, &url, self.post(&url).json(&payload)).await?;
        match response.status() {
            StatusCode::BAD_REQUEST => Ok(PollStatus::Pending),
            StatusCode::TOO_MANY_REQUESTS => Ok(PollStatus::SlowDown),
            StatusCode::NOT_FOUND => Err(AuthorizationError::InvalidCode.into()),
            StatusCode::CONFLICT => Err(AuthorizationError::AlreadyUsed.into()),
            StatusCode::GONE => Err(AuthorizationError::Expired.into()),
            StatusCode::IM_A_TEAPOT => Err(AuthorizationError::Denied.into()),
            _ => Ok(PollStatus::Approved(http::read_json(SERVICE, &url, response).await?)),
        }
    }

    /// Exchanges `refresh_token` for a new credential.
    pub async fn refresh_credential(&self, refresh_token: &str) -> Result<Credential, SourceError> {
        let url = self.url("/oauth/token");
        let payload = serde_json::json!({
            "refresh_token": refresh_token,
            "client_id": self.client_id(),
            "client_secret": self.client_secret(),
            "redirect_uri": REDIRECT_URI,
            "grant_type": "refresh_token"
        });

        let response = http::send(SERVICE, &url, self.post(&url).json(&payload)).await?;
        let credential = http::read_json(SERVICE, &url, response).await?;
        info!("Refreshed Trakt access token");
        Ok(credential)
    }
}
