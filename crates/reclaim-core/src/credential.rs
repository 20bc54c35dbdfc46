use chrono::Utc;
use reclaim_config::{TokenStore, TokenStoreError};
use reclaim_models::Credential;
use reclaim_sources::{CredentialIssuer, DevicePrompt, SourceError};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Start the device flow when no credential is cached
    Interactive,
    /// Fail instead of waiting for a human
    NonInteractive,
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error(transparent)]
    Store(#[from] TokenStoreError),
    #[error("device authorization failed")]
    Authorization(#[source] SourceError),
    #[error("token refresh failed")]
    Refresh(#[source] SourceError),
    #[error("no cached credential at {}; run `reclaim auth` first", path.display())]
    Missing { path: PathBuf },
}

/// Returns the cached credential, running the device flow first when there is
/// none and `mode` allows it.
pub async fn acquire_credential(
    store: &TokenStore,
    issuer: &dyn CredentialIssuer,
    prompt: &dyn DevicePrompt,
    mode: AuthMode,
) -> Result<Credential, CredentialError> {
    if let Some(credential) = store.load()? {
        match credential.expires_at() {
            Some(expires_at) if credential.is_expired(Utc::now()) => warn!(
                %expires_at,
                "Cached Trakt token has expired; run `reclaim auth --refresh` or `reclaim auth` if requests are rejected"
            ),
            Some(expires_at) => info!(%expires_at, "Using cached Trakt token"),
            None => warn!("Cached Trakt token has no usable expiry"),
        }
        return Ok(credential);
    }

    if mode == AuthMode::NonInteractive {
        return Err(CredentialError::Missing {
            path: store.path().to_path_buf(),
        });
    }

    info!(path = %store.path().display(), "No cached Trakt token, starting device authorization");
    authorize_and_store(store, issuer, prompt).await
}

/// Runs the device flow unconditionally and persists the result. A failed
/// save is logged and the credential is still returned.
pub async fn authorize_and_store(
    store: &TokenStore,
    issuer: &dyn CredentialIssuer,
    prompt: &dyn DevicePrompt,
) -> Result<Credential, CredentialError> {
    let credential = issuer
        .authorize(prompt)
        .await
        .map_err(CredentialError::Authorization)?;
    persist(store, &credential);
    Ok(credential)
}

/// Exchanges the cached refresh token for a new credential and saves it.
pub async fn refresh_stored_credential(
    store: &TokenStore,
    issuer: &dyn CredentialIssuer,
) -> Result<Credential, CredentialError> {
    let current = store.load()?.ok_or_else(|| CredentialError::Missing {
        path: store.path().to_path_buf(),
    })?;
    let credential = issuer
        .refresh(&current.refresh_token)
        .await
        .map_err(CredentialError::Refresh)?;
    store.save(&credential)?;
    Ok(credential)
}

fn persist(store: &TokenStore, credential: &Credential) {
    match store.save(credential) {
        Ok(()) => info!(path = %store.path().display(), "Saved Trakt token"),
        Err(e) => error!(
            operation = "save_token",
            error = %e,
            "Failed to save Trakt token; authorization will be required again next run"
        ),
    }
}
