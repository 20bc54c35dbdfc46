use super::ui::DeviceCodePrompt;
use crate::output::Output;
use color_eyre::eyre::Context;
use color_eyre::Result;
use reclaim_config::{Settings, TokenStore};
use reclaim_core::{acquire_credential, refresh_stored_credential, AuthMode};
use reclaim_sources::TraktClient;
use std::path::Path;

pub async fn run_auth(config_file: Option<&Path>, reset: bool, refresh: bool, output: &Output) -> Result<()> {
    let settings = Settings::load(config_file).wrap_err("Failed to load configuration")?;
    let trakt = TraktClient::with_base_url(
        settings.trakt.api_url.as_str(),
        settings.trakt.client_id.clone(),
        settings.trakt.client_secret.clone(),
    );
    let store = TokenStore::new(settings.paths().token_file());

    if refresh {
        let credential = refresh_stored_credential(&store, &trakt)
            .await
            .wrap_err("Failed to refresh Trakt token")?;
        output.success(format!(
            "Trakt token refreshed and saved to {}",
            store.path().display()
        ));
        if let Some(expires_at) = credential.expires_at() {
            output.info(format!("Valid until {}", expires_at.to_rfc3339()));
        }
        return Ok(());
    }

    if reset
        && store
            .clear()
            .wrap_err("Failed to remove cached Trakt token")?
    {
        output.info(format!("Removed cached token {}", store.path().display()));
    }

    if store.load().wrap_err("Failed to read cached Trakt token")?.is_some() {
        output.success(format!(
            "Already authorized; token cached at {}. Use --reset to authorize again.",
            store.path().display()
        ));
        return Ok(());
    }

    let prompt = DeviceCodePrompt::new(output);
    acquire_credential(&store, &trakt, &prompt, AuthMode::Interactive)
        .await
        .wrap_err("Trakt authorization failed")?;

    report_saved_token(&store, output)
}

/// Reads the token back after authorization. A token that is present but
/// unreadable is an error, not a failed save.
fn report_saved_token(store: &TokenStore, output: &Output) -> Result<()> {
    let saved = store
        .load()
        .wrap_err_with(|| format!("Trakt token at {} cannot be read back", store.path().display()))?;
    match saved {
        Some(_) => output.success(format!("Trakt token saved to {}", store.path().display())),
        None => output.warn("Authorized, but the token could not be saved; see the log for details"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use reclaim_models::Credential;

    fn quiet() -> Output {
        Output::new(OutputFormat::Human, true)
    }

    #[test]
    fn test_report_saved_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));

        // Nothing saved yet is only a warning
        assert!(report_saved_token(&store, &quiet()).is_ok());

        store
            .save(&Credential {
                access_token: "access".to_string(),
                token_type: "bearer".to_string(),
                expires_in: 7_776_000,
                refresh_token: "refresh".to_string(),
                scope: "public".to_string(),
                created_at: 1_700_000_000,
            })
            .unwrap();
        assert!(report_saved_token(&store, &quiet()).is_ok());
    }

    #[test]
    fn test_report_saved_token_surfaces_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "not json").unwrap();

        let err = report_saved_token(&TokenStore::new(path), &quiet()).unwrap_err();
        assert!(err.to_string().contains("cannot be read back"));
    }
}
