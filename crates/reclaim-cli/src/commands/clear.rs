use crate::output::Output;
use color_eyre::eyre::Context;
use color_eyre::Result;
use reclaim_config::{Settings, TokenStore};
use std::path::Path;

pub fn run_clear(config_file: Option<&Path>, output: &Output) -> Result<()> {
    let paths = Settings::load_paths(config_file).wrap_err("Failed to load configuration")?;
    let store = TokenStore::new(paths.token_file());

    let removed = store
        .clear()
        .wrap_err_with(|| format!("Failed to remove {}", store.path().display()))?;
    if removed {
        output.success(format!("Cleared Trakt token: {}", store.path().display()));
    } else {
        output.info("No cached Trakt token found to clear");
    }
    Ok(())
}
