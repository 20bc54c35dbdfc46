pub mod config;
pub mod error;
pub mod paths;
pub mod token_store;

pub use config::{FileConfig, Settings, SonarrSettings, TraktSettings, DEFAULT_TRAKT_API_URL, DEFAULT_WINDOW_DAYS};
pub use error::{ConfigError, TokenStoreError};
pub use paths::PathManager;
pub use token_store::TokenStore;
