pub mod error;
mod http;
pub mod sonarr;
pub mod traits;
pub mod trakt;

pub use error::{AuthorizationError, SourceError};
pub use sonarr::SonarrClient;
pub use traits::{CredentialIssuer, DeleteOutcome, LibraryManager, WatchEventStream, WatchHistorySource};
pub use trakt::{DeviceCode, DevicePrompt, SilentPrompt, TraktClient};
