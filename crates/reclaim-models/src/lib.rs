pub mod credential;
pub mod library;
pub mod watch_event;
pub mod window;

pub use credential::Credential;
pub use library::{EpisodeRecord, SeriesRecord};
pub use watch_event::WatchEvent;
pub use window::{HistoryWindow, WindowError};
