pub mod api;
pub mod auth;
pub mod client;

pub use auth::{DeviceCode, DevicePrompt, SilentPrompt};
pub use client::TraktClient;
