//! Configuration management.

mod settings;
mod xdg;

pub use settings::{GoogleOAuthSettings, Settings, SettingsError};
pub use xdg::XdgDirs;
