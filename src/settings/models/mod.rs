pub mod client_settings;
pub mod settings_error;

pub use client_settings::{ClientSettings, Timings};
pub use settings_error::{SettingsError, SettingsResult};
