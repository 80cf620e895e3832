pub mod models;
pub mod repositories;

pub use models::{ClientSettings, SettingsError, Timings};
pub use repositories::{ClientSettingsJsonRepository, ClientSettingsRepository};
