pub mod client_settings_json_repository;
pub mod client_settings_repository;

pub use client_settings_json_repository::ClientSettingsJsonRepository;
pub use client_settings_repository::ClientSettingsRepository;
