use std::path::{Path, PathBuf};

use tracing::debug;

use super::client_settings_repository::{BoxFuture, ClientSettingsRepository};
use crate::settings::models::{ClientSettings, SettingsError, SettingsResult};

pub struct ClientSettingsJsonRepository {
    file_path: PathBuf,
}

impl ClientSettingsJsonRepository {
    /// Create repository with XDG-compliant path
    pub fn new() -> SettingsResult<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| SettingsError::PathError("Cannot determine config directory".into()))?;

        let file_path = config_dir.join("agentic-chat").join("settings.json");
        Ok(Self { file_path })
    }

    /// Create repository with custom path (for testing)
    pub fn with_path(file_path: PathBuf) -> Self {
        Self { file_path }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }
}

impl ClientSettingsRepository for ClientSettingsJsonRepository {
    fn load(&self) -> BoxFuture<'static, SettingsResult<ClientSettings>> {
        let path = self.file_path.clone();

        Box::pin(async move {
            if !tokio::fs::try_exists(&path).await? {
                debug!(path = %path.display(), "No settings file, using defaults");
                return Ok(ClientSettings::default());
            }

            let contents = tokio::fs::read_to_string(&path).await?;
            let settings: ClientSettings = serde_json::from_str(&contents)?;
            Ok(settings)
        })
    }

    fn save(&self, settings: ClientSettings) -> BoxFuture<'static, SettingsResult<()>> {
        let path = self.file_path.clone();

        Box::pin(async move {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }

            let json = serde_json::to_string_pretty(&settings)?;

            // Write atomically using temp file + rename
            let temp_path = path.with_extension("json.tmp");
            tokio::fs::write(&temp_path, json).await?;
            tokio::fs::rename(&temp_path, &path).await?;

            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let repo = ClientSettingsJsonRepository::with_path(dir.path().join("settings.json"));

        let settings = repo.load().await.unwrap();
        assert_eq!(settings, ClientSettings::default());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let repo = ClientSettingsJsonRepository::with_path(path.clone());

        let mut settings = ClientSettings::default();
        settings.backend_url = "https://chat.example.com".to_string();
        settings.persist_new_conversations = true;
        repo.save(settings.clone()).await.unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(repo.load().await.unwrap(), settings);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();

        let repo = ClientSettingsJsonRepository::with_path(path);
        let err = repo.load().await.unwrap_err();
        assert!(matches!(err, SettingsError::SerializationError(_)));
    }
}
