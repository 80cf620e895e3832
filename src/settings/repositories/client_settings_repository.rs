use std::future::Future;
use std::pin::Pin;

use crate::settings::models::{ClientSettings, SettingsResult};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait ClientSettingsRepository: Send + Sync + 'static {
    /// Load settings, falling back to defaults when nothing is stored yet
    fn load(&self) -> BoxFuture<'static, SettingsResult<ClientSettings>>;

    fn save(&self, settings: ClientSettings) -> BoxFuture<'static, SettingsResult<()>>;
}
