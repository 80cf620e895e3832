use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Delays of the client's staged transitions, in milliseconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Between a successful authentication and the session opening
    pub login_settle_ms: u64,
    /// Between send and the user message being committed
    pub compose_delay_ms: u64,
    pub thinking_tick_ms: u64,
    pub thinking_finalize_ms: u64,
    pub clear_fade_ms: u64,
    pub clear_restore_ms: u64,
    pub agent_switch_ms: u64,
    pub agent_switch_settle_ms: u64,
    pub select_fade_ms: u64,
    pub select_apply_ms: u64,
    pub toast_ms: u64,
    pub toast_short_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            login_settle_ms: 600,
            compose_delay_ms: 100,
            thinking_tick_ms: 2000,
            thinking_finalize_ms: 1000,
            clear_fade_ms: 200,
            clear_restore_ms: 150,
            agent_switch_ms: 300,
            agent_switch_settle_ms: 200,
            select_fade_ms: 300,
            select_apply_ms: 100,
            toast_ms: 3000,
            toast_short_ms: 2000,
        }
    }
}

impl Timings {
    /// All delays zero, for driving the controller without waiting
    pub fn immediate() -> Self {
        Self {
            login_settle_ms: 0,
            compose_delay_ms: 0,
            thinking_tick_ms: 0,
            thinking_finalize_ms: 0,
            clear_fade_ms: 0,
            clear_restore_ms: 0,
            agent_switch_ms: 0,
            agent_switch_settle_ms: 0,
            select_fade_ms: 0,
            select_apply_ms: 0,
            ..Self::default()
        }
    }

    pub fn login_settle(&self) -> Duration {
        Duration::from_millis(self.login_settle_ms)
    }

    pub fn compose_delay(&self) -> Duration {
        Duration::from_millis(self.compose_delay_ms)
    }

    pub fn thinking_tick(&self) -> Duration {
        // A zero period would make the tick interval panic
        Duration::from_millis(self.thinking_tick_ms.max(1))
    }

    pub fn thinking_finalize(&self) -> Duration {
        Duration::from_millis(self.thinking_finalize_ms)
    }

    pub fn clear_fade(&self) -> Duration {
        Duration::from_millis(self.clear_fade_ms)
    }

    pub fn clear_restore(&self) -> Duration {
        Duration::from_millis(self.clear_restore_ms)
    }

    pub fn agent_switch(&self) -> Duration {
        Duration::from_millis(self.agent_switch_ms)
    }

    pub fn agent_switch_settle(&self) -> Duration {
        Duration::from_millis(self.agent_switch_settle_ms)
    }

    pub fn select_fade(&self) -> Duration {
        Duration::from_millis(self.select_fade_ms)
    }

    pub fn select_apply(&self) -> Duration {
        Duration::from_millis(self.select_apply_ms)
    }

    pub fn toast(&self) -> Duration {
        Duration::from_millis(self.toast_ms)
    }

    pub fn toast_short(&self) -> Duration {
        Duration::from_millis(self.toast_short_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub backend_url: String,
    pub request_timeout_secs: u64,
    /// POST the first message of a new chat to the backend
    pub persist_new_conversations: bool,
    pub timings: Timings,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            request_timeout_secs: 30,
            persist_new_conversations: false,
            timings: Timings::default(),
        }
    }
}

impl ClientSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings: ClientSettings = serde_json::from_str(
            r#"{"backend_url":"http://chat.internal:9000","timings":{"thinking_tick_ms":500}}"#,
        )
        .unwrap();

        assert_eq!(settings.backend_url, "http://chat.internal:9000");
        assert_eq!(settings.request_timeout_secs, 30);
        assert!(!settings.persist_new_conversations);
        assert_eq!(settings.timings.thinking_tick_ms, 500);
        assert_eq!(settings.timings.thinking_finalize_ms, 1000);
    }

    #[test]
    fn test_default_timings() {
        let timings = Timings::default();
        assert_eq!(timings.thinking_tick(), Duration::from_secs(2));
        assert_eq!(timings.login_settle(), Duration::from_millis(600));
        assert_eq!(timings.toast_short(), Duration::from_secs(2));
    }

    #[test]
    fn test_zero_tick_is_clamped() {
        let timings = Timings::immediate();
        assert_eq!(timings.thinking_tick(), Duration::from_millis(1));
        assert_eq!(timings.clear_fade(), Duration::ZERO);
    }
}
