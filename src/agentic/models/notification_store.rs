use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NotificationVariant {
    #[default]
    Default,
    Destructive,
}

/// Transient, auto-dismissing toast.
#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub variant: NotificationVariant,
    pub duration: Duration,
    pub raised_at: Option<Instant>,
}

impl Notification {
    pub fn info(title: impl Into<String>, description: impl Into<String>, duration: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            variant: NotificationVariant::Default,
            duration,
            raised_at: None,
        }
    }

    pub fn destructive(
        title: impl Into<String>,
        description: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            variant: NotificationVariant::Destructive,
            ..Self::info(title, description, duration)
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        match self.raised_at {
            Some(raised_at) => now.saturating_duration_since(raised_at) >= self.duration,
            None => false,
        }
    }
}

/// Toasts currently on screen, oldest first.
pub struct NotificationStore {
    entries: VecDeque<Notification>,
    max_entries: usize,
}

impl NotificationStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries,
        }
    }

    /// Show a toast. The oldest one is evicted once the store is full.
    pub fn push(&mut self, mut notification: Notification, now: Instant) -> Notification {
        notification.raised_at = Some(now);
        self.entries.push_back(notification.clone());
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
        notification
    }

    /// Toasts whose display time has not run out
    pub fn active(&self, now: Instant) -> Vec<Notification> {
        self.entries
            .iter()
            .filter(|n| !n.is_expired(now))
            .cloned()
            .collect()
    }

    /// Drop expired toasts, returning how many were removed
    pub fn prune(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|n| !n.is_expired(now));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_toasts_expire_after_their_duration() {
        let mut store = NotificationStore::default();
        let now = Instant::now();
        store.push(
            Notification::info("Files attached", "2 file(s) attached", Duration::from_secs(2)),
            now,
        );
        store.push(
            Notification::destructive("Login Failed", "unreachable", Duration::from_secs(3)),
            now,
        );

        assert_eq!(store.active(now).len(), 2);
        assert_eq!(store.active(now + Duration::from_secs(2)).len(), 1);
        assert_eq!(store.prune(now + Duration::from_secs(3)), 2);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_oldest_evicted_when_full() {
        let mut store = NotificationStore::new(2);
        let now = Instant::now();
        for title in ["one", "two", "three"] {
            store.push(Notification::info(title, "", Duration::from_secs(3)), now);
        }

        let titles: Vec<String> = store.active(now).into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["two", "three"]);
    }
}
