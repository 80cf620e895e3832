use std::collections::HashMap;
use std::fmt;
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};
use std::thread::JoinHandle;
use std::time::SystemTime;

use tracing::{
    Level, Subscriber,
    field::{Field, Visit},
};
use tracing_subscriber::Layer;

use crate::agentic::models::error_store::{ErrorEntry, ErrorLevel, ErrorStore};

const CHANNEL_CAPACITY: usize = 1000;

/// Visitor to extract fields from tracing events
struct FieldVisitor {
    message: Option<String>,
    fields: HashMap<String, String>,
}

impl FieldVisitor {
    fn new() -> Self {
        Self {
            message: None,
            fields: HashMap::new(),
        }
    }

    fn record(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record(field, format!("{:?}", value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record(field, value.to_string());
    }
}

/// Tracing layer that forwards WARN and ERROR events for the `/errors` view.
pub struct ErrorCollectorLayer {
    sender: SyncSender<ErrorEntry>,
}

impl ErrorCollectorLayer {
    pub fn new() -> (Self, Receiver<ErrorEntry>) {
        Self::with_capacity(CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> (Self, Receiver<ErrorEntry>) {
        let (tx, rx) = sync_channel(capacity);
        (Self { sender: tx }, rx)
    }

    /// Move collected entries into `store` on a background thread. The thread
    /// exits once every layer holding the sender is dropped.
    pub fn drain_into(receiver: Receiver<ErrorEntry>, store: ErrorStore) -> JoinHandle<()> {
        std::thread::spawn(move || {
            for entry in receiver {
                store.add_entry(entry);
            }
        })
    }
}

impl<S> Layer<S> for ErrorCollectorLayer
where
    S: Subscriber,
{
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let metadata = event.metadata();

        // Only capture WARN and ERROR levels
        let level = match *metadata.level() {
            Level::ERROR => ErrorLevel::Error,
            Level::WARN => ErrorLevel::Warning,
            _ => return,
        };

        let mut visitor = FieldVisitor::new();
        event.record(&mut visitor);

        let entry = ErrorEntry {
            timestamp: SystemTime::now(),
            level,
            message: visitor.message.unwrap_or_default(),
            target: metadata.target().to_string(),
            file: metadata.file().map(String::from),
            line: metadata.line(),
            fields: visitor.fields,
        };

        // Drop when full rather than block the logging thread
        let _ = self.sender.try_send(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    fn setup_collector() -> (impl tracing::Subscriber, Receiver<ErrorEntry>) {
        let (layer, rx) = ErrorCollectorLayer::new();
        let subscriber = tracing_subscriber::registry().with(layer);
        (subscriber, rx)
    }

    #[test]
    fn test_captures_error_and_warn_levels() {
        let (subscriber, rx) = setup_collector();
        tracing::subscriber::with_default(subscriber, || {
            tracing::error!("Failed to load conversation");
            tracing::warn!("Agent list unavailable");
        });

        let first = rx.try_recv().expect("error entry");
        assert_eq!(first.level, ErrorLevel::Error);
        assert!(first.message.contains("Failed to load conversation"));

        let second = rx.try_recv().expect("warning entry");
        assert_eq!(second.level, ErrorLevel::Warning);
    }

    #[test]
    fn test_ignores_lower_levels() {
        let (subscriber, rx) = setup_collector();
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("logged in");
            tracing::debug!("thinking advanced");
            tracing::trace!("tick");
        });

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_captures_target_and_fields() {
        let (subscriber, rx) = setup_collector();
        tracing::subscriber::with_default(subscriber, || {
            tracing::error!(target: "agentic_chat::session", conv_id = "c1", status = 500, "delete failed");
        });

        let entry = rx.try_recv().expect("entry");
        assert_eq!(entry.target, "agentic_chat::session");
        assert_eq!(entry.fields.get("conv_id").map(String::as_str), Some("c1"));
        assert!(entry.fields.contains_key("status"));
    }

    #[test]
    fn test_full_channel_drops_without_panic() {
        let (layer, rx) = ErrorCollectorLayer::with_capacity(2);
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            for i in 0..10 {
                tracing::error!("overflow event {}", i);
            }
        });

        assert_eq!(rx.try_iter().count(), 2);
    }

    #[test]
    fn test_drain_moves_entries_into_store() {
        let store = ErrorStore::new(10);
        let (layer, rx) = ErrorCollectorLayer::new();
        let _drain = ErrorCollectorLayer::drain_into(rx, store.clone());

        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::error!("login failed");
        });

        for _ in 0..100 {
            if store.error_count() == 1 {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert_eq!(store.error_count(), 1);
    }
}
