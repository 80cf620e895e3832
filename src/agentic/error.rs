use thiserror::Error;

use crate::agentic::models::{MAX_ATTACHMENTS, Notification};
use crate::agentic::repositories::BackendError;
use crate::settings::Timings;

/// Failures recovered at an operation boundary and shown as a toast.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("authentication rejected")]
    AuthFailure,

    #[error("authentication service unreachable: {0}")]
    TransportFailure(#[source] BackendError),

    #[error("failed to load conversation: {0}")]
    LoadFailure(#[source] BackendError),

    #[error("attachment limit reached: {admitted} admitted, {excluded} excluded")]
    CapacityExceeded { admitted: usize, excluded: usize },

    #[error("paste ignored, attachment limit reached")]
    PasteAtCapacity,

    #[error("failed to delete conversation: {0}")]
    DeleteFailure(#[source] BackendError),

    #[error("failed to save conversation: {0}")]
    CreateFailure(#[source] BackendError),
}

impl ChatError {
    /// Classify a failed authentication call
    pub fn from_login(error: BackendError) -> Self {
        if error.is_unauthorized() {
            ChatError::AuthFailure
        } else {
            ChatError::TransportFailure(error)
        }
    }

    pub fn to_notification(&self, timings: &Timings) -> Notification {
        match self {
            ChatError::AuthFailure => Notification::destructive(
                "Authentication failed",
                "Please check your credentials and try again.",
                timings.toast_short(),
            ),
            ChatError::TransportFailure(_) => Notification::destructive(
                "Login Failed",
                "Unable to connect to authentication service",
                timings.toast(),
            ),
            ChatError::LoadFailure(_) => Notification::destructive(
                "Failed to load conversation",
                "There was an error loading the conversation. Please try again.",
                timings.toast(),
            ),
            ChatError::CapacityExceeded { admitted: 0, .. } => Notification::destructive(
                "Maximum attachments reached",
                format!("You can only attach up to {MAX_ATTACHMENTS} files per message"),
                timings.toast(),
            ),
            ChatError::CapacityExceeded { admitted, excluded } => Notification::destructive(
                "Some files not added",
                format!(
                    "Only {admitted} files added. Maximum {MAX_ATTACHMENTS} files allowed per message ({excluded} files excluded)."
                ),
                timings.toast(),
            ),
            ChatError::PasteAtCapacity => Notification::destructive(
                "Maximum files reached",
                format!("You can only attach up to {MAX_ATTACHMENTS} files per message"),
                timings.toast(),
            ),
            ChatError::DeleteFailure(_) => Notification::destructive(
                "Failed to delete conversation",
                "There was an error deleting the conversation. Please try again.",
                timings.toast(),
            ),
            ChatError::CreateFailure(_) => Notification::destructive(
                "Failed to save conversation",
                "The conversation continues here but was not saved to your history.",
                timings.toast(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agentic::models::NotificationVariant;

    #[test]
    fn test_login_classification() {
        let rejected = BackendError::Status {
            operation: "authenticate",
            status: 401,
        };
        assert!(matches!(ChatError::from_login(rejected), ChatError::AuthFailure));

        let down = BackendError::Unavailable("connection refused".into());
        assert!(matches!(
            ChatError::from_login(down),
            ChatError::TransportFailure(_)
        ));

        let server = BackendError::Status {
            operation: "authenticate",
            status: 502,
        };
        assert!(matches!(
            ChatError::from_login(server),
            ChatError::TransportFailure(_)
        ));
    }

    #[test]
    fn test_capacity_toasts() {
        let timings = Timings::default();

        let full = ChatError::CapacityExceeded {
            admitted: 0,
            excluded: 2,
        }
        .to_notification(&timings);
        assert_eq!(full.title, "Maximum attachments reached");

        let partial = ChatError::CapacityExceeded {
            admitted: 5,
            excluded: 1,
        }
        .to_notification(&timings);
        assert_eq!(partial.title, "Some files not added");
        assert!(partial.description.contains("Only 5 files added"));
        assert!(partial.description.contains("(1 files excluded)"));
        assert_eq!(partial.variant, NotificationVariant::Destructive);
    }

    #[test]
    fn test_auth_failure_uses_short_toast() {
        let timings = Timings::default();
        let toast = ChatError::AuthFailure.to_notification(&timings);
        assert_eq!(toast.duration, timings.toast_short());
    }
}
