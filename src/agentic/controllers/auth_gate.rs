use tracing::{debug, error, info, warn};

use super::session_controller::{SessionController, SessionEvent};
use crate::agentic::error::ChatError;
use crate::agentic::models::{Agent, AuthRequest, AuthResponse, Conversation, Session};

impl SessionController {
    pub fn set_login_input(&self, username: impl Into<String>, password: impl Into<String>) {
        let mut state = self.inner.state.lock();
        state.login_username = username.into();
        state.login_password = password.into();
    }

    /// Authenticate with the stored credentials and load the user's agents
    /// and history.
    ///
    /// Blank credentials are ignored without a backend call. A rejection or a
    /// failed call leaves the session logged out and raises a toast.
    pub async fn login(&self) -> bool {
        let inner = &self.inner;
        let request = {
            let state = inner.state.lock();
            if state.session.logged_in {
                return true;
            }
            let username = state.login_username.trim();
            let password = state.login_password.trim();
            if username.is_empty() || password.is_empty() {
                debug!("Login ignored, missing credentials");
                return false;
            }
            AuthRequest {
                username: username.to_string(),
                password: password.to_string(),
            }
        };

        info!(username = %request.username, "Authenticating");
        let response = inner
            .backend
            .authenticate(request)
            .await
            .map(AuthResponse::accepted_user);

        let user_id = match response {
            Ok(Some(user_id)) => user_id,
            Ok(None) => {
                warn!("Authentication rejected");
                let mut state = inner.state.lock();
                inner.report(&mut state, &ChatError::AuthFailure);
                return false;
            }
            Err(e) => {
                error!(error = ?e, "Authentication request failed");
                let failure = ChatError::from_login(e);
                let mut state = inner.state.lock();
                inner.report(&mut state, &failure);
                return false;
            }
        };

        tokio::time::sleep(inner.timings().login_settle()).await;
        {
            let mut state = inner.state.lock();
            state.session = Session::logged_in(user_id.clone());
            state.session_generation += 1;
            state.login_password.clear();
            info!(user_id = %user_id, "Logged in");
            inner.emit(SessionEvent::LoggedIn {
                user_id: user_id.clone(),
            });
        }

        self.load_session_data(&user_id).await;
        true
    }

    /// Re-fetch agents and history for the logged-in user.
    pub async fn reload(&self) -> bool {
        let Some(user_id) = self.user_id().filter(|_| self.is_logged_in()) else {
            return false;
        };
        self.load_session_data(&user_id).await;
        true
    }

    /// Both lists load concurrently; each degrades to empty on its own.
    async fn load_session_data(&self, user_id: &str) {
        let inner = &self.inner;
        let (agents, conversations) = futures::join!(
            inner.backend.list_agents(),
            inner.backend.list_conversations(user_id)
        );

        let mut state = inner.state.lock();
        if state.session.active_user() != Some(user_id) {
            debug!(user_id, "Session ended before its data arrived");
            return;
        }

        match agents {
            Ok(agents) => {
                state.agents = agents.into_iter().map(Agent::from).collect();
                info!(count = state.agents.len(), "Agents loaded");
                inner.emit(SessionEvent::AgentsLoaded {
                    count: state.agents.len(),
                });
            }
            Err(e) => warn!(error = ?e, "Failed to load agents"),
        }
        if let Some(agent_id) = state.ensure_selected_agent() {
            inner.emit(SessionEvent::AgentSelected { agent_id });
        }

        match conversations {
            Ok(conversations) => {
                state
                    .conversations
                    .replace_all(conversations.into_iter().map(Conversation::from).collect());
                info!(count = state.conversations.len(), "Conversations loaded");
                inner.emit(SessionEvent::ConversationsChanged {
                    count: state.conversations.len(),
                });
            }
            Err(e) => warn!(error = ?e, "Failed to load conversations"),
        }
    }

    /// Drop the session and everything loaded for it.
    pub fn logout(&self) {
        let inner = &self.inner;
        let mut state = inner.state.lock();
        if !state.session.logged_in {
            return;
        }

        state.epoch += 1;
        state.session_generation += 1;
        inner.reset_conversation(&mut state);
        state.session = Session::default();
        state.login_username.clear();
        state.login_password.clear();
        state.agents.clear();
        state.selected_agent_id = None;
        state.conversations.clear();
        state.is_clearing = false;
        state.loading_conversation_id = None;

        info!("Logged out");
        inner.emit(SessionEvent::LoggedOut);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;

    use super::super::session_controller::tests::{controller_for, logged_in, settle};
    use super::*;
    use crate::agentic::models::ConversationDetail;
    use crate::agentic::repositories::{InMemoryBackendRepository, InjectedFailure, Operation};
    use crate::settings::ClientSettings;

    fn saved(id: &str) -> ConversationDetail {
        ConversationDetail {
            id: id.to_string(),
            agent_id: "retail".to_string(),
            agent_name: Some("Retail Agent".to_string()),
            title: None,
            is_private: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            messages: Vec::new(),
        }
    }

    fn last_toast(controller: &SessionController) -> Option<String> {
        controller.notifications().last().map(|n| n.title.clone())
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_loads_agents_and_history() {
        let backend = InMemoryBackendRepository::demo();
        backend.insert_conversation("user-demo", saved("c1"));
        let controller = controller_for(&backend, ClientSettings::default());

        controller.set_login_input("  demo ", "demo");
        assert!(controller.login().await);

        assert!(controller.is_logged_in());
        assert_eq!(controller.user_id().as_deref(), Some("user-demo"));
        assert_eq!(controller.agents().len(), 5);
        assert_eq!(controller.selected_agent_id().as_deref(), Some("hr-policies"));
        assert_eq!(controller.conversations().len(), 1);
        assert_eq!(controller.inner.state.lock().login_password, "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_opens_after_settle_delay() {
        let backend = InMemoryBackendRepository::demo();
        let controller = controller_for(&backend, ClientSettings::default());
        controller.set_login_input("demo", "demo");

        let login = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.login().await })
        };
        settle(500).await;
        assert!(!controller.is_logged_in());

        assert!(login.await.unwrap());
        assert!(controller.is_logged_in());
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_credentials_skip_backend() {
        let backend = InMemoryBackendRepository::demo();
        let controller = controller_for(&backend, ClientSettings::default());

        controller.set_login_input("demo", "   ");
        assert!(!controller.login().await);
        controller.set_login_input("", "demo");
        assert!(!controller.login().await);

        assert_eq!(backend.call_count(Operation::Authenticate), 0);
        assert!(controller.notifications().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_password_is_rejected() {
        let backend = InMemoryBackendRepository::demo();
        let controller = controller_for(&backend, ClientSettings::default());

        controller.set_login_input("demo", "nope");
        assert!(!controller.login().await);
        assert!(!controller.is_logged_in());
        assert_eq!(last_toast(&controller).as_deref(), Some("Authentication failed"));
        assert_eq!(backend.call_count(Operation::ListAgents), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_failures_are_classified() {
        let cases = [
            (InjectedFailure::Status(401), "Authentication failed"),
            (InjectedFailure::Status(403), "Authentication failed"),
            (InjectedFailure::Status(500), "Login Failed"),
            (InjectedFailure::Transport, "Login Failed"),
        ];

        for (failure, title) in cases {
            let backend = InMemoryBackendRepository::demo();
            backend.fail(Operation::Authenticate, failure);
            let controller = controller_for(&backend, ClientSettings::default());

            controller.set_login_input("demo", "demo");
            assert!(!controller.login().await);
            assert!(!controller.is_logged_in());
            assert_eq!(last_toast(&controller).as_deref(), Some(title), "{failure:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_agent_list_degrades_to_empty() {
        let backend = InMemoryBackendRepository::demo();
        backend.insert_conversation("user-demo", saved("c1"));
        backend.fail(Operation::ListAgents, InjectedFailure::Status(503));
        let controller = controller_for(&backend, ClientSettings::default());

        controller.set_login_input("demo", "demo");
        assert!(controller.login().await);

        assert!(controller.is_logged_in());
        assert!(controller.agents().is_empty());
        assert!(controller.selected_agent_id().is_none());
        assert_eq!(controller.conversations().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_history_degrades_to_empty() {
        let backend = InMemoryBackendRepository::demo();
        backend.insert_conversation("user-demo", saved("c1"));
        backend.fail(Operation::ListConversations, InjectedFailure::Transport);
        let controller = controller_for(&backend, ClientSettings::default());

        controller.set_login_input("demo", "demo");
        assert!(controller.login().await);
        assert_eq!(controller.agents().len(), 5);
        assert!(controller.conversations().is_empty());

        backend.clear_failure(Operation::ListConversations);
        assert!(controller.reload().await);
        assert_eq!(controller.conversations().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_resets_session() {
        let backend = InMemoryBackendRepository::demo();
        let controller = logged_in(&backend, ClientSettings::default()).await;

        controller.toggle_private();
        controller.send_text("Hello");
        settle(3_000).await;
        controller.logout();

        assert!(!controller.is_logged_in());
        assert!(controller.user_id().is_none());
        assert!(controller.agents().is_empty());
        assert!(controller.conversations().is_empty());
        assert!(controller.messages().is_empty());
        assert!(controller.thinking().is_none());
        assert!(!controller.is_private_mode());

        settle(10_000).await;
        assert!(controller.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_during_agent_switch_keeps_selection_cleared() {
        let backend = InMemoryBackendRepository::demo();
        let controller = logged_in(&backend, ClientSettings::default()).await;

        let switch = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.switch_agent("retail").await })
        };
        settle(100).await;
        controller.logout();

        assert!(switch.await.unwrap());
        settle(1_000).await;
        assert!(!controller.is_logged_in());
        assert!(controller.selected_agent_id().is_none());
        assert!(!controller.is_agent_switching());

        // The next session starts from the first agent again
        controller.set_login_input("demo", "demo");
        assert!(controller.login().await);
        assert_eq!(controller.selected_agent_id().as_deref(), Some("hr-policies"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_during_load_discards_lists() {
        let backend = InMemoryBackendRepository::demo();
        backend.set_delay(Operation::ListConversations, Duration::from_secs(3));
        let controller = SessionController::new(Arc::new(backend.clone()), ClientSettings::default());
        controller.set_login_input("demo", "demo");

        let login = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.login().await })
        };
        settle(1_000).await;
        assert!(controller.is_logged_in());
        controller.logout();

        assert!(login.await.unwrap());
        assert!(controller.agents().is_empty());
        assert!(controller.conversations().is_empty());
    }
}
