use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;

use super::backend_repository::{BackendRepository, BoxFuture};
use super::error::{BackendError, BackendResult};
use crate::agentic::models::agent::builtin_agents;
use crate::agentic::models::conversation::{MessageOut, UNKNOWN_AGENT_NAME};
use crate::agentic::models::{
    Agent, AgentPublic, AttachmentRecord, AuthRequest, AuthResponse, ConversationDetail,
    ConversationSummary, CreateConversationRequest,
};

/// Backend operations, used to inject failures and count calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Authenticate,
    ListAgents,
    ListConversations,
    GetConversation,
    CreateConversation,
    DeleteConversation,
}

/// How an injected failure surfaces to the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InjectedFailure {
    Transport,
    Status(u16),
}

impl InjectedFailure {
    fn to_error(self, operation: Operation) -> BackendError {
        match self {
            InjectedFailure::Transport => {
                BackendError::Unavailable(format!("{operation:?}: connection refused"))
            }
            InjectedFailure::Status(status) => BackendError::Status {
                operation: operation.label(),
                status,
            },
        }
    }
}

impl Operation {
    fn label(self) -> &'static str {
        match self {
            Operation::Authenticate => "authenticate",
            Operation::ListAgents => "list agents",
            Operation::ListConversations => "list conversations",
            Operation::GetConversation => "get conversation",
            Operation::CreateConversation => "create conversation",
            Operation::DeleteConversation => "delete conversation",
        }
    }
}

#[derive(Default)]
struct BackendState {
    /// username -> (password, user id)
    users: HashMap<String, (String, String)>,
    agents: Vec<Agent>,
    /// user id -> conversations
    conversations: HashMap<String, Vec<ConversationDetail>>,
    failures: HashMap<Operation, InjectedFailure>,
    delays: HashMap<Operation, Duration>,
    calls: HashMap<Operation, usize>,
}

/// In-memory backend
/// Useful for testing and development
#[derive(Clone, Default)]
pub struct InMemoryBackendRepository {
    state: Arc<Mutex<BackendState>>,
}

impl InMemoryBackendRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend seeded with the built-in agents and a `demo`/`demo` account
    pub fn demo() -> Self {
        let repo = Self::new();
        repo.add_user("demo", "demo", "user-demo");
        repo.set_agents(builtin_agents());
        repo
    }

    pub fn add_user(&self, username: &str, password: &str, user_id: &str) {
        self.state.lock().users.insert(
            username.to_string(),
            (password.to_string(), user_id.to_string()),
        );
    }

    pub fn set_agents(&self, agents: Vec<Agent>) {
        self.state.lock().agents = agents;
    }

    pub fn insert_conversation(&self, user_id: &str, detail: ConversationDetail) {
        let mut state = self.state.lock();
        let conversations = state.conversations.entry(user_id.to_string()).or_default();
        conversations.retain(|c| c.id != detail.id);
        conversations.push(detail);
    }

    pub fn conversation_ids(&self, user_id: &str) -> Vec<String> {
        self.state
            .lock()
            .conversations
            .get(user_id)
            .map(|list| list.iter().map(|c| c.id.clone()).collect())
            .unwrap_or_default()
    }

    /// Make every following call of `operation` fail until cleared
    pub fn fail(&self, operation: Operation, failure: InjectedFailure) {
        self.state.lock().failures.insert(operation, failure);
    }

    pub fn clear_failure(&self, operation: Operation) {
        self.state.lock().failures.remove(&operation);
    }

    /// Delay responses of `operation`, e.g. to race a slow detail load
    pub fn set_delay(&self, operation: Operation, delay: Duration) {
        self.state.lock().delays.insert(operation, delay);
    }

    pub fn call_count(&self, operation: Operation) -> usize {
        self.state.lock().calls.get(&operation).copied().unwrap_or(0)
    }

    /// Count the call and look up the injected behavior
    fn begin(&self, operation: Operation) -> (Option<Duration>, Option<InjectedFailure>) {
        let mut state = self.state.lock();
        *state.calls.entry(operation).or_insert(0) += 1;
        (
            state.delays.get(&operation).copied(),
            state.failures.get(&operation).copied(),
        )
    }

    /// Run `respond` after the configured delay unless a failure is injected.
    fn respond<T, F>(&self, operation: Operation, respond: F) -> BoxFuture<'static, BackendResult<T>>
    where
        T: Send + 'static,
        F: FnOnce(&mut BackendState) -> BackendResult<T> + Send + 'static,
    {
        let (delay, failure) = self.begin(operation);
        let state = self.state.clone();

        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(failure) = failure {
                return Err(failure.to_error(operation));
            }
            let mut state = state.lock();
            respond(&mut *state)
        })
    }
}

fn summarize(detail: &ConversationDetail) -> ConversationSummary {
    ConversationSummary {
        id: detail.id.clone(),
        agent_id: detail.agent_id.clone(),
        agent_name: detail.agent_name.clone(),
        title: detail.title.clone(),
        is_private: detail.is_private,
        last_message: detail.messages.last().and_then(|m| m.content.clone()),
        created_at: detail.created_at,
        updated_at: detail.updated_at,
    }
}

impl BackendRepository for InMemoryBackendRepository {
    fn authenticate(&self, request: AuthRequest) -> BoxFuture<'static, BackendResult<AuthResponse>> {
        self.respond(Operation::Authenticate, move |state| {
            let user_id = state
                .users
                .get(&request.username)
                .filter(|(password, _)| *password == request.password)
                .map(|(_, user_id)| user_id.clone());
            Ok(AuthResponse {
                authenticated: user_id.is_some(),
                user_id,
            })
        })
    }

    fn list_agents(&self) -> BoxFuture<'static, BackendResult<Vec<AgentPublic>>> {
        self.respond(Operation::ListAgents, |state| {
            Ok(state.agents.iter().map(Agent::to_public).collect())
        })
    }

    fn list_conversations(
        &self,
        user_id: &str,
    ) -> BoxFuture<'static, BackendResult<Vec<ConversationSummary>>> {
        let user_id = user_id.to_string();
        self.respond(Operation::ListConversations, move |state| {
            let mut summaries: Vec<ConversationSummary> = state
                .conversations
                .get(&user_id)
                .map(|list| list.iter().map(summarize).collect())
                .unwrap_or_default();
            summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            Ok(summaries)
        })
    }

    fn get_conversation(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> BoxFuture<'static, BackendResult<ConversationDetail>> {
        let user_id = user_id.to_string();
        let conversation_id = conversation_id.to_string();
        self.respond(Operation::GetConversation, move |state| {
            state
                .conversations
                .get(&user_id)
                .and_then(|list| list.iter().find(|c| c.id == conversation_id))
                .cloned()
                .ok_or(BackendError::NotFound(conversation_id))
        })
    }

    fn create_conversation(
        &self,
        user_id: &str,
        request: CreateConversationRequest,
    ) -> BoxFuture<'static, BackendResult<ConversationDetail>> {
        let user_id = user_id.to_string();
        self.respond(Operation::CreateConversation, move |state| {
            let now = Utc::now();
            let agent_name = state
                .agents
                .iter()
                .find(|a| a.id == request.agent_id)
                .map(|a| a.name.clone())
                .unwrap_or_else(|| UNKNOWN_AGENT_NAME.to_string());

            let attachments = request
                .message
                .attachments
                .iter()
                .enumerate()
                .map(|(i, upload)| AttachmentRecord {
                    id: format!("{}-att-{i}", request.id),
                    name: upload.name.clone(),
                    mime: upload.mime.clone(),
                    size: Some(upload.size),
                    timestamp: Some(now),
                    blob_id: None,
                    data: None,
                })
                .collect();

            let detail = ConversationDetail {
                id: request.id.clone(),
                agent_id: request.agent_id.clone(),
                agent_name: Some(agent_name),
                title: None,
                is_private: request.is_private,
                created_at: now,
                updated_at: now,
                messages: vec![MessageOut {
                    id: format!("{}-m0", request.id),
                    content: Some(request.message.content.clone()),
                    sender: "user".to_string(),
                    kind: request.message.kind.as_str().to_string(),
                    timestamp: Some(now),
                    created_at: None,
                    attachments,
                    thinking: None,
                    thinking_time: None,
                    error: None,
                    error_message: None,
                }],
            };

            let conversations = state.conversations.entry(user_id).or_default();
            conversations.retain(|c| c.id != detail.id);
            conversations.push(detail.clone());
            Ok(detail)
        })
    }

    fn delete_conversation(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> BoxFuture<'static, BackendResult<()>> {
        let user_id = user_id.to_string();
        let conversation_id = conversation_id.to_string();
        self.respond(Operation::DeleteConversation, move |state| {
            let list = state.conversations.entry(user_id).or_default();
            let before = list.len();
            list.retain(|c| c.id != conversation_id);
            if list.len() == before {
                return Err(BackendError::NotFound(conversation_id));
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn detail(id: &str, updated_secs: i64) -> ConversationDetail {
        let at = Utc.timestamp_opt(updated_secs, 0).unwrap();
        ConversationDetail {
            id: id.to_string(),
            agent_id: "retail".to_string(),
            agent_name: Some("Retail Agent".to_string()),
            title: None,
            is_private: false,
            created_at: at,
            updated_at: at,
            messages: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_authenticate_checks_password() {
        let repo = InMemoryBackendRepository::demo();

        let ok = repo
            .authenticate(AuthRequest {
                username: "demo".into(),
                password: "demo".into(),
            })
            .await
            .unwrap();
        assert_eq!(ok.accepted_user().as_deref(), Some("user-demo"));

        let denied = repo
            .authenticate(AuthRequest {
                username: "demo".into(),
                password: "wrong".into(),
            })
            .await
            .unwrap();
        assert!(!denied.authenticated);
    }

    #[tokio::test]
    async fn test_summaries_sorted_newest_first() {
        let repo = InMemoryBackendRepository::demo();
        repo.insert_conversation("user-demo", detail("old", 1_000));
        repo.insert_conversation("user-demo", detail("new", 2_000));

        let summaries = repo.list_conversations("user-demo").await.unwrap();
        let ids: Vec<&str> = summaries.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn test_injected_failure_and_call_count() {
        let repo = InMemoryBackendRepository::demo();
        repo.fail(Operation::ListAgents, InjectedFailure::Status(503));

        let err = repo.list_agents().await.unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert_eq!(repo.call_count(Operation::ListAgents), 1);

        repo.clear_failure(Operation::ListAgents);
        assert_eq!(repo.list_agents().await.unwrap().len(), 5);
        assert_eq!(repo.call_count(Operation::ListAgents), 2);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let repo = InMemoryBackendRepository::demo();
        repo.insert_conversation("user-demo", detail("c1", 1_000));

        repo.delete_conversation("user-demo", "c1").await.unwrap();
        assert!(repo.conversation_ids("user-demo").is_empty());

        let err = repo.delete_conversation("user-demo", "c1").await.unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_applies_before_response() {
        let repo = InMemoryBackendRepository::demo();
        repo.insert_conversation("user-demo", detail("c1", 1_000));
        repo.set_delay(Operation::GetConversation, Duration::from_secs(5));

        let start = tokio::time::Instant::now();
        let loaded = repo.get_conversation("user-demo", "c1").await.unwrap();
        assert_eq!(loaded.id, "c1");
        assert!(start.elapsed() >= Duration::from_secs(5));
    }
}
