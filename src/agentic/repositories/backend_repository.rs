use std::future::Future;
use std::pin::Pin;

use super::error::BackendResult;
use crate::agentic::models::{
    AgentPublic, AuthRequest, AuthResponse, ConversationDetail, ConversationSummary,
    CreateConversationRequest,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Contract with the chat backend.
///
/// Futures own their inputs so callers can drop locks before awaiting.
pub trait BackendRepository: Send + Sync + 'static {
    fn authenticate(&self, request: AuthRequest) -> BoxFuture<'static, BackendResult<AuthResponse>>;

    /// Agents available to every user, in registry order
    fn list_agents(&self) -> BoxFuture<'static, BackendResult<Vec<AgentPublic>>>;

    /// Summaries ordered by `updated_at`, newest first
    fn list_conversations(
        &self,
        user_id: &str,
    ) -> BoxFuture<'static, BackendResult<Vec<ConversationSummary>>>;

    fn get_conversation(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> BoxFuture<'static, BackendResult<ConversationDetail>>;

    fn create_conversation(
        &self,
        user_id: &str,
        request: CreateConversationRequest,
    ) -> BoxFuture<'static, BackendResult<ConversationDetail>>;

    fn delete_conversation(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> BoxFuture<'static, BackendResult<()>>;
}
