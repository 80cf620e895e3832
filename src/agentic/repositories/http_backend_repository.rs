use std::time::Duration;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::backend_repository::{BackendRepository, BoxFuture};
use super::error::{BackendError, BackendResult};
use crate::agentic::models::{
    AgentPublic, AuthRequest, AuthResponse, ConversationDetail, ConversationSummary,
    CreateConversationRequest,
};

/// Characters escaped in user and conversation ids placed in a path
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Backend reached over HTTP/JSON.
#[derive(Clone)]
pub struct HttpBackendRepository {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackendRepository {
    pub fn new(base_url: &str, timeout: Duration) -> BackendResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(BackendError::InvalidUrl(base_url));
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("agentic-chat/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn conversations_url(&self, user_id: &str) -> String {
        self.url(&format!("/api/users/{}/conversations", encode(user_id)))
    }

    fn conversation_url(&self, user_id: &str, conversation_id: &str) -> String {
        format!(
            "{}/{}",
            self.conversations_url(user_id),
            encode(conversation_id)
        )
    }
}

fn encode(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

/// A 404 on a conversation path means the conversation is gone
fn missing_as_not_found(error: BackendError, conversation_id: String) -> BackendError {
    match error {
        BackendError::Status { status: 404, .. } => BackendError::NotFound(conversation_id),
        other => other,
    }
}

/// Send a request and check its status. The body of a failed response is
/// never read.
async fn send(
    request: reqwest::RequestBuilder,
    operation: &'static str,
) -> BackendResult<reqwest::Response> {
    let response = request.header(ACCEPT, "application/json").send().await?;
    let status = response.status();
    debug!(operation, status = status.as_u16(), "Backend responded");

    if !status.is_success() {
        return Err(BackendError::Status {
            operation,
            status: status.as_u16(),
        });
    }
    Ok(response)
}

async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    operation: &'static str,
) -> BackendResult<T> {
    let body = send(request, operation).await?.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| BackendError::Decode {
        operation,
        message: e.to_string(),
    })
}

impl BackendRepository for HttpBackendRepository {
    fn authenticate(&self, request: AuthRequest) -> BoxFuture<'static, BackendResult<AuthResponse>> {
        let builder = self.client.post(self.url("/api/authenticate")).json(&request);
        Box::pin(send_json(builder, "authenticate"))
    }

    fn list_agents(&self) -> BoxFuture<'static, BackendResult<Vec<AgentPublic>>> {
        let builder = self.client.get(self.url("/api/agents"));
        Box::pin(send_json(builder, "list agents"))
    }

    fn list_conversations(
        &self,
        user_id: &str,
    ) -> BoxFuture<'static, BackendResult<Vec<ConversationSummary>>> {
        let builder = self.client.get(self.conversations_url(user_id));
        Box::pin(send_json(builder, "list conversations"))
    }

    fn get_conversation(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> BoxFuture<'static, BackendResult<ConversationDetail>> {
        let builder = self
            .client
            .get(self.conversation_url(user_id, conversation_id));
        let conversation_id = conversation_id.to_string();
        Box::pin(async move {
            send_json(builder, "get conversation")
                .await
                .map_err(|e| missing_as_not_found(e, conversation_id))
        })
    }

    fn create_conversation(
        &self,
        user_id: &str,
        request: CreateConversationRequest,
    ) -> BoxFuture<'static, BackendResult<ConversationDetail>> {
        let builder = self.client.post(self.conversations_url(user_id)).json(&request);
        Box::pin(send_json(builder, "create conversation"))
    }

    fn delete_conversation(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> BoxFuture<'static, BackendResult<()>> {
        let builder = self
            .client
            .delete(self.conversation_url(user_id, conversation_id));
        let conversation_id = conversation_id.to_string();
        Box::pin(async move {
            send(builder, "delete conversation")
                .await
                .map_err(|e| missing_as_not_found(e, conversation_id))?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_http_urls() {
        let result = HttpBackendRepository::new("ftp://example.com", Duration::from_secs(5));
        assert!(matches!(result, Err(BackendError::InvalidUrl(_))));
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let repo = HttpBackendRepository::new("http://localhost:8000/", Duration::from_secs(5))
            .unwrap();
        assert_eq!(repo.base_url(), "http://localhost:8000");
        assert_eq!(
            repo.conversations_url("u1"),
            "http://localhost:8000/api/users/u1/conversations"
        );
    }

    #[test]
    fn test_missing_conversation_maps_to_not_found() {
        let missing = BackendError::Status {
            operation: "get conversation",
            status: 404,
        };
        assert!(matches!(
            missing_as_not_found(missing, "c1".into()),
            BackendError::NotFound(id) if id == "c1"
        ));

        let failed = BackendError::Status {
            operation: "get conversation",
            status: 500,
        };
        assert_eq!(missing_as_not_found(failed, "c1".into()).status(), Some(500));
    }

    #[test]
    fn test_path_segments_are_escaped() {
        let repo =
            HttpBackendRepository::new("http://localhost:8000", Duration::from_secs(5)).unwrap();
        assert_eq!(
            repo.conversation_url("a b", "c/d"),
            "http://localhost:8000/api/users/a%20b/conversations/c%2Fd"
        );
    }
}
