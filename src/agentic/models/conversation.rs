use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::attachment::{Attachment, AttachmentRecord};

/// Display name used when the backend omits an agent name
pub const UNKNOWN_AGENT_NAME: &str = "Unknown Agent";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Agent,
}

impl Sender {
    fn from_wire(sender: &str) -> Self {
        match sender {
            "user" => Sender::User,
            _ => Sender::Agent,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    File,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
            MessageKind::File => "file",
        }
    }

    fn from_wire(kind: &str) -> Self {
        match kind {
            "file" => MessageKind::File,
            "image" => MessageKind::Image,
            _ => MessageKind::Text,
        }
    }
}

/// A single chat message. Immutable once appended to a conversation.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    pub kind: MessageKind,
    pub attachments: Vec<Attachment>,
    pub thinking: Option<Vec<String>>,
    /// Seconds spent thinking before the reply
    pub thinking_time: Option<u64>,
    pub error: bool,
    pub error_message: Option<String>,
}

impl Message {
    /// A message typed by the user; `kind` is `File` whenever attachments are present.
    pub fn from_user(id: String, content: String, attachments: Vec<Attachment>) -> Self {
        let kind = if attachments.is_empty() {
            MessageKind::Text
        } else {
            MessageKind::File
        };
        Self {
            id,
            content,
            sender: Sender::User,
            timestamp: Utc::now(),
            kind,
            attachments,
            thinking: None,
            thinking_time: None,
            error: false,
            error_message: None,
        }
    }

    pub fn from_agent(id: String, content: String, thinking: Vec<String>, thinking_time: u64) -> Self {
        Self {
            id,
            content,
            sender: Sender::Agent,
            timestamp: Utc::now(),
            kind: MessageKind::Text,
            attachments: Vec::new(),
            thinking: Some(thinking),
            thinking_time: Some(thinking_time),
            error: false,
            error_message: None,
        }
    }
}

/// Client-side conversation. `messages` stays empty for list entries until
/// the detail is fetched.
#[derive(Clone, Debug, PartialEq)]
pub struct Conversation {
    pub id: String,
    pub agent_id: String,
    pub agent_name: String,
    pub last_message: String,
    pub timestamp: DateTime<Utc>,
    pub messages: Vec<Message>,
    pub is_private: bool,
}

impl Conversation {
    /// Start a conversation on the client, before anything is persisted.
    pub fn start(
        id: String,
        agent_id: String,
        agent_name: String,
        first_message: String,
        is_private: bool,
    ) -> Self {
        Self {
            id,
            agent_id,
            agent_name,
            last_message: first_message,
            timestamp: Utc::now(),
            messages: Vec::new(),
            is_private,
        }
    }

    /// The same conversation without its message history.
    pub fn summary(&self) -> Conversation {
        Conversation {
            messages: Vec::new(),
            ..self.clone()
        }
    }
}

/// List entry returned by `GET /api/users/{userId}/conversations`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: String,
    pub agent_id: String,
    #[serde(default)]
    pub agent_name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(rename = "created_at", with = "flexible_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updated_at", with = "flexible_timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl From<ConversationSummary> for Conversation {
    fn from(summary: ConversationSummary) -> Self {
        Self {
            id: summary.id,
            agent_id: summary.agent_id,
            agent_name: summary
                .agent_name
                .unwrap_or_else(|| UNKNOWN_AGENT_NAME.to_string()),
            last_message: summary.last_message.unwrap_or_default(),
            timestamp: summary.updated_at,
            messages: Vec::new(),
            is_private: summary.is_private,
        }
    }
}

/// Message as returned inside a conversation detail.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageOut {
    pub id: String,
    #[serde(default)]
    pub content: Option<String>,
    pub sender: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, with = "flexible_timestamp::option")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(rename = "created_at", default, with = "flexible_timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attachments: Vec<AttachmentRecord>,
    #[serde(default)]
    pub thinking: Option<Vec<String>>,
    #[serde(default)]
    pub thinking_time: Option<u64>,
    #[serde(default)]
    pub error: Option<bool>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl From<MessageOut> for Message {
    fn from(message: MessageOut) -> Self {
        Self {
            timestamp: message
                .timestamp
                .or(message.created_at)
                .unwrap_or_else(Utc::now),
            id: message.id,
            content: message.content.unwrap_or_default(),
            sender: Sender::from_wire(&message.sender),
            kind: MessageKind::from_wire(&message.kind),
            attachments: message
                .attachments
                .into_iter()
                .map(Attachment::Persisted)
                .collect(),
            thinking: message.thinking,
            thinking_time: message.thinking_time,
            error: message.error.unwrap_or(false),
            error_message: message.error_message,
        }
    }
}

/// Full conversation returned by `GET /api/users/{userId}/conversations/{id}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationDetail {
    pub id: String,
    pub agent_id: String,
    #[serde(default)]
    pub agent_name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(rename = "created_at", with = "flexible_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updated_at", with = "flexible_timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<MessageOut>,
}

impl From<ConversationDetail> for Conversation {
    fn from(detail: ConversationDetail) -> Self {
        let messages: Vec<Message> = detail.messages.into_iter().map(Message::from).collect();
        Self {
            id: detail.id,
            agent_id: detail.agent_id,
            agent_name: detail
                .agent_name
                .unwrap_or_else(|| UNKNOWN_AGENT_NAME.to_string()),
            last_message: messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default(),
            timestamp: detail.updated_at,
            messages,
            is_private: detail.is_private,
        }
    }
}

/// Attachment bytes encoded for upload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttachmentUpload {
    pub name: String,
    pub mime: String,
    pub size: u64,
    /// Base64-encoded file bytes
    pub data: String,
}

impl AttachmentUpload {
    /// Only local attachments carry bytes; persisted and legacy ones are skipped.
    pub fn from_attachment(attachment: &Attachment) -> Option<Self> {
        match attachment {
            Attachment::Local { file, .. } => Some(Self {
                name: file.name().to_string(),
                mime: file.mime().to_string(),
                size: file.size(),
                data: BASE64.encode(file.bytes()),
            }),
            Attachment::Persisted(_) | Attachment::LegacyName(_) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InitialMessage {
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub attachments: Vec<AttachmentUpload>,
}

/// Body of `POST /api/users/{userId}/conversations`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    pub id: String,
    pub agent_id: String,
    pub is_private: bool,
    pub message: InitialMessage,
}

impl CreateConversationRequest {
    pub fn new(conversation: &Conversation, first: &Message) -> Self {
        Self {
            id: conversation.id.clone(),
            agent_id: conversation.agent_id.clone(),
            is_private: conversation.is_private,
            message: InitialMessage {
                content: first.content.clone(),
                kind: first.kind,
                attachments: first
                    .attachments
                    .iter()
                    .filter_map(AttachmentUpload::from_attachment)
                    .collect(),
            },
        }
    }
}

/// Timestamps from the backend may omit the offset; those are read as UTC.
pub(crate) mod flexible_timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                raw.parse::<NaiveDateTime>()
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => serializer.serialize_str(&value.to_rfc3339()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => super::parse(&raw)
                    .map(Some)
                    .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}"))),
                None => Ok(None),
            }
        }
    }
}
