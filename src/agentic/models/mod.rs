pub mod agent;
pub mod attachment;
pub mod conversation;
pub mod conversations_store;
pub mod error_store;
pub mod notification_store;
pub mod session;
pub mod thinking;

pub use agent::{Agent, AgentIcon, AgentPublic};
pub use attachment::{
    AdmitOutcome, Attachment, AttachmentManager, AttachmentRecord, ClipboardItem, LocalFile,
    MAX_ATTACHMENTS, PreviewRegistry, PreviewUrl,
};
pub use conversation::{
    Conversation, ConversationDetail, ConversationSummary, CreateConversationRequest, Message,
    MessageKind, Sender,
};
pub use conversations_store::ConversationsStore;
pub use error_store::{ErrorEntry, ErrorLevel, ErrorStore};
pub use notification_store::{Notification, NotificationStore, NotificationVariant};
pub use session::{AuthRequest, AuthResponse, Session};
pub use thinking::{ThinkingState, TickOutcome};
