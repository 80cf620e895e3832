//! Conversation session controller
//!
//! Owns the whole client state: session, agents, history, the active message
//! list, the composer and the single thinking cycle. Every mutation goes
//! through [`SessionController`]; presentation subscribes to [`SessionEvent`]s
//! and reads state through the getters.
//!
//! Work that resumes after a delay or a backend call re-checks `epoch`, which
//! is bumped whenever the active conversation is replaced or cleared, and
//! drops its result when it no longer applies.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::agentic::error::ChatError;
use crate::agentic::models::conversation::UNKNOWN_AGENT_NAME;
use crate::agentic::models::{
    AdmitOutcome, Agent, Attachment, AttachmentManager, ClipboardItem, Conversation,
    ConversationsStore, CreateConversationRequest, LocalFile, Message, Notification,
    NotificationStore, PreviewRegistry, Session, ThinkingState, TickOutcome,
};
use crate::agentic::repositories::BackendRepository;
use crate::agentic::services::{ScheduledTask, ThinkingHost, ThinkingSimulator};
use crate::settings::{ClientSettings, Timings};

const EVENT_CAPACITY: usize = 256;

/// Coarse state of the active conversation, as presentation sees it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    NoConversation,
    Composing,
    Sending,
    ThinkingActive,
    ViewingHistory,
    ClearingTransition,
}

/// Events emitted by the controller for decoupled UI updates.
#[derive(Clone, Debug)]
pub enum SessionEvent {
    LoggedIn {
        user_id: String,
    },
    LoggedOut,
    AgentsLoaded {
        count: usize,
    },
    AgentSelected {
        agent_id: String,
    },
    ConversationsChanged {
        count: usize,
    },
    ConversationLoaded {
        conversation_id: String,
        message_count: usize,
        /// Detail could not be fetched; only the summary was applied
        fallback: bool,
    },
    MessageAppended {
        message: Message,
    },
    ThinkingUpdated {
        message_id: String,
        index: usize,
        thought: String,
        is_done: bool,
    },
    ThinkingCleared {
        message_id: String,
    },
    ChatCleared,
    ClearingChanged {
        is_clearing: bool,
    },
    AttachmentsChanged {
        count: usize,
    },
    PrivateModeChanged {
        enabled: bool,
    },
    NotificationRaised(Notification),
}

pub(super) struct AppState {
    pub(super) session: Session,
    pub(super) login_username: String,
    pub(super) login_password: String,
    pub(super) agents: Vec<Agent>,
    pub(super) selected_agent_id: Option<String>,
    pub(super) conversations: ConversationsStore,
    pub(super) current_conversation: Option<Conversation>,
    pub(super) messages: Vec<Message>,
    pub(super) composer_text: String,
    pub(super) attachments: AttachmentManager,
    pub(super) thinking: Option<ThinkingState>,
    pub(super) expanded_thinking: HashSet<String>,
    pub(super) is_private_mode: bool,
    pub(super) is_sending_message: bool,
    pub(super) loading_conversation: bool,
    pub(super) loading_conversation_id: Option<String>,
    pub(super) is_agent_switching: bool,
    pub(super) is_clearing: bool,
    pub(super) viewing_history: bool,
    pub(super) notifications: NotificationStore,
    pub(super) epoch: u64,
    /// Bumped when a session opens or closes
    pub(super) session_generation: u64,
}

impl AppState {
    fn new(previews: PreviewRegistry) -> Self {
        Self {
            session: Session::default(),
            login_username: String::new(),
            login_password: String::new(),
            agents: Vec::new(),
            selected_agent_id: None,
            conversations: ConversationsStore::new(),
            current_conversation: None,
            messages: Vec::new(),
            composer_text: String::new(),
            attachments: AttachmentManager::new(previews),
            thinking: None,
            expanded_thinking: HashSet::new(),
            is_private_mode: false,
            is_sending_message: false,
            loading_conversation: false,
            loading_conversation_id: None,
            is_agent_switching: false,
            is_clearing: false,
            viewing_history: false,
            notifications: NotificationStore::default(),
            epoch: 0,
            session_generation: 0,
        }
    }

    pub(super) fn selected_agent(&self) -> Option<&Agent> {
        let id = self.selected_agent_id.as_deref()?;
        self.agents.iter().find(|a| a.id == id)
    }

    /// Point the selection at the first agent when it no longer resolves.
    pub(super) fn ensure_selected_agent(&mut self) -> Option<String> {
        if self.selected_agent().is_some() {
            return None;
        }
        self.selected_agent_id = self.agents.first().map(|a| a.id.clone());
        self.selected_agent_id.clone()
    }

    fn phase(&self) -> SessionPhase {
        if self.is_clearing {
            SessionPhase::ClearingTransition
        } else if self.is_sending_message {
            SessionPhase::Sending
        } else if self.thinking.is_some() {
            SessionPhase::ThinkingActive
        } else if self.viewing_history {
            SessionPhase::ViewingHistory
        } else if self.current_conversation.is_some()
            || !self.messages.is_empty()
            || !self.composer_text.is_empty()
            || !self.attachments.is_empty()
        {
            SessionPhase::Composing
        } else {
            SessionPhase::NoConversation
        }
    }

    fn is_current_load(&self, epoch: u64, conversation_id: &str) -> bool {
        self.epoch == epoch && self.loading_conversation_id.as_deref() == Some(conversation_id)
    }

    /// Revoke previews still held by sent messages
    fn release_message_previews(&mut self) {
        self.attachments
            .release_all(self.messages.iter().flat_map(|m| m.attachments.iter()));
    }

    fn touch_conversation(&mut self, message: &Message) {
        if let Some(conversation) = self.current_conversation.as_mut() {
            conversation.last_message = message.content.clone();
            conversation.timestamp = message.timestamp;
        }
    }
}

/// Boolean guards released unconditionally by [`FlagGuard`].
#[derive(Clone, Copy, Debug)]
pub(super) enum Flag {
    Sending,
    LoadingConversation,
    AgentSwitching,
}

impl Flag {
    fn slot(self, state: &mut AppState) -> &mut bool {
        match self {
            Flag::Sending => &mut state.is_sending_message,
            Flag::LoadingConversation => &mut state.loading_conversation,
            Flag::AgentSwitching => &mut state.is_agent_switching,
        }
    }
}

/// Holds a guard flag and clears it on drop.
///
/// Must never be dropped while the state lock is held.
pub(super) struct FlagGuard {
    inner: Arc<ControllerInner>,
    flag: Flag,
}

impl FlagGuard {
    pub(super) fn try_acquire(
        inner: &Arc<ControllerInner>,
        state: &mut AppState,
        flag: Flag,
    ) -> Option<Self> {
        let slot = flag.slot(state);
        if *slot {
            return None;
        }
        *slot = true;
        Some(Self {
            inner: inner.clone(),
            flag,
        })
    }
}

impl Drop for FlagGuard {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock();
        *self.flag.slot(&mut state) = false;
        debug!(flag = ?self.flag, "Guard released");
    }
}

pub(super) struct ControllerInner {
    pub(super) state: Mutex<AppState>,
    pub(super) backend: Arc<dyn BackendRepository>,
    pub(super) simulator: ThinkingSimulator,
    pub(super) settings: ClientSettings,
    events: broadcast::Sender<SessionEvent>,
    thinking_task: Mutex<Option<ScheduledTask>>,
    last_id: Mutex<i64>,
}

impl ControllerInner {
    pub(super) fn timings(&self) -> &Timings {
        &self.settings.timings
    }

    pub(super) fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    pub(super) fn notify(&self, state: &mut AppState, notification: Notification) {
        let now = Instant::now();
        state.notifications.prune(now);
        let shown = state.notifications.push(notification, now);
        self.emit(SessionEvent::NotificationRaised(shown));
    }

    pub(super) fn report(&self, state: &mut AppState, error: &ChatError) {
        self.notify(state, error.to_notification(self.timings()));
    }

    /// Millisecond timestamp, bumped to stay unique within a session
    pub(super) fn next_id(&self) -> String {
        let now = Utc::now().timestamp_millis();
        let mut last = self.last_id.lock();
        let id = now.max(*last + 1);
        *last = id;
        id.to_string()
    }

    /// Tear down the timer and drop the thinking state; no reply follows.
    pub(super) fn cancel_thinking(&self, state: &mut AppState) {
        drop(self.thinking_task.lock().take());
        if let Some(thinking) = state.thinking.take() {
            debug!(message_id = %thinking.message_id, "Thinking cancelled");
            self.emit(SessionEvent::ThinkingCleared {
                message_id: thinking.message_id,
            });
        }
    }

    /// Drop the active conversation and everything composed for it.
    pub(super) fn reset_conversation(&self, state: &mut AppState) {
        self.cancel_thinking(state);
        state.release_message_previews();
        state.messages.clear();
        state.expanded_thinking.clear();
        state.attachments.clear();
        state.composer_text.clear();
        state.current_conversation = None;
        state.is_private_mode = false;
        state.viewing_history = false;
    }
}

impl ThinkingHost for ControllerInner {
    fn advance_thinking(&self, message_id: &str, now: Instant) -> TickOutcome {
        let mut state = self.state.lock();
        let Some(thinking) = state
            .thinking
            .as_mut()
            .filter(|t| t.message_id == message_id)
        else {
            return TickOutcome::Idle;
        };

        let outcome = thinking.tick(now);
        if outcome != TickOutcome::Idle {
            self.emit(SessionEvent::ThinkingUpdated {
                message_id: message_id.to_string(),
                index: thinking.current_thought_index,
                thought: thinking.current_thought().unwrap_or_default().to_string(),
                is_done: thinking.is_done,
            });
        }
        outcome
    }

    fn finish_thinking(&self, message_id: &str) {
        let mut state = self.state.lock();
        let current = state
            .thinking
            .as_ref()
            .is_some_and(|t| t.message_id == message_id && t.is_done);
        if !current {
            debug!(message_id, "Finalize for a cycle that is no longer current");
            return;
        }
        let Some(thinking) = state.thinking.take() else {
            return;
        };

        let reply = self.simulator.synthesize(&thinking, state.selected_agent());
        state.touch_conversation(&reply);
        state.messages.push(reply.clone());
        info!(
            message_id,
            thinking_time = reply.thinking_time.unwrap_or_default(),
            "Agent reply appended"
        );

        self.emit(SessionEvent::MessageAppended { message: reply });
        self.emit(SessionEvent::ThinkingCleared {
            message_id: message_id.to_string(),
        });
    }
}

/// Handle to the session. Clones share the same state.
#[derive(Clone)]
pub struct SessionController {
    pub(super) inner: Arc<ControllerInner>,
}

impl SessionController {
    /// Controller with the canned responder, timed by `settings`.
    pub fn new(backend: Arc<dyn BackendRepository>, settings: ClientSettings) -> Self {
        let simulator = ThinkingSimulator::canned(
            settings.timings.thinking_tick(),
            settings.timings.thinking_finalize(),
        );
        Self::with_simulator(backend, settings, simulator)
    }

    pub fn with_simulator(
        backend: Arc<dyn BackendRepository>,
        settings: ClientSettings,
        simulator: ThinkingSimulator,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(ControllerInner {
                state: Mutex::new(AppState::new(PreviewRegistry::new())),
                backend,
                simulator,
                settings,
                events,
                thinking_task: Mutex::new(None),
                last_id: Mutex::new(0),
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.inner.settings
    }

    pub fn phase(&self) -> SessionPhase {
        self.inner.state.lock().phase()
    }

    pub fn is_logged_in(&self) -> bool {
        self.inner.state.lock().session.logged_in
    }

    pub fn user_id(&self) -> Option<String> {
        self.inner.state.lock().session.user_id.clone()
    }

    pub fn agents(&self) -> Vec<Agent> {
        self.inner.state.lock().agents.clone()
    }

    pub fn selected_agent(&self) -> Option<Agent> {
        self.inner.state.lock().selected_agent().cloned()
    }

    pub fn selected_agent_id(&self) -> Option<String> {
        self.inner.state.lock().selected_agent_id.clone()
    }

    pub fn conversations(&self) -> Vec<Conversation> {
        self.inner.state.lock().conversations.list().to_vec()
    }

    pub fn current_conversation(&self) -> Option<Conversation> {
        self.inner.state.lock().current_conversation.clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.inner.state.lock().messages.clone()
    }

    pub fn thinking(&self) -> Option<ThinkingState> {
        self.inner.state.lock().thinking.clone()
    }

    pub fn composer_text(&self) -> String {
        self.inner.state.lock().composer_text.clone()
    }

    pub fn pending_attachments(&self) -> Vec<Attachment> {
        self.inner.state.lock().attachments.pending().to_vec()
    }

    pub fn previews(&self) -> PreviewRegistry {
        self.inner.state.lock().attachments.previews().clone()
    }

    pub fn is_private_mode(&self) -> bool {
        self.inner.state.lock().is_private_mode
    }

    pub fn is_sending_message(&self) -> bool {
        self.inner.state.lock().is_sending_message
    }

    pub fn is_loading_conversation(&self) -> bool {
        self.inner.state.lock().loading_conversation
    }

    pub fn is_agent_switching(&self) -> bool {
        self.inner.state.lock().is_agent_switching
    }

    pub fn is_clearing(&self) -> bool {
        self.inner.state.lock().is_clearing
    }

    pub fn is_thinking_expanded(&self, message_id: &str) -> bool {
        self.inner.state.lock().expanded_thinking.contains(message_id)
    }

    /// Toasts still on screen
    pub fn notifications(&self) -> Vec<Notification> {
        self.inner.state.lock().notifications.active(Instant::now())
    }

    pub fn set_composer_text(&self, text: impl Into<String>) {
        self.inner.state.lock().composer_text = text.into();
    }

    /// Attach picked files, up to the per-message limit.
    pub fn add_files(&self, files: Vec<LocalFile>) -> AdmitOutcome {
        if files.is_empty() {
            return AdmitOutcome::default();
        }

        let inner = &self.inner;
        let mut state = inner.state.lock();
        let outcome = state.attachments.add(files);

        if outcome.is_partial() {
            info!(
                admitted = outcome.admitted,
                excluded = outcome.excluded,
                "Attachment limit reached"
            );
            inner.report(
                &mut state,
                &ChatError::CapacityExceeded {
                    admitted: outcome.admitted,
                    excluded: outcome.excluded,
                },
            );
        } else {
            let toast = Notification::info(
                "Files attached",
                format!("{} file(s) attached to your message", outcome.admitted),
                inner.timings().toast_short(),
            );
            inner.notify(&mut state, toast);
        }

        if outcome.admitted > 0 {
            inner.emit(SessionEvent::AttachmentsChanged {
                count: state.attachments.len(),
            });
        }
        outcome
    }

    /// Attach pasted images. Anything else on the clipboard is ignored.
    pub fn paste(&self, items: Vec<ClipboardItem>) -> AdmitOutcome {
        let inner = &self.inner;
        let mut state = inner.state.lock();

        if state.attachments.remaining_capacity() == 0 {
            inner.report(&mut state, &ChatError::PasteAtCapacity);
            return AdmitOutcome::default();
        }

        let outcome = state.attachments.add_from_paste(items);
        if outcome.admitted > 0 {
            inner.emit(SessionEvent::AttachmentsChanged {
                count: state.attachments.len(),
            });
        }
        outcome
    }

    pub fn remove_attachment(&self, index: usize) -> bool {
        let mut state = self.inner.state.lock();
        let removed = state.attachments.remove(index).is_some();
        if removed {
            self.inner.emit(SessionEvent::AttachmentsChanged {
                count: state.attachments.len(),
            });
        }
        removed
    }

    /// Set the composer text and send it with the pending attachments.
    ///
    /// A rejected send leaves the text in the composer.
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.set_composer_text(text);
        self.send_message()
    }

    /// Send the composed message and start the agent's thinking cycle.
    ///
    /// Returns false without changing anything when there is nothing to send,
    /// a send is already in flight, or nobody is logged in. The message is
    /// committed after the compose delay.
    pub fn send_message(&self) -> bool {
        let inner = &self.inner;
        let mut state = inner.state.lock();

        if !state.session.logged_in {
            debug!("Send ignored, not logged in");
            return false;
        }
        if state.composer_text.trim().is_empty() && state.attachments.is_empty() {
            return false;
        }
        let Some(guard) = FlagGuard::try_acquire(inner, &mut state, Flag::Sending) else {
            debug!("Send ignored, already sending");
            return false;
        };

        let text = state.composer_text.clone();
        let agent = state.selected_agent().cloned();
        let new_conversation = state.messages.is_empty();

        if new_conversation {
            let conversation = Conversation::start(
                inner.next_id(),
                state.selected_agent_id.clone().unwrap_or_default(),
                agent
                    .as_ref()
                    .map_or_else(|| UNKNOWN_AGENT_NAME.to_string(), |a| a.name.clone()),
                text.clone(),
                state.is_private_mode,
            );
            info!(
                conv_id = %conversation.id,
                agent_id = %conversation.agent_id,
                is_private = conversation.is_private,
                "Conversation started"
            );
            state.current_conversation = Some(conversation);
        }

        let attachments = state.attachments.prepare_for_send();
        state.attachments.detach_all();
        let message = Message::from_user(inner.next_id(), text, attachments);
        state.viewing_history = false;
        let epoch = state.epoch;

        self.start_thinking(&mut state, agent.as_ref());
        drop(state);

        let controller = self.clone();
        let delay = inner.timings().compose_delay();
        tokio::spawn(async move {
            let _guard = guard;
            tokio::time::sleep(delay).await;
            controller.commit_message(epoch, message, new_conversation);
        });
        true
    }

    /// Begin a thinking cycle, superseding any running one.
    fn start_thinking(&self, state: &mut AppState, agent: Option<&Agent>) {
        let inner = &self.inner;
        inner.cancel_thinking(state);

        let reply_id = inner.next_id();
        let thinking = inner.simulator.begin(reply_id.clone(), agent, Instant::now());
        inner.emit(SessionEvent::ThinkingUpdated {
            message_id: reply_id.clone(),
            index: thinking.current_thought_index,
            thought: thinking.current_thought().unwrap_or_default().to_string(),
            is_done: false,
        });
        state.thinking = Some(thinking);

        let task = inner.simulator.start(inner.clone(), reply_id);
        *inner.thinking_task.lock() = Some(task);
    }

    fn commit_message(&self, epoch: u64, message: Message, new_conversation: bool) {
        let inner = &self.inner;
        let persist = {
            let mut state = inner.state.lock();
            if state.epoch != epoch {
                debug!(message_id = %message.id, "Chat cleared before commit, message dropped");
                state.attachments.release_all(&message.attachments);
                return;
            }

            state.touch_conversation(&message);
            state.messages.push(message.clone());
            // Text typed during the compose delay stays in the composer
            if state.composer_text == message.content {
                state.composer_text.clear();
            }
            debug!(message_id = %message.id, kind = ?message.kind, "User message committed");
            inner.emit(SessionEvent::MessageAppended {
                message: message.clone(),
            });
            inner.emit(SessionEvent::AttachmentsChanged {
                count: state.attachments.len(),
            });

            if new_conversation && inner.settings.persist_new_conversations {
                match (
                    state.session.active_user(),
                    state.current_conversation.as_ref(),
                ) {
                    (Some(user_id), Some(conversation)) => Some((
                        user_id.to_string(),
                        CreateConversationRequest::new(conversation, &message),
                    )),
                    _ => None,
                }
            } else {
                None
            }
        };

        if let Some((user_id, request)) = persist {
            self.persist_conversation(user_id, request);
        }
    }

    fn persist_conversation(&self, user_id: String, request: CreateConversationRequest) {
        let controller = self.clone();
        tokio::spawn(async move {
            let inner = &controller.inner;
            let conversation_id = request.id.clone();
            let result = inner.backend.create_conversation(&user_id, request).await;

            let mut state = inner.state.lock();
            match result {
                Ok(detail) => {
                    if state.session.active_user() != Some(user_id.as_str()) {
                        debug!(conv_id = %conversation_id, "Session changed before save completed");
                        return;
                    }
                    state.conversations.upsert_front(Conversation::from(detail));
                    info!(conv_id = %conversation_id, "Conversation saved");
                    inner.emit(SessionEvent::ConversationsChanged {
                        count: state.conversations.len(),
                    });
                }
                Err(e) => {
                    error!(conv_id = %conversation_id, error = ?e, "Failed to save conversation");
                    inner.report(&mut state, &ChatError::CreateFailure(e));
                }
            }
        });
    }

    /// Clear the active conversation behind a fade.
    ///
    /// Thinking stops immediately; the rest of the state is reset once the
    /// fade has run, unless something else replaced the conversation first.
    pub async fn clear_chat(&self) {
        let inner = &self.inner;
        let epoch = {
            let mut state = inner.state.lock();
            state.epoch += 1;
            state.is_clearing = true;
            inner.cancel_thinking(&mut state);
            inner.emit(SessionEvent::ClearingChanged { is_clearing: true });
            state.epoch
        };

        tokio::time::sleep(inner.timings().clear_fade()).await;
        {
            let mut state = inner.state.lock();
            if state.epoch != epoch {
                debug!("Clear superseded");
                return;
            }
            inner.reset_conversation(&mut state);
            debug!("Chat cleared");
            inner.emit(SessionEvent::ChatCleared);
        }

        tokio::time::sleep(inner.timings().clear_restore()).await;
        let mut state = inner.state.lock();
        if state.epoch == epoch && state.is_clearing {
            state.is_clearing = false;
            inner.emit(SessionEvent::ClearingChanged { is_clearing: false });
        }
    }

    pub async fn new_chat(&self) {
        self.clear_chat().await;
    }

    /// Switch to another agent, clearing the active conversation.
    ///
    /// Returns false when a switch is already running or the id is unknown.
    pub async fn switch_agent(&self, agent_id: &str) -> bool {
        let inner = &self.inner;
        let (generation, _guard) = {
            let mut state = inner.state.lock();
            if !state.agents.is_empty() && !state.agents.iter().any(|a| a.id == agent_id) {
                warn!(agent_id, "Unknown agent");
                return false;
            }
            let Some(guard) = FlagGuard::try_acquire(inner, &mut state, Flag::AgentSwitching)
            else {
                debug!(agent_id, "Agent switch already running");
                return false;
            };
            (state.session_generation, guard)
        };

        let apply = async {
            tokio::time::sleep(inner.timings().agent_switch()).await;
            {
                let mut state = inner.state.lock();
                if state.session_generation != generation {
                    debug!(agent_id, "Session changed during agent switch");
                    return;
                }
                state.selected_agent_id = Some(agent_id.to_string());
                info!(agent_id, "Agent selected");
                inner.emit(SessionEvent::AgentSelected {
                    agent_id: agent_id.to_string(),
                });
            }
            tokio::time::sleep(inner.timings().agent_switch_settle()).await;
        };

        futures::join!(self.clear_chat(), apply);
        true
    }

    /// Load a conversation from history into the session.
    ///
    /// When the detail cannot be fetched, the summary's own fields are applied
    /// with an empty message list and a toast is raised. Returns true only
    /// when the full detail was applied.
    pub async fn select_conversation(&self, summary: &Conversation) -> bool {
        let inner = &self.inner;
        let (user_id, epoch, _guard) = {
            let mut state = inner.state.lock();
            let Some(user_id) = state.session.active_user().map(str::to_string) else {
                return false;
            };
            let Some(guard) =
                FlagGuard::try_acquire(inner, &mut state, Flag::LoadingConversation)
            else {
                debug!(conv_id = %summary.id, "Conversation load already running");
                return false;
            };

            state.epoch += 1;
            state.loading_conversation_id = Some(summary.id.clone());
            state.is_clearing = true;
            inner.cancel_thinking(&mut state);
            inner.emit(SessionEvent::ClearingChanged { is_clearing: true });
            (user_id, state.epoch, guard)
        };

        tokio::time::sleep(inner.timings().select_fade()).await;
        let result = inner.backend.get_conversation(&user_id, &summary.id).await;

        match result {
            Ok(detail) => {
                tokio::time::sleep(inner.timings().select_apply()).await;
                let conversation = Conversation::from(detail);

                let mut state = inner.state.lock();
                if !state.is_current_load(epoch, &summary.id) {
                    debug!(conv_id = %summary.id, "Discarding stale conversation load");
                    return false;
                }

                state.release_message_previews();
                state.messages = conversation.messages.clone();
                state.selected_agent_id = Some(conversation.agent_id.clone());
                state.is_private_mode = conversation.is_private;
                state.current_conversation = Some(conversation.summary());
                state.viewing_history = true;
                state.is_clearing = false;
                state.loading_conversation_id = None;

                info!(
                    conv_id = %conversation.id,
                    message_count = conversation.messages.len(),
                    "Conversation loaded"
                );
                inner.emit(SessionEvent::AgentSelected {
                    agent_id: conversation.agent_id.clone(),
                });
                inner.emit(SessionEvent::ConversationLoaded {
                    conversation_id: conversation.id,
                    message_count: conversation.messages.len(),
                    fallback: false,
                });
                inner.emit(SessionEvent::ClearingChanged { is_clearing: false });
                true
            }
            Err(e) => {
                error!(conv_id = %summary.id, error = ?e, "Failed to load conversation");

                let mut state = inner.state.lock();
                if !state.is_current_load(epoch, &summary.id) {
                    debug!(conv_id = %summary.id, "Load failed after the session moved on");
                    return false;
                }
                inner.report(&mut state, &ChatError::LoadFailure(e));

                state.release_message_previews();
                state.messages.clear();
                state.selected_agent_id = Some(summary.agent_id.clone());
                state.is_private_mode = summary.is_private;
                state.current_conversation = Some(summary.summary());
                state.viewing_history = true;
                state.is_clearing = false;
                state.loading_conversation_id = None;

                inner.emit(SessionEvent::AgentSelected {
                    agent_id: summary.agent_id.clone(),
                });
                inner.emit(SessionEvent::ConversationLoaded {
                    conversation_id: summary.id.clone(),
                    message_count: 0,
                    fallback: true,
                });
                inner.emit(SessionEvent::ClearingChanged { is_clearing: false });
                false
            }
        }
    }

    /// Delete a conversation from history. Deleting the active one also
    /// clears the session's conversation.
    pub async fn delete_conversation(&self, conversation_id: &str) -> bool {
        let inner = &self.inner;
        let session = {
            let state = inner.state.lock();
            state
                .session
                .active_user()
                .map(|user_id| (user_id.to_string(), state.session_generation))
        };
        let Some((user_id, generation)) = session else {
            return false;
        };

        let result = inner
            .backend
            .delete_conversation(&user_id, conversation_id)
            .await;

        let was_active = {
            let mut state = inner.state.lock();
            if let Err(e) = result {
                error!(conv_id = %conversation_id, error = ?e, "Failed to delete conversation");
                inner.report(&mut state, &ChatError::DeleteFailure(e));
                return false;
            }
            if state.session_generation != generation {
                debug!(conv_id = %conversation_id, "Session changed before delete completed");
                return false;
            }

            // A load still in flight for this id must not install it afterwards
            let was_loading = state.loading_conversation_id.as_deref() == Some(conversation_id);
            if was_loading {
                state.epoch += 1;
                state.loading_conversation_id = None;
            }

            state.conversations.remove(conversation_id);
            info!(conv_id = %conversation_id, "Conversation deleted");
            inner.emit(SessionEvent::ConversationsChanged {
                count: state.conversations.len(),
            });
            let toast = Notification::info(
                "Conversation deleted",
                "The conversation has been removed from your history",
                inner.timings().toast_short(),
            );
            inner.notify(&mut state, toast);

            was_loading
                || state
                    .current_conversation
                    .as_ref()
                    .is_some_and(|c| c.id == conversation_id)
        };

        if was_active {
            self.clear_chat().await;
        }
        true
    }

    /// Flip private mode. Only allowed before the first message, or to turn
    /// private mode off.
    pub fn toggle_private(&self) -> bool {
        let mut state = self.inner.state.lock();
        if !(state.messages.is_empty() || state.is_private_mode) {
            debug!("Private mode locked for a conversation in progress");
            return false;
        }
        state.is_private_mode = !state.is_private_mode;
        self.inner.emit(SessionEvent::PrivateModeChanged {
            enabled: state.is_private_mode,
        });
        true
    }

    /// Expand or collapse the thoughts of one message; returns the new state.
    pub fn toggle_thinking(&self, message_id: &str) -> bool {
        let mut state = self.inner.state.lock();
        if state.expanded_thinking.remove(message_id) {
            false
        } else {
            state.expanded_thinking.insert(message_id.to_string());
            true
        }
    }
}
