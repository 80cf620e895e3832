use super::conversation::Conversation;

/// Conversation history of the logged-in user.
///
/// Keeps the order the backend returned (most recently updated first);
/// entries are summaries, their `messages` stay empty.
#[derive(Debug, Default)]
pub struct ConversationsStore {
    conversations: Vec<Conversation>,
}

impl ConversationsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole list, e.g. after a fresh load on login
    pub fn replace_all(&mut self, conversations: Vec<Conversation>) {
        self.conversations = conversations;
    }

    /// Insert or move a conversation to the front of the list
    pub fn upsert_front(&mut self, conversation: Conversation) {
        self.conversations.retain(|c| c.id != conversation.id);
        self.conversations.insert(0, conversation.summary());
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    /// Get the conversation at a display position
    pub fn get_at(&self, index: usize) -> Option<&Conversation> {
        self.conversations.get(index)
    }

    /// Delete a conversation by ID
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.conversations.len();
        self.conversations.retain(|c| c.id != id);
        self.conversations.len() != before
    }

    pub fn list(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn clear(&mut self) {
        self.conversations.clear();
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation(id: &str) -> Conversation {
        Conversation::start(
            id.to_string(),
            "retail".to_string(),
            "Retail Agent".to_string(),
            format!("hello from {id}"),
            false,
        )
    }

    #[test]
    fn test_replace_keeps_backend_order() {
        let mut store = ConversationsStore::new();
        store.replace_all(vec![conversation("b"), conversation("a")]);
        let ids: Vec<&str> = store.list().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_remove_reports_presence() {
        let mut store = ConversationsStore::new();
        store.replace_all(vec![conversation("a"), conversation("b")]);

        assert!(store.remove("a"));
        assert!(!store.remove("a"));
        assert_eq!(store.len(), 1);
        assert!(store.get("b").is_some());
    }

    #[test]
    fn test_upsert_moves_to_front_without_messages() {
        let mut store = ConversationsStore::new();
        store.replace_all(vec![conversation("a"), conversation("b")]);

        let mut updated = conversation("b");
        updated.messages.push(crate::agentic::models::conversation::Message::from_user(
            "m1".into(),
            "hi".into(),
            Vec::new(),
        ));
        store.upsert_front(updated);

        assert_eq!(store.len(), 2);
        assert_eq!(store.get_at(0).map(|c| c.id.as_str()), Some("b"));
        assert!(store.get_at(0).is_some_and(|c| c.messages.is_empty()));
    }
}
