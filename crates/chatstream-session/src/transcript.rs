use chatstream_types::FormattedMessage;

/// Ordered list of messages shown in a conversation view.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<FormattedMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<FormattedMessage>) -> Self {
        Self { messages }
    }

    pub fn push(&mut self, message: FormattedMessage) {
        self.messages.push(message);
    }

    /// Replace the entry with the same id, or append
    pub fn upsert(&mut self, message: FormattedMessage) {
        match self.position(&message.id) {
            Some(index) => self.messages[index] = message,
            None => self.messages.push(message),
        }
    }

    /// Swap the entry `id` for `message`, keeping the original `created_at`
    /// so ordering among messages is stable. Appends when `id` is unknown.
    pub fn replace(&mut self, id: &str, mut message: FormattedMessage) -> &FormattedMessage {
        let index = match self.position(id) {
            Some(index) => {
                message.created_at = self.messages[index].created_at;
                self.messages[index] = message;
                index
            }
            None => {
                self.messages.push(message);
                self.messages.len() - 1
            }
        };
        &self.messages[index]
    }

    pub fn get(&self, id: &str) -> Option<&FormattedMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut FormattedMessage> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    pub fn last(&self) -> Option<&FormattedMessage> {
        self.messages.last()
    }

    pub fn messages(&self) -> &[FormattedMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.messages.iter().position(|m| m.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_replace_preserves_created_at() {
        let mut transcript = Transcript::new();
        let provisional = FormattedMessage::provisional_bot();
        let created_at = provisional.created_at;
        let id = provisional.id.clone();
        transcript.push(FormattedMessage::user("q"));
        transcript.push(provisional);

        let mut server = FormattedMessage::provisional_bot();
        server.id = "server-id".to_string();
        server.content = "final".to_string();
        server.created_at = created_at + Duration::seconds(30);

        let replaced = transcript.replace(&id, server);
        assert_eq!(replaced.created_at, created_at);
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.last().unwrap().id, "server-id");
        assert!(transcript.get(&id).is_none());
    }

    #[test]
    fn test_upsert_appends_unknown() {
        let mut transcript = Transcript::new();
        let message = FormattedMessage::user("a");
        transcript.upsert(message.clone());
        transcript.upsert(message);
        assert_eq!(transcript.len(), 1);
    }
}
