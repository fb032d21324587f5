//! Conversation session state.

use std::time::{SystemTime, UNIX_EPOCH};

use helferlain_io::Source;
use helferlain_view::MessageRole;
use nanoid::nanoid;

/// One transcript entry. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: SystemTime,
    pub sources: Vec<Source>,
    pub is_error: bool,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            timestamp: SystemTime::now(),
            sources: Vec::new(),
            is_error: false,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            timestamp: SystemTime::now(),
            sources: Vec::new(),
            is_error: false,
        }
    }

    pub fn assistant_error(content: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::assistant(content)
        }
    }

    pub fn with_sources(mut self, sources: Vec<Source>) -> Self {
        self.sources = sources;
        self
    }
}

/// Per-widget conversation: transcript plus the open/loading/typing flags.
/// The transcript is capped at `max_messages`; overflow evicts the oldest
/// entry (FIFO), never recomputes a window.
#[derive(Debug)]
pub struct ConversationSession {
    session_id: String,
    messages: Vec<Message>,
    max_messages: usize,
    pub is_open: bool,
    pub is_loading: bool,
    pub is_typing: bool,
}

impl ConversationSession {
    pub fn new(max_messages: usize) -> Self {
        Self {
            session_id: generate_session_id(),
            messages: Vec::new(),
            max_messages: max_messages.max(1),
            is_open: false,
            is_loading: false,
            is_typing: false,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Append a message; returns true when the oldest entry was evicted
    /// to stay within the cap.
    pub fn push(&mut self, message: Message) -> bool {
        self.messages.push(message);
        if self.messages.len() > self.max_messages {
            self.messages.remove(0);
            true
        } else {
            false
        }
    }
}

/// `session_<epochMillis>_<random>`, unique per widget instance.
fn generate_session_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("session_{}_{}", millis, nanoid!(9))
}
