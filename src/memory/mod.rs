
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who spoke a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "User"),
            Self::Assistant => write!(f, "Assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    #[inline]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    #[inline]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// Ordered history of one chat session
///
/// Turns are only ever appended. History grows without bound for the
/// lifetime of the session.
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    session_id: Uuid,
    turns: Vec<Turn>,
}

impl Default for ConversationMemory {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationMemory {
    #[inline]
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            turns: Vec::new(),
        }
    }

    #[inline]
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    #[inline]
    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Record a question and the answer given to it
    #[inline]
    pub fn record_exchange(&mut self, question: &str, answer: &str) {
        self.turns.push(Turn::user(question));
        self.turns.push(Turn::assistant(answer));
    }

    #[inline]
    pub fn history(&self) -> &[Turn] {
        &self.turns
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Forget all turns and start a new session
    #[inline]
    pub fn clear(&mut self) {
        self.turns.clear();
        self.session_id = Uuid::new_v4();
    }

    /// Render the history as `Role: text` lines for inclusion in a prompt
    #[inline]
    pub fn format_history(&self) -> String {
        self.turns
            .iter()
            .map(|turn| format!("{}: {}", turn.role, turn.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
