//! In-memory conversation history.

use serde::{Deserialize, Serialize};

/// Text of the turn every conversation starts with.
pub const GREETING: &str = "Hello! How can I help you today?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Identity of a turn within one [`Conversation`].
///
/// Two turns with identical text still have different ids, which is what placeholder removal
/// relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnId(u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: TurnId,
    pub role: Role,
    pub content: String,
}

/// Ordered list of turns. Turns are only appended, except for [`Conversation::remove`].
#[derive(Debug, Clone)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
    next_id: u64,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    /// A conversation holding only the system greeting.
    pub fn new() -> Self {
        let mut conversation = Self {
            turns: Vec::new(),
            next_id: 0,
        };
        conversation.push(Role::System, GREETING);
        conversation
    }

    pub fn push(&mut self, role: Role, content: impl Into<String>) -> TurnId {
        let id = TurnId(self.next_id);
        self.next_id += 1;
        self.turns.push(ConversationTurn {
            id,
            role,
            content: content.into(),
        });
        id
    }

    /// Remove the turn with this id, leaving every other turn in place.
    pub fn remove(&mut self, id: TurnId) -> Option<ConversationTurn> {
        let index = self.turns.iter().position(|turn| turn.id == id)?;
        Some(self.turns.remove(index))
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
