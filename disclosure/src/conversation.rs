//! Conversation Log: append-only sequence of turns
//!
//! The log assigns ordinals itself, so callers cannot reorder or rewrite
//! history. There is no edit or delete operation.

use serde::{Deserialize, Serialize};

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Agent,
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Agent => write!(f, "agent"),
        }
    }
}

/// One message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    /// 1-based position in the log
    pub ordinal: u64,
}

/// Reasons a persisted turn sequence cannot be adopted as a log
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogIntegrityError {
    #[error("turn at index {index} has ordinal {found}, expected {expected}")]
    OrdinalGap {
        index: usize,
        expected: u64,
        found: u64,
    },
}

/// Ordered, append-only turn sequence owned by one session.
///
/// Serializes as a plain turn array. Deserialize a `Vec<Turn>` and go through
/// [`ConversationLog::from_turns`] to read one back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConversationLog {
    turns: Vec<Turn>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt a previously persisted turn sequence.
    ///
    /// Ordinals must run 1, 2, 3, … without gaps; anything else means the
    /// sequence was edited after the fact.
    pub fn from_turns(turns: Vec<Turn>) -> Result<Self, LogIntegrityError> {
        for (index, turn) in turns.iter().enumerate() {
            let expected = index as u64 + 1;
            if turn.ordinal != expected {
                return Err(LogIntegrityError::OrdinalGap {
                    index,
                    expected,
                    found: turn.ordinal,
                });
            }
        }
        Ok(Self { turns })
    }

    /// Append a turn and return it
    pub fn append(&mut self, speaker: Speaker, text: impl Into<String>) -> &Turn {
        let ordinal = self.turns.len() as u64 + 1;
        self.turns.push(Turn {
            speaker,
            text: text.into(),
            ordinal,
        });
        &self.turns[self.turns.len() - 1]
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// User turns in order
    pub fn user_messages(&self) -> impl Iterator<Item = &str> {
        self.turns
            .iter()
            .filter(|t| t.speaker == Speaker::User)
            .map(|t| t.text.as_str())
    }

    pub fn user_turn_count(&self) -> usize {
        self.user_messages().count()
    }
}
