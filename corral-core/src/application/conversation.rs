//! Append-only conversation log.

use crate::types::{Block, Role, Turn};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Ordered log of turns for one session.
///
/// Turns are never edited once appended; readers always get copies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationStore {
    turns: Vec<Turn>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_user(&mut self, text: impl Into<String>) {
        self.push(Turn::user_text(text));
    }

    pub fn append_assistant(&mut self, blocks: Vec<Block>) {
        if blocks.is_empty() {
            return;
        }
        self.push(Turn::new(Role::Assistant, blocks));
    }

    pub fn append_tool_result(&mut self, tool_use_id: impl Into<String>, content: impl Into<String>) {
        self.push(Turn::new(
            Role::User,
            vec![Block::tool_result(tool_use_id, content)],
        ));
    }

    pub fn append_tool_error(&mut self, tool_use_id: impl Into<String>, content: impl Into<String>) {
        self.push(Turn::new(
            Role::User,
            vec![Block::tool_error(tool_use_id, content)],
        ));
    }

    fn push(&mut self, turn: Turn) {
        debug!(
            role = turn.role.as_str(),
            blocks = turn.blocks.len(),
            position = self.turns.len(),
            "Appending conversation turn"
        );
        self.turns.push(turn);
    }

    /// An isolated copy of the full log.
    pub fn get_messages(&self) -> Vec<Turn> {
        self.turns.clone()
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

    /// The newest `window` turns.
    pub fn recent(&self, window: usize) -> Vec<Turn> {
        let start = self.turns.len().saturating_sub(window);
        self.slice_from(start)
    }

    /// The newest turns whose rough token estimate fits within `limit`.
    pub fn recent_within_tokens(&self, limit: usize) -> Vec<Turn> {
        let mut total = 0usize;
        let mut start = self.turns.len();
        for (index, turn) in self.turns.iter().enumerate().rev() {
            let estimate = rough_token_estimate(turn);
            if total + estimate > limit {
                break;
            }
            total += estimate;
            start = index;
        }
        self.slice_from(start)
    }

    fn slice_from(&self, mut start: usize) -> Vec<Turn> {
        // A window must not open on a tool_result whose tool_use was cut off.
        while start < self.turns.len() && self.turns[start].is_tool_result() {
            start += 1;
        }
        self.turns[start..].to_vec()
    }
}

/// Serialized length divided by four.
pub fn rough_token_estimate(turn: &Turn) -> usize {
    let length = match turn.blocks.as_slice() {
        [Block::Text { text }] => text.len(),
        blocks => serde_json::to_string(blocks)
            .map(|encoded| encoded.len())
            .unwrap_or_default(),
    };
    length / 4
}
