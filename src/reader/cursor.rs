//! Shard iterator lifecycle
//!
//! A shard iterator is an opaque token that silently expires on the service
//! side. [`Cursor`] keeps the token private to its shard reader and only
//! answers two questions: is there a live token, and where should a new one
//! start.

use crate::client::ShardPosition;

#[derive(Debug, Clone, PartialEq, Eq)]
enum CursorState {
    /// No token; the next fetch must issue one
    NeedsIssue,
    Live(String),
    /// The service reported the end of the shard
    Closed,
}

#[derive(Debug, Clone)]
pub(crate) struct Cursor {
    initial: ShardPosition,
    state: CursorState,
}

impl Cursor {
    pub(crate) fn new(initial: ShardPosition) -> Self {
        Self {
            initial,
            state: CursorState::NeedsIssue,
        }
    }

    pub(crate) fn token(&self) -> Option<&str> {
        match &self.state {
            CursorState::Live(token) => Some(token),
            _ => None,
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state == CursorState::Closed
    }

    /// Position for a fresh token. Once anything has been consumed the
    /// reader's own progress wins over the configured starting position.
    pub(crate) fn reissue_position(&self, last_sequence_number: Option<&str>) -> ShardPosition {
        match last_sequence_number {
            Some(seq) => ShardPosition::AfterSequenceNumber(seq.to_string()),
            None => self.initial.clone(),
        }
    }

    pub(crate) fn issued(&mut self, token: String) {
        self.state = CursorState::Live(token);
    }

    /// Stores the continuation token from a fetch; `None` closes the cursor
    pub(crate) fn advance(&mut self, next: Option<String>) {
        self.state = match next {
            Some(token) => CursorState::Live(token),
            None => CursorState::Closed,
        };
    }

    pub(crate) fn expire(&mut self) {
        self.state = CursorState::NeedsIssue;
    }
}
