//! In-memory conversation store

use super::traits::ConversationStore;
use crate::state_machine::ConversationState;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

struct Entry {
    state: ConversationState,
    last_seen: DateTime<Utc>,
}

/// Process-local map of conversations. Nothing survives a restart.
pub struct InMemoryStore {
    entries: HashMap<String, Entry>,
    /// `None` keeps conversations forever
    idle_ttl: Option<Duration>,
}

impl InMemoryStore {
    pub fn new(idle_ttl: Option<Duration>) -> Self {
        Self {
            entries: HashMap::new(),
            idle_ttl,
        }
    }

    #[cfg(test)]
    pub fn get(&self, user_id: &str) -> Option<&ConversationState> {
        self.entries.get(user_id).map(|e| &e.state)
    }
}

impl ConversationStore for InMemoryStore {
    fn get_or_create(&mut self, user_id: &str, now: DateTime<Utc>) -> ConversationState {
        let entry = self.entries.entry(user_id.to_string()).or_insert_with(|| {
            tracing::debug!(user_id = %user_id, "New conversation");
            Entry {
                state: ConversationState::new(user_id),
                last_seen: now,
            }
        });
        entry.last_seen = now;
        entry.state.clone()
    }

    fn save(&mut self, state: ConversationState, now: DateTime<Utc>) {
        self.entries.insert(
            state.user_id.clone(),
            Entry {
                state,
                last_seen: now,
            },
        );
    }

    fn evict_idle(&mut self, now: DateTime<Utc>) -> usize {
        let Some(ttl) = self.idle_ttl else {
            return 0;
        };
        let before = self.entries.len();
        self.entries.retain(|_, e| now - e.last_seen <= ttl);
        before - self.entries.len()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
