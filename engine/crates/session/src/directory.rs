use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::SessionId;

/// What other sessions may know about a live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnlineEntry {
    pub account_id: i64,
    pub username: String,
    pub character_name: Option<String>,
}

/// Shared registry of logged-in sessions. Each session writes only its own
/// entry; others read it for `who` and duplicate-login checks.
#[derive(Debug, Default)]
pub struct SessionDirectory {
    entries: Mutex<BTreeMap<SessionId, OnlineEntry>>,
}

impl SessionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<SessionId, OnlineEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a session for an account. Fails if another session already
    /// holds the account.
    pub fn claim_account(&self, session_id: SessionId, account_id: i64, username: &str) -> bool {
        let mut entries = self.lock();
        let taken = entries
            .iter()
            .any(|(sid, e)| *sid != session_id && e.account_id == account_id);
        if taken {
            return false;
        }
        entries.insert(
            session_id,
            OnlineEntry {
                account_id,
                username: username.to_string(),
                character_name: None,
            },
        );
        true
    }

    pub fn set_character(&self, session_id: SessionId, name: &str) {
        if let Some(entry) = self.lock().get_mut(&session_id) {
            entry.character_name = Some(name.to_string());
        }
    }

    pub fn release(&self, session_id: SessionId) -> Option<OnlineEntry> {
        self.lock().remove(&session_id)
    }

    pub fn is_character_online(&self, name: &str) -> bool {
        self.lock().values().any(|e| {
            e.character_name
                .as_deref()
                .is_some_and(|n| n.eq_ignore_ascii_case(name))
        })
    }

    /// Names of characters in play, sorted by session.
    pub fn online_characters(&self) -> Vec<String> {
        self.lock()
            .values()
            .filter_map(|e| e.character_name.clone())
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.lock().len()
    }
}
