use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;

/// What one connection has told us about who it is.
#[derive(Debug, Clone)]
struct PresenceEntry {
    username: String,
    offline: bool,
}

/// Who is on the wall right now. Keyed by connection, not username — two
/// tabs with the same name are two entries that collapse to one roster row.
/// Single-process state: a second server instance would have its own view.
#[derive(Default)]
pub struct PresenceTracker {
    entries: RwLock<HashMap<Uuid, PresenceEntry>>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or update) what a connection calls itself. `offline: true`
    /// keeps the binding but hides it from the roster.
    pub async fn upsert(&self, conn_id: Uuid, username: String, offline: bool) {
        self.entries
            .write()
            .await
            .insert(conn_id, PresenceEntry { username, offline });
    }

    /// Drop a connection's entry. Returns true if there was one — callers
    /// only rebroadcast the roster when something actually changed.
    pub async fn remove(&self, conn_id: Uuid) -> bool {
        self.entries.write().await.remove(&conn_id).is_some()
    }

    /// The roster: every visible name once, sorted case-insensitively with
    /// exact ordering as the tiebreak so equal-but-for-case names are stable.
    pub async fn visible_usernames(&self) -> Vec<String> {
        let entries = self.entries.read().await;
        let mut users: Vec<String> = entries
            .values()
            .filter(|entry| !entry.offline)
            .map(|entry| entry.username.clone())
            .collect();
        users.sort_by(|a, b| {
            a.to_lowercase()
                .cmp(&b.to_lowercase())
                .then_with(|| a.cmp(b))
        });
        users.dedup();
        users
    }
}
