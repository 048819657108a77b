use serde::{Deserialize, Serialize};

/// A public chat message as it goes over the wire. `timestamp` is the
/// server-assigned `HH:MM` (UTC) display string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicMessage {
    pub username: String,
    pub message: String,
    pub timestamp: String,
}

/// A private message as it goes over the wire, both for live delivery and
/// history replay. Same `HH:MM` display timestamp as public messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivateMessage {
    pub from: String,
    pub to: String,
    pub message: String,
    pub timestamp: String,
}

/// Public profile view for a reserved name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    pub location: String,
    pub bio: String,
    /// URL path of the stored avatar, `None` if never uploaded
    pub avatar_url: Option<String>,
    /// Human-formatted last login, or `"Never"`
    pub last_seen: String,
}
