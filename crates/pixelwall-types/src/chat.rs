use serde::{Deserialize, Serialize};

use crate::models::PrivateMessage;

/// Frames sent FROM client TO server on the chat channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatClientFrame {
    /// Post a public message under the given display name
    ChatMessage { username: String, message: String },

    /// Send a private message to another user
    PrivateMessage { to: String, message: String },

    /// Fetch the recent private conversation with another user
    GetPrivateHistory { with_user: String },

    /// Announce (or change) this connection's display name.
    /// `offline: true` keeps the name bound but hides it from the roster.
    PresenceUpdate {
        username: String,
        #[serde(default)]
        offline: bool,
    },

    /// Re-authenticate with a previously issued identity token
    TokenLogin { token: String },

    /// Ask whether a name is reserved and how
    CheckUsername { username: String },

    /// Reserve the name with a password
    ReserveUsername { username: String, password: String },

    /// Log in to a reserved name
    AuthUsername { username: String, password: String },

    /// Attach a recovery email to a reserved name (empty string clears it)
    SaveEmail { username: String, email: String },

    /// Request a password-reset email
    ForgotPassword { username: String },
}

/// Frames sent FROM server TO clients on the chat channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatServerFrame {
    /// Current visible roster, re-sent in full after every change
    PresenceList { users: Vec<String> },

    /// A public message, broadcast to the whole room
    Message {
        username: String,
        message: String,
        timestamp: String,
    },

    /// A private message, delivered to sender and recipient only
    PrivateMessage {
        from: String,
        to: String,
        message: String,
        timestamp: String,
    },

    /// Recent private conversation, oldest first
    PrivateHistory {
        with_user: String,
        messages: Vec<PrivateMessage>,
    },

    /// Answer to CheckUsername. Echoes the name so clients can match
    /// responses to requests.
    UsernameStatus {
        username: String,
        taken: bool,
        password_protected: bool,
        has_email: bool,
    },

    /// Outcome of ReserveUsername
    ReserveResult {
        success: bool,
        token: Option<String>,
        error: Option<String>,
    },

    /// Outcome of AuthUsername
    AuthResult {
        success: bool,
        token: Option<String>,
        has_email: Option<bool>,
        error: Option<String>,
    },

    /// Outcome of SaveEmail
    EmailResult { success: bool, message: String },

    /// Outcome of ForgotPassword. The success message never reveals whether
    /// the name exists or has an email on file.
    ForgotPasswordResult { success: bool, message: String },

    /// Outcome of TokenLogin. Failure carries no reason.
    TokenLoginResult {
        success: bool,
        username: Option<String>,
    },
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
