use pixelwall_types::models::{PrivateMessage, PublicMessage};

use crate::{ChatEngine, ChatError, clean_message, clean_name, display_time};

/// How much of a private conversation gets replayed on request.
const PRIVATE_HISTORY_LIMIT: u32 = 50;

impl ChatEngine {
    /// Persist a public message and return the broadcast payload with the
    /// server-assigned timestamp. A message that is empty once trimmed is
    /// dropped without error — `None` means nothing to broadcast.
    pub async fn post_public(
        &self,
        username: &str,
        message: &str,
    ) -> Result<Option<PublicMessage>, ChatError> {
        let username = clean_name(username);
        let message = clean_message(message);
        if message.is_empty() {
            return Ok(None);
        }

        let row = self
            .store(move |db| db.insert_public_message(&username, &message))
            .await?;

        Ok(Some(PublicMessage {
            username: row.username,
            message: row.message,
            timestamp: display_time(&row.timestamp),
        }))
    }

    /// Persist a private message and return the delivery payload. Routing to
    /// the two parties' connections is the gateway's job.
    pub async fn post_private(
        &self,
        sender: &str,
        to: &str,
        message: &str,
    ) -> Result<Option<PrivateMessage>, ChatError> {
        let sender = sender.to_string();
        let recipient = clean_name(to);
        let message = clean_message(message);
        if message.is_empty() {
            return Ok(None);
        }

        let row = self
            .store(move |db| db.insert_private_message(&sender, &recipient, &message))
            .await?;

        Ok(Some(PrivateMessage {
            from: row.sender,
            to: row.recipient,
            message: row.message,
            timestamp: display_time(&row.timestamp),
        }))
    }

    /// The recent conversation between two users, oldest first, regardless
    /// of who sent what.
    pub async fn private_history(
        &self,
        user: &str,
        with_user: &str,
    ) -> Result<Vec<PrivateMessage>, ChatError> {
        let user = user.to_string();
        let with_user = clean_name(with_user);

        let rows = self
            .store(move |db| db.recent_private_messages(&user, &with_user, PRIVATE_HISTORY_LIMIT))
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| PrivateMessage {
                from: row.sender,
                to: row.recipient,
                message: row.message,
                timestamp: display_time(&row.timestamp),
            })
            .collect())
    }

    /// Recent public messages, oldest first. Used to seed page renders.
    pub async fn recent_messages(&self, limit: u32) -> Result<Vec<PublicMessage>, ChatError> {
        let rows = self
            .store(move |db| db.recent_public_messages(limit))
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| PublicMessage {
                username: row.username,
                message: row.message,
                timestamp: display_time(&row.timestamp),
            })
            .collect())
    }
}
