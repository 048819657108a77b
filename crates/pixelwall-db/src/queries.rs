use std::collections::HashMap;

use anyhow::Result;
use rusqlite::Connection;
use tracing::warn;

use crate::Database;
use crate::models::{IdentityRow, PrivateMessageRow, PublicMessageRow, ResetLookupRow};
use pixelwall_types::canvas::Pixel;

/// Color value that removes a cell instead of painting it.
const ERASE: &str = "erase";

impl Database {
    // -- Canvas --

    /// Load the canvas snapshot, creating the singleton row on first touch.
    pub fn load_canvas(&self) -> Result<HashMap<String, String>> {
        self.with_conn(|conn| {
            ensure_canvas_row(conn)?;
            let raw: String = conn.query_row(
                "SELECT canvas_data FROM wall_canvas WHERE id = 1",
                [],
                |row| row.get(0),
            )?;
            Ok(parse_canvas(&raw))
        })
    }

    /// Merge a batch of edits into the snapshot. Later entries win over
    /// earlier ones for the same cell. The whole read-modify-write runs
    /// under one lock hold, so concurrent batches serialize cleanly.
    pub fn apply_pixels(&self, pixels: &[Pixel]) -> Result<()> {
        self.with_conn(|conn| {
            ensure_canvas_row(conn)?;
            let raw: String = conn.query_row(
                "SELECT canvas_data FROM wall_canvas WHERE id = 1",
                [],
                |row| row.get(0),
            )?;

            let mut canvas = parse_canvas(&raw);
            for pixel in pixels {
                let key = format!("{},{}", pixel.x, pixel.y);
                if pixel.color == ERASE {
                    canvas.remove(&key);
                } else {
                    canvas.insert(key, pixel.color.clone());
                }
            }

            let data = serde_json::to_string(&canvas)?;
            conn.execute(
                "UPDATE wall_canvas SET canvas_data = ?1, updated_at = datetime('now') WHERE id = 1",
                [&data],
            )?;
            Ok(())
        })
    }

    pub fn clear_canvas(&self) -> Result<()> {
        self.with_conn(|conn| {
            ensure_canvas_row(conn)?;
            conn.execute(
                "UPDATE wall_canvas SET canvas_data = '{}', updated_at = datetime('now') WHERE id = 1",
                [],
            )?;
            Ok(())
        })
    }

    // -- Identities --

    pub fn create_identity(&self, username: &str, password_hash: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chat_usernames (username, password_hash) VALUES (?1, ?2)",
                (username, password_hash),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Lookup is case-insensitive; the stored casing is returned as-is.
    pub fn get_identity(&self, username: &str) -> Result<Option<IdentityRow>> {
        self.with_conn(|conn| query_identity(conn, username))
    }

    pub fn stamp_last_login(&self, username: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE chat_usernames SET last_login = datetime('now')
                 WHERE LOWER(username) = LOWER(?1)",
                [username],
            )?;
            Ok(())
        })
    }

    /// `None` clears the stored address.
    pub fn set_email(&self, username: &str, email: Option<&str>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE chat_usernames SET email = ?2 WHERE LOWER(username) = LOWER(?1)",
                (username, email),
            )?;
            Ok(())
        })
    }

    pub fn set_profile_text(&self, username: &str, location: &str, bio: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE chat_usernames SET location = ?2, bio = ?3
                 WHERE LOWER(username) = LOWER(?1)",
                (username, location, bio),
            )?;
            Ok(())
        })
    }

    pub fn set_avatar(&self, username: &str, filename: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE chat_usernames SET avatar = ?2 WHERE LOWER(username) = LOWER(?1)",
                (username, filename),
            )?;
            Ok(())
        })
    }

    // -- Public messages --

    /// Insert and return the stored row, including the server-assigned
    /// timestamp.
    pub fn insert_public_message(&self, username: &str, message: &str) -> Result<PublicMessageRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chat_messages (username, message) VALUES (?1, ?2)",
                (username, message),
            )?;
            let id = conn.last_insert_rowid();
            let row = conn.query_row(
                "SELECT id, username, message, timestamp FROM chat_messages WHERE id = ?1",
                [id],
                map_public_message,
            )?;
            Ok(row)
        })
    }

    /// The newest `limit` public messages, oldest first.
    pub fn recent_public_messages(&self, limit: u32) -> Result<Vec<PublicMessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, message, timestamp FROM chat_messages
                 ORDER BY timestamp DESC, id DESC LIMIT ?1",
            )?;
            let mut rows = stmt
                .query_map([limit], map_public_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.reverse();
            Ok(rows)
        })
    }

    // -- Private messages --

    pub fn insert_private_message(
        &self,
        sender: &str,
        recipient: &str,
        message: &str,
    ) -> Result<PrivateMessageRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO private_messages (sender, recipient, message) VALUES (?1, ?2, ?3)",
                (sender, recipient, message),
            )?;
            let id = conn.last_insert_rowid();
            let row = conn.query_row(
                "SELECT id, sender, recipient, message, timestamp
                 FROM private_messages WHERE id = ?1",
                [id],
                map_private_message,
            )?;
            Ok(row)
        })
    }

    /// The newest `limit` messages between the pair in either direction,
    /// oldest first. The id tiebreak keeps same-second messages in insert
    /// order.
    pub fn recent_private_messages(
        &self,
        user_a: &str,
        user_b: &str,
        limit: u32,
    ) -> Result<Vec<PrivateMessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, sender, recipient, message, timestamp FROM private_messages
                 WHERE (sender = ?1 AND recipient = ?2) OR (sender = ?2 AND recipient = ?1)
                 ORDER BY timestamp DESC, id DESC LIMIT ?3",
            )?;
            let mut rows = stmt
                .query_map(rusqlite::params![user_a, user_b, limit], map_private_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.reverse();
            Ok(rows)
        })
    }

    // -- Reset tokens --

    /// Store a fresh token for the identity, retiring any earlier unused
    /// ones so only the newest link in an inbox works.
    pub fn create_reset_token(&self, username_id: i64, token: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE password_reset_tokens SET used = 1 WHERE username_id = ?1 AND used = 0",
                [username_id],
            )?;
            conn.execute(
                "INSERT INTO password_reset_tokens (username_id, token) VALUES (?1, ?2)",
                (username_id, token),
            )?;
            Ok(())
        })
    }

    /// Resolve a token that is unused and under an hour old.
    pub fn valid_reset_token(&self, token: &str) -> Result<Option<ResetLookupRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT t.id, t.username_id, u.username
                     FROM password_reset_tokens t
                     JOIN chat_usernames u ON u.id = t.username_id
                     WHERE t.token = ?1
                       AND t.used = 0
                       AND t.created_at > datetime('now', '-1 hour')",
                    [token],
                    |row| {
                        Ok(ResetLookupRow {
                            token_id: row.get(0)?,
                            username_id: row.get(1)?,
                            username: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Apply the new password and burn the token in one lock hold.
    pub fn consume_reset_token(
        &self,
        token_id: i64,
        username_id: i64,
        password_hash: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE chat_usernames SET password_hash = ?2 WHERE id = ?1",
                (username_id, password_hash),
            )?;
            conn.execute(
                "UPDATE password_reset_tokens SET used = 1 WHERE id = ?1",
                [token_id],
            )?;
            Ok(())
        })
    }
}

fn ensure_canvas_row(conn: &Connection) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO wall_canvas (id, canvas_data) VALUES (1, '{}')",
        [],
    )?;
    Ok(())
}

/// A corrupt snapshot falls back to an empty canvas rather than wedging
/// every connection.
fn parse_canvas(raw: &str) -> HashMap<String, String> {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!("Corrupt canvas snapshot ({} bytes): {}", raw.len(), e);
        HashMap::new()
    })
}

fn query_identity(conn: &Connection, username: &str) -> Result<Option<IdentityRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, username, password_hash, email, location, bio, avatar, last_login, created_at
         FROM chat_usernames WHERE LOWER(username) = LOWER(?1)",
    )?;

    let row = stmt
        .query_row([username], |row| {
            Ok(IdentityRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password_hash: row.get(2)?,
                email: row.get(3)?,
                location: row.get(4)?,
                bio: row.get(5)?,
                avatar: row.get(6)?,
                last_login: row.get(7)?,
                created_at: row.get(8)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn map_public_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<PublicMessageRow> {
    Ok(PublicMessageRow {
        id: row.get(0)?,
        username: row.get(1)?,
        message: row.get(2)?,
        timestamp: row.get(3)?,
    })
}

fn map_private_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<PrivateMessageRow> {
    Ok(PrivateMessageRow {
        id: row.get(0)?,
        sender: row.get(1)?,
        recipient: row.get(2)?,
        message: row.get(3)?,
        timestamp: row.get(4)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
