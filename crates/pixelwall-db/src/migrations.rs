use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS wall_canvas (
            id          INTEGER PRIMARY KEY CHECK (id = 1),
            canvas_data TEXT NOT NULL DEFAULT '{}',
            updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS chat_usernames (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            username      TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            email         TEXT,
            location      TEXT NOT NULL DEFAULT '',
            bio           TEXT NOT NULL DEFAULT '',
            avatar        TEXT,
            last_login    TEXT,
            created_at    TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Reservation uniqueness is case-insensitive
        CREATE UNIQUE INDEX IF NOT EXISTS idx_chat_usernames_lower
            ON chat_usernames(LOWER(username));

        CREATE TABLE IF NOT EXISTS chat_messages (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            username    TEXT NOT NULL,
            message     TEXT NOT NULL,
            timestamp   TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_chat_messages_timestamp
            ON chat_messages(timestamp);

        CREATE TABLE IF NOT EXISTS private_messages (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            sender      TEXT NOT NULL,
            recipient   TEXT NOT NULL,
            message     TEXT NOT NULL,
            timestamp   TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_private_messages_pair
            ON private_messages(sender, recipient, timestamp);

        CREATE TABLE IF NOT EXISTS password_reset_tokens (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            username_id INTEGER NOT NULL REFERENCES chat_usernames(id) ON DELETE CASCADE,
            token       TEXT NOT NULL UNIQUE,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            used        INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_reset_tokens_username
            ON password_reset_tokens(username_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
