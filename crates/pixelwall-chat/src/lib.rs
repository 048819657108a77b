pub mod error;
pub mod identity;
pub mod mailer;
pub mod messaging;
pub mod names;
pub mod profile;
pub mod reset;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::error;

use pixelwall_auth::TokenSigner;
use pixelwall_db::Database;

pub use error::ChatError;
pub use mailer::{Mailer, MailerError, ResendMailer};

/// Everything the chat side of the wall can do, independent of how clients
/// reach it (WebSocket sessions and the HTTP surface both call in here).
/// Holds no per-connection state; identity binding and presence live with
/// the gateway.
pub struct ChatEngine {
    db: Arc<Database>,
    signer: TokenSigner,
    mailer: Option<Arc<dyn Mailer>>,
    avatar_dir: PathBuf,
    public_url: String,
}

impl ChatEngine {
    pub fn new(
        db: Arc<Database>,
        signer: TokenSigner,
        mailer: Option<Arc<dyn Mailer>>,
        avatar_dir: PathBuf,
        public_url: String,
    ) -> Self {
        Self {
            db,
            signer,
            mailer,
            avatar_dir,
            public_url,
        }
    }

    /// Run a blocking store closure off the async runtime. Store failures are
    /// logged here and collapse to the generic internal error — callers only
    /// branch on domain outcomes.
    pub(crate) async fn store<T, F>(&self, f: F) -> Result<T, ChatError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ChatError::Internal
            })?
            .map_err(|e| {
                error!("store error: {}", e);
                ChatError::Internal
            })
    }
}

/// Display names are trimmed and capped at 50 characters everywhere they
/// enter the system.
pub(crate) fn clean_name(raw: &str) -> String {
    raw.trim().chars().take(50).collect()
}

pub(crate) fn clean_message(raw: &str) -> String {
    raw.trim().chars().take(500).collect()
}

/// Wire timestamps are the `HH:MM` (UTC) the chat widget renders directly.
pub(crate) fn display_time(stored: &str) -> String {
    pixelwall_db::models::parse_timestamp(stored)
        .format("%H:%M")
        .to_string()
}
