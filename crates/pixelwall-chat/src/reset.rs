use rand::RngCore;
use tracing::{error, info, warn};

use crate::{ChatEngine, ChatError};

/// The one answer forgot_password gives for missing names, names without an
/// email, and names where a mail actually went out. Anything more specific
/// would let anyone probe which names have recovery set up.
pub const RESET_SENT_MESSAGE: &str =
    "If that username has an email on file, a reset link is on the way.";

const MIN_PASSWORD_CHARS: usize = 4;

impl ChatEngine {
    /// Kick off a password reset. Eligible requests rotate the stored token
    /// and send a fresh link; everything else quietly pretends to.
    /// Only a real delivery problem surfaces as an error.
    pub async fn forgot_password(&self, username: &str) -> Result<String, ChatError> {
        let username = username.trim().to_string();

        let row = {
            let name = username.clone();
            self.store(move |db| db.get_identity(&name)).await?
        };

        let Some(row) = row else {
            return Ok(RESET_SENT_MESSAGE.to_string());
        };
        let Some(email) = row.email.clone() else {
            return Ok(RESET_SENT_MESSAGE.to_string());
        };
        let Some(mailer) = self.mailer.clone() else {
            warn!(
                "Password reset requested for '{}' but no mailer is configured",
                row.username
            );
            return Err(ChatError::EmailDelivery);
        };

        let token = generate_reset_token();
        {
            let id = row.id;
            let value = token.clone();
            self.store(move |db| db.create_reset_token(id, &value)).await?;
        }

        let reset_url = format!("{}/reset/{}", self.public_url.trim_end_matches('/'), token);
        mailer
            .send_password_reset(&email, &row.username, &reset_url)
            .await
            .map_err(|e| {
                error!("Reset email for '{}' failed: {}", row.username, e);
                ChatError::EmailDelivery
            })?;

        info!("Sent password reset email for '{}'", row.username);
        Ok(RESET_SENT_MESSAGE.to_string())
    }

    /// Complete a reset from the emailed link. The token is only burned on
    /// success, so a user who fumbles the form can resubmit the same link.
    /// Returns the username for the confirmation page.
    pub async fn confirm_password_reset(
        &self,
        token: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<String, ChatError> {
        let lookup = {
            let value = token.to_string();
            self.store(move |db| db.valid_reset_token(&value)).await?
        }
        .ok_or(ChatError::InvalidResetToken)?;

        if new_password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(ChatError::PasswordTooShort);
        }
        if new_password != confirm_password {
            return Err(ChatError::PasswordMismatch);
        }

        let password_hash = pixelwall_auth::hash_password(new_password);
        {
            let token_id = lookup.token_id;
            let username_id = lookup.username_id;
            self.store(move |db| db.consume_reset_token(token_id, username_id, &password_hash))
                .await?;
        }

        info!("Password reset completed for '{}'", lookup.username);
        Ok(lookup.username)
    }
}

/// 32 random bytes, hex-encoded. Fits the 64-char token column and is far
/// too wide to guess within the one-hour window.
fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_tokens_are_64_hex_chars_and_unique() {
        let a = generate_reset_token();
        let b = generate_reset_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
