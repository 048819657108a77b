use tracing::{error, info};

use crate::{ChatEngine, ChatError, clean_name};

const MIN_PASSWORD_CHARS: usize = 4;

pub struct UsernameStatus {
    pub username: String,
    pub taken: bool,
    pub password_protected: bool,
    pub has_email: bool,
}

#[derive(Debug)]
pub struct AuthSuccess {
    pub token: String,
    pub has_email: bool,
}

impl ChatEngine {
    /// Anyone may ask whether a name is reserved. Reserved names always have
    /// a password here, so `password_protected` tracks `taken`.
    pub async fn check_username(&self, username: &str) -> Result<UsernameStatus, ChatError> {
        let username = username.trim().to_string();
        let row = {
            let name = username.clone();
            self.store(move |db| db.get_identity(&name)).await?
        };

        Ok(match row {
            Some(row) => UsernameStatus {
                username,
                taken: true,
                password_protected: true,
                has_email: row.email.is_some(),
            },
            None => UsernameStatus {
                username,
                taken: false,
                password_protected: false,
                has_email: false,
            },
        })
    }

    /// Reserve a name and hand back an identity token. The taken check runs
    /// before the password check — a taken name reports as taken even when
    /// the offered password is also bad.
    pub async fn reserve(&self, username: &str, password: &str) -> Result<String, ChatError> {
        let username = clean_name(username);

        let existing = {
            let name = username.clone();
            self.store(move |db| db.get_identity(&name)).await?
        };
        if existing.is_some() {
            return Err(ChatError::AlreadyReserved);
        }
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(ChatError::PasswordTooShort);
        }

        let password_hash = pixelwall_auth::hash_password(password);
        {
            let name = username.clone();
            self.store(move |db| db.create_identity(&name, &password_hash).map(|_| ()))
                .await?;
        }

        let token = self.issue_token(&username)?;
        info!("Reserved username '{}'", username);
        Ok(token)
    }

    /// Log in to a reserved name. The two failure cases are reported
    /// distinctly: check_username already discloses which names exist, so
    /// a combined message would hide nothing.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<AuthSuccess, ChatError> {
        let username = clean_name(username);

        let row = {
            let name = username.clone();
            self.store(move |db| db.get_identity(&name)).await?
        }
        .ok_or(ChatError::UsernameNotFound)?;

        if !pixelwall_auth::verify_password(password, &row.password_hash) {
            return Err(ChatError::WrongPassword);
        }

        {
            let name = row.username.clone();
            self.store(move |db| db.stamp_last_login(&name)).await?;
        }

        // Tokens carry the stored casing, not whatever the user typed
        let token = self.issue_token(&row.username)?;
        info!("'{}' logged in", row.username);
        Ok(AuthSuccess {
            token,
            has_email: row.email.is_some(),
        })
    }

    /// Re-authenticate with a stored token. Any failure — bad signature,
    /// expiry, or a name that is no longer reserved — is silent.
    pub async fn token_login(&self, token: &str) -> Option<String> {
        let username = self.signer.resolve(token)?;

        let row = {
            let name = username.clone();
            self.store(move |db| db.get_identity(&name)).await.ok()?
        }?;

        {
            let name = row.username.clone();
            self.store(move |db| db.stamp_last_login(&name)).await.ok()?;
        }

        Some(row.username)
    }

    /// Attach (or with an empty string, clear) the recovery email for a
    /// reserved name. Returns the confirmation message to show.
    pub async fn save_email(&self, username: &str, email: &str) -> Result<String, ChatError> {
        let username = clean_name(username);
        let email = email.trim().to_string();

        let row = {
            let name = username.clone();
            self.store(move |db| db.get_identity(&name)).await?
        }
        .ok_or(ChatError::UsernameNotFound)?;

        if email.is_empty() {
            let name = row.username.clone();
            self.store(move |db| db.set_email(&name, None)).await?;
            return Ok("Email removed.".to_string());
        }

        if !is_valid_email(&email) {
            return Err(ChatError::InvalidEmail);
        }

        {
            let name = row.username.clone();
            let addr = email.clone();
            self.store(move |db| db.set_email(&name, Some(&addr))).await?;
        }
        Ok("Email saved.".to_string())
    }

    pub(crate) fn issue_token(&self, username: &str) -> Result<String, ChatError> {
        self.signer.issue(username).map_err(|e| {
            error!("Token issue failed for '{}': {}", username, e);
            ChatError::Internal
        })
    }
}

/// Minimal shape check: one `@`, nonempty local part, and a domain with a
/// dot that has something on both sides. Deliverability is the mail
/// provider's problem.
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}
