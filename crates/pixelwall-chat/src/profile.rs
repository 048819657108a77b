use std::path::PathBuf;

use tracing::{info, warn};

use pixelwall_types::models::Profile;

use crate::{ChatEngine, ChatError};

/// Avatars are fitted inside this square, never upscaled.
pub const AVATAR_SIZE: u32 = 120;

const MAX_LOCATION_CHARS: usize = 100;
const MAX_BIO_CHARS: usize = 500;

/// Fields to change. `None` leaves the stored value alone.
#[derive(Default)]
pub struct ProfileUpdate {
    pub location: Option<String>,
    pub bio: Option<String>,
    /// Raw image bytes in whatever format the uploader had
    pub avatar: Option<Vec<u8>>,
}

#[derive(Debug)]
pub struct ProfileUpdateOutcome {
    pub username: String,
    /// Set when the text fields went through but the avatar did not
    pub avatar_error: Option<String>,
}

#[derive(Debug, thiserror::Error)]
enum AvatarError {
    #[error("Could not read that image.")]
    Decode,
    #[error("Could not store the avatar.")]
    Store,
}

impl ChatEngine {
    pub async fn get_profile(&self, username: &str) -> Result<Option<Profile>, ChatError> {
        let name = username.trim().to_string();
        let row = self.store(move |db| db.get_identity(&name)).await?;

        Ok(row.map(|row| Profile {
            username: row.username,
            location: row.location,
            bio: row.bio,
            avatar_url: row.avatar.map(|file| format!("/media/avatars/{file}")),
            last_seen: row
                .last_login
                .map(|raw| format_last_seen(&raw))
                .unwrap_or_else(|| "Never".to_string()),
        }))
    }

    /// Apply a profile update for the token's owner. A rejected avatar does
    /// not roll back the text fields — the outcome reports it separately so
    /// the caller can tell the user exactly what happened.
    pub async fn update_profile(
        &self,
        token: &str,
        update: ProfileUpdate,
    ) -> Result<ProfileUpdateOutcome, ChatError> {
        let username = self
            .signer
            .resolve(token)
            .ok_or(ChatError::InvalidToken)?;

        let row = {
            let name = username.clone();
            self.store(move |db| db.get_identity(&name)).await?
        }
        // A valid token for a name that is no longer reserved is still a dead token
        .ok_or(ChatError::InvalidToken)?;

        if update.location.is_some() || update.bio.is_some() {
            let location = match update.location {
                Some(value) => value.trim().chars().take(MAX_LOCATION_CHARS).collect(),
                None => row.location.clone(),
            };
            let bio = match update.bio {
                Some(value) => value.trim().chars().take(MAX_BIO_CHARS).collect::<String>(),
                None => row.bio.clone(),
            };
            let name = row.username.clone();
            self.store(move |db| db.set_profile_text(&name, &location, &bio))
                .await?;
        }

        let avatar_error = match update.avatar {
            Some(bytes) => match self.store_avatar(row.username.clone(), bytes).await {
                Ok(filename) => {
                    let name = row.username.clone();
                    self.store(move |db| db.set_avatar(&name, &filename)).await?;
                    None
                }
                Err(e) => Some(e.to_string()),
            },
            None => None,
        };

        info!("Profile updated for '{}'", row.username);
        Ok(ProfileUpdateOutcome {
            username: row.username,
            avatar_error,
        })
    }

    /// Decode, fit inside the avatar square, and store as PNG under a stable
    /// per-username filename so a re-upload replaces the old file.
    async fn store_avatar(&self, username: String, bytes: Vec<u8>) -> Result<String, AvatarError> {
        let filename = format!("{}.png", avatar_stem(&username));
        let dir = self.avatar_dir.clone();
        let path: PathBuf = dir.join(&filename);

        let result = tokio::task::spawn_blocking(move || -> Result<(), AvatarError> {
            let img = image::load_from_memory(&bytes).map_err(|e| {
                warn!("Avatar for '{}' failed to decode: {}", username, e);
                AvatarError::Decode
            })?;

            // RGBA keeps transparency through the resize and re-encode
            let img = image::DynamicImage::ImageRgba8(img.to_rgba8());
            let img = if img.width() > AVATAR_SIZE || img.height() > AVATAR_SIZE {
                img.resize(AVATAR_SIZE, AVATAR_SIZE, image::imageops::FilterType::Lanczos3)
            } else {
                img
            };

            std::fs::create_dir_all(&dir).map_err(|e| {
                warn!("Avatar dir {} not writable: {}", dir.display(), e);
                AvatarError::Store
            })?;
            img.save_with_format(&path, image::ImageFormat::Png)
                .map_err(|e| {
                    warn!("Avatar write to {} failed: {}", path.display(), e);
                    AvatarError::Store
                })?;
            Ok(())
        })
        .await;

        match result {
            Ok(Ok(())) => Ok(filename),
            Ok(Err(e)) => Err(e),
            Err(e) => {
                warn!("Avatar task join error: {}", e);
                Err(AvatarError::Store)
            }
        }
    }
}

/// Usernames are unrestricted text but avatar names become path components,
/// so everything outside [a-z0-9_-] maps to '_'.
fn avatar_stem(username: &str) -> String {
    let stem: String = username
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if stem.is_empty() { "anon".to_string() } else { stem }
}

fn format_last_seen(stored: &str) -> String {
    pixelwall_db::models::parse_timestamp(stored)
        .format("%b %-d, %Y %H:%M UTC")
        .to_string()
}
