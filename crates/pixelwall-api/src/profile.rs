use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;

use pixelwall_chat::ChatError;
use pixelwall_chat::names;
use pixelwall_chat::profile::ProfileUpdate;
use pixelwall_types::api::{GuestNameResponse, UpdateProfileRequest, UpdateProfileResponse};
use pixelwall_types::models::Profile;

use crate::AppState;

/// GET /api/profile/{username} — public view, no auth.
pub async fn get_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Profile>, StatusCode> {
    let profile = state
        .engine
        .get_profile(&username)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(profile))
}

/// POST /api/profile — token-authenticated update. A well-formed request
/// with a broken image still applies the text fields and reports the avatar
/// problem in the body; only transport-level garbage is an HTTP error.
pub async fn update_profile(
    State(state): State<AppState>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UpdateProfileResponse>, StatusCode> {
    let avatar = match req.avatar {
        Some(encoded) => Some(B64.decode(encoded.as_bytes()).map_err(|_| StatusCode::BAD_REQUEST)?),
        None => None,
    };

    let outcome = state
        .engine
        .update_profile(
            &req.token,
            ProfileUpdate {
                location: req.location,
                bio: req.bio,
                avatar,
            },
        )
        .await
        .map_err(|e| match e {
            ChatError::InvalidToken => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        })?;

    Ok(Json(UpdateProfileResponse {
        success: true,
        avatar_error: outcome.avatar_error,
    }))
}

/// GET /api/guest-name — a fresh suggestion for the name box.
pub async fn guest_name() -> Json<GuestNameResponse> {
    Json(GuestNameResponse {
        username: names::guest_name(),
    })
}
