use serde::{Deserialize, Serialize};

// -- Profile --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    /// Identity token issued at reserve/login time
    pub token: String,
    pub location: Option<String>,
    pub bio: Option<String>,
    /// Base64-encoded image bytes; any format the decoder recognizes
    pub avatar: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateProfileResponse {
    pub success: bool,
    /// Set when the text fields were applied but the avatar was rejected
    pub avatar_error: Option<String>,
}

// -- Guest names --

#[derive(Debug, Serialize, Deserialize)]
pub struct GuestNameResponse {
    pub username: String,
}
