//! HTTP handlers for everything on the wall that is not a WebSocket:
//! profile pages, the guest-name generator, and the password-reset pages.

pub mod profile;
pub mod reset;

use std::sync::Arc;

use pixelwall_chat::ChatEngine;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub engine: Arc<ChatEngine>,
}
