//! Server assembly: configuration, shared state, and the axum router.
//! `main.rs` serves this; the integration tests serve it from an ephemeral
//! port with their own engine wiring.

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

use pixelwall_api::{AppState, AppStateInner};
use pixelwall_auth::TokenSigner;
use pixelwall_chat::{ChatEngine, Mailer, ResendMailer};
use pixelwall_db::Database;
use pixelwall_gateway::{Dispatcher, canvas, chat};

/// Everything read from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub token_secret: String,
    pub avatar_dir: PathBuf,
    /// Origin used in emailed links, e.g. "https://wall.example.com"
    pub public_url: String,
    pub resend_api_key: Option<String>,
    pub email_from: Option<String>,
}

impl Config {
    /// Read configuration from WALL_* environment variables, with dev
    /// defaults for everything except the mail credentials.
    pub fn from_env() -> anyhow::Result<Self> {
        let port: u16 = std::env::var("WALL_PORT")
            .unwrap_or_else(|_| "8000".into())
            .parse()?;

        Ok(Self {
            host: std::env::var("WALL_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port,
            db_path: std::env::var("WALL_DB_PATH")
                .unwrap_or_else(|_| "wall.db".into())
                .into(),
            token_secret: std::env::var("WALL_TOKEN_SECRET")
                .unwrap_or_else(|_| "dev-secret-change-me".into()),
            avatar_dir: std::env::var("WALL_AVATAR_DIR")
                .unwrap_or_else(|_| "avatars".into())
                .into(),
            public_url: std::env::var("WALL_PUBLIC_URL")
                .unwrap_or_else(|_| "http://localhost:8000".into()),
            resend_api_key: std::env::var("RESEND_API_KEY").ok(),
            email_from: std::env::var("WALL_EMAIL_FROM").ok(),
        })
    }
}

/// State for the WebSocket routes. The plain HTTP handlers get the smaller
/// api state instead.
#[derive(Clone)]
pub struct ServerState {
    pub db: Arc<Database>,
    pub engine: Arc<ChatEngine>,
    pub dispatcher: Dispatcher,
}

/// Open the store, wire up the engine, and build the full router.
pub fn build_app(config: &Config) -> anyhow::Result<Router> {
    let db = Arc::new(Database::open(&config.db_path)?);

    let mailer: Option<Arc<dyn Mailer>> = match (&config.resend_api_key, &config.email_from) {
        (Some(key), Some(from)) => Some(Arc::new(ResendMailer::new(key, from.clone()))),
        _ => {
            warn!("RESEND_API_KEY / WALL_EMAIL_FROM not set, password reset emails are disabled");
            None
        }
    };

    let engine = Arc::new(ChatEngine::new(
        db.clone(),
        TokenSigner::new(config.token_secret.clone()),
        mailer,
        config.avatar_dir.clone(),
        config.public_url.clone(),
    ));

    Ok(build_router(db, engine, Dispatcher::new(), &config.avatar_dir))
}

/// Assemble the router from prebuilt parts. Kept separate from `build_app`
/// so tests can inject their own mailer and storage paths.
pub fn build_router(
    db: Arc<Database>,
    engine: Arc<ChatEngine>,
    dispatcher: Dispatcher,
    avatar_dir: &Path,
) -> Router {
    let app_state: AppState = Arc::new(AppStateInner {
        engine: engine.clone(),
    });
    let state = ServerState {
        db,
        engine,
        dispatcher,
    };

    let http_routes = Router::new()
        .route("/api/profile/{username}", get(pixelwall_api::profile::get_profile))
        .route("/api/profile", post(pixelwall_api::profile::update_profile))
        .route("/api/guest-name", get(pixelwall_api::profile::guest_name))
        .route("/reset/{token}", get(pixelwall_api::reset::reset_form))
        .route("/reset/{token}", post(pixelwall_api::reset::reset_submit))
        .with_state(app_state);

    let ws_routes = Router::new()
        .route("/ws/canvas", get(canvas_upgrade))
        .route("/ws/chat", get(chat_upgrade))
        .with_state(state);

    Router::new()
        .merge(http_routes)
        .merge(ws_routes)
        .nest_service("/media/avatars", ServeDir::new(avatar_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn canvas_upgrade(
    State(state): State<ServerState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        canvas::handle_canvas_connection(socket, state.db, state.dispatcher)
    })
}

async fn chat_upgrade(State(state): State<ServerState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| chat::handle_chat_connection(socket, state.engine, state.dispatcher))
}
