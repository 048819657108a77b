use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast, mpsc};
use uuid::Uuid;

use pixelwall_types::canvas::CanvasServerFrame;
use pixelwall_types::chat::ChatServerFrame;

use crate::presence::PresenceTracker;

/// Manages the two rooms of the wall — the shared canvas and the chat — plus
/// the per-user private delivery groups and the presence roster.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Broadcast channel for the canvas room — every canvas client sees every frame
    canvas_tx: broadcast::Sender<CanvasServerFrame>,

    /// Broadcast channel for the chat room
    chat_tx: broadcast::Sender<ChatServerFrame>,

    /// Private delivery groups: bound username -> (conn_id -> sender).
    /// Keys are exact strings — "Ada" and "ada" are different groups.
    user_groups: RwLock<HashMap<String, HashMap<Uuid, mpsc::UnboundedSender<ChatServerFrame>>>>,

    /// Who is visible on the chat roster
    presence: PresenceTracker,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (canvas_tx, _) = broadcast::channel(1024);
        let (chat_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner {
                canvas_tx,
                chat_tx,
                user_groups: RwLock::new(HashMap::new()),
                presence: PresenceTracker::new(),
            }),
        }
    }

    // -- Rooms --

    /// Subscribe to the canvas room. Returns a broadcast receiver.
    pub fn subscribe_canvas(&self) -> broadcast::Receiver<CanvasServerFrame> {
        self.inner.canvas_tx.subscribe()
    }

    /// Broadcast a frame to every canvas client.
    pub fn broadcast_canvas(&self, frame: CanvasServerFrame) {
        let _ = self.inner.canvas_tx.send(frame);
    }

    /// Subscribe to the chat room. Returns a broadcast receiver.
    pub fn subscribe_chat(&self) -> broadcast::Receiver<ChatServerFrame> {
        self.inner.chat_tx.subscribe()
    }

    /// Broadcast a frame to every chat client.
    pub fn broadcast_chat(&self, frame: ChatServerFrame) {
        let _ = self.inner.chat_tx.send(frame);
    }

    // -- Private groups --

    /// Add a connection to a username's delivery group. Joining again under
    /// the same name just refreshes the stored sender.
    pub async fn join_user_group(
        &self,
        username: &str,
        conn_id: Uuid,
        tx: mpsc::UnboundedSender<ChatServerFrame>,
    ) {
        self.inner
            .user_groups
            .write()
            .await
            .entry(username.to_string())
            .or_default()
            .insert(conn_id, tx);
    }

    /// Remove a connection from a username's group, dropping the group once
    /// it is empty.
    pub async fn leave_user_group(&self, username: &str, conn_id: Uuid) {
        let mut groups = self.inner.user_groups.write().await;
        if let Some(group) = groups.get_mut(username) {
            group.remove(&conn_id);
            if group.is_empty() {
                groups.remove(username);
            }
        }
    }

    /// Send a frame to every connection bound to a username. Nobody bound is
    /// fine — private messages to absent users are persisted, not delivered.
    pub async fn send_to_user(&self, username: &str, frame: ChatServerFrame) {
        let groups = self.inner.user_groups.read().await;
        if let Some(group) = groups.get(username) {
            for tx in group.values() {
                let _ = tx.send(frame.clone());
            }
        }
    }

    // -- Presence --

    pub async fn set_presence(&self, conn_id: Uuid, username: String, offline: bool) {
        self.inner.presence.upsert(conn_id, username, offline).await;
    }

    /// Drop a connection's roster entry. Returns true if there was one.
    pub async fn clear_presence(&self, conn_id: Uuid) -> bool {
        self.inner.presence.remove(conn_id).await
    }

    pub async fn visible_usernames(&self) -> Vec<String> {
        self.inner.presence.visible_usernames().await
    }
}
