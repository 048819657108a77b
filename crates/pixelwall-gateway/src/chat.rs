use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use pixelwall_chat::ChatEngine;
use pixelwall_types::chat::{ChatClientFrame, ChatServerFrame};

use crate::dispatcher::Dispatcher;
use crate::{HEARTBEAT_INTERVAL, STORE_TIMEOUT};

/// Handle one chat WebSocket connection. The connection starts anonymous;
/// a `presence_update` or successful `token_login` binds it to a display
/// name, which also routes private messages here.
pub async fn handle_chat_connection(
    socket: WebSocket,
    engine: Arc<ChatEngine>,
    dispatcher: Dispatcher,
) {
    let (mut sender, mut receiver) = socket.split();
    let conn_id = Uuid::new_v4();

    // Subscribe before snapshotting the roster so changes in between queue
    // up behind the snapshot instead of getting lost.
    let mut chat_rx = dispatcher.subscribe_chat();

    let roster = ChatServerFrame::PresenceList {
        users: dispatcher.visible_usernames().await,
    };
    if sender
        .send(Message::Text(serde_json::to_string(&roster).unwrap().into()))
        .await
        .is_err()
    {
        return;
    }

    info!("Chat session {} connected", conn_id);

    // Targeted frames (auth results, private messages) arrive here
    let (private_tx, mut private_rx) = mpsc::unbounded_channel::<ChatServerFrame>();

    // The name this connection is bound to, shared with cleanup below
    let bound_name: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward room broadcasts + targeted frames -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = chat_rx.recv() => {
                    let frame = match result {
                        Ok(frame) => frame,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            warn!("Chat receiver lagged by {} frames", n);
                            continue;
                        }
                        Err(_) => break,
                    };
                    if sender
                        .send(Message::Text(serde_json::to_string(&frame).unwrap().into()))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                result = private_rx.recv() => {
                    let frame = match result {
                        Some(frame) => frame,
                        None => break,
                    };
                    if sender
                        .send(Message::Text(serde_json::to_string(&frame).unwrap().into()))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!(
                                "Heartbeat timeout (missed {} pongs), dropping chat connection",
                                missed_heartbeats
                            );
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read frames from the client
    let recv_engine = engine.clone();
    let recv_dispatcher = dispatcher.clone();
    let recv_private_tx = private_tx.clone();
    let recv_bound = bound_name.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ChatClientFrame>(&text) {
                    Ok(frame) => {
                        if !handle_chat_frame(
                            &recv_engine,
                            &recv_dispatcher,
                            conn_id,
                            &recv_private_tx,
                            &recv_bound,
                            frame,
                        )
                        .await
                        {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(
                            "Chat session {} bad frame: {} -- raw: {}",
                            conn_id,
                            e,
                            text.chars().take(200).collect::<String>()
                        );
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    // Detach from the private group, then drop the roster entry. The roster
    // is only rebroadcast when this connection was actually on it.
    let bound = bound_name.lock().expect("identity lock poisoned").take();
    if let Some(name) = bound {
        dispatcher.leave_user_group(&name, conn_id).await;
    }
    if dispatcher.clear_presence(conn_id).await {
        let users = dispatcher.visible_usernames().await;
        dispatcher.broadcast_chat(ChatServerFrame::PresenceList { users });
    }

    info!("Chat session {} disconnected", conn_id);
}

/// Apply one inbound frame. Returns false when the connection should close.
async fn handle_chat_frame(
    engine: &Arc<ChatEngine>,
    dispatcher: &Dispatcher,
    conn_id: Uuid,
    private_tx: &mpsc::UnboundedSender<ChatServerFrame>,
    bound_name: &Arc<Mutex<Option<String>>>,
    frame: ChatClientFrame,
) -> bool {
    match frame {
        ChatClientFrame::ChatMessage { username, message } => {
            let Some(result) = bounded(engine.post_public(&username, &message)).await else {
                return false;
            };
            match result {
                Ok(Some(posted)) => {
                    dispatcher.broadcast_chat(ChatServerFrame::Message {
                        username: posted.username,
                        message: posted.message,
                        timestamp: posted.timestamp,
                    });
                }
                Ok(None) => {} // empty once trimmed
                Err(e) => warn!("Chat session {} message failed: {}", conn_id, e),
            }
        }

        ChatClientFrame::PrivateMessage { to, message } => {
            let Some(sender) = current_name(bound_name) else {
                warn!(
                    "Chat session {} sent a private message before binding a name",
                    conn_id
                );
                return true;
            };
            let Some(result) = bounded(engine.post_private(&sender, &to, &message)).await else {
                return false;
            };
            match result {
                Ok(Some(delivered)) => {
                    let from = delivered.from.clone();
                    let to = delivered.to.clone();
                    let frame = ChatServerFrame::PrivateMessage {
                        from: delivered.from,
                        to: delivered.to,
                        message: delivered.message,
                        timestamp: delivered.timestamp,
                    };
                    // Recipient's tabs and the sender's own, once when equal
                    dispatcher.send_to_user(&to, frame.clone()).await;
                    if from != to {
                        dispatcher.send_to_user(&from, frame).await;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Chat session {} private message failed: {}", conn_id, e),
            }
        }

        ChatClientFrame::GetPrivateHistory { with_user } => {
            let Some(user) = current_name(bound_name) else {
                warn!(
                    "Chat session {} asked for history before binding a name",
                    conn_id
                );
                return true;
            };
            let Some(result) = bounded(engine.private_history(&user, &with_user)).await else {
                return false;
            };
            match result {
                Ok(messages) => {
                    let _ = private_tx.send(ChatServerFrame::PrivateHistory { with_user, messages });
                }
                Err(e) => warn!("Chat session {} history failed: {}", conn_id, e),
            }
        }

        ChatClientFrame::PresenceUpdate { username, offline } => {
            let username: String = username.trim().chars().take(50).collect();
            if username.is_empty() {
                return true;
            }
            bind_identity(dispatcher, conn_id, private_tx, bound_name, &username).await;
            dispatcher.set_presence(conn_id, username, offline).await;
            let users = dispatcher.visible_usernames().await;
            dispatcher.broadcast_chat(ChatServerFrame::PresenceList { users });
        }

        ChatClientFrame::TokenLogin { token } => {
            let Some(resolved) = bounded(engine.token_login(&token)).await else {
                return false;
            };
            let result = match resolved {
                Some(username) => {
                    bind_identity(dispatcher, conn_id, private_tx, bound_name, &username).await;
                    info!("Chat session {} resumed as '{}'", conn_id, username);
                    ChatServerFrame::TokenLoginResult {
                        success: true,
                        username: Some(username),
                    }
                }
                None => ChatServerFrame::TokenLoginResult {
                    success: false,
                    username: None,
                },
            };
            let _ = private_tx.send(result);
        }

        ChatClientFrame::CheckUsername { username } => {
            let Some(result) = bounded(engine.check_username(&username)).await else {
                return false;
            };
            match result {
                Ok(status) => {
                    let _ = private_tx.send(ChatServerFrame::UsernameStatus {
                        username: status.username,
                        taken: status.taken,
                        password_protected: status.password_protected,
                        has_email: status.has_email,
                    });
                }
                Err(e) => warn!("Chat session {} username check failed: {}", conn_id, e),
            }
        }

        ChatClientFrame::ReserveUsername { username, password } => {
            let Some(result) = bounded(engine.reserve(&username, &password)).await else {
                return false;
            };
            let frame = match result {
                Ok(token) => ChatServerFrame::ReserveResult {
                    success: true,
                    token: Some(token),
                    error: None,
                },
                Err(e) => ChatServerFrame::ReserveResult {
                    success: false,
                    token: None,
                    error: Some(e.to_string()),
                },
            };
            let _ = private_tx.send(frame);
        }

        ChatClientFrame::AuthUsername { username, password } => {
            let Some(result) = bounded(engine.authenticate(&username, &password)).await else {
                return false;
            };
            let frame = match result {
                Ok(auth) => ChatServerFrame::AuthResult {
                    success: true,
                    token: Some(auth.token),
                    has_email: Some(auth.has_email),
                    error: None,
                },
                Err(e) => ChatServerFrame::AuthResult {
                    success: false,
                    token: None,
                    has_email: None,
                    error: Some(e.to_string()),
                },
            };
            let _ = private_tx.send(frame);
        }

        ChatClientFrame::SaveEmail { username, email } => {
            let Some(result) = bounded(engine.save_email(&username, &email)).await else {
                return false;
            };
            let frame = match result {
                Ok(message) => ChatServerFrame::EmailResult {
                    success: true,
                    message,
                },
                Err(e) => ChatServerFrame::EmailResult {
                    success: false,
                    message: e.to_string(),
                },
            };
            let _ = private_tx.send(frame);
        }

        ChatClientFrame::ForgotPassword { username } => {
            let Some(result) = bounded(engine.forgot_password(&username)).await else {
                return false;
            };
            let frame = match result {
                Ok(message) => ChatServerFrame::ForgotPasswordResult {
                    success: true,
                    message,
                },
                Err(e) => ChatServerFrame::ForgotPasswordResult {
                    success: false,
                    message: e.to_string(),
                },
            };
            let _ = private_tx.send(frame);
        }
    }

    true
}

/// Point this connection at a display name: join its private group and
/// remember it for cleanup. Rebinding to a different name leaves the old
/// group first; rebinding to the same name is a no-op.
async fn bind_identity(
    dispatcher: &Dispatcher,
    conn_id: Uuid,
    private_tx: &mpsc::UnboundedSender<ChatServerFrame>,
    bound_name: &Arc<Mutex<Option<String>>>,
    username: &str,
) {
    let previous = {
        let mut bound = bound_name.lock().expect("identity lock poisoned");
        if bound.as_deref() == Some(username) {
            return;
        }
        bound.replace(username.to_string())
    };
    if let Some(old) = previous {
        dispatcher.leave_user_group(&old, conn_id).await;
    }
    dispatcher
        .join_user_group(username, conn_id, private_tx.clone())
        .await;
}

fn current_name(bound_name: &Arc<Mutex<Option<String>>>) -> Option<String> {
    bound_name.lock().expect("identity lock poisoned").clone()
}

/// Wrap an engine call in the session store timeout. `None` means the call
/// got stuck and the connection should close.
async fn bounded<T>(call: impl Future<Output = T>) -> Option<T> {
    match tokio::time::timeout(STORE_TIMEOUT, call).await {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Store call timed out");
            None
        }
    }
}
