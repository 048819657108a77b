use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, error, warn};

use pixelwall_db::Database;
use pixelwall_types::canvas::{CanvasClientFrame, CanvasServerFrame};

use crate::dispatcher::Dispatcher;
use crate::{HEARTBEAT_INTERVAL, STORE_TIMEOUT};

/// Handle one canvas WebSocket connection: replay the current canvas, then
/// relay drawing both ways until the client goes away.
pub async fn handle_canvas_connection(
    socket: WebSocket,
    db: Arc<Database>,
    dispatcher: Dispatcher,
) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before loading so frames drawn while we read the snapshot
    // queue up behind it instead of getting lost.
    let mut canvas_rx = dispatcher.subscribe_canvas();

    let data = match canvas_store(&db, |db| db.load_canvas()).await {
        Some(Ok(data)) => data,
        Some(Err(e)) => {
            error!("Canvas load failed: {}", e);
            return;
        }
        None => {
            warn!("Canvas load timed out");
            return;
        }
    };

    let init = CanvasServerFrame::CanvasInit { data };
    if sender
        .send(Message::Text(serde_json::to_string(&init).unwrap().into()))
        .await
        .is_err()
    {
        return;
    }

    debug!("Canvas client connected");

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward room frames -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = canvas_rx.recv() => {
                    let frame = match result {
                        Ok(frame) => frame,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            warn!("Canvas receiver lagged by {} frames", n);
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
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!(
                                "Heartbeat timeout (missed {} pongs), dropping canvas connection",
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

    // Read drawing from the client
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<CanvasClientFrame>(&text) {
                    Ok(frame) => {
                        if !handle_canvas_frame(&db, &dispatcher, frame).await {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(
                            "Bad canvas frame: {} -- raw: {}",
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

    debug!("Canvas client disconnected");
}

/// Apply one inbound frame: persist first, then rebroadcast to the room
/// (the sender included — its own draw comes back as confirmation).
/// Returns false when the connection should close.
async fn handle_canvas_frame(
    db: &Arc<Database>,
    dispatcher: &Dispatcher,
    frame: CanvasClientFrame,
) -> bool {
    match frame {
        CanvasClientFrame::Draw { pixels } => {
            let batch = pixels.clone();
            match canvas_store(db, move |db| db.apply_pixels(&batch)).await {
                Some(Ok(())) => {}
                Some(Err(e)) => {
                    error!("Canvas write failed: {}", e);
                    return true;
                }
                None => {
                    warn!("Canvas write timed out, closing connection");
                    return false;
                }
            }
            dispatcher.broadcast_canvas(CanvasServerFrame::Draw { pixels });
        }
        CanvasClientFrame::Clear => {
            match canvas_store(db, |db| db.clear_canvas()).await {
                Some(Ok(())) => {}
                Some(Err(e)) => {
                    error!("Canvas clear failed: {}", e);
                    return true;
                }
                None => {
                    warn!("Canvas clear timed out, closing connection");
                    return false;
                }
            }
            dispatcher.broadcast_canvas(CanvasServerFrame::Clear);
        }
    }
    true
}

/// Run a canvas store operation off the runtime, bounded by STORE_TIMEOUT.
/// `None` means the store is stuck and the session should close.
async fn canvas_store<T, F>(db: &Arc<Database>, op: F) -> Option<anyhow::Result<T>>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = db.clone();
    let task = tokio::task::spawn_blocking(move || op(&db));
    match tokio::time::timeout(STORE_TIMEOUT, task).await {
        Ok(Ok(result)) => Some(result),
        Ok(Err(e)) => Some(Err(e.into())),
        Err(_) => None,
    }
}
