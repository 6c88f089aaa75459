//! Per-job WebSocket endpoint

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::debug;

use crate::server::server_core::ServerState;
use crate::server::types::WsFrame;

/// GET /ws/:job_id
///
/// Streams a job's log, progress, and status frames. The first frame is
/// always the full job record so a late subscriber catches up; anything
/// the client sends is answered with a pong frame.
pub async fn attach(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
    Path(job_id): Path<String>,
) -> Response {
    ws.on_upgrade(move |socket| handle(socket, state, job_id))
}

async fn handle(mut socket: WebSocket, state: Arc<ServerState>, job_id: String) {
    let Some(job) = state.jobs.get(&job_id) else {
        debug!(job = %job_id, "socket for unknown job, closing");
        let _ = socket.send(Message::Close(None)).await;
        return;
    };

    if send_frame(&mut socket, &WsFrame::Init(job)).await.is_err() {
        return;
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    state.jobs.attach_socket(&job_id, tx);

    loop {
        tokio::select! {
            frame = rx.recv() => {
                let Some(frame) = frame else { break };
                if send_frame(&mut socket, &frame).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {
                        if send_frame(&mut socket, &WsFrame::Pong).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    }

    state.jobs.detach_socket(&job_id);
    debug!(job = %job_id, "socket detached");
}

async fn send_frame(socket: &mut WebSocket, frame: &WsFrame) -> Result<(), ()> {
    let text = serde_json::to_string(frame).map_err(|_| ())?;
    socket.send(Message::Text(text)).await.map_err(|_| ())
}
