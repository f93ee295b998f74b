use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use lineup_core::JobEvent;

use crate::{
    protocol::{Command, ControlFrame},
    AppState,
};

/// Keepalive cadence; clients expect a frame at least every 30s.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(25);

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Stream job events to one client, handling its commands and keepalive.
/// The subscription's first event is always the jobs_state snapshot.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.coordinator.subscribe().await;
    let mut keepalive = tokio::time::interval(KEEPALIVE_INTERVAL);
    keepalive.tick().await; // First tick fires immediately

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(event) => {
                        if send_event(&mut sender, &event).await.is_err() {
                            break;
                        }
                    }
                    // Dropped by the coordinator (slow consumer)
                    None => {
                        tracing::warn!("job event stream closed for subscriber");
                        break;
                    }
                }
            }

            _ = keepalive.tick() => {
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }

            msg = receiver.next() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        tracing::debug!("websocket receive error: {e}");
                        break;
                    }
                    None => break,
                };

                match msg {
                    Message::Text(text) => {
                        let command: Command = match serde_json::from_str(&text) {
                            Ok(command) => command,
                            Err(e) => {
                                let frame = ControlFrame::Error {
                                    message: format!("Invalid command: {e}"),
                                };
                                if send_frame(&mut sender, &frame).await.is_err() {
                                    break;
                                }
                                continue;
                            }
                        };
                        if handle_command(command, &state, &mut sender).await.is_err() {
                            break;
                        }
                    }
                    Message::Close(_) => {
                        tracing::debug!("websocket closed by client");
                        break;
                    }
                    // Pong and binary frames need no handling
                    _ => {}
                }
            }
        }
    }
}

async fn handle_command(
    command: Command,
    state: &Arc<AppState>,
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
) -> Result<(), axum::Error> {
    match command {
        Command::Ping => send_frame(sender, &ControlFrame::Pong).await,
        Command::CancelJob { job_id } => {
            let cancelled = state.coordinator.cancel_job(&job_id).await;
            if cancelled {
                if let Some(token) = state.cancel_token_for(&job_id).await {
                    token.cancel();
                }
            } else {
                let frame = ControlFrame::Error {
                    message: format!("Job not cancellable: {job_id}"),
                };
                send_frame(sender, &frame).await?;
            }
            Ok(())
        }
        Command::GetJobs => {
            let jobs = state.coordinator.recent_jobs(50).await;
            send_event(sender, &JobEvent::JobsState { jobs }).await
        }
    }
}

async fn send_event(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    event: &JobEvent,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(event)
        .map_err(|e| axum::Error::new(std::io::Error::other(e)))?;
    sender.send(Message::Text(json)).await
}

async fn send_frame(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    frame: &ControlFrame,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(frame)
        .map_err(|e| axum::Error::new(std::io::Error::other(e)))?;
    sender.send(Message::Text(json)).await
}
