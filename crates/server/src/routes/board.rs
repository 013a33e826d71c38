//! WebSocket board route.
//!
//! Each connection owns one [`BoardSession`]. Client messages, autoplay ticks,
//! finished analyses and controller snapshots are all handled on the
//! connection task, so the controller is never touched concurrently.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query,
    },
    response::IntoResponse,
    Extension,
};
use chess_core::TokioTimer;
use futures::{stream::SplitSink, SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::auth::middleware::AuthUser;
use crate::clients::gemini::GeminiClient;
use crate::config::Config;
use crate::session::{BoardSession, ClientMessage, Outcome, ServerMessage, View};

#[derive(Deserialize)]
pub struct BoardQuery {
    #[serde(default)]
    pub view: View,
}

/// GET /api/board/ws?view=dashboard|analysis
pub async fn ws_handler(
    AuthUser(account): AuthUser,
    ws: WebSocketUpgrade,
    Query(query): Query<BoardQuery>,
    Extension(config): Extension<Config>,
    Extension(gemini): Extension<GeminiClient>,
) -> impl IntoResponse {
    let user_id = account.id;
    ws.on_upgrade(move |socket| handle_socket(socket, user_id, query.view, config, gemini))
}

async fn handle_socket(
    socket: WebSocket,
    user_id: i64,
    view: View,
    config: Config,
    gemini: GeminiClient,
) {
    let (tick_tx, mut tick_rx) = mpsc::unbounded_channel();
    let (analysis_tx, mut analysis_rx) = mpsc::unbounded_channel::<(u64, String)>();

    let mut session = BoardSession::new(view, TokioTimer::new(tick_tx), config.autoplay_period());
    let mut snapshots = session.subscribe();
    let (mut sender, mut receiver) = socket.split();

    tracing::info!(user_id, ?view, "Board session opened");

    if send_message(&mut sender, &ServerMessage::State(session.state()))
        .await
        .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            msg = receiver.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(t))) => t,
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => continue,
                };

                let outcome = match serde_json::from_str::<ClientMessage>(text.as_str()) {
                    Ok(message) => session.handle(message),
                    Err(e) => Outcome {
                        replies: vec![ServerMessage::Error {
                            message: format!("Invalid message: {e}"),
                        }],
                        analysis: None,
                    },
                };

                if let Some(request) = outcome.analysis {
                    let gemini = gemini.clone();
                    let done = analysis_tx.clone();
                    tokio::spawn(async move {
                        let text = gemini.analyze(&request.pgn).await;
                        let _ = done.send((request.generation, text));
                    });
                }

                let mut closed = false;
                for reply in &outcome.replies {
                    if send_message(&mut sender, reply).await.is_err() {
                        closed = true;
                        break;
                    }
                }
                if closed {
                    break;
                }
            }
            Some(id) = tick_rx.recv() => {
                session.on_tick(id);
            }
            Some((generation, text)) = analysis_rx.recv() => {
                session.finish_analysis(generation, text);
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                let state = ServerMessage::State(session.state_for(snapshot));
                if send_message(&mut sender, &state).await.is_err() {
                    break;
                }
            }
        }
    }

    // Dropping the session cancels any running autoplay timer.
    drop(session);
    tracing::info!(user_id, ?view, "Board session closed");
}

async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(message).map_err(axum::Error::new)?;
    sender.send(Message::Text(text.into())).await
}
