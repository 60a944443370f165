use axum::extract::{
    Query, State,
    ws::{self, WebSocket, WebSocketUpgrade},
};
use axum::response::Response;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::error::Result as WebResult;
use super::handlers::PlayQuery;
use crate::messages::{ClientToServerMessage, ServerToClientMessage, client_message_from_ws_text};
use crate::player::{PlayerActorHandle, PlayerEvent};
use crate::quiz::{Quiz, load_playable_quiz};
use crate::state::AppState;

/// Opens a play session for the quiz in `?data=`. The payload is checked
/// before upgrading so an unplayable link gets a regular error response.
pub async fn ws_handler(
    ws_upgrade: WebSocketUpgrade,
    Query(query): Query<PlayQuery>,
    State(app_state): State<AppState>,
) -> WebResult<Response> {
    let quiz = load_playable_quiz(query.data.as_deref()).inspect_err(|e| {
        tracing::info!(error = %e, "WebSocket: Refusing play session for unplayable link");
    })?;
    tracing::info!(
        quiz.question_count = quiz.questions.len(),
        "WebSocket: Play session requested"
    );
    Ok(ws_upgrade.on_upgrade(move |socket| handle_socket(socket, quiz, app_state)))
}

async fn send_system_error(ws_sender: &mut SplitSink<WebSocket, ws::Message>, message: String) {
    let error_response = ServerToClientMessage::SystemError { message };
    if let Ok(ws_msg) = error_response.to_ws_text() {
        let _ = ws_sender.send(ws_msg).await;
    }
}

pub async fn handle_socket(socket: WebSocket, quiz: Quiz, app_state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (events_tx, mut events_rx) = mpsc::channel::<PlayerEvent>(32);
    let player_handle =
        match PlayerActorHandle::spawn(quiz, app_state.player_settings.clone(), events_tx, 32) {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(error = %e, "WebSocket: Could not start play session");
                send_system_error(&mut ws_sender, e.to_string()).await;
                let _ = ws_sender.close().await;
                return;
            }
        };
    let session_id = player_handle.session_id;
    tracing::info!(session.id = %session_id, "WebSocket: Play session started");

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            let message = ServerToClientMessage::from(event);
            let ws_msg = match message.to_ws_text() {
                Ok(ws_msg) => ws_msg,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize player event");
                    continue;
                }
            };
            if ws_sender.send(ws_msg).await.is_err() {
                tracing::info!(
                    session.id = %session_id,
                    "WS send error, client likely disconnected"
                );
                break;
            }
        }
        tracing::debug!(session.id = %session_id, "Send task terminating");
        let _ = ws_sender.close().await;
    });

    let recv_handle = player_handle.clone();
    let mut recv_task = tokio::spawn(async move {
        loop {
            match ws_receiver.next().await {
                Some(Ok(ws::Message::Text(text_msg))) => {
                    let forwarded = match client_message_from_ws_text(&text_msg) {
                        Ok(ClientToServerMessage::EnterRoom { code }) => {
                            recv_handle.enter_room(code).await
                        }
                        Ok(ClientToServerMessage::SubmitAnswer { answer }) => {
                            recv_handle.submit_answer(answer).await
                        }
                        Ok(ClientToServerMessage::LeaveQuiz) => {
                            tracing::info!(session.id = %session_id, "Client left the quiz");
                            recv_handle.leave().await;
                            break;
                        }
                        Err(e) => {
                            tracing::warn!(
                                session.id = %session_id,
                                error = %e,
                                "Ignoring malformed client message"
                            );
                            Ok(())
                        }
                    };
                    if let Err(e) = forwarded {
                        tracing::info!(
                            session.id = %session_id,
                            error = %e,
                            "Play session no longer accepts input"
                        );
                        break;
                    }
                }
                Some(Ok(ws::Message::Close(_))) => {
                    tracing::info!(session.id = %session_id, "WebSocket closed by client");
                    break;
                }
                Some(Ok(_)) => {
                    tracing::trace!(session.id = %session_id, "Ignoring non-text WebSocket frame");
                }
                Some(Err(e)) => {
                    tracing::warn!(session.id = %session_id, error = %e, "WebSocket error (recv)");
                    break;
                }
                None => break,
            }
        }
        tracing::debug!(session.id = %session_id, "Receive task terminating");
    });

    tokio::select! {
        _ = (&mut send_task) => {
            tracing::debug!(session.id = %session_id, "Send task finished, aborting recv_task");
            recv_task.abort();
        },
        _ = (&mut recv_task) => {
            tracing::debug!(session.id = %session_id, "Recv task finished, aborting send_task");
            send_task.abort();
        },
    }

    // Stops the countdown and discards the session if it is still running.
    player_handle.leave().await;
    tracing::info!(session.id = %session_id, "WebSocket: Play session closed");
}
