//! WebSocket handlers for the signaling server
//!
//! Upgrades requests on the signaling path, then pumps frames between the
//! socket and the connection's [`Session`].

use crate::{
    error::ClientRequestError,
    session::Session,
    state::{PeerSender, ServerState},
};
use axum::{
    Json,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt, future};
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// Upgrade a request to a signaling connection
pub async fn ws_handler(
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<ServerState>,
) -> Response {
    match upgrade {
        Ok(ws) => {
            let sessions = state.sessions.clone();
            ws.on_failed_upgrade(|err: axum::Error| warn!("Failed to upgrade to websocket connection: {err}"))
                .on_upgrade(move |socket| sessions.track_future(handle_socket(socket, state)))
        }
        Err(rejection) => {
            warn!("Rejected websocket upgrade: {rejection}");
            rejection.into_response()
        }
    }
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    peers: usize,
}

/// Liveness check reporting the number of connected peers
pub async fn health_handler(State(state): State<ServerState>) -> impl IntoResponse {
    Json(Health {
        status: "ok",
        peers: state.registry.len(),
    })
}

/// Map a raw WebSocket frame to session input. Control frames yield `None`.
fn parse_frame(frame: Result<Message, axum::Error>) -> Option<Result<Vec<u8>, ClientRequestError>> {
    match frame {
        Ok(Message::Text(text)) => Some(Ok(text.as_str().as_bytes().to_vec())),
        Ok(Message::Binary(bytes)) => Some(Ok(bytes.to_vec())),
        Ok(Message::Close(frame)) => {
            match frame {
                Some(frame) if frame.code == 1000 || frame.code == 1001 => {
                    debug!("Client closed connection gracefully")
                }
                Some(frame) => debug!(
                    "Web socket closed with unexpected code {}: {}",
                    frame.code,
                    frame.reason.as_str()
                ),
                None => debug!("Client closed connection without a close frame"),
            }
            Some(Err(ClientRequestError::Close))
        }
        Ok(Message::Ping(_) | Message::Pong(_)) => None,
        Err(err) => Some(Err(ClientRequestError::WebSocket(err.to_string()))),
    }
}

async fn handle_socket(socket: WebSocket, state: ServerState) {
    let (mut ws_sender, ws_receiver) = socket.split();
    let (sender, mut outbound) = PeerSender::channel();

    let session = match Session::open(state.registry.clone(), state.config.clone(), sender) {
        Ok(session) => session,
        Err(err) => {
            error!("Could not register connection: {err}");
            let _ = ws_sender.send(Message::Close(None)).await;
            return;
        }
    };
    let peer_id = session.id().clone();
    info!(%peer_id, "New socket connection");

    // Single writer per socket. Ends once the session and the registry have
    // both let go of this connection's sender.
    let writer = tokio::spawn(async move {
        while let Some(text) = outbound.recv().await {
            if let Err(err) = ws_sender.send(Message::Text(text.into())).await {
                debug!("Failed to write to socket: {err}");
                return;
            }
        }
        let _ = ws_sender.send(Message::Close(None)).await;
    });

    let frames = ws_receiver.filter_map(|frame| future::ready(parse_frame(frame)));
    session.run(Box::pin(frames), state.shutdown_signal()).await;

    if let Err(err) = writer.await {
        error!(%peer_id, "Socket writer failed: {err}");
    }
    info!(%peer_id, "Connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::ws::CloseFrame;

    #[test]
    fn data_frames_become_session_input() {
        let text = parse_frame(Ok(Message::Text("{}".into())));
        assert_eq!(text.unwrap().unwrap(), b"{}".to_vec());

        let binary = parse_frame(Ok(Message::Binary(vec![1u8, 2, 3].into())));
        assert_eq!(binary.unwrap().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn control_frames_are_skipped() {
        assert!(parse_frame(Ok(Message::Ping(Vec::new().into()))).is_none());
        assert!(parse_frame(Ok(Message::Pong(Vec::new().into()))).is_none());
    }

    #[test]
    fn close_frames_end_the_session() {
        let close = parse_frame(Ok(Message::Close(Some(CloseFrame {
            code: 4000,
            reason: "bye".into(),
        }))));
        assert!(matches!(close, Some(Err(ClientRequestError::Close))));
        assert!(matches!(
            parse_frame(Ok(Message::Close(None))),
            Some(Err(ClientRequestError::Close))
        ));
    }
}
