//! WebSocket handler: admission, the per-session receive loop, and outbound delivery.

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde::Deserialize;
use std::borrow::Cow;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::error::AppResult;
use crate::handlers::http::AppState;
use crate::middleware::resolve_identity;
use crate::models::{ClientMessage, ServerEvent, UserIdentity};
use crate::services::registry::EventReceiver;
use crate::services::{AdmissionError, PresenceTracker, Session};

#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    /// Browser clients cannot set headers on the upgrade request.
    pub token: Option<String>,
}

/// Why a session ended.
#[derive(Debug)]
enum Teardown {
    ClientClosed,
    StreamEnded,
    TransportError(String),
    WriteFailed(String),
    Closed,
}

impl std::fmt::Display for Teardown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Teardown::ClientClosed => write!(f, "client closed"),
            Teardown::StreamEnded => write!(f, "stream ended"),
            Teardown::TransportError(e) => write!(f, "transport error: {}", e),
            Teardown::WriteFailed(e) => write!(f, "write failed: {}", e),
            Teardown::Closed => write!(f, "closed by server"),
        }
    }
}

/// GET /ws/chat/: upgrade, attach the caller's identity (or none), and run the session.
pub async fn ws_handler(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Response {
    let token = bearer
        .map(|TypedHeader(Authorization(b))| b.token().to_string())
        .or(params.token);
    let identity = resolve_identity(&state, token.as_deref()).await;
    ws.on_upgrade(move |socket| handle_socket(state, socket, identity))
}

async fn handle_socket(state: AppState, socket: WebSocket, identity: Option<UserIdentity>) {
    match state.registry.admit(identity) {
        Ok(session) => {
            let (sender, receiver) = socket.split();
            run_session(state, sender, receiver, session).await;
        }
        Err(e) => reject(socket, e).await,
    }
}

async fn reject(mut socket: WebSocket, err: AdmissionError) {
    info!(code = err.close_code(), reason = %err, "ws rejected");
    let frame = CloseFrame {
        code: err.close_code(),
        reason: Cow::Owned(err.to_string()),
    };
    let _ = socket.send(Message::Close(Some(frame))).await;
}

/// Drive one admitted session until either side ends it.
///
/// Reader and writer are polled inside this future, so dropping it stops both
/// and releases the registration together.
async fn run_session<S, R>(state: AppState, mut sender: S, receiver: R, session: Session) -> Teardown
where
    S: Sink<Message, Error = axum::Error> + Unpin,
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let Session {
        owner,
        events,
        registration,
    } = session;
    let session_id = registration.handle().id().to_string();
    let room_key = registration.handle().room_key().to_string();

    // Registered before the ack, so anything published after the client sees it reaches us.
    let ack = ServerEvent::ConnectionEstablished {
        session_id: session_id.clone(),
    };
    if let Err(e) = write_event(&mut sender, &ack).await {
        warn!(session_id = %session_id, error = %e, "ws ack failed");
        return Teardown::WriteFailed(e.to_string());
    }
    info!(session_id = %session_id, user_id = %owner.id, "ws connected");

    let (stop_writer, writer_stop) = oneshot::channel();
    let (stop_reader, reader_stop) = oneshot::channel();
    let reader = read_loop(receiver, &state.presence, &owner, reader_stop);
    let writer = write_loop(sender, events, writer_stop);
    tokio::pin!(reader, writer);

    let reason = tokio::select! {
        reason = &mut reader => {
            let _ = stop_writer.send(());
            (&mut writer).await;
            reason
        }
        reason = &mut writer => {
            // The reader stops between messages; a status update in progress still fans out.
            let _ = stop_reader.send(());
            (&mut reader).await;
            reason
        }
    };

    drop(registration);
    info!(
        session_id = %session_id,
        user_id = %owner.id,
        reason = %reason,
        remaining = state.registry.sessions_for(&room_key).len(),
        "ws disconnected"
    );
    reason
}

/// Inbound side: one message at a time, each fully handled before the next is read.
///
/// `shutdown` is only observed while waiting for a frame.
async fn read_loop<R>(
    mut receiver: R,
    presence: &PresenceTracker,
    owner: &UserIdentity,
    mut shutdown: oneshot::Receiver<()>,
) -> Teardown
where
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    loop {
        let frame = tokio::select! {
            frame = receiver.next() => frame,
            _ = &mut shutdown => return Teardown::Closed,
        };
        match frame {
            Some(Ok(Message::Text(text))) => handle_inbound(presence, owner, &text).await,
            Some(Ok(Message::Close(_))) => return Teardown::ClientClosed,
            Some(Ok(_)) => {}
            Some(Err(e)) => return Teardown::TransportError(e.to_string()),
            None => return Teardown::StreamEnded,
        }
    }
}

async fn handle_inbound(presence: &PresenceTracker, owner: &UserIdentity, text: &str) {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(m) => m,
        Err(e) => {
            debug!(user_id = %owner.id, error = %e, "ignoring malformed inbound message");
            return;
        }
    };
    if let Err(e) = presence.update_status(owner, message.status).await {
        warn!(user_id = %owner.id, error = %e, "presence update failed");
    }
}

/// Outbound side: drain the delivery channel in order until shutdown or a failed write.
async fn write_loop<S>(
    mut sender: S,
    mut events: EventReceiver,
    mut shutdown: oneshot::Receiver<()>,
) -> Teardown
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    loop {
        tokio::select! {
            maybe = events.recv() => match maybe {
                Some(event) => {
                    if let Err(e) = write_event(&mut sender, &event).await {
                        return Teardown::WriteFailed(e.to_string());
                    }
                }
                None => break,
            },
            _ = &mut shutdown => break,
        }
    }
    let _ = sender.close().await;
    Teardown::Closed
}

async fn write_event<S>(sender: &mut S, event: &ServerEvent) -> AppResult<()>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    let text = serde_json::to_string(event)?;
    sender.send(Message::Text(text)).await?;
    Ok(())
}
