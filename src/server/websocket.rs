//! WebSocket handler: attaches a receiver to a PTY session.

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{debug, error, info, warn};

use super::handlers::AppState;
use super::session::PtySession;
use crate::protocol::{Frame, Message};
use crate::pty::PtySize;

type Sink = SplitSink<WebSocket, WsMessage>;

/// Why a receiver stopped being served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Detach {
    /// The command exited.
    Exited,
    /// The receiver closed its socket or stopped reading.
    ReceiverGone,
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, session_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, session_id: String) {
    let (mut sink, mut stream) = socket.split();

    let (session, receivers) = match state.attach(&session_id) {
        Ok(attached) => attached,
        Err(e) => {
            error!(session = %session_id, "cannot start session: {}", e);
            let _ = sink.close().await;
            return;
        }
    };

    info!(session = %session_id, receivers, "receiver attached");

    let mut output = session.subscribe();
    session.refresh();

    let detach = loop {
        tokio::select! {
            biased;

            chunk = output.recv() => match chunk {
                Ok(bytes) => {
                    if send_frame(&mut sink, &Frame::write_bytes(&bytes)).await.is_err() {
                        break Detach::ReceiverGone;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(session = %session_id, skipped, "receiver is lagging, output dropped");
                }
                Err(RecvError::Closed) => break Detach::Exited,
            },
            message = stream.next() => match message {
                Some(Ok(WsMessage::Text(text))) => handle_frame(&session, text.as_str()).await,
                Some(Ok(WsMessage::Ping(data))) => {
                    let _ = sink.send(WsMessage::Pong(data)).await;
                }
                Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break Detach::ReceiverGone,
                Some(Ok(_)) => {}
            },
            () = session.wait() => {
                flush_output(&mut sink, &mut output).await;
                if let Err(e) = send_frame(&mut sink, &Frame::terminate()).await {
                    debug!(session = %session_id, "could not send Terminate: {}", e);
                }
                break Detach::Exited;
            }
        }
    };

    // Removes the session once the last receiver is gone
    let remaining = match state.store.detach(&session) {
        Ok(remaining) => remaining,
        Err(e) => {
            error!(session = %session_id, "cannot detach receiver: {}", e);
            session.receiver_count()
        }
    };
    info!(session = %session_id, ?detach, remaining, "receiver detached");

    match detach {
        Detach::Exited => {
            let _ = sink.close().await;
            let _ = state.store.remove(&session);
        }
        Detach::ReceiverGone if remaining == 0 => session.stop(),
        Detach::ReceiverGone => {}
    }

    if state.once {
        info!("closing server because it was asked to serve once");
        state.request_shutdown();
    }
}

/// Apply one frame from a receiver to the session.
///
/// The whole decoded payload is written; the `Size` field is informational.
async fn handle_frame(session: &PtySession, text: &str) {
    let message = match Frame::from_json(text).and_then(|frame| frame.decode()) {
        Ok(message) => message,
        Err(e) => {
            warn!(session = %session.id(), "unreadable frame from receiver: {}", e);
            return;
        }
    };

    match message {
        Message::Write(bytes) => {
            if let Err(e) = session.write(bytes).await {
                warn!(session = %session.id(), "cannot write to PTY: {}", e);
            }
        }
        Message::WinSize { cols, rows } => {
            if cols == 0 || rows == 0 {
                debug!(session = %session.id(), cols, rows, "ignoring empty window size");
                return;
            }
            if let Err(e) = session.resize(PtySize::new(rows, cols)) {
                warn!(session = %session.id(), "cannot resize PTY: {}", e);
            }
        }
        other => warn!(session = %session.id(), "ignoring {:?} from receiver", other),
    }
}

/// Send output that was published before the exit was noticed.
async fn flush_output(sink: &mut Sink, output: &mut tokio::sync::broadcast::Receiver<Vec<u8>>) {
    loop {
        match output.try_recv() {
            Ok(bytes) => {
                if send_frame(sink, &Frame::write_bytes(&bytes)).await.is_err() {
                    return;
                }
            }
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => return,
        }
    }
}

async fn send_frame(sink: &mut Sink, frame: &Frame) -> crate::Result<()> {
    let json = frame.to_json()?;
    sink.send(WsMessage::Text(json.into()))
        .await
        .map_err(|e| crate::error::TtyShareError::WebSocket(e.to_string()))
}
