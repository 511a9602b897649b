//! Async driver: owns the link and feeds the adapter its events.

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::adapter::{CloseOutcome, TtyReceiver};
use super::transport::{Link, Transport};
use crate::widget::{TerminalWidget, WidgetEvent};
use crate::Result;

/// Why the open-connection loop returned.
enum LinkEnd {
    /// The connection closed.
    Closed,
    /// The widget event channel closed: the UI is gone.
    OwnerGone,
}

/// Run a receiver until its session ends.
///
/// Connects to the receiver's target, pumps frames and widget events while
/// open, and reconnects after a close for as long as the receiver allows it.
/// Returns when the session reaches its terminal state, or when `events`
/// closes.
pub async fn run<W, T>(
    receiver: &mut TtyReceiver<W>,
    transport: &mut T,
    events: &mut mpsc::Receiver<WidgetEvent>,
) -> Result<()>
where
    W: TerminalWidget,
    T: Transport,
{
    loop {
        let target = receiver.target().to_string();
        debug!(url = %target, attempt = receiver.attempts(), "connecting");

        let connect = transport.connect(&target);
        tokio::pin!(connect);
        let connected = loop {
            tokio::select! {
                result = &mut connect => break result,
                event = events.recv() => match event {
                    Some(event) => handle_offline_event(receiver, event),
                    None => {
                        receiver.shutdown();
                        return Ok(());
                    }
                }
            }
        };

        match connected {
            Ok(mut link) => {
                if let LinkEnd::OwnerGone = serve_link(receiver, &mut link, events).await {
                    link.close().await;
                    receiver.shutdown();
                    return Ok(());
                }
            }
            Err(e) => warn!(url = %target, "connection failed: {}", e),
        }

        let after = match receiver.on_close() {
            CloseOutcome::Finished => return Ok(()),
            CloseOutcome::Reconnect { after } => after,
        };

        let delay = tokio::time::sleep(after);
        tokio::pin!(delay);
        loop {
            tokio::select! {
                () = &mut delay => break,
                event = events.recv() => match event {
                    Some(event) => handle_offline_event(receiver, event),
                    None => {
                        // Pending reconnect dies with the owner
                        receiver.shutdown();
                        return Ok(());
                    }
                }
            }
        }

        if !receiver.begin_reconnect() {
            return Ok(());
        }
    }
}

async fn serve_link<W, L>(
    receiver: &mut TtyReceiver<W>,
    link: &mut L,
    events: &mut mpsc::Receiver<WidgetEvent>,
) -> LinkEnd
where
    W: TerminalWidget,
    L: Link,
{
    for frame in receiver.on_open() {
        if let Err(e) = link.send(frame).await {
            debug!("send failed right after open: {}", e);
            return LinkEnd::Closed;
        }
    }

    loop {
        tokio::select! {
            message = link.recv() => match message {
                Some(text) => receiver.on_message(&text),
                None => return LinkEnd::Closed,
            },
            event = events.recv() => {
                let frame = match event {
                    Some(WidgetEvent::Input(data)) => receiver.on_input(&data),
                    Some(WidgetEvent::WindowResized) => receiver.on_window_resize(),
                    None => return LinkEnd::OwnerGone,
                };
                if let Some(frame) = frame {
                    if let Err(e) = link.send(frame).await {
                        debug!("send failed: {}", e);
                        return LinkEnd::Closed;
                    }
                }
            }
        }
    }
}

/// Widget events while no connection is open only affect the widget.
fn handle_offline_event<W: TerminalWidget>(receiver: &mut TtyReceiver<W>, event: WidgetEvent) {
    match event {
        WidgetEvent::Input(data) => {
            receiver.on_input(&data);
        }
        WidgetEvent::WindowResized => {
            receiver.on_window_resize();
        }
    }
}
