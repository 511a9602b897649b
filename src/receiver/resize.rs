//! Scoped subscription to host window-size changes.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::widget::WidgetEvent;

/// Forwards window-change notifications as [`WidgetEvent::WindowResized`].
///
/// The forwarding task lives exactly as long as this value: dropping it
/// unsubscribes.
pub struct ResizeSubscription {
    task: JoinHandle<()>,
}

impl ResizeSubscription {
    /// Subscribe to `SIGWINCH` for the controlling terminal.
    #[cfg(unix)]
    pub fn window_changes(tx: mpsc::Sender<WidgetEvent>) -> crate::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigwinch = signal(SignalKind::window_change())?;
        let task = tokio::spawn(async move {
            while sigwinch.recv().await.is_some() {
                if tx.send(WidgetEvent::WindowResized).await.is_err() {
                    break;
                }
            }
            debug!("window-change subscription ended");
        });
        Ok(Self { task })
    }

    /// Forward every tick received on `ticks`.
    ///
    /// For hosts that report resizes some other way than a signal.
    pub fn forward(mut ticks: mpsc::Receiver<()>, tx: mpsc::Sender<WidgetEvent>) -> Self {
        let task = tokio::spawn(async move {
            while ticks.recv().await.is_some() {
                if tx.send(WidgetEvent::WindowResized).await.is_err() {
                    break;
                }
            }
        });
        Self { task }
    }

    /// Whether the forwarding task is still running.
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for ResizeSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_forwards_ticks() {
        let (tick_tx, tick_rx) = mpsc::channel(4);
        let (tx, mut rx) = mpsc::channel(4);
        let sub = ResizeSubscription::forward(tick_rx, tx);

        tick_tx.send(()).await.unwrap();
        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert_eq!(event, Some(WidgetEvent::WindowResized));
        assert!(sub.is_active());
    }

    #[tokio::test]
    async fn test_drop_releases_subscription() {
        let (tick_tx, tick_rx) = mpsc::channel(4);
        let (tx, mut rx) = mpsc::channel(4);
        let sub = ResizeSubscription::forward(tick_rx, tx);
        drop(sub);

        // The aborted task drops its sender, closing the event channel
        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert_eq!(event, None);
        assert!(tick_tx.send(()).await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_window_changes_subscribes() {
        let (tx, _rx) = mpsc::channel(4);
        let sub = ResizeSubscription::window_changes(tx).unwrap();
        assert!(sub.is_active());
    }
}
