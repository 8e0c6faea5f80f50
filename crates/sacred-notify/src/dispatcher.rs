use tokio::sync::mpsc;
use tracing::{debug, warn};

use sacred_types::events::NotificationEvent;

use crate::delivery::Delivery;

/// Fire-and-forget handle for outbound notifications.
///
/// `notify` only enqueues; a background task owns delivery. Callers never
/// see delivery failures.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<NotificationEvent>,
}

impl Notifier {
    /// Starts the delivery task on the current tokio runtime.
    pub fn spawn(delivery: Delivery) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_delivery_loop(rx, delivery));
        Self { tx }
    }

    /// A notifier whose events land on the returned receiver instead of
    /// being delivered.
    pub fn capture() -> (Self, mpsc::UnboundedReceiver<NotificationEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn notify(&self, event: NotificationEvent) {
        let kind = event.kind();
        if self.tx.send(event).is_err() {
            warn!("Notification queue closed, dropping {} event", kind);
        }
    }
}

async fn run_delivery_loop(mut rx: mpsc::UnboundedReceiver<NotificationEvent>, delivery: Delivery) {
    while let Some(event) = rx.recv().await {
        match delivery.deliver(&event).await {
            Ok(()) => debug!("Delivered {} notification to {}", event.kind(), event.recipient()),
            Err(e) => warn!("Notification {} for {} failed: {}", event.kind(), event.recipient(), e),
        }
    }
    debug!("Notification queue drained, delivery task exiting");
}
