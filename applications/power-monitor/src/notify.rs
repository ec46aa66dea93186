use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::error::Result;

/// Delivers a rendered message to the configured chat channel.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}

/// Fire-and-forget front of the gateway.
///
/// Messages are queued and delivered by a background task, so a slow or
/// failing chat channel never holds up the caller.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<String>,
}

impl Notifier {
    /// Start the delivery task. It exits once every `Notifier` clone is dropped
    /// and the queue has drained.
    pub fn spawn(gateway: Arc<dyn NotificationGateway>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<String>(capacity.max(1));
        let handle = tokio::spawn(async move {
            while let Some(text) = rx.recv().await {
                match gateway.send(&text).await {
                    Ok(()) => debug!(chars = text.len(), "notification delivered"),
                    Err(e) => error!(error = %e, "notification delivery failed"),
                }
            }
            debug!("notification queue closed");
        });
        (Self { tx }, handle)
    }

    /// Queue a message. Returns false if it was dropped.
    pub fn dispatch(&self, text: String) -> bool {
        match self.tx.try_send(text) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("notification queue full; dropping message");
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!("notification queue closed; dropping message");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use mockall::Sequence;

    #[tokio::test]
    async fn test_failed_delivery_does_not_stop_the_queue() {
        let mut gateway = MockNotificationGateway::new();
        let mut seq = Sequence::new();
        gateway
            .expect_send()
            .withf(|text: &str| text == "first")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(AppError::Telegram("chat not found".to_string())));
        gateway
            .expect_send()
            .withf(|text: &str| text == "second")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let (notifier, handle) = Notifier::spawn(Arc::new(gateway), 8);
        assert!(notifier.dispatch("first".to_string()));
        assert!(notifier.dispatch("second".to_string()));

        drop(notifier);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_dispatch_after_worker_stopped_is_dropped() {
        let gateway = MockNotificationGateway::new();
        let (notifier, handle) = Notifier::spawn(Arc::new(gateway), 1);
        handle.abort();
        let _ = handle.await;

        assert!(!notifier.dispatch("late".to_string()));
    }
}
