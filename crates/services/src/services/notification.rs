use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

/// A message addressed to one customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub customer_id: Uuid,
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn welcome(customer_id: Uuid, name: &str, email: &str) -> Self {
        Self {
            customer_id,
            recipient: email.to_string(),
            subject: "Welcome".to_string(),
            body: format!("Hello {name}, your customer account is ready."),
        }
    }
}

/// Outbound notification channel (email, push, ...).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<(), NotificationError>;
}

/// Records notifications in the log instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotificationError> {
        tracing::info!(
            customer_id = %notification.customer_id,
            recipient = %notification.recipient,
            subject = %notification.subject,
            "Notification sent"
        );
        Ok(())
    }
}

/// Sends `notification` on a detached task.
///
/// The task outlives the caller's request and its failure is logged and
/// dropped.
pub fn spawn_notification(
    notifier: Arc<dyn Notifier>,
    notification: Notification,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let customer_id = notification.customer_id;
        if let Err(e) = notifier.send(notification).await {
            tracing::warn!(%customer_id, "Failed to send notification: {}", e);
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Failing(Arc<AtomicUsize>);

    #[async_trait]
    impl Notifier for Failing {
        async fn send(&self, _notification: Notification) -> Result<(), NotificationError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(NotificationError::Delivery("smtp down".into()))
        }
    }

    #[tokio::test]
    async fn failed_delivery_does_not_surface() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let notifier: Arc<dyn Notifier> = Arc::new(Failing(Arc::clone(&attempts)));

        let handle = spawn_notification(
            notifier,
            Notification::welcome(Uuid::new_v4(), "Ann", "ann@example.com"),
        );

        handle.await.unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn welcome_is_addressed_to_the_customer() {
        let id = Uuid::new_v4();
        let welcome = Notification::welcome(id, "Ann", "ann@example.com");
        assert_eq!(welcome.recipient, "ann@example.com");
        assert!(welcome.body.contains("Ann"));
    }
}
