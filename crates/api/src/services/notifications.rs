//! Outbound notifications.
//!
//! Services publish a [`Notification`] after their writes have committed.
//! A background worker drains the channel and hands each event to a
//! [`Mailer`]. Delivery is fire-and-forget: failures are logged here and
//! never reach the publisher.

use std::future::Future;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use marquee_core::Email;

use crate::models::Purchase;
use crate::services::email::EmailError;

/// Everything a purchase confirmation needs, captured at commit time.
#[derive(Debug, Clone)]
pub struct PurchaseReceipt {
    pub purchase: Purchase,
    pub customer_email: Email,
    pub customer_name: String,
    pub movie_title: String,
    pub movie_genre: String,
    pub movie_duration_min: i32,
}

/// An event for the notification worker.
#[derive(Debug, Clone)]
pub enum Notification {
    /// A purchase was durably committed.
    PurchaseCompleted(Box<PurchaseReceipt>),
    /// A new customer registered.
    CustomerRegistered { email: Email, first_name: String },
}

impl Notification {
    const fn kind(&self) -> &'static str {
        match self {
            Self::PurchaseCompleted(_) => "purchase_completed",
            Self::CustomerRegistered { .. } => "customer_registered",
        }
    }
}

/// Delivers notifications to customers.
pub trait Mailer: Send + Sync {
    /// Send a purchase confirmation to the buyer.
    fn send_purchase_confirmation(
        &self,
        receipt: &PurchaseReceipt,
    ) -> impl Future<Output = Result<(), EmailError>> + Send;

    /// Send a welcome message to a new customer.
    fn send_welcome(
        &self,
        to: &str,
        first_name: &str,
    ) -> impl Future<Output = Result<(), EmailError>> + Send;
}

/// Publishing side of the notification channel.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl Notifier {
    /// Create a notifier and the receiver its worker should drain.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue a notification. Never fails; a closed channel is only logged.
    pub fn publish(&self, notification: Notification) {
        let kind = notification.kind();
        if self.tx.send(notification).is_err() {
            warn!(kind, "Notification worker is gone, dropping notification");
        }
    }
}

/// Drain `rx` until every [`Notifier`] is dropped.
///
/// With no mailer configured, notifications are logged and discarded.
pub async fn run_worker<M: Mailer>(
    mut rx: mpsc::UnboundedReceiver<Notification>,
    mailer: Option<M>,
) {
    info!(
        email_enabled = mailer.is_some(),
        "Notification worker started"
    );

    while let Some(notification) = rx.recv().await {
        let kind = notification.kind();
        let Some(mailer) = mailer.as_ref() else {
            info!(kind, "Email not configured, skipping notification");
            continue;
        };

        let result = match &notification {
            Notification::PurchaseCompleted(receipt) => {
                mailer.send_purchase_confirmation(receipt).await
            }
            Notification::CustomerRegistered { email, first_name } => {
                mailer.send_welcome(email.as_str(), first_name).await
            }
        };

        if let Err(e) = result {
            error!(kind, error = %e, "Failed to deliver notification");
        }
    }

    info!("Notification worker stopped");
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording mailer for tests.

    use std::sync::{Arc, Mutex};

    use super::{EmailError, Mailer, PurchaseReceipt};

    /// Records every delivery; optionally fails all of them.
    #[derive(Clone, Default)]
    pub struct RecordingMailer {
        pub sent: Arc<Mutex<Vec<String>>>,
        pub fail: bool,
    }

    impl RecordingMailer {
        pub fn sent(&self) -> Vec<String> {
            self.sent.lock().map(|s| s.clone()).unwrap_or_default()
        }

        fn record(&self, entry: String) -> Result<(), EmailError> {
            if let Ok(mut sent) = self.sent.lock() {
                sent.push(entry);
            }
            if self.fail {
                return Err(EmailError::InvalidAddress("forced failure".to_owned()));
            }
            Ok(())
        }
    }

    impl Mailer for RecordingMailer {
        async fn send_purchase_confirmation(
            &self,
            receipt: &PurchaseReceipt,
        ) -> Result<(), EmailError> {
            self.record(format!("purchase:{}", receipt.purchase.id))
        }

        async fn send_welcome(&self, to: &str, _first_name: &str) -> Result<(), EmailError> {
            self.record(format!("welcome:{to}"))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::testing::RecordingMailer;
    use super::*;

    fn registered(email: &str) -> Notification {
        Notification::CustomerRegistered {
            email: Email::parse(email).unwrap(),
            first_name: "Ana".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_worker_delivers_until_senders_drop() {
        let (notifier, rx) = Notifier::channel();
        let mailer = RecordingMailer::default();

        notifier.publish(registered("a@example.com"));
        notifier.publish(registered("b@example.com"));
        drop(notifier);

        run_worker(rx, Some(mailer.clone())).await;
        assert_eq!(
            mailer.sent(),
            vec!["welcome:a@example.com", "welcome:b@example.com"]
        );
    }

    #[tokio::test]
    async fn test_worker_survives_delivery_failures() {
        let (notifier, rx) = Notifier::channel();
        let mailer = RecordingMailer {
            fail: true,
            ..RecordingMailer::default()
        };

        notifier.publish(registered("a@example.com"));
        notifier.publish(registered("b@example.com"));
        drop(notifier);

        run_worker(rx, Some(mailer.clone())).await;
        assert_eq!(mailer.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_worker_without_mailer_drains_queue() {
        let (notifier, rx) = Notifier::channel();
        notifier.publish(registered("a@example.com"));
        drop(notifier);

        run_worker::<RecordingMailer>(rx, None).await;
    }

    #[test]
    fn test_publish_after_worker_gone_is_ignored() {
        let (notifier, rx) = Notifier::channel();
        drop(rx);
        notifier.publish(registered("a@example.com"));
    }
}
