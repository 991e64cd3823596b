//! SMTP delivery for workflow notifications.

use std::sync::Arc;

use async_trait::async_trait;

use payrail_core::workflow::{Notification, Notifier, NotifyError};
use payrail_shared::EmailService;

/// Delivers workflow notifications through the shared SMTP transport.
pub struct SmtpNotifier {
    email: Arc<EmailService>,
}

impl SmtpNotifier {
    /// Creates a notifier over an SMTP transport.
    #[must_use]
    pub fn new(email: Arc<EmailService>) -> Self {
        Self { email }
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.email
            .send(
                &notification.recipient,
                &notification.subject,
                &notification.body,
            )
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))
    }
}
