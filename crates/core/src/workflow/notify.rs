//! Status change notifications.
//!
//! The engine supplies recipient, subject, and body; delivery (SMTP,
//! dashboard toast, test double) is a collaborator behind [`Notifier`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use payrail_shared::types::RequestRef;

use crate::request::types::RequestStatus;

/// A notification to a request's owning actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Recipient email address.
    pub recipient: String,
    /// Subject line; includes the request title and new-state label.
    pub subject: String,
    /// Plain-text body; includes a link back to the request and the
    /// reason, when one was given.
    pub body: String,
}

impl Notification {
    /// Builds the notification for a status change.
    #[must_use]
    pub fn for_status_change(
        dashboard_url: &str,
        request: RequestRef,
        title: &str,
        recipient: &str,
        new_status: RequestStatus,
        reason: Option<&str>,
    ) -> Self {
        let link = format!(
            "{dashboard_url}/requests/{}/{}",
            request.tenant_id, request.record_id
        );

        let mut body = format!(
            "The status of \"{title}\" is now {}.\n\nView the request: {link}\n",
            new_status.label()
        );
        if let Some(reason) = reason {
            body.push_str(&format!("\nReason: {reason}\n"));
        }

        Self {
            recipient: recipient.to_string(),
            subject: format!("{title}: {}", new_status.label()),
            body,
        }
    }
}

/// Notification delivery errors.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The transport failed to deliver.
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

/// Notification transport.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one notification.
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Notifier that drops everything, for tests and headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify(&self, _notification: &Notification) -> Result<(), NotifyError> {
        Ok(())
    }
}
