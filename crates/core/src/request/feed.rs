//! Tenant feed hydration.
//!
//! External tenant snapshots arrive as JSON arrays of request records.
//! A record's stored status slug may predate the unified lifecycle, so
//! hydration resolves it through [`remap_status`] before the record is
//! deserialized into a typed [`Request`]. Current slugs pass through
//! unchanged; unknown slugs reject the record.

use serde_json::Value;
use thiserror::Error;

use super::statusmap::remap_status;
use super::types::{KindDetails, Request};

/// Errors hydrating a single feed record.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Record is missing a field hydration needs before deserializing.
    #[error("feed record has no `{0}` field")]
    MissingField(&'static str),

    /// Status slug matches neither the current vocabulary nor the
    /// kind's legacy table.
    #[error("unknown status slug `{0}`")]
    UnknownStatus(String),

    /// Record does not deserialize into a request.
    #[error("malformed feed record: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Hydrates one feed record into a [`Request`].
///
/// The status slug is read as a raw string and remapped against the
/// kind's table, so snapshots taken from stores that still carry
/// historical slugs hydrate the same as current ones.
pub fn request_from_feed(mut value: Value) -> Result<Request, FeedError> {
    let details = value
        .get("details")
        .cloned()
        .ok_or(FeedError::MissingField("details"))?;
    let details: KindDetails = serde_json::from_value(details)?;

    let raw_status = value
        .get("status")
        .and_then(Value::as_str)
        .ok_or(FeedError::MissingField("status"))?;
    let status = remap_status(details.kind(), raw_status)
        .ok_or_else(|| FeedError::UnknownStatus(raw_status.to_owned()))?;

    value["status"] = Value::String(status.as_str().to_owned());
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::testutil;
    use crate::request::types::{RequestKind, RequestStatus};

    fn feed_record(kind: RequestKind, raw_status: &str) -> Value {
        let mut value =
            serde_json::to_value(testutil::request(kind, 42, 7)).expect("request serializes");
        value["status"] = Value::String(raw_status.to_owned());
        value
    }

    #[test]
    fn test_legacy_slug_hydrates_remapped() {
        let request =
            request_from_feed(feed_record(RequestKind::Reimbursement, "reimbursed")).unwrap();
        assert_eq!(request.status, RequestStatus::Paid);
    }

    #[test]
    fn test_current_slug_passes_through() {
        let request =
            request_from_feed(feed_record(RequestKind::VendorPayment, "pending-approval"))
                .unwrap();
        assert_eq!(request.status, RequestStatus::PendingApproval);
    }

    #[test]
    fn test_unknown_slug_rejects_the_record() {
        let err = request_from_feed(feed_record(RequestKind::SponsorInvoice, "limbo")).unwrap_err();
        assert!(matches!(err, FeedError::UnknownStatus(slug) if slug == "limbo"));
    }

    #[test]
    fn test_record_without_status_is_rejected() {
        let mut value = feed_record(RequestKind::VendorPayment, "draft");
        value.as_object_mut().unwrap().remove("status");
        let err = request_from_feed(value).unwrap_err();
        assert!(matches!(err, FeedError::MissingField("status")));
    }
}
