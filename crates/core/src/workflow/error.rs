//! Workflow error types.

use thiserror::Error;

use crate::request::types::RequestStatus;

/// Errors that can occur during workflow transitions.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Attempted an invalid status transition.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// The current status.
        from: RequestStatus,
        /// The attempted target status.
        to: RequestStatus,
    },

    /// The acting user lacks the capability this transition requires.
    ///
    /// Rejections are side-effect-free: no status change, no audit entry,
    /// no notification.
    #[error("Actor lacks the {required} capability for this transition")]
    Forbidden {
        /// The capability that was required.
        required: &'static str,
    },

    /// Submission blocked because mandatory fields are missing.
    #[error("Request is missing required fields: {}", missing.join(", "))]
    IncompleteFields {
        /// Names of the missing fields.
        missing: Vec<&'static str>,
    },

    /// The transition requires a non-empty reason note.
    #[error("A reason is required for this transition")]
    ReasonRequired,
}
