//! Workflow domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use payrail_shared::types::ActorId;

use crate::audit::AuditEntry;
use crate::request::types::RequestStatus;
use crate::workflow::notify::Notification;

/// Capability level of an acting user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    /// Can create, edit, and submit their own requests.
    Requester,
    /// Central operator; can review, route, pay, cancel, and reopen any
    /// request.
    Operator,
}

/// A user acting on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// The user's id.
    pub id: ActorId,
    /// The user's capability level.
    pub role: ActorRole,
}

impl Actor {
    /// Creates an actor.
    #[must_use]
    pub const fn new(id: ActorId, role: ActorRole) -> Self {
        Self { id, role }
    }

    /// Returns true for operator-capability actors.
    #[must_use]
    pub const fn is_operator(&self) -> bool {
        matches!(self.role, ActorRole::Operator)
    }
}

/// The accepted side effects of a validated transition.
///
/// The engine never mutates anything; callers persist the new status,
/// append the audit entry, and deliver the notification (if any).
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    /// Status before the transition.
    pub from: RequestStatus,
    /// Status after the transition.
    pub to: RequestStatus,
    /// Who performed it.
    pub actor_id: ActorId,
    /// Optional reason note (required for some transitions).
    pub reason: Option<String>,
    /// When the transition was validated.
    pub occurred_at: DateTime<Utc>,
    /// Audit entry to append to the request's trail.
    pub audit: AuditEntry,
    /// Notification to the owning actor, when the new state is on the
    /// notify list.
    pub notification: Option<Notification>,
}
