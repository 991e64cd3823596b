//! Workflow transition engine.
//!
//! Validates transitions against the per-kind table and assembles the
//! side effects for accepted ones. Rejections return an error and nothing
//! else; the guard invariant is that a `Forbidden` attempt leaves no trace.

use serde_json::json;

use crate::audit::AuditEntry;
use crate::request::types::{Request, RequestKind, RequestStatus};
use crate::workflow::error::WorkflowError;
use crate::workflow::notify::Notification;
use crate::workflow::types::{Actor, TransitionOutcome};

/// New states that trigger a notification to the owning actor.
const NOTIFY_STATES: &[RequestStatus] = &[
    RequestStatus::Incomplete,
    RequestStatus::Approved,
    RequestStatus::PendingPayment,
    RequestStatus::Paid,
    RequestStatus::Failed,
    RequestStatus::Cancelled,
];

/// Capability a transition requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capability {
    /// The request's owning actor (operators also qualify).
    Owner,
    /// Operator-level capability only.
    Operator,
}

/// Requirements attached to an allowed transition.
#[derive(Debug, Clone, Copy)]
struct Rule {
    capability: Capability,
    needs_reason: bool,
    needs_complete_fields: bool,
}

const fn rule(capability: Capability) -> Rule {
    Rule {
        capability,
        needs_reason: false,
        needs_complete_fields: false,
    }
}

/// Stateless workflow engine.
///
/// Carries only the dashboard base URL used to build notification links.
#[derive(Debug, Clone)]
pub struct WorkflowEngine {
    dashboard_url: String,
}

impl WorkflowEngine {
    /// Creates an engine building links against the given dashboard URL.
    #[must_use]
    pub fn new(dashboard_url: impl Into<String>) -> Self {
        Self {
            dashboard_url: dashboard_url.into(),
        }
    }

    /// Validates a transition and returns its side effects.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` when the per-kind table has no such edge
    /// - `Forbidden` when the actor lacks the required capability
    /// - `ReasonRequired` / `IncompleteFields` when the edge's guards fail
    pub fn transition(
        &self,
        request: &Request,
        target: RequestStatus,
        actor: &Actor,
        reason: Option<&str>,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let from = request.status;
        let kind = request.kind();

        let rule = Self::lookup(kind, from, target).ok_or(WorkflowError::InvalidTransition {
            from,
            to: target,
        })?;

        Self::check_capability(rule.capability, request, actor)?;

        let reason = reason.map(str::trim).filter(|r| !r.is_empty());
        if rule.needs_reason && reason.is_none() {
            return Err(WorkflowError::ReasonRequired);
        }

        if rule.needs_complete_fields {
            let missing = Self::missing_fields(request);
            if !missing.is_empty() {
                return Err(WorkflowError::IncompleteFields { missing });
            }
        }

        Ok(self.outcome(request, target, actor, reason, "transition"))
    }

    /// Reopens a terminal request back to pending approval.
    ///
    /// Terminal states are otherwise irreversible; reopening is an
    /// explicit operator action and always requires a reason.
    pub fn reopen(
        &self,
        request: &Request,
        actor: &Actor,
        reason: &str,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let from = request.status;
        if !from.is_terminal(request.kind()) {
            return Err(WorkflowError::InvalidTransition {
                from,
                to: RequestStatus::PendingApproval,
            });
        }

        if !actor.is_operator() {
            return Err(WorkflowError::Forbidden {
                required: "operator",
            });
        }

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(WorkflowError::ReasonRequired);
        }

        Ok(self.outcome(
            request,
            RequestStatus::PendingApproval,
            actor,
            Some(reason),
            "reopen",
        ))
    }

    /// Names of mandatory fields the request is still missing.
    ///
    /// Parameterized per kind; a sponsor invoice needs sponsor, currency,
    /// amount, and a routing classification before submission.
    #[must_use]
    pub fn missing_fields(request: &Request) -> Vec<&'static str> {
        use crate::request::types::KindDetails;

        let mut missing = Vec::new();
        if request.title.trim().is_empty() {
            missing.push("title");
        }

        match &request.details {
            KindDetails::Payment { .. } => {
                if request.currency.is_unset() {
                    missing.push("currency");
                }
                if request.amount <= rust_decimal::Decimal::ZERO {
                    missing.push("amount");
                }
                if request.method.is_none() {
                    missing.push("method");
                }
            }
            KindDetails::Reimbursement { wordcamp_name, .. } => {
                if wordcamp_name.trim().is_empty() {
                    missing.push("wordcamp_name");
                }
                if request.line_items.is_empty() {
                    missing.push("line_items");
                }
                if request.method.is_none() {
                    missing.push("method");
                }
            }
            KindDetails::Invoice {
                sponsor_name,
                classification,
                ..
            } => {
                if sponsor_name.trim().is_empty() {
                    missing.push("sponsor");
                }
                if request.currency.is_unset() {
                    missing.push("currency");
                }
                if request.amount <= rust_decimal::Decimal::ZERO {
                    missing.push("amount");
                }
                if classification.trim().is_empty() {
                    missing.push("classification");
                }
            }
        }

        missing
    }

    /// Derived editability, never stored.
    ///
    /// Owners may edit while drafting or completing requested info;
    /// operators in any non-terminal state; nobody once paid.
    #[must_use]
    pub fn is_editable_by(request: &Request, actor: &Actor) -> bool {
        if request.status == RequestStatus::Paid {
            return false;
        }
        if actor.is_operator() {
            return !request.status.is_terminal(request.kind());
        }
        actor.id == request.author_id
            && matches!(
                request.status,
                RequestStatus::Draft | RequestStatus::Incomplete
            )
    }

    /// The per-kind transition table.
    fn lookup(kind: RequestKind, from: RequestStatus, to: RequestStatus) -> Option<Rule> {
        use RequestStatus as S;

        // Operator may cancel or fail anything non-terminal. Storage-only
        // states never enter the workflow; the tenant store owns those.
        if matches!(to, S::Cancelled | S::Failed)
            && !from.is_terminal(kind)
            && !matches!(from, S::AutoDraft | S::Trash)
        {
            return Some(rule(Capability::Operator));
        }

        match (from, to) {
            (S::Draft | S::Incomplete, S::PendingApproval) => Some(Rule {
                capability: Capability::Owner,
                needs_reason: false,
                needs_complete_fields: true,
            }),
            (S::PendingApproval, S::Approved) => Some(rule(Capability::Operator)),
            (S::PendingApproval, S::Incomplete) => Some(Rule {
                capability: Capability::Operator,
                needs_reason: true,
                needs_complete_fields: false,
            }),
            (S::Approved, S::PendingPayment) => Some(rule(Capability::Operator)),
            (S::Approved, S::Uncollectible) if kind == RequestKind::SponsorInvoice => {
                Some(rule(Capability::Operator))
            }
            (S::PendingPayment, S::Paid) => Some(rule(Capability::Operator)),
            (S::Paid, S::Refunded) if kind == RequestKind::SponsorInvoice => {
                Some(rule(Capability::Operator))
            }
            _ => None,
        }
    }

    fn check_capability(
        capability: Capability,
        request: &Request,
        actor: &Actor,
    ) -> Result<(), WorkflowError> {
        match capability {
            Capability::Owner => {
                if actor.is_operator() || actor.id == request.author_id {
                    Ok(())
                } else {
                    Err(WorkflowError::Forbidden { required: "owner" })
                }
            }
            Capability::Operator => {
                if actor.is_operator() {
                    Ok(())
                } else {
                    Err(WorkflowError::Forbidden {
                        required: "operator",
                    })
                }
            }
        }
    }

    fn outcome(
        &self,
        request: &Request,
        target: RequestStatus,
        actor: &Actor,
        reason: Option<&str>,
        action: &str,
    ) -> TransitionOutcome {
        let from = request.status;

        let audit = AuditEntry::new(
            actor.id,
            format!("Status changed from {from} to {target}"),
            json!({
                "action": action,
                "from": from.as_str(),
                "to": target.as_str(),
                "reason": reason,
            }),
        );

        let notification = (NOTIFY_STATES.contains(&target) && !request.author_email.is_empty())
            .then(|| {
                Notification::for_status_change(
                    &self.dashboard_url,
                    request.reference(),
                    &request.title,
                    &request.author_email,
                    target,
                    reason,
                )
            });

        TransitionOutcome {
            from,
            to: target,
            actor_id: actor.id,
            reason: reason.map(String::from),
            occurred_at: audit.timestamp,
            audit,
            notification,
        }
    }
}
