//! Approval/payment lifecycle state machine.
//!
//! The engine is pure: it validates a requested transition against the
//! per-kind table and returns a [`types::TransitionOutcome`] describing the
//! side effects (audit entry, optional notification). Executing those side
//! effects is the orchestration layer's job; a rejected transition produces
//! nothing at all.

pub mod engine;
pub mod error;
pub mod notify;
pub mod types;

pub use engine::WorkflowEngine;
pub use error::WorkflowError;
pub use notify::{Notification, Notifier, NotifyError};
pub use types::{Actor, ActorRole, TransitionOutcome};
