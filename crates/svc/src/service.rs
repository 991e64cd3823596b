//! Request lifecycle service.
//!
//! Glues the pure workflow engine to its side effects. An accepted
//! transition persists the new status, appends the audit entry, delivers
//! the notification, and refreshes the central index row; a rejected one
//! does none of those, so `Forbidden` attempts leave no trace anywhere.
//!
//! Indexing and notification failures are logged and swallowed: neither
//! may fail a transition that the authoritative store already accepted.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use payrail_shared::types::{ActorId, RequestRef};

use payrail_core::audit::{AuditError, AuditLog};
use payrail_core::index::{
    IndexMaintainer, IndexStore, InMemoryTenantStore, StoreError, TenantStore,
};
use payrail_core::request::RequestStatus;
use payrail_core::workflow::{
    Actor, ActorRole, Notifier, TransitionOutcome, WorkflowEngine, WorkflowError,
};

/// Synthetic actor for transitions confirmed by a banking rail rather
/// than a person (export reconciliation marking requests paid).
pub const RECONCILIATION_ACTOR: ActorId =
    ActorId::from_uuid(Uuid::from_u128(0x5265_636f_6e63_696c));

/// Request service errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No authoritative record at this address.
    #[error("Request {0} not found")]
    NotFound(RequestRef),

    /// The workflow engine rejected the transition.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// A backing store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The audit trail could not be appended.
    #[error(transparent)]
    Audit(#[from] AuditError),
}

/// Write access back into a tenant's authoritative store.
///
/// Tenant storage itself is an external collaborator; the adapter that
/// fronts it implements this to persist an accepted status change.
#[async_trait]
pub trait StatusWriter: Send + Sync {
    /// Persists the new status. When the status is `Paid`, the write
    /// also stamps `paid_at` with the transition time.
    async fn write_status(
        &self,
        reference: RequestRef,
        status: RequestStatus,
        occurred_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

#[async_trait]
impl StatusWriter for InMemoryTenantStore {
    async fn write_status(
        &self,
        reference: RequestRef,
        status: RequestStatus,
        occurred_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let Some(mut request) = self.get(reference).await? else {
            return Err(StoreError::Query(format!("no record at {reference}")));
        };
        request.status = status;
        request.updated_at = occurred_at;
        if status == RequestStatus::Paid {
            request.paid_at = Some(occurred_at);
        }
        self.put(request);
        Ok(())
    }
}

/// Runs workflow transitions end to end.
pub struct RequestService<T, I> {
    engine: WorkflowEngine,
    tenants: Arc<T>,
    writer: Arc<dyn StatusWriter>,
    maintainer: Arc<IndexMaintainer<T, I>>,
    audit: Arc<dyn AuditLog>,
    notifier: Arc<dyn Notifier>,
}

impl<T: TenantStore, I: IndexStore> RequestService<T, I> {
    /// Creates a service over the given collaborators.
    #[must_use]
    pub fn new(
        engine: WorkflowEngine,
        tenants: Arc<T>,
        writer: Arc<dyn StatusWriter>,
        maintainer: Arc<IndexMaintainer<T, I>>,
        audit: Arc<dyn AuditLog>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            engine,
            tenants,
            writer,
            maintainer,
            audit,
            notifier,
        }
    }

    /// Moves a request to `target`, executing all side effects.
    ///
    /// # Errors
    ///
    /// Workflow rejections (`Forbidden`, `InvalidTransition`,
    /// `ReasonRequired`, `IncompleteFields`) propagate before any side
    /// effect runs.
    pub async fn transition(
        &self,
        reference: RequestRef,
        target: RequestStatus,
        actor: &Actor,
        reason: Option<&str>,
    ) -> Result<TransitionOutcome, ServiceError> {
        let request = self
            .tenants
            .get(reference)
            .await?
            .ok_or(ServiceError::NotFound(reference))?;
        let outcome = self.engine.transition(&request, target, actor, reason)?;
        self.commit(reference, outcome).await
    }

    /// Reopens a terminal request back to pending approval.
    pub async fn reopen(
        &self,
        reference: RequestRef,
        actor: &Actor,
        reason: &str,
    ) -> Result<TransitionOutcome, ServiceError> {
        let request = self
            .tenants
            .get(reference)
            .await?
            .ok_or(ServiceError::NotFound(reference))?;
        let outcome = self.engine.reopen(&request, actor, reason)?;
        self.commit(reference, outcome).await
    }

    /// Marks a pending-payment request paid on behalf of the banking
    /// rail that confirmed completion.
    pub async fn reconcile_paid(
        &self,
        reference: RequestRef,
    ) -> Result<TransitionOutcome, ServiceError> {
        let actor = Actor::new(RECONCILIATION_ACTOR, ActorRole::Operator);
        self.transition(reference, RequestStatus::Paid, &actor, None)
            .await
    }

    async fn commit(
        &self,
        reference: RequestRef,
        outcome: TransitionOutcome,
    ) -> Result<TransitionOutcome, ServiceError> {
        self.writer
            .write_status(reference, outcome.to, outcome.occurred_at)
            .await?;
        self.audit.append(reference, outcome.audit.clone()).await?;

        if let Some(notification) = &outcome.notification {
            if let Err(error) = self.notifier.notify(notification).await {
                warn!(request = %reference, %error, "notification delivery failed");
            }
        }
        if let Err(error) = self.maintainer.handle_saved(reference).await {
            warn!(request = %reference, %error, "incremental index update failed");
        }

        Ok(outcome)
    }
}
