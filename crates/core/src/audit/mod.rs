//! Append-only per-record audit trail.
//!
//! Every accepted workflow transition appends an entry; entries are never
//! deleted or reordered. The trail is stored alongside the authoritative
//! request and surfaced to operators.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

use payrail_shared::types::{ActorId, AuditEntryId, RequestRef};

/// One audit trail event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Entry id (UUID v7, time-ordered).
    pub id: AuditEntryId,
    /// When the event happened.
    pub timestamp: DateTime<Utc>,
    /// Who caused it.
    pub actor_id: ActorId,
    /// Human-readable event description.
    pub message: String,
    /// Structured event payload (old/new status, reason, rail, ...).
    pub data: serde_json::Value,
}

impl AuditEntry {
    /// Creates a new entry stamped now.
    #[must_use]
    pub fn new(actor_id: ActorId, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            id: AuditEntryId::new(),
            timestamp: Utc::now(),
            actor_id,
            message: message.into(),
            data,
        }
    }
}

/// Audit storage errors.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The backing store rejected the operation.
    #[error("Audit store error: {0}")]
    Store(String),
}

/// Append-only audit trail storage.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Appends an entry to a record's ordered trail.
    async fn append(&self, request: RequestRef, entry: AuditEntry) -> Result<(), AuditError>;

    /// Returns a record's trail in append order.
    async fn entries(&self, request: RequestRef) -> Result<Vec<AuditEntry>, AuditError>;
}

/// In-memory audit log for tests and single-process deployments.
#[derive(Default)]
pub struct InMemoryAuditLog {
    trails: Mutex<HashMap<RequestRef, Vec<AuditEntry>>>,
}

impl InMemoryAuditLog {
    /// Creates an empty audit log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn append(&self, request: RequestRef, entry: AuditEntry) -> Result<(), AuditError> {
        let mut trails = self
            .trails
            .lock()
            .map_err(|e| AuditError::Store(e.to_string()))?;
        trails.entry(request).or_default().push(entry);
        Ok(())
    }

    async fn entries(&self, request: RequestRef) -> Result<Vec<AuditEntry>, AuditError> {
        let trails = self
            .trails
            .lock()
            .map_err(|e| AuditError::Store(e.to_string()))?;
        Ok(trails.get(&request).cloned().unwrap_or_default())
    }
}
