//! Quick-Checks sequence counter repository.
//!
//! Implements the core `SequenceCounter` trait over the single-row
//! `check_sequence` table. A reservation claims the row by writing
//! `locked_until`, bumps the counter, and releases. The claim is a
//! conditional update, so two concurrent exports cannot both hold it;
//! a claim whose holder crashed expires with its TTL and is taken over
//! by the next caller.

use std::time::Duration;

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, Statement};
use tracing::debug;

use payrail_core::export::quickchecks::LOCK_TTL;
use payrail_core::export::{ExportError, SequenceCounter};
use payrail_core::index::StoreError;

/// Pause between claim attempts while another export holds the lock.
const RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// Check sequence repository.
#[derive(Debug, Clone)]
pub struct CheckSequenceRepository {
    db: DatabaseConnection,
    lock_ttl: Duration,
}

impl CheckSequenceRepository {
    /// Creates a new sequence repository with the default lock TTL.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            lock_ttl: LOCK_TTL,
        }
    }

    /// Attempts one claim. Returns the pre-claim counter value when the
    /// lock was free or stale, `None` when another holder has it.
    async fn try_claim(&self) -> Result<Option<i64>, ExportError> {
        let statement = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "UPDATE check_sequence \
             SET locked_until = NOW() + $1 * INTERVAL '1 second' \
             WHERE id = 1 AND (locked_until IS NULL OR locked_until < NOW()) \
             RETURNING next_number",
            [i64::try_from(self.lock_ttl.as_secs()).unwrap_or(i64::MAX).into()],
        );
        let row = self
            .db
            .query_one(statement)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;
        row.map(|r| {
            r.try_get::<i64>("", "next_number")
                .map_err(|e| ExportError::from(StoreError::Query(e.to_string())))
        })
        .transpose()
    }

    /// Bumps the counter past the reserved block and releases the lock.
    async fn commit_block(&self, next_number: i64) -> Result<(), ExportError> {
        let statement = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "UPDATE check_sequence \
             SET next_number = $1, locked_until = NULL, updated_at = NOW() \
             WHERE id = 1",
            [next_number.into()],
        );
        self.db
            .execute(statement)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl SequenceCounter for CheckSequenceRepository {
    async fn reserve(&self, count: u64) -> Result<u64, ExportError> {
        let deadline = tokio::time::Instant::now() + self.lock_ttl;

        loop {
            if let Some(first) = self.try_claim().await? {
                let block = i64::try_from(count).map_err(|_| {
                    StoreError::Query(format!("block of {count} checks exceeds the counter range"))
                })?;
                let next = first.saturating_add(block);
                self.commit_block(next).await?;
                debug!(first, count, "check numbers reserved");
                return Ok(u64::try_from(first).unwrap_or(0));
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(ExportError::LockTimeout(self.lock_ttl));
            }
            tokio::time::sleep(RETRY_INTERVAL).await;
        }
    }
}
