//! Creates the central payment index table and its rebuild shadow.
//!
//! The shadow table is identical in shape. Full rebuilds populate the
//! shadow and swap the two names in one transaction, so a crashed
//! rebuild leaves the previous index in place rather than an empty one.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const PAYMENT_INDEX_COLUMNS: &str = r"
    tenant_id       BIGINT NOT NULL,
    record_id       BIGINT NOT NULL,
    kind            VARCHAR(32) NOT NULL,
    status          VARCHAR(32) NOT NULL,
    amount          NUMERIC(14, 2) NOT NULL,
    currency        VARCHAR(3) NOT NULL DEFAULT '',
    title           VARCHAR(128) NOT NULL DEFAULT '',
    created_at      TIMESTAMPTZ NOT NULL,
    updated_at      TIMESTAMPTZ NOT NULL,
    paid_at         TIMESTAMPTZ,
    category        VARCHAR(64),
    method          VARCHAR(32),
    wordcamp_name   VARCHAR(128),
    date_paid       DATE,
    sponsor_name    VARCHAR(128),
    due_date        DATE,
    PRIMARY KEY (tenant_id, record_id)
";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(&format!(
            "CREATE TABLE payment_index ({PAYMENT_INDEX_COLUMNS});"
        ))
        .await?;
        db.execute_unprepared(&format!(
            "CREATE TABLE payment_index_shadow ({PAYMENT_INDEX_COLUMNS});"
        ))
        .await?;

        // Dashboard reads sort by status and recency, and exports select
        // by status within a paid/updated window.
        db.execute_unprepared(
            "CREATE INDEX idx_payment_index_status ON payment_index (status, updated_at DESC);",
        )
        .await?;
        db.execute_unprepared(
            "CREATE INDEX idx_payment_index_paid_at ON payment_index (paid_at);",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP TABLE IF EXISTS payment_index_shadow;")
            .await?;
        db.execute_unprepared("DROP TABLE IF EXISTS payment_index;")
            .await?;
        Ok(())
    }
}
