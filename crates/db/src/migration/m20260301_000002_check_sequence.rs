//! Creates the Quick-Checks sequence counter.
//!
//! A single row holds the next check number and the lock that serializes
//! reservations across concurrent export runs.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(
            r"
            CREATE TABLE check_sequence (
                id            SMALLINT PRIMARY KEY,
                next_number   BIGINT NOT NULL,
                locked_until  TIMESTAMPTZ,
                updated_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            ",
        )
        .await?;

        // Seed the singleton row. Check numbering starts at 1000 so the
        // first printed checks do not collide with manually written ones.
        db.execute_unprepared(
            "INSERT INTO check_sequence (id, next_number) VALUES (1, 1000);",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS check_sequence;")
            .await?;
        Ok(())
    }
}
