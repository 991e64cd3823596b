//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions for the central index and check counter
//! - Repository implementations of the core store traits
//! - Database migrations
//!
//! Only the central tables live here. Per-tenant request stores are
//! external collaborators reached through the `TenantStore` trait.

pub mod entities;
pub mod migration;
pub mod repositories;

pub use repositories::{CheckSequenceRepository, IndexRowRepository};

use sea_orm::{Database, DatabaseConnection, DbErr};

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}
