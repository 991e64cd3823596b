//! Shared types, errors, and configuration for Payrail.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for tenant-scoped record addressing
//! - Currency handling with decimal precision
//! - Pagination types for tenant store queries
//! - Application-wide error types
//! - Configuration management
//! - SMTP transport for status notifications

pub mod config;
pub mod email;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use email::EmailService;
pub use error::{AppError, AppResult};
