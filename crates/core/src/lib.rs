//! Core domain logic for Payrail.
//!
//! This crate contains pure business logic with ZERO web or database
//! dependencies. All domain types, the workflow state machine, the index
//! projection, and the export encoders live here.
//!
//! # Modules
//!
//! - `crypto` - Authenticated encryption of sensitive banking fields
//! - `request` - Financial request records and legacy status mapping
//! - `workflow` - Approval/payment lifecycle state machine
//! - `audit` - Append-only per-record event trail
//! - `index` - Cross-tenant denormalized index projection and maintenance
//! - `export` - NACHA / wire CSV / Quick-Checks file encoders
//! - `rates` - Exchange rate lookup with TTL caching

pub mod audit;
pub mod crypto;
pub mod export;
pub mod index;
pub mod rates;
pub mod request;
pub mod workflow;
