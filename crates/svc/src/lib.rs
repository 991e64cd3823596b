//! Orchestration layer for Payrail.
//!
//! The core crate is pure domain logic; this crate wires it to the
//! outside world:
//! - [`service::RequestService`] runs workflow transitions end to end
//!   (persist, audit, notify, reindex)
//! - [`scheduler`] drives the recurring full index rebuild
//! - [`export_runner::ExportRunner`] resolves a batch, encodes it, and
//!   materializes the file atomically
//! - [`notifier::SmtpNotifier`] delivers workflow notifications over SMTP
//! - [`rates::HttpRateProvider`] fetches exchange rates over HTTP

pub mod export_runner;
pub mod notifier;
pub mod rates;
pub mod scheduler;
pub mod service;

pub use export_runner::{ExportFormat, ExportRunner};
pub use notifier::SmtpNotifier;
pub use rates::HttpRateProvider;
pub use service::{RequestService, ServiceError, StatusWriter};
