//! Outbox: queue outbound notification emails and deliver them over SMTP
//! with bounded concurrency, connection reuse, and bounded retry.
//!
//! This crate wires the workspace together: the [`Controller`] runs the
//! delivery daemon from a configuration file, and [`Ingest`] is the
//! entrypoint a request layer uses to queue emails.

pub mod controller;
pub mod ingest;

pub use controller::Controller;
pub use ingest::{Ingest, IngestError};
