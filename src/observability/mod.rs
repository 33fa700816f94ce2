//! Observability subsystem.
//!
//! Structured logging is initialized in `main.rs` through
//! `tracing-subscriber`; this module owns metrics exposition.

pub mod metrics;
