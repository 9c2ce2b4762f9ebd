#![deny(unused)]
//! Observability for Planview.
//!
//! This crate provides:
//! - Structured logging setup (plain or JSON)
//! - Prometheus metrics recorder and request/pipeline counters

pub mod metrics;
pub mod tracing_layer;

pub use self::metrics::{
    setup_metrics_recorder, track_render, track_request, track_upload, track_upstream_error,
};
pub use tracing_layer::configure_tracing;
