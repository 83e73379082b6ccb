//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Relay handler, pipeline, upstream client produce:
//!     → logging.rs (structured log events, one per validation step)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every log line via the request span
//! - Secrets never appear in logs

pub mod logging;
pub mod metrics;
