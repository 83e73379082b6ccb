//! Authenticated relay between the restaurant dashboard and the inference API.
//!
//! # Architecture Overview
//!
//! ```text
//!     Browser / app                  ┌──────────────────────────────────────────────┐
//!     ───────────────────────────────┼─▶ http::server (request id, trace, limits)   │
//!                                    │      │                                       │
//!                                    │      ▼                                       │
//!                                    │   security::cors ──▶ relay::handler          │
//!                                    │                        │                     │
//!                                    │        ┌───────────────┼──────────────┐      │
//!                                    │        ▼               ▼              ▼      │
//!                                    │   relay::request   relay::pipeline  prompt   │
//!                                    │                        │                     │
//!                                    │                        ▼                     │
//!                                    │                  store (users, tenants)      │
//!                                    │                        │                     │
//!     ◀──────────────────────────────┼── upstream::client ◀───┘ ───────────────────▶│ Inference API
//!                                    │                                              │
//!                                    │  config · error · observability · lifecycle  │
//!                                    └──────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod config;
pub mod error;
pub mod http;
pub mod relay;

// Collaborators
pub mod prompt;
pub mod store;
pub mod upstream;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::RelayConfig;
pub use error::RelayError;
pub use http::{HttpServer, Services};
pub use lifecycle::Shutdown;
