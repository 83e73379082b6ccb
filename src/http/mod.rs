//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, per-request span)
//!     → relay handler
//!     → response.rs (JSON error bodies)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod tls;

pub use request::{request_id, RequestIdMaker, X_REQUEST_ID};
pub use response::ErrorBody;
pub use server::{HttpServer, Services, StartupError};
