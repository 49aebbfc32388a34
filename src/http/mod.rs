//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layer ordering)
//!     → request.rs (correlation ID, RequestContext)
//!     → security::identity (client identity)
//!     → security::rate_limit (allow / 429 / 503)
//!     → handlers
//!     → request.rs (echo X-Request-ID on the way out)
//! ```

pub mod request;
pub mod server;

pub use request::{RequestContext, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
