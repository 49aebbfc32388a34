//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to the counter store:
//!     → timeouts.rs (enforce round-trip deadline)
//!     → On timeout: StoreError::Timeout, handled like an unreachable store
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - A slow store degrades throttling, never request latency

pub mod timeouts;

pub use timeouts::with_deadline;
