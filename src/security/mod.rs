//! Request governance.
//!
//! # Data Flow
//! ```text
//! Incoming request (RequestContext already attached):
//!     → identity.rs (principal, origin address, or `unknown`)
//!     → rate_limit.rs (fixed-window count in the shared store)
//!         → degraded.rs (fail-open / fail-closed when the store is down)
//!     → Pass to handlers
//! ```
//!
//! # Design Decisions
//! - No rate-limit state in process; the counter store is the only owner
//! - Degraded mode is decided per request, so recovery is immediate
//! - Unidentified callers share one bucket instead of bypassing the limit

pub mod degraded;
pub mod identity;
pub mod rate_limit;

pub use degraded::{DegradedOutcome, DegradedStrategy, FailClosed, FailOpen};
pub use identity::{AuthenticatedPrincipal, ClientIdentity, IdentityResolver};
pub use rate_limit::{Decision, Quota, RateLimiter};
