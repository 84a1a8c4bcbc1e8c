//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! RPC call from a client:
//!     → timeouts.rs (enforce per-call deadline)
//!     → On failure: retries.rs (check if transient, retry after delay)
//!     → Exhausted or non-transient: mapped to a TransferError by the caller
//!     → classifier.rs (decide reprompt / abort / terminate, log once)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every RPC call has a deadline
//! - Retry is innermost, classification outermost
//! - All resilience logic is composable wrappers around futures

pub mod backoff;
pub mod classifier;
pub mod retries;
pub mod timeouts;

pub use classifier::{classify, escalate, report, Disposition, Escalation};
pub use retries::{retry, RetryPolicy, Transient};
pub use timeouts::with_timeout;
