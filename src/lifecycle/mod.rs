//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     Ctrl-C anywhere in the flow → Interrupted → exit 130
//!
//! Exit (exit.rs):
//!     completed → 0, fatal classified error → 1, bad config → 2
//! ```
//!
//! # Design Decisions
//! - An interrupted flow is dropped at its next await point
//! - Sessions are still disconnected before the process exits

pub mod exit;
pub mod signals;
