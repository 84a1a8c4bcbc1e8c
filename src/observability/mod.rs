//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields (client, attempt, tx_hash)
//!     → logging.rs (filter, then console and optional file sinks)
//! ```
//!
//! # Design Decisions
//! - Structured logging; JSON console format for machine parsing
//! - `RUST_LOG` overrides the configured level
//! - Secrets never reach a log event

pub mod logging;

pub use logging::{init, LoggingError};
