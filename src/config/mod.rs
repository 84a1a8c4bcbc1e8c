//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → CLI overrides (rpc url, proxy, fee model)
//!     → validation.rs (semantic checks)
//!     → TransferConfig (validated, immutable)
//!     → shared by reference with both clients
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ConfirmationConfig, EndpointConfig, FeeConfig, FeeModel, LogFormat, ObservabilityConfig,
    RetryConfig, TransferConfig,
};
pub use validation::{validate_config, ValidationError};
