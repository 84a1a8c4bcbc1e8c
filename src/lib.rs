//! Native-asset transfer client for EVM JSON-RPC endpoints.

pub mod blockchain;
pub mod cli;
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use blockchain::{BlockchainClient, TransferError};
pub use config::schema::TransferConfig;
