//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! user input (address, key, amount)
//!     → validators.rs (format checks, key derivation)
//!     → client.rs (session lifecycle, write-once credentials, queries)
//!         → rpc.rs (raw JSON-RPC over HTTP, optional proxy)
//!     → transaction.rs (unsigned transfer, legacy or EIP-1559 fees)
//!     → submitter.rs (estimate, sign, broadcast, poll for receipt)
//!         → wallet.rs (local signing)
//! ```
//!
//! # Security Constraints
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts
//! - A session is closed on every exit path, including a failed connect

pub mod client;
pub mod rpc;
pub mod submitter;
pub mod transaction;
pub mod types;
pub mod validators;
pub mod wallet;

pub use client::BlockchainClient;
pub use rpc::{ChainRpc, Connector, HttpConnector, HttpSession};
pub use submitter::{ConfirmationState, TxSubmitter};
pub use transaction::{FeePolicy, TxBuilder};
pub use types::{
    ConfirmationResult, FeeFields, Multiplier, RpcFailure, RpcResult, SignedTransaction,
    TransferError, TransferResult, TxReceipt, UnsignedTransaction,
};
pub use validators::{validate_address, validate_amount, validate_private_key, Amount};
pub use wallet::{PrivateKey, PRIVATE_KEY_ENV_VAR};
