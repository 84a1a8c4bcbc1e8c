//! Chain-specific types and error definitions.

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use thiserror::Error;

// Re-export the endpoint settings from the config module to avoid duplication
pub use crate::config::schema::{EndpointConfig, FeeModel};

/// Failure reported by a single RPC call, before any retry decision.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RpcFailure {
    /// Transport-level failure (refused connection, HTTP error, proxy failure).
    #[error("connection error: {0}")]
    Connection(String),

    /// The node did not answer within the per-call deadline.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// The node answered with a JSON-RPC error object.
    #[error("node rejected request ({code}): {message}")]
    Rejected {
        code: i64,
        message: String,
        /// Rate limiting and similar back-pressure responses.
        retryable: bool,
    },

    /// The node answered with something we could not interpret.
    #[error("unexpected response: {0}")]
    Malformed(String),
}

impl RpcFailure {
    /// Whether repeating the same call may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            RpcFailure::Connection(_) | RpcFailure::Timeout(_) => true,
            RpcFailure::Rejected { retryable, .. } => *retryable,
            RpcFailure::Malformed(_) => false,
        }
    }
}

/// Result type for raw RPC calls.
pub type RpcResult<T> = Result<T, RpcFailure>;

/// Errors surfaced by the transfer pipeline.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransferError {
    /// Malformed recipient or sender address.
    #[error("Invalid address: {0}")]
    AddressIncorrect(String),

    /// Malformed private key or one that does not match the session address.
    #[error("Invalid private key: {0}")]
    KeyIncorrect(String),

    /// Non-numeric or non-positive transfer amount.
    #[error("Invalid amount: {0}")]
    AmountIncorrect(String),

    #[error("Address is already set for this client")]
    AddressAlreadySet,

    #[error("Private key is already set for this client")]
    KeyAlreadySet,

    #[error("Client has no address")]
    AddressNotSet,

    #[error("Client has no private key")]
    KeyNotSet,

    /// A query was issued before `connect()` or after `disconnect()`.
    #[error("Client {0} is not connected")]
    NotConnected(String),

    /// Endpoint unreachable after retries.
    #[error("Network connection error: {0}")]
    NetworkConnection(String),

    /// Endpoint unresponsive after retries.
    #[error("RPC server did not respond within {0} seconds")]
    ServerTimeout(u64),

    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    #[error("Priority fee could not be determined: {0}")]
    PriorityFee(String),

    #[error("Fee history is empty")]
    EmptyFeeHistory,

    #[error("Transaction preparation failed: {0}")]
    TransactionPreparation(String),

    #[error("Transaction signing failed: {0}")]
    TransactionSign(String),

    #[error("Transaction broadcast failed: {0}")]
    TransactionSend(String),

    #[error("Transaction receipt unavailable: {0}")]
    TransactionReceipt(String),

    #[error("Transaction not confirmed within {0} seconds")]
    TransactionTimeout(u64),

    #[error("Transaction {0} reverted")]
    TransactionReverted(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl TransferError {
    /// Errors caused by calling the client in the wrong order.
    ///
    /// These keep their identity when a pipeline stage wraps failures, so a
    /// missing `connect()` is never reported as a fee problem.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            TransferError::NotConnected(_) | TransferError::AddressNotSet | TransferError::KeyNotSet
        )
    }

    /// Re-label a failure as belonging to a pipeline stage.
    pub fn in_stage(self, stage: fn(String) -> TransferError) -> TransferError {
        if self.is_usage() {
            self
        } else {
            stage(self.to_string())
        }
    }
}

impl From<RpcFailure> for TransferError {
    fn from(failure: RpcFailure) -> Self {
        match failure {
            RpcFailure::Connection(reason) => TransferError::NetworkConnection(reason),
            RpcFailure::Timeout(secs) => TransferError::ServerTimeout(secs),
            other => TransferError::Unknown(other.to_string()),
        }
    }
}

/// Result type for transfer operations.
pub type TransferResult<T> = Result<T, TransferError>;

/// Integer headroom factor applied to fees and gas limits.
///
/// Stored in basis points so `floor(value * factor)` is exact for any
/// integer input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Multiplier {
    basis_points: u128,
}

impl Multiplier {
    const SCALE: u128 = 10_000;

    pub fn from_factor(factor: f64) -> Self {
        Self {
            basis_points: (factor * Self::SCALE as f64).round() as u128,
        }
    }

    /// `floor(value * factor)`, or `None` on overflow.
    pub fn apply(self, value: u128) -> Option<u128> {
        value
            .checked_mul(self.basis_points)
            .map(|scaled| scaled / Self::SCALE)
    }

    pub fn apply_u64(self, value: u64) -> Option<u64> {
        self.apply(value as u128).and_then(|v| u64::try_from(v).ok())
    }
}

/// Fee fields of a transaction; exactly one model is ever present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeFields {
    Legacy {
        gas_price: u128,
    },
    Eip1559 {
        max_priority_fee_per_gas: u128,
        max_fee_per_gas: u128,
    },
}

impl FeeFields {
    /// Highest price per gas unit this transaction may pay.
    pub fn max_price_per_gas(&self) -> u128 {
        match self {
            FeeFields::Legacy { gas_price } => *gas_price,
            FeeFields::Eip1559 {
                max_fee_per_gas, ..
            } => *max_fee_per_gas,
        }
    }
}

/// Unsigned native-asset transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub chain_id: u64,
    pub nonce: u64,
    pub from: Address,
    pub to: Address,
    /// Amount in wei.
    pub value: U256,
    /// Gas limit, filled in after estimation.
    pub gas: Option<u64>,
    pub fees: FeeFields,
}

impl UnsignedTransaction {
    pub fn with_gas(mut self, gas: u64) -> Self {
        self.gas = Some(gas);
        self
    }

    /// Worst-case fee in wei, once the gas limit is known.
    pub fn max_gas_cost(&self) -> Option<U256> {
        self.gas
            .map(|gas| U256::from(gas) * U256::from(self.fees.max_price_per_gas()))
    }

    /// Convert into an alloy request for estimation and signing.
    pub fn to_request(&self) -> TransactionRequest {
        let mut request = TransactionRequest::default()
            .with_from(self.from)
            .with_to(self.to)
            .with_value(self.value)
            .with_nonce(self.nonce)
            .with_chain_id(self.chain_id);

        match self.fees {
            FeeFields::Legacy { gas_price } => {
                request = request.with_gas_price(gas_price);
            }
            FeeFields::Eip1559 {
                max_priority_fee_per_gas,
                max_fee_per_gas,
            } => {
                request = request
                    .with_max_priority_fee_per_gas(max_priority_fee_per_gas)
                    .with_max_fee_per_gas(max_fee_per_gas);
                request.transaction_type = Some(2);
            }
        }

        if let Some(gas) = self.gas {
            request = request.with_gas_limit(gas);
        }
        request
    }
}

/// Node-facing JSON shape: legacy transactions carry `gasPrice`, EIP-1559
/// transactions carry the two fee caps and `type: "0x2"` instead.
impl Serialize for UnsignedTransaction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("chainId", &U256::from(self.chain_id))?;
        map.serialize_entry("nonce", &U256::from(self.nonce))?;
        map.serialize_entry("from", &self.from)?;
        map.serialize_entry("to", &self.to)?;
        map.serialize_entry("value", &self.value)?;
        match self.fees {
            FeeFields::Legacy { gas_price } => {
                map.serialize_entry("gasPrice", &U256::from(gas_price))?;
            }
            FeeFields::Eip1559 {
                max_priority_fee_per_gas,
                max_fee_per_gas,
            } => {
                map.serialize_entry("maxPriorityFeePerGas", &U256::from(max_priority_fee_per_gas))?;
                map.serialize_entry("maxFeePerGas", &U256::from(max_fee_per_gas))?;
                map.serialize_entry("type", "0x2")?;
            }
        }
        if let Some(gas) = self.gas {
            map.serialize_entry("gas", &U256::from(gas))?;
        }
        map.end()
    }
}

/// EIP-2718 encoded, signed transaction ready for broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub raw: Bytes,
    pub hash: TxHash,
}

/// The parts of a receipt the confirmation loop cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    /// Receipt status 1.
    pub success: bool,
    pub block_number: Option<u64>,
    pub gas_used: u64,
}

/// Final outcome of waiting for a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationResult {
    /// Receipt status 1.
    Success,
    /// Receipt status 0.
    Failed,
    /// No receipt within the timeout.
    TimedOut,
}
