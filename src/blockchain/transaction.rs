//! Unsigned transaction assembly.
//!
//! # Responsibilities
//! - Fetch chain id, nonce and base fee concurrently
//! - Fill either legacy or EIP-1559 fee fields, never both
//! - Fall back to fee history when the node has no priority fee method
//!
//! # Fee Rules
//! ```text
//! legacy:   gasPrice     = floor(base * m)
//! eip1559:  priority     = eth_maxPriorityFeePerGas, or median fee history reward
//!           priority     = base                      if priority == 0
//!           maxFeePerGas = floor(base * m) + priority
//! ```
//! `m` is `fees.gas_price_multiplier` (1.25 by default), headroom against
//! base fee movement between preparation and inclusion.

use alloy::primitives::Address;

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::rpc::{Connector, HttpConnector};
use crate::blockchain::types::{
    FeeFields, FeeModel, Multiplier, TransferError, TransferResult, UnsignedTransaction,
};
use crate::blockchain::validators::Amount;
use crate::config::schema::{FeeConfig, TransferConfig};

/// How fee fields are computed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeePolicy {
    pub model: FeeModel,
    pub gas_price_multiplier: Multiplier,
    pub fee_history_blocks: u64,
    pub priority_fee_percentile: f64,
}

impl FeePolicy {
    pub fn new(model: FeeModel, fees: &FeeConfig) -> Self {
        Self {
            model,
            gas_price_multiplier: Multiplier::from_factor(fees.gas_price_multiplier),
            fee_history_blocks: fees.fee_history_blocks,
            priority_fee_percentile: fees.priority_fee_percentile,
        }
    }
}

impl From<&TransferConfig> for FeePolicy {
    fn from(config: &TransferConfig) -> Self {
        Self::new(config.endpoint.fee_model, &config.fees)
    }
}

/// Builds unsigned transfers from the sender's session.
pub struct TxBuilder<'a, C: Connector = HttpConnector> {
    client: &'a BlockchainClient<C>,
    policy: FeePolicy,
}

impl<'a, C: Connector> TxBuilder<'a, C> {
    pub fn new(client: &'a BlockchainClient<C>, policy: FeePolicy) -> Self {
        Self { client, policy }
    }

    /// Assemble an unsigned transfer of `amount` to `recipient`.
    ///
    /// The gas limit is left empty for the submitter to estimate.
    pub async fn prepare(
        &self,
        recipient: Address,
        amount: &Amount,
    ) -> TransferResult<UnsignedTransaction> {
        let from = self.client.require_address()?;

        let (chain_id, nonce, base_fee) = tokio::try_join!(
            self.client.get_chain_id(),
            self.client.get_nonce(),
            self.client.get_gas_price(),
        )
        .map_err(|e| e.in_stage(TransferError::TransactionPreparation))?;

        let fees = match self.policy.model {
            FeeModel::Legacy => FeeFields::Legacy {
                gas_price: self.scaled(base_fee)?,
            },
            FeeModel::Eip1559 => {
                let mut priority = self.priority_fee().await?;
                if priority == 0 {
                    tracing::debug!(base_fee, "Zero priority fee, using base fee instead");
                    priority = base_fee;
                }
                let max_fee = self
                    .scaled(base_fee)?
                    .checked_add(priority)
                    .ok_or_else(|| {
                        TransferError::TransactionPreparation("max fee overflows".to_string())
                    })?;
                FeeFields::Eip1559 {
                    max_priority_fee_per_gas: priority,
                    max_fee_per_gas: max_fee,
                }
            }
        };

        tracing::info!(
            client = %self.client.name(),
            chain_id,
            nonce,
            base_fee,
            fee_model = %self.policy.model,
            max_price_per_gas = fees.max_price_per_gas(),
            "Transaction prepared"
        );

        Ok(UnsignedTransaction {
            chain_id,
            nonce,
            from,
            to: recipient,
            value: amount.wei(),
            gas: None,
            fees,
        })
    }

    fn scaled(&self, base_fee: u128) -> TransferResult<u128> {
        self.policy
            .gas_price_multiplier
            .apply(base_fee)
            .ok_or_else(|| TransferError::TransactionPreparation("gas price overflows".to_string()))
    }

    /// Node-suggested priority fee, or the fee history median when the node
    /// does not offer one.
    async fn priority_fee(&self) -> TransferResult<u128> {
        match self.client.get_max_priority_fee().await {
            Ok(fee) => Ok(fee),
            Err(TransferError::PriorityFee(reason)) => {
                tracing::warn!(
                    client = %self.client.name(),
                    reason = %reason,
                    "eth_maxPriorityFeePerGas unavailable, using fee history"
                );
                let rewards = self
                    .client
                    .get_fee_history(
                        self.policy.fee_history_blocks,
                        self.policy.priority_fee_percentile,
                    )
                    .await
                    .map_err(|e| match e {
                        TransferError::PriorityFee(_) | TransferError::EmptyFeeHistory => e,
                        other => other.in_stage(TransferError::TransactionPreparation),
                    })?;
                median(rewards).ok_or(TransferError::EmptyFeeHistory)
            }
            Err(other) => Err(other.in_stage(TransferError::TransactionPreparation)),
        }
    }
}

/// Median of the samples; the lower middle value for even counts.
fn median(mut samples: Vec<u128>) -> Option<u128> {
    if samples.is_empty() {
        return None;
    }
    samples.sort_unstable();
    Some(samples[(samples.len() - 1) / 2])
}
