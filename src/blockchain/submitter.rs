//! Gas estimation, signing, broadcast, and confirmation polling.
//!
//! # Confirmation State Machine
//! ```text
//!            not found yet
//!           ┌────────────┐
//!           ▼            │
//!        Pending ────────┘
//!         │  │  │
//! status=1│  │  │ deadline passed
//!         ▼  │  ▼
//!   Success  │  TimedOut
//!            ▼ status=0
//!          Failed
//! ```
//! Terminal states never transition. Polls are strictly sequential.

use std::time::Duration;

use alloy::primitives::TxHash;
use tokio::time::{sleep, Instant};

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::rpc::{Connector, HttpConnector};
use crate::blockchain::types::{
    ConfirmationResult, Multiplier, SignedTransaction, TransferError, TransferResult, TxReceipt,
    UnsignedTransaction,
};
use crate::config::schema::{ConfirmationConfig, TransferConfig};

/// Polling state for one transaction hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationState {
    Pending,
    Success,
    Failed,
    TimedOut,
}

impl ConfirmationState {
    /// Next state after one poll.
    pub fn advance(self, receipt: Option<&TxReceipt>, deadline_passed: bool) -> Self {
        match (self, receipt) {
            (ConfirmationState::Pending, Some(r)) if r.success => ConfirmationState::Success,
            (ConfirmationState::Pending, Some(_)) => ConfirmationState::Failed,
            (ConfirmationState::Pending, None) if deadline_passed => ConfirmationState::TimedOut,
            (state, _) => state,
        }
    }

    pub fn outcome(self) -> Option<ConfirmationResult> {
        match self {
            ConfirmationState::Pending => None,
            ConfirmationState::Success => Some(ConfirmationResult::Success),
            ConfirmationState::Failed => Some(ConfirmationResult::Failed),
            ConfirmationState::TimedOut => Some(ConfirmationResult::TimedOut),
        }
    }
}

/// Signs and submits transactions from the sender's session.
pub struct TxSubmitter<'a, C: Connector = HttpConnector> {
    client: &'a BlockchainClient<C>,
    gas_limit_multiplier: Multiplier,
    confirmation: ConfirmationConfig,
}

impl<'a, C: Connector> TxSubmitter<'a, C> {
    pub fn new(
        client: &'a BlockchainClient<C>,
        gas_limit_multiplier: Multiplier,
        confirmation: ConfirmationConfig,
    ) -> Self {
        Self {
            client,
            gas_limit_multiplier,
            confirmation,
        }
    }

    pub fn from_config(client: &'a BlockchainClient<C>, config: &TransferConfig) -> Self {
        Self::new(
            client,
            Multiplier::from_factor(config.fees.gas_limit_multiplier),
            config.confirmation.clone(),
        )
    }

    /// Node estimate with headroom: `floor(estimate * 1.5)` by default.
    ///
    /// Failure blocks signing and is reported as `TransactionSign`.
    pub async fn estimate_gas(&self, tx: &UnsignedTransaction) -> TransferResult<u64> {
        let raw = self
            .client
            .estimate_gas(tx)
            .await
            .map_err(|e| e.in_stage(TransferError::TransactionSign))?;

        let gas = self.gas_limit_multiplier.apply_u64(raw).ok_or_else(|| {
            TransferError::TransactionSign(format!("gas estimate {} overflows", raw))
        })?;

        tracing::debug!(client = %self.client.name(), estimate = raw, gas, "Gas estimated");
        Ok(gas)
    }

    /// Sign locally with the session key. No network access.
    pub async fn sign(&self, tx: &UnsignedTransaction) -> TransferResult<SignedTransaction> {
        self.client.signer()?.sign_transaction(tx).await
    }

    /// Broadcast and log the explorer link.
    pub async fn send(&self, signed: &SignedTransaction) -> TransferResult<TxHash> {
        let hash = self.client.send_raw_transaction(signed).await?;
        tracing::info!(
            client = %self.client.name(),
            tx_hash = %hash,
            explorer = %self.client.endpoint().tx_url(hash),
            "Transaction sent"
        );
        Ok(hash)
    }

    pub async fn sign_and_send(&self, tx: &UnsignedTransaction) -> TransferResult<TxHash> {
        let signed = self.sign(tx).await?;
        self.send(&signed).await
    }

    /// Poll for a receipt until it arrives or the timeout passes.
    pub async fn await_confirmation(&self, hash: TxHash) -> TransferResult<ConfirmationResult> {
        let timeout = Duration::from_secs(self.confirmation.timeout_secs);
        let interval = Duration::from_secs(self.confirmation.poll_interval_secs);
        let started = Instant::now();
        let deadline = started + timeout;
        let mut state = ConfirmationState::Pending;

        loop {
            let receipt = self.client.get_transaction_receipt(hash).await?;
            let now = Instant::now();
            state = state.advance(receipt.as_ref(), now >= deadline);

            if let Some(outcome) = state.outcome() {
                let elapsed_secs = now.duration_since(started).as_secs();
                match (outcome, receipt) {
                    (ConfirmationResult::TimedOut, _) => tracing::warn!(
                        tx_hash = %hash,
                        elapsed_secs,
                        "No receipt before timeout"
                    ),
                    (_, Some(r)) => tracing::info!(
                        tx_hash = %hash,
                        status = ?outcome,
                        block = r.block_number,
                        gas_used = r.gas_used,
                        elapsed_secs,
                        explorer = %self.client.endpoint().tx_url(hash),
                        "Transaction mined"
                    ),
                    (_, None) => {}
                }
                return Ok(outcome);
            }

            tracing::debug!(tx_hash = %hash, "Transaction pending");
            sleep(interval.min(deadline.saturating_duration_since(now))).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receipt(success: bool) -> TxReceipt {
        TxReceipt {
            success,
            block_number: Some(100),
            gas_used: 21_000,
        }
    }

    #[test]
    fn test_pending_transitions() {
        let pending = ConfirmationState::Pending;
        assert_eq!(pending.advance(None, false), ConfirmationState::Pending);
        assert_eq!(pending.advance(None, true), ConfirmationState::TimedOut);
        assert_eq!(
            pending.advance(Some(&receipt(true)), false),
            ConfirmationState::Success
        );
        assert_eq!(
            pending.advance(Some(&receipt(false)), true),
            ConfirmationState::Failed
        );
    }

    #[test]
    fn test_terminal_states_are_final() {
        for state in [
            ConfirmationState::Success,
            ConfirmationState::Failed,
            ConfirmationState::TimedOut,
        ] {
            assert_eq!(state.advance(None, true), state);
            assert_eq!(state.advance(Some(&receipt(true)), false), state);
            assert_eq!(state.advance(Some(&receipt(false)), false), state);
            assert!(state.outcome().is_some());
        }
        assert_eq!(ConfirmationState::Pending.outcome(), None);
    }
}
