//! Private key handling and transaction signing.
//!
//! # Security
//! - Keys are never logged or serialized; `Debug` only shows the address
//! - Keys may come from the `TRANSFER_PRIVATE_KEY` environment variable or
//!   an interactive prompt, never from the config file

use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;

use crate::blockchain::types::{
    SignedTransaction, TransferError, TransferResult, UnsignedTransaction,
};

/// Environment variable name for the private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "TRANSFER_PRIVATE_KEY";

/// A validated secp256k1 private key.
#[derive(Clone)]
pub struct PrivateKey {
    signer: PrivateKeySigner,
}

impl PrivateKey {
    pub(crate) fn new(signer: PrivateKeySigner) -> Self {
        Self { signer }
    }

    /// Address derived from the key.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Sign a fully prepared transaction locally.
    ///
    /// Fails without touching the network when the transaction has no gas
    /// limit or was prepared for another sender.
    pub async fn sign_transaction(
        &self,
        tx: &UnsignedTransaction,
    ) -> TransferResult<SignedTransaction> {
        if tx.from != self.address() {
            return Err(TransferError::TransactionSign(format!(
                "transaction sender {} does not match key address {}",
                tx.from,
                self.address()
            )));
        }
        if tx.gas.is_none() {
            return Err(TransferError::TransactionSign(
                "gas limit has not been estimated".to_string(),
            ));
        }

        let wallet = EthereumWallet::from(self.signer.clone());
        let envelope = tx
            .to_request()
            .build(&wallet)
            .await
            .map_err(|e| TransferError::TransactionSign(e.to_string()))?;

        Ok(SignedTransaction {
            hash: *envelope.tx_hash(),
            raw: envelope.encoded_2718().into(),
        })
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("address", &self.address())
            .field("key", &"<redacted>")
            .finish()
    }
}
