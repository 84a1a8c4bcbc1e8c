//! One party's session with a JSON-RPC endpoint.
//!
//! # Responsibilities
//! - Open and probe the network session; release it on every exit path
//! - Hold the write-once address and private key
//! - Query chain state (balances, nonce, chain id, fees, receipts)
//! - Route every RPC call through a per-call deadline and the retry policy
//!
//! # Lifecycle
//! ```text
//! new() ──connect()──▶ connected ──disconnect()──▶ closed
//!           │ probe fails
//!           └──▶ session closed, NetworkConnection
//! ```

use std::future::Future;
use std::time::Duration;

use alloy::primitives::{Address, TxHash, U256};
use tracing::Instrument;

use crate::blockchain::rpc::{ChainRpc, Connector, HttpConnector};
use crate::blockchain::types::{
    EndpointConfig, RpcFailure, RpcResult, SignedTransaction, TransferError, TransferResult,
    TxReceipt, UnsignedTransaction,
};
use crate::blockchain::validators::{validate_address, validate_private_key};
use crate::blockchain::wallet::PrivateKey;
use crate::config::schema::TransferConfig;
use crate::resilience::retries::{retry, RetryPolicy};
use crate::resilience::timeouts::with_timeout;

/// Blockchain RPC client for one party of a transfer.
pub struct BlockchainClient<C: Connector = HttpConnector> {
    /// Display name used in logs ("Sender", "Recipient").
    name: String,
    endpoint: EndpointConfig,
    retry: RetryPolicy,
    /// Per-call deadline.
    rpc_timeout: Duration,
    connector: C,
    /// Present between `connect()` and `disconnect()`.
    session: Option<C::Session>,
    address: Option<Address>,
    key: Option<PrivateKey>,
}

impl BlockchainClient<HttpConnector> {
    /// Create an unconnected HTTP client.
    pub fn new(name: impl Into<String>, endpoint: EndpointConfig, retry: RetryPolicy) -> Self {
        Self::with_connector(name, endpoint, retry, HttpConnector)
    }

    pub fn from_config(name: impl Into<String>, config: &TransferConfig) -> Self {
        Self::new(
            name,
            config.endpoint.clone(),
            RetryPolicy::from(&config.retries),
        )
    }
}

impl<C: Connector> BlockchainClient<C> {
    /// Create an unconnected client over any connector.
    pub fn with_connector(
        name: impl Into<String>,
        endpoint: EndpointConfig,
        retry: RetryPolicy,
        connector: C,
    ) -> Self {
        Self {
            name: name.into(),
            rpc_timeout: Duration::from_secs(endpoint.rpc_timeout_secs),
            endpoint,
            retry,
            connector,
            session: None,
            address: None,
            key: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Open the session and verify the endpoint answers.
    ///
    /// A session that fails the liveness probe (or the chain id check) is
    /// closed before the error is returned.
    pub async fn connect(&mut self) -> TransferResult<()> {
        if self.session.is_some() {
            tracing::debug!(client = %self.name, "Already connected");
            return Ok(());
        }

        let span = tracing::info_span!("connect", client = %self.name);
        let session = retry(&self.retry, "open", || {
            self.connector.open(&self.endpoint, self.rpc_timeout)
        })
        .instrument(span.clone())
        .await
        .map_err(|e| TransferError::NetworkConnection(e.to_string()))?;

        let limit = self.rpc_timeout;
        let probe = retry(&self.retry, "eth_blockNumber", || {
            with_timeout(limit, session.block_number())
        })
        .instrument(span.clone())
        .await;

        let block = match probe {
            Ok(block) => block,
            Err(failure) => {
                session.close().await;
                return Err(connect_failure(failure));
            }
        };

        if let Some(expected) = self.endpoint.expected_chain_id {
            let actual = retry(&self.retry, "eth_chainId", || {
                with_timeout(limit, session.chain_id())
            })
            .instrument(span)
            .await;

            match actual {
                Ok(actual) if actual == expected => {}
                Ok(actual) => {
                    session.close().await;
                    return Err(TransferError::ChainMismatch { expected, actual });
                }
                Err(failure) => {
                    session.close().await;
                    return Err(connect_failure(failure));
                }
            }
        }

        tracing::info!(
            client = %self.name,
            rpc_url = %self.endpoint.rpc_url,
            block,
            "Connected"
        );
        self.session = Some(session);
        Ok(())
    }

    /// Release the session. Safe to call on an unconnected client.
    pub async fn disconnect(&mut self) {
        if let Some(session) = self.session.take() {
            session.close().await;
            tracing::info!(client = %self.name, "Disconnected");
        }
    }

    /// Set the session address. Write-once.
    pub fn set_address(&mut self, raw: &str) -> TransferResult<Address> {
        if self.address.is_some() {
            return Err(TransferError::AddressAlreadySet);
        }
        let address = validate_address(raw)?;
        self.address = Some(address);
        tracing::info!(client = %self.name, address = %address, "Address set");
        Ok(address)
    }

    /// Set the private key. Write-once.
    ///
    /// Without an address, the key's address becomes the session address;
    /// with one, the key must derive exactly that address.
    pub fn set_private_key(&mut self, raw: &str) -> TransferResult<Address> {
        if self.key.is_some() {
            return Err(TransferError::KeyAlreadySet);
        }
        let key = validate_private_key(raw)?;
        let derived = key.address();

        match self.address {
            Some(address) if address != derived => {
                return Err(TransferError::KeyIncorrect(format!(
                    "key belongs to {}, not {}",
                    derived, address
                )));
            }
            Some(_) => {}
            None => self.address = Some(derived),
        }

        self.key = Some(key);
        tracing::info!(client = %self.name, address = %derived, "Private key set");
        Ok(derived)
    }

    pub fn address(&self) -> Option<Address> {
        self.address
    }

    pub fn has_private_key(&self) -> bool {
        self.key.is_some()
    }

    pub(crate) fn require_address(&self) -> TransferResult<Address> {
        self.address.ok_or(TransferError::AddressNotSet)
    }

    pub(crate) fn signer(&self) -> TransferResult<&PrivateKey> {
        self.key.as_ref().ok_or(TransferError::KeyNotSet)
    }

    fn session(&self) -> TransferResult<&C::Session> {
        self.session
            .as_ref()
            .ok_or_else(|| TransferError::NotConnected(self.name.clone()))
    }

    /// One RPC call with deadline and retries.
    async fn call_raw<'a, T, F, Fut>(
        &'a self,
        operation: &'static str,
        f: F,
    ) -> TransferResult<RpcResult<T>>
    where
        F: Fn(&'a C::Session) -> Fut,
        Fut: Future<Output = RpcResult<T>>,
    {
        let session = self.session()?;
        let limit = self.rpc_timeout;
        let span = tracing::debug_span!("rpc", client = %self.name);
        Ok(retry(&self.retry, operation, || with_timeout(limit, f(session)))
            .instrument(span)
            .await)
    }

    async fn call<'a, T, F, Fut>(&'a self, operation: &'static str, f: F) -> TransferResult<T>
    where
        F: Fn(&'a C::Session) -> Fut,
        Fut: Future<Output = RpcResult<T>>,
    {
        Ok(self.call_raw(operation, f).await??)
    }

    /// Balance of the session address in wei.
    pub async fn get_balance(&self) -> TransferResult<U256> {
        let address = self.require_address()?;
        self.get_balance_of(address).await
    }

    pub async fn get_balance_of(&self, address: Address) -> TransferResult<U256> {
        self.call("eth_getBalance", |s| s.balance(address)).await
    }

    pub async fn get_chain_id(&self) -> TransferResult<u64> {
        self.call("eth_chainId", |s| s.chain_id()).await
    }

    /// Next nonce for the session address.
    pub async fn get_nonce(&self) -> TransferResult<u64> {
        let address = self.require_address()?;
        self.call("eth_getTransactionCount", |s| s.transaction_count(address))
            .await
    }

    pub async fn get_gas_price(&self) -> TransferResult<u128> {
        self.call("eth_gasPrice", |s| s.gas_price()).await
    }

    /// Suggested priority fee.
    ///
    /// A node rejecting the method yields `PriorityFee`; connectivity
    /// failures keep their own kind.
    pub async fn get_max_priority_fee(&self) -> TransferResult<u128> {
        match self
            .call_raw("eth_maxPriorityFeePerGas", |s| s.max_priority_fee_per_gas())
            .await?
        {
            Ok(fee) => Ok(fee),
            Err(failure @ (RpcFailure::Rejected { .. } | RpcFailure::Malformed(_))) => {
                Err(TransferError::PriorityFee(failure.to_string()))
            }
            Err(failure) => Err(failure.into()),
        }
    }

    /// Per-block priority fee rewards at `percentile`.
    pub async fn get_fee_history(&self, blocks: u64, percentile: f64) -> TransferResult<Vec<u128>> {
        let rewards = self
            .call_raw("eth_feeHistory", |s| s.fee_history(blocks, percentile))
            .await?
            .map_err(|e| TransferError::PriorityFee(e.to_string()))?;

        if rewards.is_empty() {
            return Err(TransferError::EmptyFeeHistory);
        }
        Ok(rewards)
    }

    /// Raw gas estimate from the node, without headroom.
    pub async fn estimate_gas(&self, tx: &UnsignedTransaction) -> TransferResult<u64> {
        let request = tx.to_request();
        self.call("eth_estimateGas", |s| s.estimate_gas(request.clone()))
            .await
    }

    /// Broadcast a signed transaction.
    ///
    /// A node that already holds the transaction (a retried broadcast that
    /// landed the first time) is treated as success.
    pub async fn send_raw_transaction(&self, signed: &SignedTransaction) -> TransferResult<TxHash> {
        match self
            .call_raw("eth_sendRawTransaction", |s| {
                s.send_raw_transaction(signed.raw.clone())
            })
            .await?
        {
            Ok(hash) => {
                if hash != signed.hash {
                    tracing::warn!(
                        client = %self.name,
                        node_hash = %hash,
                        local_hash = %signed.hash,
                        "Node returned an unexpected transaction hash"
                    );
                }
                Ok(hash)
            }
            Err(RpcFailure::Rejected { message, .. })
                if message.to_lowercase().contains("already known") =>
            {
                tracing::info!(
                    client = %self.name,
                    tx_hash = %signed.hash,
                    "Transaction already known to the node"
                );
                Ok(signed.hash)
            }
            Err(failure) => Err(TransferError::TransactionSend(failure.to_string())),
        }
    }

    /// Receipt for `hash`, `None` while the transaction is pending.
    pub async fn get_transaction_receipt(&self, hash: TxHash) -> TransferResult<Option<TxReceipt>> {
        self.call("eth_getTransactionReceipt", |s| s.transaction_receipt(hash))
            .await
            .map_err(|e| e.in_stage(TransferError::TransactionReceipt))
    }
}

/// Any failure while establishing a session is a connection failure,
/// except a node that never answers.
fn connect_failure(failure: RpcFailure) -> TransferError {
    match failure {
        RpcFailure::Timeout(secs) => TransferError::ServerTimeout(secs),
        other => TransferError::NetworkConnection(other.to_string()),
    }
}

impl<C: Connector> Drop for BlockchainClient<C> {
    fn drop(&mut self) {
        if self.session.is_some() {
            tracing::warn!(client = %self.name, "Client dropped without disconnect()");
        }
    }
}

impl<C: Connector> std::fmt::Debug for BlockchainClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainClient")
            .field("name", &self.name)
            .field("rpc_url", &self.endpoint.rpc_url)
            .field("connected", &self.session.is_some())
            .field("address", &self.address)
            .field("has_key", &self.key.is_some())
            .finish()
    }
}
