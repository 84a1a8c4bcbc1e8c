//! Chain capability traits and the alloy HTTP implementation.
//!
//! # Responsibilities
//! - Define the raw JSON-RPC surface a client session needs
//! - Open HTTP sessions through an optional proxy
//! - Translate alloy transport errors into `RpcFailure`
//!
//! # Design Decisions
//! - One raw call per method; retries and deadlines are layered on top by
//!   `BlockchainClient`, so implementations stay single-shot
//! - Sessions are owned values closed by `close(self)`, never shared

use std::future::Future;
use std::time::Duration;

use alloy::eips::BlockNumberOrTag;
use alloy::network::ReceiptResponse;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::client::RpcClient;
use alloy::rpc::types::TransactionRequest;
use alloy::transports::http::{reqwest, Http};
use alloy::transports::{RpcError, TransportError};

use crate::blockchain::types::{EndpointConfig, RpcFailure, RpcResult, TxReceipt};

/// Raw calls available on an open session.
pub trait ChainRpc: Send + Sync + 'static {
    /// Latest block number; used as the liveness probe.
    fn block_number(&self) -> impl Future<Output = RpcResult<u64>> + Send;

    fn chain_id(&self) -> impl Future<Output = RpcResult<u64>> + Send;

    fn balance(&self, address: Address) -> impl Future<Output = RpcResult<U256>> + Send;

    fn transaction_count(&self, address: Address) -> impl Future<Output = RpcResult<u64>> + Send;

    fn gas_price(&self) -> impl Future<Output = RpcResult<u128>> + Send;

    fn max_priority_fee_per_gas(&self) -> impl Future<Output = RpcResult<u128>> + Send;

    /// One reward per block at `percentile`, oldest first. Blocks without
    /// reward data are skipped.
    fn fee_history(
        &self,
        blocks: u64,
        percentile: f64,
    ) -> impl Future<Output = RpcResult<Vec<u128>>> + Send;

    fn estimate_gas(
        &self,
        request: TransactionRequest,
    ) -> impl Future<Output = RpcResult<u64>> + Send;

    fn send_raw_transaction(&self, raw: Bytes) -> impl Future<Output = RpcResult<TxHash>> + Send;

    /// `None` while the transaction is not yet mined.
    fn transaction_receipt(
        &self,
        hash: TxHash,
    ) -> impl Future<Output = RpcResult<Option<TxReceipt>>> + Send;

    /// Release the session.
    fn close(self) -> impl Future<Output = ()> + Send;
}

/// Opens sessions against an endpoint.
pub trait Connector: Send + Sync {
    type Session: ChainRpc;

    fn open(
        &self,
        endpoint: &EndpointConfig,
        timeout: Duration,
    ) -> impl Future<Output = RpcResult<Self::Session>> + Send;
}

/// JSON-RPC over HTTP(S) using alloy's reqwest transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpConnector;

impl Connector for HttpConnector {
    type Session = HttpSession;

    async fn open(&self, endpoint: &EndpointConfig, timeout: Duration) -> RpcResult<HttpSession> {
        let url: url::Url = endpoint.rpc_url.parse().map_err(|e| {
            RpcFailure::Malformed(format!("Invalid RPC URL '{}': {}", endpoint.rpc_url, e))
        })?;

        let mut builder = reqwest::Client::builder().timeout(timeout);
        let proxy = endpoint
            .proxy_url()
            .map_err(|e| RpcFailure::Malformed(format!("Invalid proxy URL: {}", e)))?;
        if let Some(proxy) = proxy {
            let proxy = reqwest::Proxy::all(proxy.as_str())
                .map_err(|e| RpcFailure::Malformed(format!("Invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }
        let http = builder
            .build()
            .map_err(|e| RpcFailure::Connection(format!("HTTP client: {}", e)))?;

        let transport = Http::with_client(http, url);
        let client = RpcClient::new(transport, false);

        tracing::debug!(
            rpc_url = %endpoint.rpc_url,
            proxied = endpoint.proxy.is_some(),
            "HTTP session opened"
        );

        Ok(HttpSession {
            provider: RootProvider::new(client),
            rpc_url: endpoint.rpc_url.clone(),
        })
    }
}

/// An open HTTP session.
#[derive(Clone)]
pub struct HttpSession {
    provider: RootProvider,
    rpc_url: String,
}

impl std::fmt::Debug for HttpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSession")
            .field("rpc_url", &self.rpc_url)
            .finish()
    }
}

impl ChainRpc for HttpSession {
    async fn block_number(&self) -> RpcResult<u64> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn chain_id(&self) -> RpcResult<u64> {
        Ok(self.provider.get_chain_id().await?)
    }

    async fn balance(&self, address: Address) -> RpcResult<U256> {
        Ok(self.provider.get_balance(address).await?)
    }

    async fn transaction_count(&self, address: Address) -> RpcResult<u64> {
        Ok(self.provider.get_transaction_count(address).await?)
    }

    async fn gas_price(&self) -> RpcResult<u128> {
        Ok(self.provider.get_gas_price().await?)
    }

    async fn max_priority_fee_per_gas(&self) -> RpcResult<u128> {
        Ok(self.provider.get_max_priority_fee_per_gas().await?)
    }

    async fn fee_history(&self, blocks: u64, percentile: f64) -> RpcResult<Vec<u128>> {
        let history = self
            .provider
            .get_fee_history(blocks, BlockNumberOrTag::Latest, &[percentile])
            .await?;

        Ok(history
            .reward
            .unwrap_or_default()
            .into_iter()
            .filter_map(|row| row.first().copied())
            .collect())
    }

    async fn estimate_gas(&self, request: TransactionRequest) -> RpcResult<u64> {
        Ok(self.provider.estimate_gas(request).await?)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> RpcResult<TxHash> {
        let pending = self.provider.send_raw_transaction(&raw).await?;
        Ok(*pending.tx_hash())
    }

    async fn transaction_receipt(&self, hash: TxHash) -> RpcResult<Option<TxReceipt>> {
        let receipt = self.provider.get_transaction_receipt(hash).await?;
        Ok(receipt.map(|r| TxReceipt {
            success: r.status(),
            block_number: r.block_number(),
            gas_used: r.gas_used(),
        }))
    }

    async fn close(self) {
        // The reqwest pool is released when the provider is dropped.
        tracing::debug!(rpc_url = %self.rpc_url, "HTTP session closed");
    }
}

impl From<TransportError> for RpcFailure {
    fn from(err: TransportError) -> Self {
        match err {
            RpcError::ErrorResp(payload) => RpcFailure::Rejected {
                code: payload.code,
                retryable: payload.is_retry_err(),
                message: payload.message.to_string(),
            },
            RpcError::Transport(kind) => RpcFailure::Connection(kind.to_string()),
            RpcError::NullResp => RpcFailure::Malformed("null response".to_string()),
            other => RpcFailure::Malformed(other.to_string()),
        }
    }
}
