//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use alloy::primitives::{keccak256, Address, Bytes, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::Instant;

use native_transfer::blockchain::{
    BlockchainClient, ChainRpc, Connector, RpcFailure, RpcResult, TxReceipt,
};
use native_transfer::cli::Prompter;
use native_transfer::config::{EndpointConfig, FeeModel, TransferConfig};
use native_transfer::resilience::RetryPolicy;

/// Well-known test private key (Anvil's first account).
pub const SENDER_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const SENDER: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
pub const RECIPIENT: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";

pub const ONE_ETHER: u128 = 1_000_000_000_000_000_000;

pub fn address(raw: &str) -> Address {
    raw.parse().unwrap()
}

/// Scripted node state shared by every session of a `MockChain`.
pub struct ChainState {
    pub chain_id: u64,
    pub block_number: u64,
    pub balances: HashMap<Address, U256>,
    pub nonces: HashMap<Address, u64>,
    pub gas_price: u128,
    /// `None` makes `eth_maxPriorityFeePerGas` fail as an unknown method.
    pub priority_fee: Option<u128>,
    pub fee_history: Vec<u128>,
    pub gas_estimate: u64,
    /// Failures returned, in order, before an operation starts succeeding.
    pub failures: HashMap<&'static str, VecDeque<RpcFailure>>,
    /// Operations that never answer.
    pub hanging: HashSet<&'static str>,
    pub calls: HashMap<&'static str, u32>,
    pub opened: u32,
    pub closed: u32,
    pub estimates: Vec<TransactionRequest>,
    pub sent: Vec<Bytes>,
    /// Receipt becomes visible at this instant.
    pub mined_at: Option<(Instant, bool)>,
}

impl Default for ChainState {
    fn default() -> Self {
        Self {
            chain_id: 31337,
            block_number: 1,
            balances: HashMap::new(),
            nonces: HashMap::new(),
            gas_price: 10,
            priority_fee: Some(2),
            fee_history: Vec::new(),
            gas_estimate: 21_000,
            failures: HashMap::new(),
            hanging: HashSet::new(),
            calls: HashMap::new(),
            opened: 0,
            closed: 0,
            estimates: Vec::new(),
            sent: Vec::new(),
            mined_at: None,
        }
    }
}

/// In-process chain implementing the connector capability.
#[derive(Clone, Default)]
pub struct MockChain {
    state: Arc<Mutex<ChainState>>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap()
    }

    pub fn set_balance(&self, who: &str, wei: u128) {
        self.state().balances.insert(address(who), U256::from(wei));
    }

    /// Fail the next `times` calls of `op` with `failure`.
    pub fn fail(&self, op: &'static str, failure: RpcFailure, times: usize) {
        let mut state = self.state();
        let queue = state.failures.entry(op).or_default();
        for _ in 0..times {
            queue.push_back(failure.clone());
        }
    }

    pub fn hang(&self, op: &'static str) {
        self.state().hanging.insert(op);
    }

    /// Make the receipt visible `after` from now.
    pub fn mine_after(&self, after: Duration, success: bool) {
        self.state().mined_at = Some((Instant::now() + after, success));
    }

    pub fn calls(&self, op: &str) -> u32 {
        self.state().calls.get(op).copied().unwrap_or(0)
    }

    pub fn opened(&self) -> u32 {
        self.state().opened
    }

    pub fn closed(&self) -> u32 {
        self.state().closed
    }

    async fn call<T, F>(&self, op: &'static str, f: F) -> RpcResult<T>
    where
        F: FnOnce(&mut ChainState) -> RpcResult<T>,
    {
        let hanging = {
            let mut state = self.state();
            *state.calls.entry(op).or_default() += 1;
            if let Some(failure) = state.failures.get_mut(op).and_then(VecDeque::pop_front) {
                return Err(failure);
            }
            state.hanging.contains(op)
        };
        if hanging {
            std::future::pending::<()>().await;
        }
        f(&mut self.state())
    }
}

pub struct MockConnector {
    pub chain: MockChain,
}

impl Connector for MockConnector {
    type Session = MockSession;

    async fn open(&self, _endpoint: &EndpointConfig, _timeout: Duration) -> RpcResult<MockSession> {
        self.chain
            .call("open", |state| {
                state.opened += 1;
                Ok(())
            })
            .await?;
        Ok(MockSession {
            chain: self.chain.clone(),
        })
    }
}

pub struct MockSession {
    chain: MockChain,
}

impl ChainRpc for MockSession {
    async fn block_number(&self) -> RpcResult<u64> {
        self.chain.call("eth_blockNumber", |s| Ok(s.block_number)).await
    }

    async fn chain_id(&self) -> RpcResult<u64> {
        self.chain.call("eth_chainId", |s| Ok(s.chain_id)).await
    }

    async fn balance(&self, address: Address) -> RpcResult<U256> {
        self.chain
            .call("eth_getBalance", |s| {
                Ok(s.balances.get(&address).copied().unwrap_or_default())
            })
            .await
    }

    async fn transaction_count(&self, address: Address) -> RpcResult<u64> {
        self.chain
            .call("eth_getTransactionCount", |s| {
                Ok(s.nonces.get(&address).copied().unwrap_or_default())
            })
            .await
    }

    async fn gas_price(&self) -> RpcResult<u128> {
        self.chain.call("eth_gasPrice", |s| Ok(s.gas_price)).await
    }

    async fn max_priority_fee_per_gas(&self) -> RpcResult<u128> {
        self.chain
            .call("eth_maxPriorityFeePerGas", |s| {
                s.priority_fee.ok_or_else(|| RpcFailure::Rejected {
                    code: -32601,
                    message: "the method eth_maxPriorityFeePerGas does not exist".into(),
                    retryable: false,
                })
            })
            .await
    }

    async fn fee_history(&self, blocks: u64, _percentile: f64) -> RpcResult<Vec<u128>> {
        self.chain
            .call("eth_feeHistory", |s| {
                Ok(s.fee_history.iter().take(blocks as usize).copied().collect())
            })
            .await
    }

    async fn estimate_gas(&self, request: TransactionRequest) -> RpcResult<u64> {
        self.chain
            .call("eth_estimateGas", |s| {
                s.estimates.push(request);
                Ok(s.gas_estimate)
            })
            .await
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> RpcResult<TxHash> {
        self.chain
            .call("eth_sendRawTransaction", |s| {
                let hash = keccak256(&raw);
                s.sent.push(raw);
                Ok(hash)
            })
            .await
    }

    async fn transaction_receipt(&self, _hash: TxHash) -> RpcResult<Option<TxReceipt>> {
        self.chain
            .call("eth_getTransactionReceipt", |s| {
                Ok(match s.mined_at {
                    Some((at, success)) if Instant::now() >= at => Some(TxReceipt {
                        success,
                        block_number: Some(s.block_number + 1),
                        gas_used: 21_000,
                    }),
                    _ => None,
                })
            })
            .await
    }

    async fn close(self) {
        self.chain.state().closed += 1;
    }
}

/// Config pointing at a mock endpoint with short retry delays.
pub fn test_config(fee_model: FeeModel) -> TransferConfig {
    let mut config = TransferConfig::default();
    config.endpoint.rpc_url = "http://127.0.0.1:8545".to_string();
    config.endpoint.fee_model = fee_model;
    config.retries.delay_ms = 10;
    config
}

pub fn mock_client(
    name: &str,
    chain: &MockChain,
    config: &TransferConfig,
) -> BlockchainClient<MockConnector> {
    BlockchainClient::with_connector(
        name,
        config.endpoint.clone(),
        RetryPolicy::from(&config.retries),
        MockConnector {
            chain: chain.clone(),
        },
    )
}

/// A connected sender holding the test key.
pub async fn funded_sender(
    chain: &MockChain,
    config: &TransferConfig,
) -> BlockchainClient<MockConnector> {
    chain.set_balance(SENDER, ONE_ETHER);
    let mut sender = mock_client("Sender", chain, config);
    sender.connect().await.unwrap();
    sender.set_private_key(SENDER_KEY).unwrap();
    sender
}

pub fn scripted_input(
    input: &'static str,
) -> Prompter<tokio::io::Lines<tokio::io::BufReader<&'static [u8]>>> {
    Prompter::new(tokio::io::BufReader::new(input.as_bytes()))
}

/// Start a JSON-RPC backend answering each method through `handler`.
///
/// `Err((code, message))` becomes a JSON-RPC error object.
pub async fn start_rpc_backend<F>(handler: F) -> SocketAddr
where
    F: Fn(&str) -> Result<Value, (i64, String)> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        let _ = serve_rpc(socket, handler.as_ref()).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn serve_rpc<F>(socket: TcpStream, handler: &F) -> std::io::Result<()>
where
    F: Fn(&str) -> Result<Value, (i64, String)>,
{
    let mut reader = BufReader::new(socket);
    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 || line == "\r\n" {
            break;
        }
        if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
            content_length = value.trim().parse().unwrap_or(0);
        }
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await?;
    let request: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let id = request["id"].clone();
    let method = request["method"].as_str().unwrap_or_default();

    let response = match handler(method) {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        Err((code, message)) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": code, "message": message }
        }),
    }
    .to_string();

    let mut socket = reader.into_inner();
    socket
        .write_all(
            format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                response.len(),
                response
            )
            .as_bytes(),
        )
        .await?;
    socket.shutdown().await
}
