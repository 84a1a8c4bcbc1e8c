//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap every RPC call with a deadline
//! - Report an elapsed deadline as a transient `RpcFailure::Timeout`
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;

use crate::blockchain::types::{RpcFailure, RpcResult};

/// Run one RPC call with a deadline.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> RpcResult<T>
where
    F: Future<Output = RpcResult<T>>,
{
    match timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(RpcFailure::Timeout(limit.as_secs())),
    }
}
