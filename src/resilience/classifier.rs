//! Error classification.
//!
//! # Responsibilities
//! - Map every failure reaching the top level to one caller action
//! - Log each classified failure exactly once
//!
//! # Actions
//! ```text
//! AddressIncorrect, KeyIncorrect, AmountIncorrect,
//! AddressAlreadySet, KeyAlreadySet                → Reprompt
//! PriorityFee, EmptyFeeHistory,
//! TransactionPreparation, TransactionSign         → Abort (retry the whole flow)
//! everything else                                 → Terminate (process exit)
//! ```
//!
//! # Design Decisions
//! - Runs outside the retry layer: a failure is only escalated after its
//!   retries are exhausted
//! - A broken endpoint terminates instead of being retried indefinitely
//! - Once a transaction may have been broadcast, failures terminate so the
//!   flow never re-sends

use std::future::Future;

use crate::blockchain::types::{TransferError, TransferResult};

/// What the caller should do about a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Bad user input; ask again.
    Reprompt,
    /// Abandon the current transaction attempt; the flow may start over.
    Abort,
    /// Log and exit the process.
    Terminate,
}

/// A classified failure on its way to the top-level handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Escalation {
    pub error: TransferError,
    pub disposition: Disposition,
}

/// Decide the caller action for a failure.
pub fn classify(err: &TransferError) -> Disposition {
    use TransferError::*;

    match err {
        AddressIncorrect(_) | KeyIncorrect(_) | AmountIncorrect(_) | AddressAlreadySet
        | KeyAlreadySet => Disposition::Reprompt,

        PriorityFee(_) | EmptyFeeHistory | TransactionPreparation(_) | TransactionSign(_) => {
            Disposition::Abort
        }

        NetworkConnection(_)
        | ServerTimeout(_)
        | ChainMismatch { .. }
        | TransactionSend(_)
        | TransactionReceipt(_)
        | TransactionTimeout(_)
        | TransactionReverted(_)
        | NotConnected(_)
        | AddressNotSet
        | KeyNotSet
        | Unknown(_) => Disposition::Terminate,
    }
}

/// Classify and log a failure.
pub fn report(operation: &str, err: &TransferError) -> Disposition {
    let disposition = classify(err);
    match disposition {
        Disposition::Reprompt => {
            tracing::warn!(operation, error = %err, "Invalid input, please try again");
        }
        Disposition::Abort => {
            tracing::error!(operation, error = %err, "Operation aborted");
        }
        Disposition::Terminate => match err {
            TransferError::Unknown(cause) => {
                tracing::error!(operation, cause = %cause, "Unexpected failure, terminating");
            }
            TransferError::NetworkConnection(_) | TransferError::ServerTimeout(_) => {
                tracing::error!(
                    operation,
                    error = %err,
                    "RPC endpoint unavailable; check the connection, RPC URL and proxy"
                );
            }
            _ => tracing::error!(operation, error = %err, "Fatal error, terminating"),
        },
    }
    disposition
}

/// Outermost wrapper: run `fut` and classify its failure.
pub async fn escalate<T, F>(operation: &str, fut: F) -> Result<T, Escalation>
where
    F: Future<Output = TransferResult<T>>,
{
    fut.await.map_err(|error| Escalation {
        disposition: report(operation, &error),
        error,
    })
}
