//! Interactive command-line front end.
//!
//! # Data Flow
//! ```text
//! args.rs (flags, config overrides)
//!     → prompt.rs (missing inputs, re-prompt on validation errors)
//!     → transfer.rs (connect both parties → prepare → confirm → send → poll)
//!     → exit code
//! ```

pub mod args;
pub mod prompt;
pub mod transfer;

use thiserror::Error;

use crate::lifecycle::exit::{EXIT_FATAL, EXIT_INTERRUPTED};
use crate::resilience::classifier::Escalation;

pub use args::Args;
pub use prompt::{LineSource, Prompter, StdinLines};
pub use transfer::{execute, run, TransferOutcome};

/// Why the interactive flow stopped early.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("interrupted by user")]
    Interrupted,

    #[error("standard input closed")]
    InputClosed,

    #[error("cannot read standard input: {0}")]
    Io(#[from] std::io::Error),

    /// Already logged by the classifier.
    #[error("{}", .0.error)]
    Failed(Escalation),
}

impl From<Escalation> for FlowError {
    fn from(escalation: Escalation) -> Self {
        FlowError::Failed(escalation)
    }
}

impl FlowError {
    pub fn exit_code(&self) -> u8 {
        match self {
            FlowError::Interrupted => EXIT_INTERRUPTED,
            FlowError::InputClosed | FlowError::Io(_) | FlowError::Failed(_) => EXIT_FATAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::types::TransferError;
    use crate::resilience::classifier::Disposition;

    #[test]
    fn test_flow_exit_codes() {
        assert_eq!(FlowError::Interrupted.exit_code(), 130);
        assert_eq!(FlowError::InputClosed.exit_code(), 1);

        let failed = FlowError::from(Escalation {
            error: TransferError::ServerTimeout(10),
            disposition: Disposition::Terminate,
        });
        assert_eq!(failed.exit_code(), 1);
        assert_eq!(
            failed.to_string(),
            "RPC server did not respond within 10 seconds"
        );
    }
}
