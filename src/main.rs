//! Native-asset transfer client.
//!
//! # Architecture Overview
//!
//! ```text
//!   args + config file
//!          │
//!          ▼
//!   ┌─────────────┐     ┌──────────────────────────────────────────────┐
//!   │  cli flow   │────▶│ BlockchainClient (Sender)    BlockchainClient │
//!   │  prompts    │     │   TxBuilder → TxSubmitter    (Recipient)      │
//!   └─────────────┘     └───────────────┬──────────────────────────────┘
//!          │                            │ every RPC call
//!          │                            ▼
//!          │            ┌──────────────────────────────┐
//!          │            │ timeout → retry → classifier │
//!          │            └───────────────┬──────────────┘
//!          │                            ▼
//!          │                     JSON-RPC endpoint (HTTP, optional proxy)
//!          ▼
//!      exit code (0 / 1 / 2 / 130)
//! ```

use std::process::ExitCode;

use clap::Parser;

use native_transfer::cli::{self, Args};
use native_transfer::lifecycle::exit::EXIT_CONFIG;
use native_transfer::observability;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    if let Err(e) = observability::init(&config.observability) {
        eprintln!("{}", e);
        return ExitCode::from(EXIT_CONFIG);
    }

    tracing::info!(
        rpc_url = %config.endpoint.rpc_url,
        fee_model = %config.endpoint.fee_model,
        proxied = config.endpoint.proxy.is_some(),
        "native-transfer v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    ExitCode::from(cli::run(&config, &args).await)
}
