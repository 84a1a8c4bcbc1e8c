//! The two-party transfer flow.
//!
//! ```text
//! connect sender + recipient (concurrently)
//!   → sender key (env or prompt) derives the sender address
//!   → recipient address
//!   → loop: balances → amount → prepare + estimate
//!         (fee errors and insufficient funds start the loop over)
//!   → preview → confirm → sign + send → poll for receipt
//! disconnect both, on every path
//! ```
//!
//! Ctrl-C at any point abandons the flow; both sessions are still
//! disconnected before exit code 130 is returned.

use alloy::primitives::utils::format_ether;
use alloy::primitives::{Address, TxHash, U256};

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::rpc::Connector;
use crate::blockchain::submitter::TxSubmitter;
use crate::blockchain::transaction::{FeePolicy, TxBuilder};
use crate::blockchain::types::{
    ConfirmationResult, TransferError, TransferResult, UnsignedTransaction,
};
use crate::blockchain::validators::{validate_amount, Amount};
use crate::blockchain::wallet::PRIVATE_KEY_ENV_VAR;
use crate::cli::args::Args;
use crate::cli::prompt::{LineSource, Prompter};
use crate::cli::FlowError;
use crate::config::schema::TransferConfig;
use crate::lifecycle::exit::EXIT_SUCCESS;
use crate::lifecycle::signals::interrupted;
use crate::resilience::classifier::{escalate, Disposition};

/// How a flow that did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The user answered no at the confirmation prompt.
    Declined,
    /// The transaction was mined with status 1.
    Confirmed { tx_hash: TxHash },
}

/// Run the interactive flow over HTTP and return the process exit code.
pub async fn run(config: &TransferConfig, args: &Args) -> u8 {
    let mut sender = BlockchainClient::from_config("Sender", config);
    let mut recipient = BlockchainClient::from_config("Recipient", config);
    let mut prompter = Prompter::stdin();

    let result = tokio::select! {
        result = execute(config, args, &mut sender, &mut recipient, &mut prompter) => result,
        _ = interrupted() => {
            println!();
            Err(FlowError::Interrupted)
        }
    };
    tokio::join!(sender.disconnect(), recipient.disconnect());

    match result {
        Ok(TransferOutcome::Declined) => {
            tracing::info!("Transfer cancelled");
            EXIT_SUCCESS
        }
        Ok(TransferOutcome::Confirmed { .. }) => EXIT_SUCCESS,
        Err(FlowError::Interrupted) => {
            tracing::info!("Interrupted by user");
            FlowError::Interrupted.exit_code()
        }
        Err(e @ FlowError::Failed(_)) => e.exit_code(),
        Err(e) => {
            tracing::error!(error = %e, "Input unavailable");
            e.exit_code()
        }
    }
}

/// The flow itself, over already constructed clients.
///
/// Clients are left connected or not; the caller disconnects both.
pub async fn execute<C, S>(
    config: &TransferConfig,
    args: &Args,
    sender: &mut BlockchainClient<C>,
    recipient: &mut BlockchainClient<C>,
    prompter: &mut Prompter<S>,
) -> Result<TransferOutcome, FlowError>
where
    C: Connector,
    S: LineSource,
{
    let (sender_connected, recipient_connected) = tokio::join!(
        escalate("connect", sender.connect()),
        escalate("connect", recipient.connect()),
    );
    sender_connected?;
    recipient_connected?;

    if let Some(from) = &args.from {
        prompter
            .ask_until("Sender address: ", Some(from.clone()), |raw| {
                sender.set_address(raw)
            })
            .await?;
    }
    let key_from_env = std::env::var(PRIVATE_KEY_ENV_VAR).ok();
    prompter
        .ask_until("Sender private key: ", key_from_env, |raw| {
            sender.set_private_key(raw)
        })
        .await?;
    let to = prompter
        .ask_until("Recipient address: ", args.to.clone(), |raw| {
            recipient.set_address(raw)
        })
        .await?;
    if sender.address() == Some(to) {
        tracing::warn!(address = %to, "Sender and recipient are the same address");
    }

    let sender = &*sender;
    let recipient = &*recipient;
    let builder = TxBuilder::new(sender, FeePolicy::from(config));
    let submitter = TxSubmitter::from_config(sender, config);
    let mut preset_amount = args.amount.clone();

    let (tx, amount) = loop {
        let (balance, _) = show_balances(sender, recipient).await?;

        let amount = prompter
            .ask_until("Amount to send: ", preset_amount.take(), validate_amount)
            .await?;

        let prepared = prepare_transfer(&builder, &submitter, to, &amount);
        let tx = match escalate("prepare", prepared).await {
            Ok(tx) => tx,
            Err(e) if e.disposition == Disposition::Abort => continue,
            Err(e) => return Err(e.into()),
        };

        let max_cost = tx.max_gas_cost().unwrap_or_default();
        let required = amount.wei().saturating_add(max_cost);
        if balance < required {
            tracing::warn!(
                balance = %format_ether(balance),
                required = %format_ether(required),
                "Insufficient funds for amount plus gas"
            );
            continue;
        }

        break (tx, amount);
    };

    print_preview(&tx, &amount, config);
    if !args.yes && !prompter.confirm("Send this transaction?").await? {
        return Ok(TransferOutcome::Declined);
    }

    let tx_hash = escalate("send", submitter.sign_and_send(&tx)).await?;
    println!("Sent: {}", config.endpoint.tx_url(tx_hash));

    escalate("confirm", async {
        match submitter.await_confirmation(tx_hash).await? {
            ConfirmationResult::Success => Ok(()),
            ConfirmationResult::Failed => {
                Err(TransferError::TransactionReverted(tx_hash.to_string()))
            }
            ConfirmationResult::TimedOut => Err(TransferError::TransactionTimeout(
                config.confirmation.timeout_secs,
            )),
        }
    })
    .await?;

    println!("Confirmed: {}", config.endpoint.tx_url(tx_hash));
    show_balances(sender, recipient).await?;
    Ok(TransferOutcome::Confirmed { tx_hash })
}

/// Unsigned transfer with its gas limit filled in.
async fn prepare_transfer<C: Connector>(
    builder: &TxBuilder<'_, C>,
    submitter: &TxSubmitter<'_, C>,
    to: Address,
    amount: &Amount,
) -> TransferResult<UnsignedTransaction> {
    let tx = builder.prepare(to, amount).await?;
    let gas = submitter.estimate_gas(&tx).await?;
    Ok(tx.with_gas(gas))
}

async fn show_balances<C: Connector>(
    sender: &BlockchainClient<C>,
    recipient: &BlockchainClient<C>,
) -> Result<(U256, U256), FlowError> {
    let (sender_balance, recipient_balance) = tokio::join!(
        escalate("balance", sender.get_balance()),
        escalate("balance", recipient.get_balance()),
    );
    let (sender_balance, recipient_balance) = (sender_balance?, recipient_balance?);

    for (client, balance) in [(sender, sender_balance), (recipient, recipient_balance)] {
        println!(
            "{} {} balance: {}",
            client.name(),
            client.address().map(|a| a.to_string()).unwrap_or_default(),
            format_ether(balance)
        );
    }
    Ok((sender_balance, recipient_balance))
}

fn print_preview(tx: &UnsignedTransaction, amount: &Amount, config: &TransferConfig) {
    println!("To:        {}", tx.to);
    println!("Amount:    {}", amount);
    println!("Fee model: {}", config.endpoint.fee_model);
    println!("Gas limit: {}", tx.gas.unwrap_or_default());
    println!(
        "Max fee:   {}",
        format_ether(tx.max_gas_cost().unwrap_or_default())
    );
}
