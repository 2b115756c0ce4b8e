//! Subcommand implementations.

pub mod buy;
pub mod lend;
pub mod menu;
pub mod pay;
pub mod reset;
pub mod resume;
pub mod status;

use std::io::Write;

use anyhow::Context;
use mortal_core::flow::{FlowError, FlowStep, OrderFlowController, WalletPayment};
use mortal_sdk::objects::ChainInfo;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use crate::render;
use crate::shutdown;
use crate::state::AppState;

/// How the user wants to pay.
#[derive(Debug, Clone, Default)]
pub struct PaymentChoice {
    pub tx_hash: Option<String>,
    pub wallet: bool,
}

impl PaymentChoice {
    pub fn is_some(&self) -> bool {
        self.tx_hash.is_some() || self.wallet
    }
}

/// Render `error` for the user and turn it into the command's error.
pub fn report(error: FlowError) -> anyhow::Error {
    render::flow_error(&error);
    anyhow::Error::new(error)
}

/// Pay the current order with a pasted hash or from the wallet.
pub async fn pay_order(
    app: &AppState,
    controller: &mut OrderFlowController,
    choice: &PaymentChoice,
    chain: Option<&ChainInfo>,
) -> anyhow::Result<()> {
    if let Some(hash) = &choice.tx_hash {
        controller.submit_manual_payment(hash).await.map_err(report)?;
        return Ok(());
    }
    if !choice.wallet {
        return Ok(());
    }

    let chain = chain.context("chain details unavailable, cannot pay from the wallet")?;
    let executor = app.payment_executor()?;
    println!("Confirm the transfer in your wallet...");
    match controller
        .pay_with_wallet(&executor, chain)
        .await
        .map_err(report)?
    {
        WalletPayment::Verified(_) => {}
        WalletPayment::Stuck(tx) => {
            println!(
                "Transfer {tx} is not confirmed after {}s. It may still be pending on chain.",
                app.config.timings.stuck_timeout.as_secs()
            );
            let answer = prompt("Submit the hash for verification anyway? [y/N]").await?;
            if matches!(answer.as_str(), "y" | "yes") {
                controller.on_wallet_paid(tx).await.map_err(report)?;
            } else {
                println!("Run `mortal pay --tx-hash {tx}` once it confirms.");
            }
        }
    }
    Ok(())
}

/// Follow the order until it finishes or the user interrupts.
pub async fn wait_for_delivery(
    controller: &mut OrderFlowController,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    let mut last_status = controller.state().status;
    render::outcome(controller.state());
    while controller.step() == FlowStep::Waiting {
        tokio::select! {
            biased;

            () = shutdown::requested(shutdown_rx) => {
                println!("Stopped waiting. Run `mortal resume` to pick the order up again.");
                return;
            }

            _ = controller.next_update() => {
                let status = controller.state().status;
                if status != last_status {
                    if let Some(status) = status {
                        println!("Status: {status}");
                    }
                    last_status = status;
                }
            }
        }
    }
    render::outcome(controller.state());
}

/// Ask a question on stdin and return the trimmed, lowercased answer.
pub async fn prompt(question: &str) -> anyhow::Result<String> {
    print!("{question} ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(line.trim().to_lowercase())
}
