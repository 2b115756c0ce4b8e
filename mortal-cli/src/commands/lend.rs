//! Interactive approve → lend.

use std::future::Future;

use anyhow::Context;
use mortal_core::executor::{LendError, LendExecutor, WaitOutcome};
use mortal_core::flow::{LoanFlow, LoanStep};
use mortal_core::wallet::contracts::parse_address;
use rust_decimal::Decimal;
use tokio::sync::watch;

use super::prompt;
use crate::render;
use crate::shutdown;
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct LendRequest {
    pub amount: Decimal,
    pub rate_bps: u32,
    pub chain: Option<String>,
}

/// What to do about a wait that timed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StuckChoice {
    Proceed,
    Restart,
    Wait,
}

impl StuckChoice {
    fn parse(answer: &str) -> Self {
        match answer {
            "p" | "proceed" => StuckChoice::Proceed,
            "r" | "restart" => StuckChoice::Restart,
            _ => StuckChoice::Wait,
        }
    }
}

pub async fn run(app: &AppState, request: LendRequest) -> anyhow::Result<()> {
    let menu = app.menu().await?;
    let chain_id = request.chain.unwrap_or_else(|| menu.default_chain.clone());
    let chain = menu
        .chain(&chain_id)
        .with_context(|| format!("chain {chain_id:?} is not supported by this agent"))?;
    let token = chain
        .token_address
        .as_deref()
        .with_context(|| format!("no token contract configured for chain {}", chain.id))?;
    let token = parse_address(token)
        .with_context(|| format!("invalid token contract for chain {}", chain.id))?;

    let requested = LoanFlow::new(
        request.amount,
        chain.decimals,
        request.rate_bps,
        chain.id.clone(),
        &app.config.lending,
    )?;
    let persistence = app.loans();
    let mut flow = match persistence.load()? {
        Some(saved) if same_loan(&saved, &requested) => {
            println!("Resuming saved loan ({}).", saved.step);
            saved
        }
        Some(saved) => {
            anyhow::bail!(
                "a different loan ({} at {} bps, {}) is in progress; run `mortal reset` to discard it",
                saved.amount,
                saved.interest_rate_bps,
                saved.step
            );
        }
        None => requested,
    };

    let status = app.api.get_status().await.context("failed to load agent status")?;
    let executor = LendExecutor::for_agent(app.wallet()?, token, &status, app.config.timings)
        .map_err(report)?
        .with_persistence(persistence);
    println!("Vault: {}", executor.vault());

    let mut shutdown_rx = app.shutdown.clone();
    loop {
        match flow.step {
            LoanStep::Idle => {
                if executor.check_allowance(&mut flow).await.map_err(report)? {
                    render::loan(&flow, &chain.token);
                    continue;
                }
                println!("Approve {} {} for the vault in your wallet...", flow.amount, chain.token);
                let tx = executor.approve(&mut flow).await.map_err(report)?;
                println!("Approve submitted: {tx}");
            }
            LoanStep::Approving => {
                let Some(outcome) =
                    until_shutdown(&mut shutdown_rx, executor.await_approval(&mut flow)).await
                else {
                    interrupted();
                    return Ok(());
                };
                match outcome.map_err(report)? {
                    WaitOutcome::Confirmed(source) => println!("Approval confirmed ({source:?})."),
                    WaitOutcome::Stuck => handle_stuck(&executor, &mut flow, "approval").await?,
                }
            }
            LoanStep::Approved => {
                println!("Confirm the lend in your wallet...");
                let tx = executor.lend(&mut flow).await.map_err(report)?;
                println!("Lend submitted: {tx}");
            }
            LoanStep::Lending => {
                let Some(outcome) =
                    until_shutdown(&mut shutdown_rx, executor.await_lend(&mut flow)).await
                else {
                    interrupted();
                    return Ok(());
                };
                match outcome.map_err(report)? {
                    WaitOutcome::Confirmed(_) => {}
                    WaitOutcome::Stuck => handle_stuck(&executor, &mut flow, "lend").await?,
                }
            }
            LoanStep::Done => {
                render::loan(&flow, &chain.token);
                println!("Loan placed.");
                return Ok(());
            }
        }
    }
}

fn same_loan(saved: &LoanFlow, requested: &LoanFlow) -> bool {
    saved.amount == requested.amount
        && saved.interest_rate_bps == requested.interest_rate_bps
        && saved.chain == requested.chain
}

async fn handle_stuck(
    executor: &LendExecutor,
    flow: &mut LoanFlow,
    what: &str,
) -> anyhow::Result<()> {
    println!("The {what} has not been observed on chain yet. The transaction may still confirm.");
    let answer = prompt("[p]roceed (confirmed on the explorer), [r]estart, or [w]ait?").await?;
    match StuckChoice::parse(&answer) {
        StuckChoice::Proceed => {
            executor.override_confirmed(flow).map_err(report)?;
        }
        StuckChoice::Restart => executor.start_over(flow),
        StuckChoice::Wait => {}
    }
    Ok(())
}

async fn until_shutdown<T>(
    shutdown_rx: &mut watch::Receiver<bool>,
    fut: impl Future<Output = T>,
) -> Option<T> {
    tokio::select! {
        biased;

        () = shutdown::requested(shutdown_rx) => None,
        value = fut => Some(value),
    }
}

fn interrupted() {
    println!("Stopped. Progress is saved; run the same `mortal lend` command to continue.");
}

fn report(error: LendError) -> anyhow::Error {
    match &error {
        LendError::Rejected => println!("Cancelled in the wallet. Nothing was sent."),
        LendError::Security(alert) => render::security_alert(alert),
        LendError::Wallet(message) => println!("Wallet error: {message}. You can retry."),
        other => println!("{other}"),
    }
    anyhow::Error::new(error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stuck_choice_parsing() {
        assert_eq!(StuckChoice::parse("p"), StuckChoice::Proceed);
        assert_eq!(StuckChoice::parse("restart"), StuckChoice::Restart);
        assert_eq!(StuckChoice::parse(""), StuckChoice::Wait);
        assert_eq!(StuckChoice::parse("w"), StuckChoice::Wait);
    }
}
