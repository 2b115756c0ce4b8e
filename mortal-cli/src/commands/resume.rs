use mortal_core::flow::{FlowStep, OrderFlowController, ResumeOutcome};
use mortal_sdk::objects::ChainInfo;
use tracing::debug;

use super::{report, wait_for_delivery};
use crate::render;
use crate::state::AppState;

/// Restore the saved order, if any. Returns `None` when there is nothing
/// left to resume.
pub async fn restore(
    app: &AppState,
) -> anyhow::Result<Option<(OrderFlowController, Option<ChainInfo>)>> {
    let mut controller = app.controller();
    match controller.resume().await.map_err(report)? {
        ResumeOutcome::Nothing => {
            println!("No order in progress.");
            Ok(None)
        }
        ResumeOutcome::Finished { order_id, status } => {
            println!("Order {order_id} already finished ({status}). Saved progress discarded.");
            Ok(None)
        }
        ResumeOutcome::Resumed(_) => {
            let chain = chain_details(app, &controller).await;
            render::payment_screen(controller.state(), chain.as_ref());
            Ok(Some((controller, chain)))
        }
    }
}

/// Token details for the order's chain, if the menu is reachable. The
/// payment screen renders without them.
async fn chain_details(app: &AppState, controller: &OrderFlowController) -> Option<ChainInfo> {
    let chain_id = controller.state().chain.clone()?;
    match app.menu().await {
        Ok(menu) => menu.chain(&chain_id).cloned(),
        Err(e) => {
            debug!("Menu unavailable while resuming: {e:#}");
            None
        }
    }
}

pub async fn run(app: &AppState, no_wait: bool) -> anyhow::Result<()> {
    let Some((mut controller, _)) = restore(app).await? else {
        return Ok(());
    };
    match controller.step() {
        FlowStep::Payment => {
            println!();
            println!("Awaiting payment. Run `mortal pay --tx-hash <hash>` (or `mortal pay --wallet`).");
        }
        FlowStep::Waiting if !no_wait => {
            wait_for_delivery(&mut controller, &mut app.shutdown.clone()).await;
        }
        _ => render::outcome(controller.state()),
    }
    Ok(())
}
