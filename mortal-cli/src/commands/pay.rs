use mortal_core::flow::FlowStep;

use super::{PaymentChoice, pay_order, resume, wait_for_delivery};
use crate::render;
use crate::state::AppState;

/// Pay the saved order.
pub async fn run(app: &AppState, choice: PaymentChoice, no_wait: bool) -> anyhow::Result<()> {
    let Some((mut controller, chain)) = resume::restore(app).await? else {
        return Ok(());
    };
    if choice.wallet {
        if controller.step() == FlowStep::Waiting {
            println!("A payment was already accepted for this order; not sending another.");
            render::outcome(controller.state());
            return Ok(());
        }
        if let Some(tx) = &controller.state().tx_hash {
            println!("Transfer {tx} was already sent for this order. Run `mortal pay --tx-hash {tx}` to verify it.");
            return Ok(());
        }
    }

    pay_order(app, &mut controller, &choice, chain.as_ref()).await?;
    if no_wait {
        render::outcome(controller.state());
        return Ok(());
    }
    wait_for_delivery(&mut controller, &mut app.shutdown.clone()).await;
    Ok(())
}
