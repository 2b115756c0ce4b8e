use anyhow::Context;

use super::{PaymentChoice, pay_order, report, wait_for_delivery};
use crate::render;
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct BuyRequest {
    pub service: String,
    pub chain: Option<String>,
    pub input: Option<String>,
    pub spread_type: Option<String>,
    pub payment: PaymentChoice,
    pub no_wait: bool,
}

/// Select a service, create and verify the order, then optionally pay and
/// follow it to delivery.
pub async fn run(app: &AppState, request: BuyRequest) -> anyhow::Result<()> {
    let menu = app.menu().await?;
    let service = menu
        .service(&request.service)
        .with_context(|| format!("unknown service {:?}", request.service))?
        .clone();
    let chain_id = request.chain.unwrap_or_else(|| menu.default_chain.clone());
    let chain = menu
        .chain(&chain_id)
        .with_context(|| format!("chain {chain_id:?} is not supported by this agent"))?
        .clone();

    let mut controller = app.controller();
    controller.select_service(&service, chain.id.clone());
    controller
        .set_input(request.input.unwrap_or_default(), request.spread_type)
        .map_err(report)?;
    controller.proceed_to_payment().await.map_err(report)?;
    render::payment_screen(controller.state(), Some(&chain));

    if !request.payment.is_some() {
        println!();
        println!("Send the payment, then run `mortal pay --tx-hash <hash>` (or `mortal pay --wallet`).");
        return Ok(());
    }

    pay_order(app, &mut controller, &request.payment, Some(&chain)).await?;
    if request.no_wait {
        render::outcome(controller.state());
        return Ok(());
    }
    wait_for_delivery(&mut controller, &mut app.shutdown.clone()).await;
    Ok(())
}
