//! Plain-text screens written to stdout.

use mortal_core::amount::{from_base_units, to_base_units};
use mortal_core::flow::{DeliveryContent, ErrorCategory, FlowError, FlowState, FlowStep, LoanFlow};
use mortal_core::verify::SecurityError;
use mortal_sdk::objects::{AgentStatus, ChainInfo, MenuResponse};
use time::OffsetDateTime;

pub fn menu(menu: &MenuResponse) {
    println!("Services:");
    for service in &menu.services {
        let shareable = if service.shareable { " (shareable)" } else { "" };
        println!(
            "  {:<16} {:<28} ${:<8} ~{} min{}",
            service.id, service.name, service.price_usd, service.delivery_time_minutes, shareable
        );
        if let Some(description) = &service.description {
            println!("  {:<16} {}", "", description);
        }
    }
    println!();
    println!("Chains:");
    for chain in &menu.supported_chains {
        let default = if chain.id == menu.default_chain { " [default]" } else { "" };
        let contract = chain.token_address.as_deref().unwrap_or("no token contract");
        println!(
            "  {:<16} {:<16} {} ({} decimals, {}){}",
            chain.id, chain.name, chain.token, chain.decimals, contract, default
        );
    }
}

pub fn status(status: &AgentStatus) {
    println!(
        "Vault:            {}",
        status.vault_address.as_deref().unwrap_or("(not reported)")
    );
    if let Some(chain) = &status.preferred_payment_chain {
        println!("Preferred chain:  {chain}");
    }
    if let Some(chains) = &status.deployed_chains {
        println!("Deployed chains:  {}", chains.join(", "));
    }
    for (key, value) in &status.extra {
        println!("{:<17} {}", format!("{key}:"), value);
    }
}

/// Everything needed to pay, from the flow state alone.
pub fn payment_screen(state: &FlowState, chain: Option<&ChainInfo>) {
    let Some(order) = state.order.as_ref().map(|o| o.order()) else {
        return;
    };
    let service = state.service.as_ref().map_or(order.service_id.as_str(), |s| s.name.as_str());
    println!("Order {} for {}", order.order_id, service);
    match chain {
        Some(chain) => {
            let amount = to_base_units(order.price_usd, chain.decimals)
                .map(|units| from_base_units(units, chain.decimals))
                .unwrap_or_else(|_| order.price_usd.to_string());
            println!("  Pay exactly:  {} {} on {}", amount, chain.token, chain.name);
        }
        None => println!("  Pay exactly:  ${} on {}", order.price_usd, order.chain),
    }
    println!("  To:           {}", order.payment_address);
    let remaining = order.minutes_remaining(OffsetDateTime::now_utc());
    if remaining > 0 {
        println!("  Expires in:   {remaining} min");
    } else {
        println!("  Expires in:   payment window has passed");
    }
    if let Some(tx) = &state.tx_hash {
        println!("  Pending tx:   {tx}");
    }
}

pub fn outcome(state: &FlowState) {
    match state.step {
        FlowStep::Delivered => match &state.result {
            Some(DeliveryContent::Delivered(value)) => {
                println!("Delivered:");
                let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
                println!("{pretty}");
            }
            _ => {
                println!("Delivered. The content was not returned here; check the agent's delivery channel for your result.");
            }
        },
        FlowStep::Failed => println!("The agent could not fulfil this order."),
        FlowStep::Expired => println!("The order expired before payment was seen."),
        FlowStep::Refunded => println!("The order was refunded."),
        FlowStep::Waiting => {
            if let Some(tx) = &state.tx_hash {
                println!("Payment {} accepted, waiting for delivery.", tx.short());
            } else {
                println!("Waiting for delivery.");
            }
        }
        FlowStep::Browse | FlowStep::Input | FlowStep::Payment => {}
    }
}

pub fn security_alert(alert: &SecurityError) {
    println!("!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!");
    println!("{alert}");
    println!("Payment has been blocked. Do NOT send funds to this order.");
    println!("!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!");
}

/// Show a flow error the way its category calls for.
pub fn flow_error(error: &FlowError) {
    if error.is_user_rejection() {
        println!("Payment cancelled in the wallet. Nothing was sent.");
        return;
    }
    match error.category() {
        ErrorCategory::Security => {
            if let FlowError::Security(alert) = error {
                security_alert(alert);
            }
        }
        ErrorCategory::Wallet => println!("Wallet error: {error}. You can retry."),
        ErrorCategory::Validation => println!("Invalid input: {error}"),
        ErrorCategory::Network => println!("Could not reach the agent: {error}"),
        ErrorCategory::Flow => println!("{error}"),
    }
}

pub fn loan(flow: &LoanFlow, token: &str) {
    println!(
        "Loan: {} {} at {} bps on {} [{}]",
        flow.amount, token, flow.interest_rate_bps, flow.chain, flow.step
    );
    if flow.already_approved {
        println!("  Allowance already covers this amount, no approval needed.");
    }
    if let Some(tx) = &flow.approve_tx {
        println!("  Approve tx: {tx}");
    }
    if let Some(tx) = &flow.lend_tx {
        println!("  Lend tx:    {tx}");
    }
}
