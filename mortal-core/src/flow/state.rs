//! Purchase flow state machine.
//!
//! `browse → input → payment → waiting → {delivered | failed | expired | refunded}`
//!
//! [`reduce`] is the only place flow state changes. It is pure: side effects
//! come back as [`Effect`] values for the controller to carry out, which
//! keeps every transition testable without a runtime.

use mortal_sdk::objects::{OrderStatus, Service, VerifyResponse};
use serde_json::Value;
use tracing::{debug, error, info};

use super::error::FlowError;
use crate::events::PollEvent;
use crate::persistence::{PersistedOrder, PersistedStep};
use crate::verify::{SecurityError, TxHash, VerifiedOrder};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FlowStep {
    #[default]
    Browse,
    Input,
    Payment,
    Waiting,
    Delivered,
    Failed,
    Expired,
    Refunded,
}

impl FlowStep {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            FlowStep::Delivered | FlowStep::Failed | FlowStep::Expired | FlowStep::Refunded
        )
    }

    /// The terminal step for a terminal order status.
    pub fn from_terminal(status: OrderStatus) -> Option<Self> {
        match status {
            OrderStatus::Delivered => Some(FlowStep::Delivered),
            OrderStatus::Failed => Some(FlowStep::Failed),
            OrderStatus::Expired => Some(FlowStep::Expired),
            OrderStatus::Refunded => Some(FlowStep::Refunded),
            OrderStatus::PendingPayment | OrderStatus::Paid => None,
        }
    }
}

impl std::fmt::Display for FlowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FlowStep::Browse => "browse",
            FlowStep::Input => "input",
            FlowStep::Payment => "payment",
            FlowStep::Waiting => "waiting",
            FlowStep::Delivered => "delivered",
            FlowStep::Failed => "failed",
            FlowStep::Expired => "expired",
            FlowStep::Refunded => "refunded",
        };
        f.write_str(name)
    }
}

/// What the delivered screen shows.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryContent {
    /// Returned synchronously by the verify call.
    Delivered(Value),
    /// Delivery was observed by polling, which never carries content.
    CheckElsewhere,
}

/// The selected service, as far as the flow needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedService {
    pub id: String,
    pub name: String,
}

impl From<&Service> for SelectedService {
    fn from(service: &Service) -> Self {
        Self {
            id: service.id.clone(),
            name: service.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowState {
    pub step: FlowStep,
    /// Bumped whenever the flow is superseded. Background results tagged
    /// with an older epoch are ignored.
    pub epoch: u64,
    pub service: Option<SelectedService>,
    pub chain: Option<String>,
    pub user_input: String,
    pub spread_type: Option<String>,
    pub order: Option<VerifiedOrder>,
    pub tx_hash: Option<TxHash>,
    pub status: Option<OrderStatus>,
    pub result: Option<DeliveryContent>,
    /// Set when address verification failed. Cleared only by a new service
    /// selection or a reset.
    pub security_alert: Option<SecurityError>,
}

impl FlowState {
    /// Nothing order-scoped, ready for a new selection.
    fn superseded(&self) -> Self {
        Self {
            epoch: self.epoch + 1,
            ..Self::default()
        }
    }

    fn snapshot(&self, step: PersistedStep) -> Option<PersistedOrder> {
        let order = self.order.as_ref()?;
        let service_name = self
            .service
            .as_ref()
            .map(|s| s.name.clone())
            .unwrap_or_else(|| order.order().service_id.clone());
        Some(PersistedOrder::new(order, service_name, step, self.tx_hash.clone()))
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowEvent {
    ServiceSelected { service: SelectedService, chain: String },
    InputChanged { user_input: String, spread_type: Option<String> },
    /// Address verification failed for a freshly created order.
    SecurityRejected(SecurityError),
    /// A freshly created order passed address verification.
    OrderVerified(VerifiedOrder),
    /// A snapshot was found on startup and its order is still live.
    /// `status` is the backend's current answer, when it could be fetched.
    Resumed {
        snapshot: PersistedOrder,
        status: Option<OrderStatus>,
    },
    /// The wallet returned a hash; the transfer is not confirmed yet.
    PaymentSubmitted(TxHash),
    /// The backend answered a verify call.
    PaymentVerified { tx_hash: TxHash, response: VerifyResponse },
    Polled(PollEvent),
    Reset,
}

impl FlowEvent {
    fn name(&self) -> &'static str {
        match self {
            FlowEvent::ServiceSelected { .. } => "select a service",
            FlowEvent::InputChanged { .. } => "change the input",
            FlowEvent::SecurityRejected(_) => "reject an order",
            FlowEvent::OrderVerified(_) => "accept an order",
            FlowEvent::Resumed { .. } => "resume an order",
            FlowEvent::PaymentSubmitted(_) => "submit a payment",
            FlowEvent::PaymentVerified { .. } => "verify a payment",
            FlowEvent::Polled(_) => "apply a status update",
            FlowEvent::Reset => "reset",
        }
    }
}

/// Side effects requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Persist(PersistedOrder),
    ClearPersistence,
    StartPolling { order_id: String, epoch: u64 },
    StopPolling,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: FlowState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn to(state: FlowState) -> Self {
        Self {
            state,
            effects: Vec::new(),
        }
    }

    fn with(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    fn persisting(state: FlowState, step: PersistedStep) -> Self {
        let snapshot = state.snapshot(step);
        let transition = Self::to(state);
        match snapshot {
            Some(snapshot) => transition.with(Effect::Persist(snapshot)),
            None => transition,
        }
    }

    fn unchanged(state: &FlowState) -> Self {
        Self::to(state.clone())
    }
}

/// Apply `event` to `state`.
///
/// Events that make no sense in the current step are rejected and leave the
/// caller's state untouched. Poll results from a superseded epoch (or for a
/// flow that is no longer waiting) are silently ignored.
pub fn reduce(state: &FlowState, event: FlowEvent) -> Result<Transition, FlowError> {
    let action = event.name();
    let invalid = || FlowError::InvalidTransition {
        step: state.step,
        action,
    };

    match event {
        FlowEvent::ServiceSelected { service, chain } => {
            info!(service = %service.id, chain = %chain, epoch = state.epoch + 1, "Service selected");
            let next = FlowState {
                step: FlowStep::Input,
                service: Some(service),
                chain: Some(chain),
                ..state.superseded()
            };
            Ok(Transition::to(next).with(Effect::StopPolling))
        }

        FlowEvent::InputChanged {
            user_input,
            spread_type,
        } => {
            if state.step != FlowStep::Input {
                return Err(invalid());
            }
            let next = FlowState {
                user_input,
                spread_type,
                ..state.clone()
            };
            Ok(Transition::to(next))
        }

        FlowEvent::SecurityRejected(alert) => {
            if state.step != FlowStep::Input {
                return Err(invalid());
            }
            error!(error = %alert, "Payment blocked by address verification");
            let next = FlowState {
                security_alert: Some(alert),
                ..state.clone()
            };
            Ok(Transition::to(next))
        }

        FlowEvent::OrderVerified(order) => {
            if state.step != FlowStep::Input {
                return Err(invalid());
            }
            info!(order_id = %order.order_id(), "Order verified, awaiting payment");
            let next = FlowState {
                step: FlowStep::Payment,
                order: Some(order),
                tx_hash: None,
                status: Some(OrderStatus::PendingPayment),
                result: None,
                security_alert: None,
                ..state.clone()
            };
            Ok(Transition::persisting(next, PersistedStep::Payment))
        }

        FlowEvent::Resumed { snapshot, status } => {
            if state.step != FlowStep::Browse || status.is_some_and(|s| s.is_terminal()) {
                return Err(invalid());
            }
            let epoch = state.epoch + 1;
            let step = match snapshot.step {
                PersistedStep::Payment => FlowStep::Payment,
                PersistedStep::Waiting => FlowStep::Waiting,
            };
            info!(order_id = %snapshot.order_id, %step, epoch, "Resumed order from snapshot");
            let next = FlowState {
                step,
                epoch,
                service: Some(SelectedService {
                    id: snapshot.service_id.clone(),
                    name: snapshot.service_name.clone(),
                }),
                chain: Some(snapshot.chain.clone()),
                order: Some(snapshot.verified_order()),
                tx_hash: snapshot.tx_hash.clone(),
                status: Some(status.unwrap_or(match step {
                    FlowStep::Waiting => OrderStatus::Paid,
                    _ => OrderStatus::PendingPayment,
                })),
                ..FlowState::default()
            };
            let transition = Transition::to(next);
            Ok(match step {
                FlowStep::Waiting => transition.with(Effect::StartPolling {
                    order_id: snapshot.order_id,
                    epoch,
                }),
                _ => transition,
            })
        }

        FlowEvent::PaymentSubmitted(tx_hash) => {
            if state.step != FlowStep::Payment {
                return Err(invalid());
            }
            info!(tx_hash = %tx_hash, "Payment pending");
            let next = FlowState {
                tx_hash: Some(tx_hash),
                ..state.clone()
            };
            Ok(Transition::persisting(next, PersistedStep::Payment))
        }

        FlowEvent::PaymentVerified { tx_hash, response } => {
            let order_id = match (&state.order, state.step) {
                (Some(order), FlowStep::Payment | FlowStep::Waiting) => order.order_id().to_owned(),
                _ => return Err(invalid()),
            };
            if let Some(terminal) = FlowStep::from_terminal(response.status) {
                info!(order_id = %order_id, tx_hash = %tx_hash, status = %response.status, "Order finished on verification");
                let content = match (terminal, response.result) {
                    (FlowStep::Delivered, Some(value)) => Some(DeliveryContent::Delivered(value)),
                    (FlowStep::Delivered, None) => Some(DeliveryContent::CheckElsewhere),
                    _ => None,
                };
                let next = FlowState {
                    step: terminal,
                    tx_hash: Some(tx_hash),
                    status: Some(response.status),
                    result: content,
                    ..state.clone()
                };
                return Ok(Transition::to(next)
                    .with(Effect::StopPolling)
                    .with(Effect::ClearPersistence));
            }

            info!(order_id = %order_id, tx_hash = %tx_hash, status = %response.status, "Payment accepted, waiting for delivery");
            let next = FlowState {
                step: FlowStep::Waiting,
                tx_hash: Some(tx_hash),
                status: Some(response.status),
                ..state.clone()
            };
            Ok(Transition::persisting(next, PersistedStep::Waiting).with(Effect::StartPolling {
                order_id,
                epoch: state.epoch,
            }))
        }

        FlowEvent::Polled(event) => {
            let current = state
                .order
                .as_ref()
                .is_some_and(|o| o.order_id() == event.order_id);
            if event.epoch != state.epoch || state.step != FlowStep::Waiting || !current {
                debug!(
                    order_id = %event.order_id,
                    event_epoch = event.epoch,
                    epoch = state.epoch,
                    "Ignoring stale poll result"
                );
                return Ok(Transition::unchanged(state));
            }
            match FlowStep::from_terminal(event.status) {
                Some(terminal) => {
                    info!(order_id = %event.order_id, status = %event.status, "Order finished");
                    let next = FlowState {
                        step: terminal,
                        status: Some(event.status),
                        result: (terminal == FlowStep::Delivered).then_some(DeliveryContent::CheckElsewhere),
                        ..state.clone()
                    };
                    Ok(Transition::to(next)
                        .with(Effect::StopPolling)
                        .with(Effect::ClearPersistence))
                }
                None => {
                    let next = FlowState {
                        status: Some(event.status),
                        ..state.clone()
                    };
                    Ok(Transition::to(next))
                }
            }
        }

        FlowEvent::Reset => {
            info!(from = %state.step, epoch = state.epoch + 1, "Flow reset");
            Ok(Transition::to(state.superseded())
                .with(Effect::StopPolling)
                .with(Effect::ClearPersistence))
        }
    }
}
