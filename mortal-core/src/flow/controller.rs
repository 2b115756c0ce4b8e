use std::sync::Arc;

use mortal_sdk::objects::{ChainInfo, CreateOrderRequest, MenuResponse, OrderStatus, Service};
use time::OffsetDateTime;
use tracing::{info, warn};

use super::error::FlowError;
use super::state::{Effect, FlowEvent, FlowState, FlowStep, SelectedService, Transition, reduce};
use crate::api::AgentApi;
use crate::config::FlowTimings;
use crate::events::{PollEventReceiver, poll_event_channel};
use crate::executor::{Confirmation, OnChainPaymentExecutor};
use crate::order::Order;
use crate::persistence::OrderPersistence;
use crate::processors::{OrderStatusPoller, TaskSlot};
use crate::verify::{SecurityError, TxHash, VerifiedOrder, verify_payment_address};

/// What [`OrderFlowController::resume`] found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeOutcome {
    /// No snapshot; the flow stays in `browse`.
    Nothing,
    /// The saved order already finished. The snapshot was discarded.
    Finished { order_id: String, status: OrderStatus },
    /// The saved order was restored into this step.
    Resumed(FlowStep),
}

/// Result of [`OrderFlowController::pay_with_wallet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletPayment {
    /// The transfer confirmed and was handed to verification.
    Verified(FlowStep),
    /// No receipt before the stuck timeout. The hash is recorded; the caller
    /// may still submit it with [`OrderFlowController::on_wallet_paid`].
    Stuck(TxHash),
}

/// Drives one purchase flow.
///
/// All state changes go through [`reduce`]; the controller only performs
/// I/O and the effects a transition asks for. Dropping the controller
/// aborts its poller and leaves the snapshot in place for a later resume.
pub struct OrderFlowController {
    api: Arc<dyn AgentApi>,
    persistence: OrderPersistence,
    poller: OrderStatusPoller,
    poll_task: TaskSlot,
    poll_rx: PollEventReceiver,
    state: FlowState,
}

impl OrderFlowController {
    pub fn new(api: Arc<dyn AgentApi>, persistence: OrderPersistence, timings: &FlowTimings) -> Self {
        let (poll_tx, poll_rx) = poll_event_channel();
        let poller = OrderStatusPoller::new(Arc::clone(&api), timings.purchase_poll_interval, poll_tx);
        Self {
            api,
            persistence,
            poller,
            poll_task: TaskSlot::new(),
            poll_rx,
            state: FlowState::default(),
        }
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn step(&self) -> FlowStep {
        self.state.step
    }

    /// The current order, once it has passed address verification.
    pub fn order(&self) -> Option<&VerifiedOrder> {
        self.state.order.as_ref()
    }

    /// Set after a failed address verification, until the next selection
    /// or reset.
    pub fn security_alert(&self) -> Option<&SecurityError> {
        self.state.security_alert.as_ref()
    }

    pub fn is_polling(&self) -> bool {
        self.poll_task.is_active()
    }

    /// Catalog for the browse step.
    pub async fn load_menu(&self) -> Result<MenuResponse, FlowError> {
        Ok(self.api.menu().await?)
    }

    /// Restore an in-progress order from the local snapshot.
    ///
    /// The order status is checked once. A terminal status discards the
    /// snapshot; a failed check does not, since the snapshot alone is enough
    /// to show the payment screen.
    pub async fn resume(&mut self) -> Result<ResumeOutcome, FlowError> {
        if self.state.step != FlowStep::Browse {
            return Err(FlowError::InvalidTransition {
                step: self.state.step,
                action: "resume",
            });
        }
        let Some(snapshot) = self.persistence.load()? else {
            return Ok(ResumeOutcome::Nothing);
        };

        let status = match self.api.order_status(&snapshot.order_id).await {
            Ok(status) if status.is_terminal() => {
                info!(order_id = %snapshot.order_id, %status, "Saved order already finished, discarding snapshot");
                self.persistence.clear()?;
                return Ok(ResumeOutcome::Finished {
                    order_id: snapshot.order_id,
                    status,
                });
            }
            Ok(status) => {
                info!(order_id = %snapshot.order_id, %status, "Saved order still open");
                Some(status)
            }
            Err(e) => {
                warn!(order_id = %snapshot.order_id, error = %e, "Could not re-check saved order, resuming offline");
                None
            }
        };

        self.apply(FlowEvent::Resumed { snapshot, status })?;
        Ok(ResumeOutcome::Resumed(self.state.step))
    }

    /// Start a new purchase of `service` on `chain`. Anything order-scoped
    /// from a previous attempt is dropped and its poller torn down. The old
    /// snapshot stays until a new order replaces it.
    pub fn select_service(&mut self, service: &Service, chain: impl Into<String>) {
        self.apply_infallible(FlowEvent::ServiceSelected {
            service: SelectedService::from(service),
            chain: chain.into(),
        });
    }

    pub fn set_input(
        &mut self,
        user_input: impl Into<String>,
        spread_type: Option<String>,
    ) -> Result<(), FlowError> {
        self.apply(FlowEvent::InputChanged {
            user_input: user_input.into(),
            spread_type,
        })
    }

    /// Create the order and verify its payment address.
    ///
    /// `GET /status` and `POST /order` run concurrently. The order is only
    /// accepted when its payment address matches the status vault address;
    /// a missing vault address or a failed status fetch counts as a
    /// mismatch.
    pub async fn proceed_to_payment(&mut self) -> Result<(), FlowError> {
        let (FlowStep::Input, Some(service), Some(chain)) =
            (self.state.step, &self.state.service, &self.state.chain)
        else {
            return Err(FlowError::InvalidTransition {
                step: self.state.step,
                action: "proceed to payment",
            });
        };

        let request = CreateOrderRequest {
            service_id: service.id.clone(),
            user_input: self.state.user_input.clone(),
            spread_type: self.state.spread_type.clone(),
            chain: chain.clone(),
        };
        let (status, created) = tokio::join!(self.api.status(), self.api.create_order(&request));
        let created = created?;

        let authoritative = match status {
            Ok(status) => status.vault_address,
            Err(e) => {
                warn!(error = %e, "Status fetch failed, cannot verify payment address");
                None
            }
        };
        let order = Order::from_response(
            created,
            request.service_id,
            request.chain,
            OffsetDateTime::now_utc(),
        );

        match verify_payment_address(authoritative.as_deref(), order) {
            Ok(verified) => self.apply(FlowEvent::OrderVerified(verified)),
            Err(alert) => {
                self.apply(FlowEvent::SecurityRejected(alert.clone()))?;
                Err(FlowError::Security(alert))
            }
        }
    }

    /// Verify a hash the user pasted. Malformed input is rejected before
    /// any request is made.
    pub async fn submit_manual_payment(&mut self, raw: &str) -> Result<FlowStep, FlowError> {
        let tx_hash = TxHash::parse(raw)?;
        self.verify(tx_hash).await
    }

    /// Verify the hash of a wallet transfer.
    pub async fn on_wallet_paid(&mut self, tx_hash: TxHash) -> Result<FlowStep, FlowError> {
        self.verify(tx_hash).await
    }

    /// Pay the current order from the wallet behind `executor`, then verify.
    pub async fn pay_with_wallet(
        &mut self,
        executor: &OnChainPaymentExecutor,
        chain: &ChainInfo,
    ) -> Result<WalletPayment, FlowError> {
        let order = match (&self.state.order, self.state.step) {
            (Some(order), FlowStep::Payment) => order,
            _ => {
                return Err(FlowError::InvalidTransition {
                    step: self.state.step,
                    action: "pay with wallet",
                });
            }
        };
        let plan = executor.plan(order, chain)?;
        info!(order_id = %plan.order_id, amount = %plan.display_amount(), to = %plan.to, "Requesting wallet transfer");

        let pending = executor.submit(&plan).await?;
        self.apply(FlowEvent::PaymentSubmitted(pending.tx_hash.clone()))?;

        match executor.confirm(&pending).await? {
            Confirmation::Confirmed(_) => {
                let step = self.on_wallet_paid(pending.tx_hash).await?;
                Ok(WalletPayment::Verified(step))
            }
            Confirmation::Stuck => Ok(WalletPayment::Stuck(pending.tx_hash)),
        }
    }

    /// Wait for the next status update from the poller and apply it.
    ///
    /// Only returns once a poll result arrives, so callers should only await
    /// it while the flow is `waiting`.
    pub async fn next_update(&mut self) -> FlowStep {
        if let Some(event) = self.poll_rx.recv().await {
            self.apply_infallible(FlowEvent::Polled(event));
        }
        self.state.step
    }

    /// Back to `browse`, forgetting the saved order.
    pub fn reset(&mut self) {
        self.apply_infallible(FlowEvent::Reset);
    }

    async fn verify(&mut self, tx_hash: TxHash) -> Result<FlowStep, FlowError> {
        let order_id = match (&self.state.order, self.state.step) {
            (Some(order), FlowStep::Payment | FlowStep::Waiting) => order.order_id().to_owned(),
            _ => {
                return Err(FlowError::InvalidTransition {
                    step: self.state.step,
                    action: "verify a payment",
                });
            }
        };
        info!(order_id = %order_id, tx_hash = %tx_hash, "Verifying payment");
        let response = self.api.verify_payment(&order_id, &tx_hash).await?;
        self.apply(FlowEvent::PaymentVerified { tx_hash, response })?;
        Ok(self.state.step)
    }

    fn apply(&mut self, event: FlowEvent) -> Result<(), FlowError> {
        let transition = reduce(&self.state, event)?;
        self.commit(transition);
        Ok(())
    }

    /// For events accepted in every step.
    fn apply_infallible(&mut self, event: FlowEvent) {
        if let Err(e) = self.apply(event) {
            warn!(error = %e, "Flow event rejected");
        }
    }

    fn commit(&mut self, transition: Transition) {
        let Transition { state, effects } = transition;
        self.state = state;
        for effect in effects {
            self.run(effect);
        }
    }

    fn run(&mut self, effect: Effect) {
        match effect {
            Effect::Persist(snapshot) => {
                if let Err(e) = self.persistence.save(&snapshot) {
                    warn!(order_id = %snapshot.order_id, error = %e, "Failed to save order snapshot");
                }
            }
            Effect::ClearPersistence => {
                if let Err(e) = self.persistence.clear() {
                    warn!(error = %e, "Failed to clear order snapshot");
                }
            }
            Effect::StartPolling { order_id, epoch } => {
                self.poll_task.replace(self.poller.spawn(order_id, epoch));
            }
            Effect::StopPolling => {
                self.poll_task.abort();
            }
        }
    }
}

impl std::fmt::Debug for OrderFlowController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderFlowController")
            .field("state", &self.state)
            .field("polling", &self.poll_task.is_active())
            .finish_non_exhaustive()
    }
}
