//! Order status polling.
//!
//! One poller task per order in the `waiting` step. Each tick fetches
//! `GET /order/{id}` and forwards the status to the controller. The task
//! ends itself on the first terminal status; fetch failures are logged and
//! the next tick simply tries again.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::AgentApi;
use crate::events::{PollEvent, PollEventSender};

/// Spawns order status polling tasks.
#[derive(Clone)]
pub struct OrderStatusPoller {
    api: Arc<dyn AgentApi>,
    interval: Duration,
    events: PollEventSender,
}

impl OrderStatusPoller {
    pub fn new(api: Arc<dyn AgentApi>, interval: Duration, events: PollEventSender) -> Self {
        Self {
            api,
            interval,
            events,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start polling `order_id`. The first fetch happens one interval from
    /// now. The caller owns the handle and is responsible for aborting it
    /// when the flow moves on.
    pub fn spawn(&self, order_id: String, epoch: u64) -> JoinHandle<()> {
        let poller = self.clone();
        tokio::spawn(async move { poller.run(order_id, epoch).await })
    }

    async fn run(self, order_id: String, epoch: u64) {
        info!(order_id = %order_id, epoch, interval = ?self.interval, "Order status poller started");
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let status = match self.api.order_status(&order_id).await {
                Ok(status) => status,
                Err(e) => {
                    warn!(order_id = %order_id, error = %e, "Order status fetch failed, retrying next tick");
                    continue;
                }
            };
            debug!(order_id = %order_id, %status, "Polled order status");

            let event = PollEvent {
                epoch,
                order_id: order_id.clone(),
                status,
            };
            let terminal = event.is_terminal();
            if self.events.send(event).await.is_err() {
                debug!(order_id = %order_id, "Poll event receiver dropped, stopping");
                return;
            }
            if terminal {
                info!(order_id = %order_id, %status, "Order reached terminal status, poller stopped");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::poll_event_channel;
    use crate::processors::TaskSlot;
    use crate::testing::FakeApi;
    use mortal_sdk::objects::OrderStatus;

    const TICK: Duration = Duration::from_secs(3);

    #[tokio::test(start_paused = true)]
    async fn test_stops_on_first_terminal_status() {
        let api = Arc::new(FakeApi::new());
        api.script_statuses([
            Some(OrderStatus::PendingPayment),
            Some(OrderStatus::Paid),
            Some(OrderStatus::Delivered),
            Some(OrderStatus::PendingPayment),
        ]);
        let (tx, mut rx) = poll_event_channel();
        let poller = OrderStatusPoller::new(api.clone(), TICK, tx);
        let handle = poller.spawn("ord_1".into(), 4);

        let mut seen = Vec::new();
        while let Some(event) = rx.recv().await {
            assert_eq!(event.epoch, 4);
            assert_eq!(event.order_id, "ord_1");
            seen.push(event.status);
            if event.is_terminal() {
                break;
            }
        }
        assert_eq!(
            seen,
            vec![OrderStatus::PendingPayment, OrderStatus::Paid, OrderStatus::Delivered]
        );

        tokio::time::sleep(TICK * 10).await;
        assert!(handle.is_finished());
        assert_eq!(api.polls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failures_are_swallowed() {
        let api = Arc::new(FakeApi::new());
        api.script_statuses([None, None, Some(OrderStatus::Expired)]);
        let (tx, mut rx) = poll_event_channel();
        let poller = OrderStatusPoller::new(api.clone(), TICK, tx);
        let _handle = poller.spawn("ord_1".into(), 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.status, OrderStatus::Expired);
        assert_eq!(api.polls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_poll_waits_one_interval() {
        let api = Arc::new(FakeApi::new());
        let (tx, _rx) = poll_event_channel();
        let poller = OrderStatusPoller::new(api.clone(), TICK, tx);
        let _handle = poller.spawn("ord_1".into(), 1);

        tokio::time::sleep(TICK - Duration::from_millis(1)).await;
        assert_eq!(api.polls(), 0);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(api.polls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_poller_never_reports() {
        let api = Arc::new(FakeApi::new());
        let (tx, mut rx) = poll_event_channel();
        let poller = OrderStatusPoller::new(api, TICK, tx);
        let mut slot = TaskSlot::new();

        slot.replace(poller.spawn("ord_1".into(), 1));
        slot.replace(poller.spawn("ord_2".into(), 2));

        for _ in 0..3 {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.epoch, 2);
            assert_eq!(event.order_id, "ord_2");
        }
    }
}
