//! Typed snapshots on top of a [`KeyValueStore`].

use std::marker::PhantomData;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use super::store::{KeyValueStore, PersistenceError};
use crate::flow::loan::LoanFlow;
use crate::order::Order;
use crate::verify::{TxHash, VerifiedOrder};

/// Storage key of the purchase flow snapshot.
pub const ORDER_KEY: &str = "mortal_order_flow";
/// Storage key of the loan flow snapshot.
pub const LOAN_KEY: &str = "mortal_loan_flow";

/// A single JSON value stored under a fixed key.
pub struct Snapshot<T> {
    store: Arc<dyn KeyValueStore>,
    key: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            key: self.key,
            _marker: PhantomData,
        }
    }
}

impl<T: Serialize + DeserializeOwned> Snapshot<T> {
    pub fn new(store: Arc<dyn KeyValueStore>, key: &'static str) -> Self {
        Self {
            store,
            key,
            _marker: PhantomData,
        }
    }

    /// Read the snapshot.
    ///
    /// An unreadable snapshot (older format, hand-edited file) is dropped
    /// and reported as absent rather than wedging the flow.
    pub fn load(&self) -> Result<Option<T>, PersistenceError> {
        let Some(raw) = self.store.get(self.key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key = self.key, error = %e, "Discarding unreadable snapshot");
                self.store.remove(self.key)?;
                Ok(None)
            }
        }
    }

    pub fn save(&self, value: &T) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(value)?;
        self.store.set(self.key, &json)?;
        debug!(key = self.key, "Saved snapshot");
        Ok(())
    }

    pub fn clear(&self) -> Result<(), PersistenceError> {
        self.store.remove(self.key)?;
        debug!(key = self.key, "Cleared snapshot");
        Ok(())
    }
}

/// Snapshot of the purchase flow.
pub type OrderPersistence = Snapshot<PersistedOrder>;
/// Snapshot of the loan flow.
pub type LoanPersistence = Snapshot<LoanFlow>;

impl Snapshot<PersistedOrder> {
    pub fn orders(store: Arc<dyn KeyValueStore>) -> Self {
        Self::new(store, ORDER_KEY)
    }
}

impl Snapshot<LoanFlow> {
    pub fn loans(store: Arc<dyn KeyValueStore>) -> Self {
        Self::new(store, LOAN_KEY)
    }
}

/// Screen the order was on when it was saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistedStep {
    Payment,
    Waiting,
}

/// Everything needed to redraw the payment screen offline.
///
/// Only this crate can turn a snapshot back into a [`VerifiedOrder`]:
///
/// ```compile_fail
/// use mortal_core::persistence::PersistedOrder;
/// use mortal_core::verify::VerifiedOrder;
///
/// fn forge(snapshot: &PersistedOrder) -> VerifiedOrder {
///     snapshot.verified_order()
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedOrder {
    pub order_id: String,
    pub service_id: String,
    pub service_name: String,
    pub chain: String,
    pub step: PersistedStep,
    pub payment_address: String,
    pub price_usd: Decimal,
    pub expires_minutes: u32,
    pub created_at: i64,
    /// Hash already submitted for this order, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
}

impl PersistedOrder {
    pub fn new(
        order: &VerifiedOrder,
        service_name: impl Into<String>,
        step: PersistedStep,
        tx_hash: Option<TxHash>,
    ) -> Self {
        let order = order.order();
        Self {
            order_id: order.order_id.clone(),
            service_id: order.service_id.clone(),
            service_name: service_name.into(),
            chain: order.chain.clone(),
            step,
            payment_address: order.payment_address.clone(),
            price_usd: order.price_usd,
            expires_minutes: order.expires_minutes,
            created_at: order.created_at,
            tx_hash,
        }
    }

    pub fn order(&self) -> Order {
        Order {
            order_id: self.order_id.clone(),
            service_id: self.service_id.clone(),
            chain: self.chain.clone(),
            payment_address: self.payment_address.clone(),
            price_usd: self.price_usd,
            expires_minutes: self.expires_minutes,
            created_at: self.created_at,
        }
    }

    /// The snapshot is only written after address verification, so the
    /// restored order counts as verified.
    pub(crate) fn verified_order(&self) -> VerifiedOrder {
        VerifiedOrder::restore(self.order())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use crate::verify::verify_payment_address;

    fn verified() -> VerifiedOrder {
        let order = Order {
            order_id: "ord_7".into(),
            service_id: "tarot".into(),
            chain: "base".into(),
            payment_address: "0xVault".into(),
            price_usd: Decimal::new(500, 2),
            expires_minutes: 30,
            created_at: 1_700_000_000,
        };
        verify_payment_address(Some("0xvault"), order).unwrap()
    }

    #[test]
    fn test_order_snapshot_round_trip() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let persistence = OrderPersistence::orders(store.clone());
        assert_eq!(persistence.load().unwrap(), None);

        let snapshot = PersistedOrder::new(&verified(), "Tarot Reading", PersistedStep::Payment, None);
        persistence.save(&snapshot).unwrap();

        let restored = OrderPersistence::orders(store).load().unwrap().unwrap();
        assert_eq!(restored, snapshot);
        assert_eq!(restored.verified_order(), verified());
    }

    #[test]
    fn test_corrupt_snapshot_is_dropped() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        store.set(ORDER_KEY, "{not json").unwrap();
        let persistence = OrderPersistence::orders(store.clone());
        assert_eq!(persistence.load().unwrap(), None);
        assert_eq!(store.get(ORDER_KEY).unwrap(), None);
    }

    #[test]
    fn test_clear_removes_snapshot() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let persistence = OrderPersistence::orders(store);
        let snapshot = PersistedOrder::new(&verified(), "Tarot Reading", PersistedStep::Waiting, None);
        persistence.save(&snapshot).unwrap();
        persistence.clear().unwrap();
        assert_eq!(persistence.load().unwrap(), None);
    }
}
