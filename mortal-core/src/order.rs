//! The order as the flow sees it.

use mortal_sdk::objects::OrderResponse;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single purchase attempt.
///
/// `payment_address` and `price_usd` come from the order-creation response
/// and are not trusted for a transfer until wrapped in a
/// [`VerifiedOrder`](crate::verify::VerifiedOrder).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub service_id: String,
    pub chain: String,
    pub payment_address: String,
    pub price_usd: Decimal,
    pub expires_minutes: u32,
    /// Client clock at creation, unix seconds.
    pub created_at: i64,
}

impl Order {
    pub fn from_response(
        response: OrderResponse,
        service_id: impl Into<String>,
        chain: impl Into<String>,
        created_at: time::OffsetDateTime,
    ) -> Self {
        Self {
            order_id: response.order_id,
            service_id: service_id.into(),
            chain: chain.into(),
            payment_address: response.payment_address,
            price_usd: response.price_usd,
            expires_minutes: response.expires_minutes,
            created_at: created_at.unix_timestamp(),
        }
    }

    /// When the payment window closes, per the client clock.
    pub fn expires_at(&self) -> Option<time::OffsetDateTime> {
        let created = time::OffsetDateTime::from_unix_timestamp(self.created_at).ok()?;
        Some(created + time::Duration::minutes(i64::from(self.expires_minutes)))
    }

    /// Whole minutes left in the payment window, never negative.
    pub fn minutes_remaining(&self, now: time::OffsetDateTime) -> i64 {
        self.expires_at()
            .map(|at| (at - now).whole_minutes().max(0))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_window() {
        let created = time::OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let order = Order::from_response(
            OrderResponse {
                order_id: "ord_1".into(),
                payment_address: "0xabc".into(),
                price_usd: Decimal::new(5, 0),
                expires_minutes: 30,
            },
            "tarot",
            "base",
            created,
        );
        assert_eq!(order.expires_at(), Some(created + time::Duration::minutes(30)));
        assert_eq!(order.minutes_remaining(created + time::Duration::minutes(10)), 20);
        assert_eq!(order.minutes_remaining(created + time::Duration::hours(2)), 0);
    }
}
