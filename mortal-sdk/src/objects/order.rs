//! Order creation, status and verification types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Request body of `POST /order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub service_id: String,
    pub user_input: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spread_type: Option<String>,
    pub chain: String,
}

/// Response of `POST /order`.
///
/// `payment_address` and `price_usd` are only trustworthy once the address
/// has been corroborated against `GET /status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResponse {
    pub order_id: String,
    pub payment_address: String,
    pub price_usd: Decimal,
    pub expires_minutes: u32,
}

/// Lifecycle of an order as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    PendingPayment,
    Paid,
    Delivered,
    Failed,
    Expired,
    Refunded,
}

impl OrderStatus {
    /// Terminal statuses never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered
                | OrderStatus::Failed
                | OrderStatus::Expired
                | OrderStatus::Refunded
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::PendingPayment => write!(f, "pending_payment"),
            OrderStatus::Paid => write!(f, "paid"),
            OrderStatus::Delivered => write!(f, "delivered"),
            OrderStatus::Failed => write!(f, "failed"),
            OrderStatus::Expired => write!(f, "expired"),
            OrderStatus::Refunded => write!(f, "refunded"),
        }
    }
}

/// Response of `GET /order/{id}`.
///
/// Polling deliberately never carries the delivered content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusResponse {
    pub status: OrderStatus,
}

/// Request body of `POST /order/{id}/verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub tx_hash: String,
}

/// Response of `POST /order/{id}/verify`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}
