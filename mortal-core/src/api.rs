//! The agent backend as seen by the flows.
//!
//! [`AgentApi`] is the seam between the orchestration core and the HTTP
//! client, so the flows can be driven against a fake backend in tests.

use async_trait::async_trait;
use mortal_sdk::client::{AgentClient, ClientError};
use mortal_sdk::objects::{
    AgentStatus, CreateOrderRequest, MenuResponse, OrderResponse, OrderStatus, VerifyResponse,
};

use crate::verify::TxHash;

/// Backend operations used by the order and loan flows.
#[async_trait]
pub trait AgentApi: Send + Sync {
    /// `GET /status`.
    async fn status(&self) -> Result<AgentStatus, ClientError>;

    /// `GET /menu`.
    async fn menu(&self) -> Result<MenuResponse, ClientError>;

    /// `POST /order`.
    async fn create_order(&self, request: &CreateOrderRequest)
    -> Result<OrderResponse, ClientError>;

    /// `GET /order/{id}`.
    async fn order_status(&self, order_id: &str) -> Result<OrderStatus, ClientError>;

    /// `POST /order/{id}/verify`.
    async fn verify_payment(
        &self,
        order_id: &str,
        tx_hash: &TxHash,
    ) -> Result<VerifyResponse, ClientError>;
}

#[async_trait]
impl AgentApi for AgentClient {
    async fn status(&self) -> Result<AgentStatus, ClientError> {
        self.get_status().await
    }

    async fn menu(&self) -> Result<MenuResponse, ClientError> {
        self.get_menu().await
    }

    async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<OrderResponse, ClientError> {
        AgentClient::create_order(self, request).await
    }

    async fn order_status(&self, order_id: &str) -> Result<OrderStatus, ClientError> {
        Ok(self.get_order(order_id).await?.status)
    }

    async fn verify_payment(
        &self,
        order_id: &str,
        tx_hash: &TxHash,
    ) -> Result<VerifyResponse, ClientError> {
        self.verify_order(order_id, tx_hash.as_str()).await
    }
}
