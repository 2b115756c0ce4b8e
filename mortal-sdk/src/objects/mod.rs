//! Request and response types of the agent backend.

pub mod menu;
pub mod order;
pub mod status;

pub use menu::{ChainInfo, MenuResponse, Service};
pub use order::{
    CreateOrderRequest, OrderResponse, OrderStatus, OrderStatusResponse, VerifyRequest,
    VerifyResponse,
};
pub use status::AgentStatus;
