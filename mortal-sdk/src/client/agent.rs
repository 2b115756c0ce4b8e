//! Agent API client (front end → agent backend).
//!
//! The agent API is unauthenticated; orders are identified by the opaque
//! `order_id` the backend hands out on creation.

use std::time::Duration;

use reqwest::Client;
use url::Url;

use super::{ClientError, parse_response};
use crate::objects::{
    AgentStatus, CreateOrderRequest, MenuResponse, OrderResponse, OrderStatusResponse,
    VerifyRequest, VerifyResponse,
};

/// Default per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Typed HTTP client for the agent backend.
///
/// Endpoint paths are joined relative to `base_url`, so an agent mounted
/// under a prefix (`https://host/agent/api/`) works the same as one at the
/// root.
#[derive(Debug, Clone)]
pub struct AgentClient {
    http: Client,
    base_url: Url,
}

impl AgentClient {
    /// Create a new `AgentClient`.
    ///
    /// A trailing `/` is appended to `base_url` when missing so that
    /// relative joins keep the last path segment.
    pub fn new(mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            http: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET /status` – agent status, including the authoritative vault
    /// address.
    pub async fn get_status(&self) -> Result<AgentStatus, ClientError> {
        let url = self.base_url.join("status")?;
        let resp = self.http.get(url).send().await?;
        parse_response(resp).await
    }

    /// `GET /menu` – service catalog and supported chains.
    pub async fn get_menu(&self) -> Result<MenuResponse, ClientError> {
        let url = self.base_url.join("menu")?;
        let resp = self.http.get(url).send().await?;
        parse_response(resp).await
    }

    /// `POST /order` – create a new order awaiting payment.
    pub async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<OrderResponse, ClientError> {
        let url = self.base_url.join("order")?;
        let resp = self.http.post(url).json(request).send().await?;
        parse_response(resp).await
    }

    /// `GET /order/{order_id}` – poll the order status.
    pub async fn get_order(&self, order_id: &str) -> Result<OrderStatusResponse, ClientError> {
        let url = self.order_url(order_id, None)?;
        let resp = self.http.get(url).send().await?;
        parse_response(resp).await
    }

    /// `POST /order/{order_id}/verify` – hand a transaction hash to the
    /// backend for on-chain verification.
    pub async fn verify_order(
        &self,
        order_id: &str,
        tx_hash: &str,
    ) -> Result<VerifyResponse, ClientError> {
        let url = self.order_url(order_id, Some("verify"))?;
        let body = VerifyRequest {
            tx_hash: tx_hash.to_owned(),
        };
        let resp = self.http.post(url).json(&body).send().await?;
        parse_response(resp).await
    }

    fn order_url(&self, order_id: &str, action: Option<&str>) -> Result<Url, ClientError> {
        let mut url = self.base_url.join("order/")?;
        // Pushing segments percent-encodes the id instead of letting it
        // rewrite the path.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(order_id);
            if let Some(action) = action {
                segments.push(action);
            }
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let client = AgentClient::new(Url::parse("https://agent.example.com/api").unwrap());
        assert_eq!(client.base_url().as_str(), "https://agent.example.com/api/");
    }

    #[test]
    fn test_order_urls_stay_under_prefix() {
        let client = AgentClient::new(Url::parse("https://agent.example.com/api/").unwrap());
        let url = client.order_url("ord_42", Some("verify")).unwrap();
        assert_eq!(url.as_str(), "https://agent.example.com/api/order/ord_42/verify");
        let url = client.order_url("a/b", None).unwrap();
        assert_eq!(url.as_str(), "https://agent.example.com/api/order/a%2Fb");
    }
}
