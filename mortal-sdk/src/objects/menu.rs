//! `GET /menu` types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A purchasable service offered by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub price_usd: Decimal,
    pub delivery_time_minutes: u32,
    #[serde(default)]
    pub shareable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A chain the agent accepts payment on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainInfo {
    /// Chain identifier used in order requests (e.g. `"base"`).
    pub id: String,
    pub name: String,
    /// Symbol of the payment token (e.g. `"USDC"`).
    pub token: String,
    /// Decimal precision of the payment token.
    pub decimals: u8,
    /// ERC-20 contract of the payment token, when the backend publishes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_address: Option<String>,
}

/// Response of `GET /menu`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuResponse {
    pub services: Vec<Service>,
    #[serde(default)]
    pub supported_chains: Vec<ChainInfo>,
    pub default_chain: String,
}

impl MenuResponse {
    pub fn service(&self, id: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.id == id)
    }

    pub fn chain(&self, id: &str) -> Option<&ChainInfo> {
        self.supported_chains.iter().find(|c| c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_parsing() {
        let json = r#"{
            "services": [
                {"id": "tarot", "name": "Tarot Reading", "price_usd": 5.0,
                 "delivery_time_minutes": 2, "shareable": true}
            ],
            "supported_chains": [
                {"id": "base", "name": "Base", "token": "USDC", "decimals": 6}
            ],
            "default_chain": "base"
        }"#;
        let menu: MenuResponse = serde_json::from_str(json).unwrap();
        let service = menu.service("tarot").unwrap();
        assert_eq!(service.price_usd, Decimal::new(5, 0));
        assert!(service.shareable);
        assert_eq!(service.description, None);
        assert_eq!(menu.chain("base").unwrap().decimals, 6);
        assert!(menu.chain("eth").is_none());
    }
}
