//! `GET /status` types.

use serde::{Deserialize, Serialize};

/// Response of `GET /status`.
///
/// This is the only authoritative source of the vault address. The field is
/// optional on the wire so that an agent that omits it still deserialises;
/// payment verification then fails closed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentStatus {
    #[serde(default)]
    pub vault_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_payment_chain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployed_chains: Option<Vec<String>>,
    /// Everything else the agent reports (balance, debt, mood, …).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
