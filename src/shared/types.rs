//! Common types used across the application

use serde::{Deserialize, Serialize};

/// Ethereum Sepolia, the only network with a price oracle deployment
pub const SEPOLIA_CHAIN_ID: u64 = 11155111;

/// Network selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub chain_id: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            chain_id: SEPOLIA_CHAIN_ID,
        }
    }
}

/// JSON-RPC transport behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Send multi-call reads as one JSON-RPC batch request
    pub batch: bool,
    pub retry_count: u32,
    /// Base delay; attempt `n` waits `retry_delay_ms * 2^n`
    pub retry_delay_ms: u64,
    pub timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            batch: true,
            retry_count: 3,
            retry_delay_ms: 150,
            timeout_ms: 10_000,
        }
    }
}

/// Event watching cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub poll_interval_ms: u64,
    /// How often `watch` re-reads prices and status; 0 disables refreshing
    pub refresh_interval_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 4_000,
            refresh_interval_ms: 30_000,
        }
    }
}

/// RPC URL override for one chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcEndpoint {
    pub chain_id: u64,
    pub url: String,
}

/// Client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub network: NetworkConfig,
    /// Transport settings; chain defaults apply when absent
    pub transport: Option<TransportConfig>,
    pub watch: WatchConfig,
    pub rpc_endpoints: Vec<RpcEndpoint>,
}

impl ClientConfig {
    /// RPC URL override configured for `chain_id`, if any
    pub fn rpc_url_for(&self, chain_id: u64) -> Option<&str> {
        self.rpc_endpoints
            .iter()
            .find(|endpoint| endpoint.chain_id == chain_id)
            .map(|endpoint| endpoint.url.as_str())
    }
}
