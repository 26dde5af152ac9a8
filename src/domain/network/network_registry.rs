//! Compiled-in deployments and chain definitions

use alloy_primitives::{address, Address};
use crate::shared::types::{TransportConfig, SEPOLIA_CHAIN_ID};

/// Lisk Sepolia testnet
pub const LISK_SEPOLIA_CHAIN_ID: u64 = 4202;

/// Ethereum mainnet
pub const MAINNET_CHAIN_ID: u64 = 1;

/// Contract addresses of the price feature on one network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkAddressSet {
    pub network_id: u64,
    pub price_oracle: Address,
    pub integration: Address,
}

/// Chain definition used to build the transport
#[derive(Debug, Clone, PartialEq)]
pub struct ChainInfo {
    pub id: u64,
    pub name: &'static str,
    pub rpc_url: &'static str,
    pub explorer_url: &'static str,
    pub native_symbol: &'static str,
    pub testnet: bool,
    pub retry_count: u32,
    pub retry_delay_ms: u64,
}

impl ChainInfo {
    /// Default transport settings for this chain
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            batch: true,
            retry_count: self.retry_count,
            retry_delay_ms: self.retry_delay_ms,
            ..TransportConfig::default()
        }
    }
}

const PRICE_DEPLOYMENTS: &[NetworkAddressSet] = &[NetworkAddressSet {
    network_id: SEPOLIA_CHAIN_ID,
    price_oracle: address!("4B001ec1F48dAE2883Fa2Dba87bE7ADc66F1B3f7"),
    integration: address!("BeC8dD4CA8b227c04BCD23EB4Bcf3bCE4E5BF795"),
}];

const CHAT_REGISTRY_DEPLOYMENTS: &[(u64, Address)] = &[
    (SEPOLIA_CHAIN_ID, address!("6C74B43b04C17322c5DfCE754b1d321EF7DF1a2c")),
    (LISK_SEPOLIA_CHAIN_ID, address!("6C74B43b04C17322c5DfCE754b1d321EF7DF1a2c")),
    // not deployed yet
    (MAINNET_CHAIN_ID, Address::ZERO),
];

const CHAINS: &[ChainInfo] = &[
    ChainInfo {
        id: SEPOLIA_CHAIN_ID,
        name: "Ethereum Sepolia",
        rpc_url: "https://sepolia.drpc.org",
        explorer_url: "https://sepolia.etherscan.io",
        native_symbol: "ETH",
        testnet: true,
        retry_count: 3,
        retry_delay_ms: 150,
    },
    ChainInfo {
        id: LISK_SEPOLIA_CHAIN_ID,
        name: "Lisk Sepolia Testnet",
        rpc_url: "https://rpc.sepolia-api.lisk.com",
        explorer_url: "https://sepolia-blockscout.lisk.com",
        native_symbol: "ETH",
        testnet: true,
        retry_count: 3,
        retry_delay_ms: 1000,
    },
];

/// Static lookup of deployments per network
pub struct NetworkRegistry;

impl NetworkRegistry {
    /// Price oracle and integration addresses, or `None` when the price
    /// feature is not deployed on `network_id`
    pub fn resolve_addresses(network_id: u64) -> Option<NetworkAddressSet> {
        PRICE_DEPLOYMENTS
            .iter()
            .find(|set| set.network_id == network_id)
            .copied()
    }

    pub fn is_price_feature_available(network_id: u64) -> bool {
        Self::resolve_addresses(network_id).is_some()
    }

    pub fn chain(network_id: u64) -> Option<&'static ChainInfo> {
        CHAINS.iter().find(|chain| chain.id == network_id)
    }

    pub fn supported_chains() -> &'static [ChainInfo] {
        CHAINS
    }

    /// Chat registry address; unknown networks fall back to the Sepolia deployment
    pub fn chat_registry_address(network_id: u64) -> Address {
        CHAT_REGISTRY_DEPLOYMENTS
            .iter()
            .find(|(id, _)| *id == network_id)
            .or_else(|| CHAT_REGISTRY_DEPLOYMENTS.iter().find(|(id, _)| *id == SEPOLIA_CHAIN_ID))
            .map(|(_, address)| *address)
            .unwrap_or(Address::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sepolia_resolves() {
        let set = NetworkRegistry::resolve_addresses(SEPOLIA_CHAIN_ID).unwrap();
        assert_eq!(set.network_id, SEPOLIA_CHAIN_ID);
        assert_ne!(set.price_oracle, Address::ZERO);
        assert_ne!(set.integration, Address::ZERO);
    }

    #[test]
    fn test_other_networks_unavailable() {
        for id in [0, MAINNET_CHAIN_ID, LISK_SEPOLIA_CHAIN_ID, 137, u64::MAX] {
            assert_eq!(NetworkRegistry::resolve_addresses(id), None);
            assert_eq!(NetworkRegistry::resolve_addresses(id), None);
        }
    }

    #[test]
    fn test_chat_registry_fallback() {
        let sepolia = NetworkRegistry::chat_registry_address(SEPOLIA_CHAIN_ID);
        assert_eq!(NetworkRegistry::chat_registry_address(LISK_SEPOLIA_CHAIN_ID), sepolia);
        assert_eq!(NetworkRegistry::chat_registry_address(MAINNET_CHAIN_ID), Address::ZERO);
        assert_eq!(NetworkRegistry::chat_registry_address(31337), sepolia);
    }

    #[test]
    fn test_chain_transport_defaults() {
        let lisk = NetworkRegistry::chain(LISK_SEPOLIA_CHAIN_ID).unwrap();
        let transport = lisk.transport();
        assert!(transport.batch);
        assert_eq!(transport.retry_count, 3);
        assert_eq!(transport.retry_delay_ms, 1000);
        assert!(NetworkRegistry::chain(MAINNET_CHAIN_ID).is_none());
    }
}
