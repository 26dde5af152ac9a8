//! Network domain - supported chains and contract deployments

mod network_registry;

pub use network_registry::{
    ChainInfo, NetworkAddressSet, NetworkRegistry, LISK_SEPOLIA_CHAIN_ID, MAINNET_CHAIN_ID,
};
