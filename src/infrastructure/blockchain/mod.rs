//! EVM contract access: ABI bindings, JSON-RPC transport and log subscriptions

pub mod abi;
pub mod log_watcher;
pub mod rpc_client;
pub mod traits;

#[cfg(test)]
pub mod mock;

pub use log_watcher::LogWatcher;
pub use rpc_client::EvmRpcClient;
pub use traits::{
    CallOutcome, ContractCall, ContractReader, EventSource, LogFilter, LogProvider, RawLog, Subscription,
};
