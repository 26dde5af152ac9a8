use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use crate::shared::errors::CallError;

/// Outcome of one call inside a batch
pub type CallOutcome = Result<Bytes, CallError>;

/// A read-only contract call (`eth_call`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContractCall {
    pub address: Address,
    pub data: Bytes,
}

impl ContractCall {
    pub fn new(address: Address, data: impl Into<Bytes>) -> Self {
        Self {
            address,
            data: data.into(),
        }
    }
}

/// Batchable contract read interface
#[async_trait]
pub trait ContractReader: Send + Sync {
    /// Execute all calls as one logical request.
    ///
    /// The outer error means the whole batch failed; otherwise one outcome is
    /// returned per call, in request order.
    async fn call_batch(&self, calls: Vec<ContractCall>) -> Result<Vec<CallOutcome>, CallError>;

    /// Execute a single call
    async fn call(&self, call: ContractCall) -> CallOutcome {
        let mut outcomes = self.call_batch(vec![call]).await?;
        outcomes.pop().unwrap_or(Err(CallError::MissingResult(0)))
    }
}

/// A log emitted by a contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: Option<u64>,
    pub log_index: Option<u64>,
    /// Block timestamp in seconds, when the node reports it
    pub block_timestamp: Option<u64>,
}

/// Which logs a subscription delivers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub address: Address,
    pub event_signature: B256,
}

/// Live subscription handle.
///
/// Batches are delivered in emission order. Dropping the handle (or calling
/// [`Subscription::unsubscribe`]) stops delivery.
pub struct Subscription {
    id: String,
    batches: mpsc::Receiver<Vec<RawLog>>,
    producer: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(id: String, batches: mpsc::Receiver<Vec<RawLog>>, producer: Option<JoinHandle<()>>) -> Self {
        Self { id, batches, producer }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the next batch; `None` once the source has closed
    pub async fn next_batch(&mut self) -> Option<Vec<RawLog>> {
        self.batches.recv().await
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.batches.close();
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Chain queries a polling log subscription is built on
#[async_trait]
pub trait LogProvider: Send + Sync {
    /// Latest block number
    async fn block_number(&self) -> Result<u64, CallError>;

    /// Logs matching `filter` in `from_block..=to_block`, in any order
    async fn get_logs(&self, filter: &LogFilter, from_block: u64, to_block: u64) -> Result<Vec<RawLog>, CallError>;

    /// Timestamp in seconds of block `number`
    async fn block_timestamp(&self, number: u64) -> Result<u64, CallError>;
}

/// Contract event subscription interface
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn subscribe(&self, filter: LogFilter) -> Result<Subscription, CallError>;
}
