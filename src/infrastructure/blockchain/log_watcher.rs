//! Polling event subscriptions over `eth_getLogs`

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};
use crate::shared::errors::CallError;
use crate::shared::utils::generate_id;
use super::traits::{EventSource, LogFilter, LogProvider, RawLog, Subscription};

/// Buffered batches per subscription before the poller waits for the consumer
const SUBSCRIPTION_BUFFER: usize = 64;

/// Widest block range requested in one `eth_getLogs` call
pub const DEFAULT_MAX_BLOCK_RANGE: u64 = 1_000;

/// Event source that polls for new logs every `poll_interval`.
///
/// Each subscription starts at the chain head and advances a block cursor, so
/// a log is delivered at most once.
#[derive(Clone)]
pub struct LogWatcher {
    provider: Arc<dyn LogProvider>,
    poll_interval: Duration,
    max_block_range: u64,
}

impl LogWatcher {
    pub fn new(provider: Arc<dyn LogProvider>, poll_interval: Duration) -> Self {
        Self {
            provider,
            poll_interval,
            max_block_range: DEFAULT_MAX_BLOCK_RANGE,
        }
    }

    pub fn with_max_block_range(mut self, max_block_range: u64) -> Self {
        self.max_block_range = max_block_range.max(1);
        self
    }

    async fn poll_loop(mut cursor: LogCursor, poll_interval: Duration, sender: mpsc::Sender<Vec<RawLog>>) {
        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            match cursor.poll_once().await {
                Ok(logs) if logs.is_empty() => {}
                Ok(logs) => {
                    debug!(
                        "Delivering {} logs from {:?} up to block {}",
                        logs.len(),
                        cursor.filter.address,
                        cursor.last_block
                    );
                    if sender.send(logs).await.is_err() {
                        // subscriber gone
                        break;
                    }
                }
                Err(e) => warn!("Failed to poll logs for {:?}: {}", cursor.filter.address, e),
            }
        }
    }
}

/// Block cursor of one subscription
struct LogCursor {
    provider: Arc<dyn LogProvider>,
    filter: LogFilter,
    max_block_range: u64,
    /// Last block whose logs were delivered
    last_block: u64,
}

impl LogCursor {
    /// Fetch the next range after the cursor, at most `max_block_range` blocks.
    ///
    /// The cursor moves only when the range was fetched, so a failed poll
    /// retries the same blocks. Logs come back in `(block, index)` order.
    async fn poll_once(&mut self) -> Result<Vec<RawLog>, CallError> {
        let head = self.provider.block_number().await?;
        if head <= self.last_block {
            return Ok(Vec::new());
        }

        let from = self.last_block + 1;
        let to = head.min(self.last_block.saturating_add(self.max_block_range));
        let mut logs = self.provider.get_logs(&self.filter, from, to).await?;
        logs.sort_by_key(|log| (log.block_number, log.log_index));
        self.fill_block_timestamps(&mut logs).await;

        self.last_block = to;
        Ok(logs)
    }

    /// Look up the block time of logs the node returned without one, once per block
    async fn fill_block_timestamps(&self, logs: &mut [RawLog]) {
        let mut known: HashMap<u64, Option<u64>> = HashMap::new();
        for log in logs.iter_mut().filter(|log| log.block_timestamp.is_none()) {
            let Some(number) = log.block_number else {
                continue;
            };
            let timestamp = match known.get(&number) {
                Some(timestamp) => *timestamp,
                None => {
                    let timestamp = match self.provider.block_timestamp(number).await {
                        Ok(timestamp) => Some(timestamp),
                        Err(e) => {
                            warn!("Failed to read timestamp of block {}: {}", number, e);
                            None
                        }
                    };
                    known.insert(number, timestamp);
                    timestamp
                }
            };
            log.block_timestamp = timestamp;
        }
    }
}

#[async_trait]
impl EventSource for LogWatcher {
    async fn subscribe(&self, filter: LogFilter) -> Result<Subscription, CallError> {
        let start = self.provider.block_number().await?;
        let (sender, receiver) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let id = generate_id();

        info!(
            "Watching {:?} for {:?} from block {} (subscription {})",
            filter.address, filter.event_signature, start, id
        );

        let cursor = LogCursor {
            provider: self.provider.clone(),
            filter,
            max_block_range: self.max_block_range,
            last_block: start,
        };
        let producer = tokio::spawn(Self::poll_loop(cursor, self.poll_interval, sender));

        Ok(Subscription::new(id, receiver, Some(producer)))
    }
}
