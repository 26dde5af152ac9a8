//! Live `PriceUpdated` event tracking

use std::collections::HashMap;
use tracing::debug;
use crate::shared::history::RollingHistory;
use crate::shared::utils::format_signed_units;
use super::{PriceRecord, PriceUpdateEvent, PriceUpdateNotification, TradingPair};

/// How many price updates are retained
pub const PRICE_UPDATE_HISTORY: usize = 10;

/// Decimals assumed for event prices; the listener does not re-query the feed
pub const PRICE_UPDATE_DECIMALS: u8 = 8;

/// Rolling history of the latest oracle price updates
#[derive(Debug, Clone)]
pub struct PriceUpdateListener {
    history: RollingHistory<PriceUpdateEvent>,
    dropped: u64,
}

impl Default for PriceUpdateListener {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceUpdateListener {
    pub fn new() -> Self {
        Self {
            history: RollingHistory::new(PRICE_UPDATE_HISTORY),
            dropped: 0,
        }
    }

    /// Apply one delivered batch in order.
    ///
    /// Notifications without a pair, new price or timestamp are dropped.
    /// Returns how many events were recorded.
    pub fn apply_batch(&mut self, notifications: &[PriceUpdateNotification]) -> usize {
        let mut applied = 0;
        for notification in notifications {
            match Self::to_event(notification) {
                Some(event) => {
                    debug!("Price update {} -> {}", event.pair, event.formatted_price);
                    self.history.push_front(event);
                    applied += 1;
                }
                None => {
                    self.dropped += 1;
                    debug!("Dropping malformed price update: {:?}", notification);
                }
            }
        }
        applied
    }

    fn to_event(notification: &PriceUpdateNotification) -> Option<PriceUpdateEvent> {
        let pair = notification.pair?;
        let price = notification.new_price?;
        let timestamp = notification.timestamp?;

        Some(PriceUpdateEvent {
            pair,
            price,
            timestamp,
            percentage_change_bps: notification.percentage_change_bps.unwrap_or_default(),
            formatted_price: format_signed_units(price, PRICE_UPDATE_DECIMALS),
        })
    }

    /// Newest-first history
    pub fn history(&self) -> &RollingHistory<PriceUpdateEvent> {
        &self.history
    }

    /// Malformed notifications seen so far
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}

/// Latest known record per pair, in display order.
///
/// An update replaces the aggregator's record when it is strictly newer.
/// Pairs the aggregator omitted still appear if an update exists for them.
pub fn merge_latest(records: &[PriceRecord], updates: &RollingHistory<PriceUpdateEvent>) -> Vec<PriceRecord> {
    let mut newest_update: HashMap<TradingPair, &PriceUpdateEvent> = HashMap::new();
    for update in updates.iter() {
        // history is newest-first
        newest_update.entry(update.pair).or_insert(update);
    }

    TradingPair::ALL
        .into_iter()
        .filter_map(|pair| {
            let record = records.iter().find(|record| record.pair() == pair);
            match (record, newest_update.get(&pair)) {
                (Some(record), Some(update)) if update.timestamp > record.timestamp_seconds() => {
                    Some(update.to_record())
                }
                (Some(record), _) => Some(record.clone()),
                (None, Some(update)) => Some(update.to_record()),
                (None, None) => None,
            }
        })
        .collect()
}
