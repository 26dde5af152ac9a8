//! Rolling history of automation price alerts

use tracing::debug;
use crate::shared::history::RollingHistory;
use super::{AlertEvent, AlertNotification};

/// How many alerts are retained
pub const ALERT_HISTORY: usize = 20;

#[derive(Debug, Clone)]
pub struct AlertListener {
    history: RollingHistory<AlertEvent>,
    dropped: u64,
}

impl Default for AlertListener {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertListener {
    pub fn new() -> Self {
        Self {
            history: RollingHistory::new(ALERT_HISTORY),
            dropped: 0,
        }
    }

    /// Apply one delivered batch; every field except the message id is required
    pub fn apply_batch(&mut self, notifications: &[AlertNotification]) -> usize {
        let mut applied = 0;
        for notification in notifications {
            let event = match (
                notification.pair,
                notification.price_change_bps,
                notification.new_price,
                notification.timestamp,
            ) {
                (Some(pair), Some(price_change_bps), Some(new_price), Some(timestamp)) => AlertEvent {
                    pair,
                    price_change_bps,
                    new_price,
                    message_id: notification.message_id,
                    timestamp,
                },
                _ => {
                    self.dropped += 1;
                    debug!("Dropping malformed price alert: {:?}", notification);
                    continue;
                }
            };
            self.history.push_front(event);
            applied += 1;
        }
        applied
    }

    pub fn history(&self) -> &RollingHistory<AlertEvent> {
        &self.history
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}
