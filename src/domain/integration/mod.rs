//! Integration domain - price-chat automation status and alerts

mod alert_monitor;
mod status_reader;

pub use alert_monitor::{AlertListener, ALERT_HISTORY};
pub use status_reader::IntegrationStatusReader;

use alloy_primitives::{I256, U256};
use crate::domain::price::TradingPair;
use crate::shared::utils::bps_to_percentage;

/// Result of `getIntegrationStatus`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegrationStatus {
    pub alerts_enabled: bool,
    pub summaries_enabled: bool,
    pub bot_registered: bool,
    pub min_interval_seconds: u64,
    pub last_summary_seconds: u64,
}

impl IntegrationStatus {
    /// Alerts are actually posted only with a registered bot
    pub fn automation_active(&self) -> bool {
        self.alerts_enabled && self.bot_registered
    }
}

/// `PriceAlertPosted` event, after validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertEvent {
    pub pair: TradingPair,
    pub price_change_bps: i64,
    pub new_price: I256,
    pub message_id: Option<U256>,
    pub timestamp: u64,
}

impl AlertEvent {
    pub fn price_change(&self) -> f64 {
        bps_to_percentage(self.price_change_bps)
    }
}

/// Decoded `PriceAlertPosted` log; any field may be missing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertNotification {
    pub pair: Option<TradingPair>,
    pub price_change_bps: Option<i64>,
    pub new_price: Option<I256>,
    pub message_id: Option<U256>,
    pub timestamp: Option<u64>,
}
