//! Price domain - oracle reads, live updates and display formatting

mod price_aggregator;
mod price_analyzer;
mod price_monitor;

pub use price_aggregator::{AggregatorStats, PriceAggregator};
pub use price_analyzer::PriceAnalyzer;
pub use price_monitor::{merge_latest, PriceUpdateListener, PRICE_UPDATE_DECIMALS, PRICE_UPDATE_HISTORY};

use alloy_primitives::{keccak256, B256, I256};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use crate::shared::errors::PriceError;
use crate::shared::utils::{bps_to_percentage, format_signed_units};

/// Trading pairs published by the oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TradingPair {
    #[serde(rename = "BTC/USD")]
    BtcUsd,
    #[serde(rename = "ETH/USD")]
    EthUsd,
    #[serde(rename = "BTC/ETH")]
    BtcEth,
    #[serde(rename = "BNB/ETH")]
    BnbEth,
}

impl TradingPair {
    /// Supported pairs in display order
    pub const ALL: [TradingPair; 4] = [
        TradingPair::BtcUsd,
        TradingPair::EthUsd,
        TradingPair::BtcEth,
        TradingPair::BnbEth,
    ];

    /// Pair name as the oracle contract knows it
    pub fn as_str(&self) -> &'static str {
        match self {
            TradingPair::BtcUsd => "BTC/USD",
            TradingPair::EthUsd => "ETH/USD",
            TradingPair::BtcEth => "BTC/ETH",
            TradingPair::BnbEth => "BNB/ETH",
        }
    }

    pub fn base(&self) -> &'static str {
        self.as_str().split('/').next().unwrap_or_default()
    }

    pub fn quote(&self) -> &'static str {
        self.as_str().split('/').nth(1).unwrap_or_default()
    }

    pub fn icon(&self) -> &'static str {
        match self {
            TradingPair::BtcUsd => "₿",
            TradingPair::EthUsd => "Ξ",
            TradingPair::BtcEth => "₿/Ξ",
            TradingPair::BnbEth => "🟡",
        }
    }

    /// Indexed `string` event arguments arrive as their keccak256 hash
    pub fn topic(&self) -> B256 {
        keccak256(self.as_str().as_bytes())
    }

    pub fn from_topic(topic: &B256) -> Option<Self> {
        Self::ALL.into_iter().find(|pair| pair.topic() == *topic)
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradingPair {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|pair| pair.as_str() == normalized)
            .ok_or_else(|| PriceError::UnknownPair(s.to_string()))
    }
}

/// One pair's price as read from the oracle or delivered by an event.
///
/// `formatted_price` is always derived from `raw_price` and `decimals`, so the
/// fields are read-only; a newer record replaces this one instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceRecord {
    pair: TradingPair,
    raw_price: I256,
    timestamp_seconds: u64,
    decimals: u8,
    percentage_change_bps: i64,
    formatted_price: String,
    oracle_formatted: Option<String>,
}

impl PriceRecord {
    pub fn new(
        pair: TradingPair,
        raw_price: I256,
        timestamp_seconds: u64,
        decimals: u8,
        percentage_change_bps: i64,
    ) -> Self {
        Self {
            pair,
            raw_price,
            timestamp_seconds,
            decimals,
            percentage_change_bps,
            formatted_price: format_signed_units(raw_price, decimals),
            oracle_formatted: None,
        }
    }

    /// Attach the oracle's own `getFormattedPrice` rendering
    pub fn with_oracle_formatted(mut self, formatted: String) -> Self {
        self.oracle_formatted = Some(formatted);
        self
    }

    pub fn pair(&self) -> TradingPair {
        self.pair
    }

    pub fn raw_price(&self) -> I256 {
        self.raw_price
    }

    pub fn timestamp_seconds(&self) -> u64 {
        self.timestamp_seconds
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn percentage_change_bps(&self) -> i64 {
        self.percentage_change_bps
    }

    /// Percentage change with two implied decimals (250 bps -> 2.5)
    pub fn percentage_change(&self) -> f64 {
        bps_to_percentage(self.percentage_change_bps)
    }

    pub fn formatted_price(&self) -> &str {
        &self.formatted_price
    }

    pub fn oracle_formatted(&self) -> Option<&str> {
        self.oracle_formatted.as_deref()
    }
}

/// Result of `getAllPrices`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllPricesSnapshot {
    pub btc_usd: I256,
    pub eth_usd: I256,
    pub btc_eth: I256,
    pub bnb_eth: I256,
    pub last_update_seconds: u64,
}

impl AllPricesSnapshot {
    pub fn price_of(&self, pair: TradingPair) -> I256 {
        match pair {
            TradingPair::BtcUsd => self.btc_usd,
            TradingPair::EthUsd => self.eth_usd,
            TradingPair::BtcEth => self.btc_eth,
            TradingPair::BnbEth => self.bnb_eth,
        }
    }
}

/// Aggregator output: snapshot, per-pair records and the pending flag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceBoard {
    pub snapshot: Option<AllPricesSnapshot>,
    pub prices: Vec<PriceRecord>,
    pub loading: bool,
}

impl PriceBoard {
    /// Board for a network without an oracle deployment
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn get(&self, pair: TradingPair) -> Option<&PriceRecord> {
        self.prices.iter().find(|record| record.pair() == pair)
    }
}

/// `PriceUpdated` event, after validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceUpdateEvent {
    pub pair: TradingPair,
    pub price: I256,
    pub timestamp: u64,
    pub percentage_change_bps: i64,
    pub formatted_price: String,
}

impl PriceUpdateEvent {
    pub fn percentage_change(&self) -> f64 {
        bps_to_percentage(self.percentage_change_bps)
    }

    pub fn to_record(&self) -> PriceRecord {
        PriceRecord::new(
            self.pair,
            self.price,
            self.timestamp,
            PRICE_UPDATE_DECIMALS,
            self.percentage_change_bps,
        )
    }
}

/// Decoded `PriceUpdated` log; any field may be missing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceUpdateNotification {
    pub pair: Option<TradingPair>,
    pub new_price: Option<I256>,
    pub percentage_change_bps: Option<i64>,
    pub timestamp: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_names_and_parts() {
        assert_eq!(TradingPair::BnbEth.to_string(), "BNB/ETH");
        assert_eq!(TradingPair::BtcEth.base(), "BTC");
        assert_eq!(TradingPair::BtcEth.quote(), "ETH");
        assert_eq!("eth/usd".parse::<TradingPair>().unwrap(), TradingPair::EthUsd);
        assert!("DOGE/USD".parse::<TradingPair>().is_err());
    }

    #[test]
    fn test_pair_from_topic() {
        for pair in TradingPair::ALL {
            assert_eq!(TradingPair::from_topic(&pair.topic()), Some(pair));
        }
        assert_eq!(TradingPair::from_topic(&B256::ZERO), None);
    }

    #[test]
    fn test_record_formats_from_raw_price() {
        let record = PriceRecord::new(
            TradingPair::BtcUsd,
            I256::try_from(9_750_012_000_000i64).unwrap(),
            1_700_000_000,
            8,
            250,
        );
        assert_eq!(record.formatted_price(), "97500.12");
        assert_eq!(record.percentage_change(), 2.5);
        assert_eq!(record.oracle_formatted(), None);
    }
}
