//! Price presentation helpers

use crate::shared::utils::format_percentage_change;
use super::{PriceRecord, TradingPair};

/// Turns price records into short display strings
pub struct PriceAnalyzer;

impl PriceAnalyzer {
    /// Display price: ETH-quoted pairs as `0.0283 ETH`, others as `$97.5K` / `$12.34`
    pub fn display_price(record: &PriceRecord) -> String {
        let value: f64 = record.formatted_price().parse().unwrap_or(0.0);
        if Self::is_eth_quoted(record.pair()) {
            format!("{:.4} ETH", value)
        } else {
            Self::compact_usd(value)
        }
    }

    pub fn compact_usd(value: f64) -> String {
        if value > 1000.0 {
            format!("${:.1}K", value / 1000.0)
        } else {
            format!("${:.2}", value)
        }
    }

    pub fn is_eth_quoted(pair: TradingPair) -> bool {
        pair.quote() == "ETH"
    }

    pub fn display_change(record: &PriceRecord) -> String {
        format_percentage_change(record.percentage_change())
    }

    pub fn is_gain(record: &PriceRecord) -> bool {
        record.percentage_change_bps() >= 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::I256;

    fn record(pair: TradingPair, raw: i64, bps: i64) -> PriceRecord {
        PriceRecord::new(pair, I256::try_from(raw).unwrap(), 0, 8, bps)
    }

    #[test]
    fn test_usd_prices_are_compacted() {
        assert_eq!(PriceAnalyzer::display_price(&record(TradingPair::BtcUsd, 9_750_012_000_000, 0)), "$97.5K");
        assert_eq!(PriceAnalyzer::display_price(&record(TradingPair::EthUsd, 99_950_000_000, 0)), "$999.50");
    }

    #[test]
    fn test_eth_quoted_prices() {
        assert_eq!(PriceAnalyzer::display_price(&record(TradingPair::BtcEth, 2_826_000_000, 0)), "28.2600 ETH");
        assert_eq!(PriceAnalyzer::display_price(&record(TradingPair::BnbEth, 17_500_000, 0)), "0.1750 ETH");
    }

    #[test]
    fn test_display_change() {
        let up = record(TradingPair::BtcUsd, 1, 250);
        let down = record(TradingPair::BtcUsd, 1, -75);
        assert_eq!(PriceAnalyzer::display_change(&up), "+2.50%");
        assert_eq!(PriceAnalyzer::display_change(&down), "-0.75%");
        assert!(PriceAnalyzer::is_gain(&up));
        assert!(!PriceAnalyzer::is_gain(&down));
    }
}
