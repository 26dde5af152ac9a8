//! Contract bindings for the Chainlink price oracle and the price-chat integration

use alloy_primitives::{Address, U256};
use alloy_sol_types::{sol, SolCall, SolEvent};
use tracing::debug;
use crate::domain::integration::AlertNotification;
use crate::domain::price::{PriceUpdateNotification, TradingPair};
use crate::shared::errors::CallError;
use super::traits::{ContractCall, RawLog};

sol! {
    interface IChainlinkPriceOracle {
        function getLatestPrice(string pairName) external view returns (int256 price, uint256 timestamp, uint8 decimals);
        function getAllPrices() external view returns (int256 btcUsd, int256 ethUsd, int256 btcEth, int256 bnbEth, uint256 lastUpdate);
        function getPriceChangePercentage(string pairName) external view returns (int256 percentageChange);
        function getFormattedPrice(string pairName) external view returns (string formattedPrice);

        event PriceUpdated(string indexed pairName, int256 oldPrice, int256 newPrice, int256 percentageChange, uint256 timestamp);
    }

    interface IPriceChatIntegration {
        function getIntegrationStatus() external view returns (bool alerts, bool summaries, bool botRegistered, uint256 minInterval, uint256 lastSummary);

        event PriceAlertPosted(string indexed pairName, int256 priceChange, int256 newPrice, uint256 messageId);
    }
}

pub use IChainlinkPriceOracle::{
    getAllPricesCall, getFormattedPriceCall, getLatestPriceCall, getPriceChangePercentageCall,
    PriceUpdated,
};
pub use IPriceChatIntegration::{getIntegrationStatusCall, PriceAlertPosted};

pub fn latest_price_call(oracle: Address, pair: TradingPair) -> ContractCall {
    let call = getLatestPriceCall { pairName: pair.as_str().to_string() };
    ContractCall::new(oracle, call.abi_encode())
}

pub fn price_change_call(oracle: Address, pair: TradingPair) -> ContractCall {
    let call = getPriceChangePercentageCall { pairName: pair.as_str().to_string() };
    ContractCall::new(oracle, call.abi_encode())
}

pub fn formatted_price_call(oracle: Address, pair: TradingPair) -> ContractCall {
    let call = getFormattedPriceCall { pairName: pair.as_str().to_string() };
    ContractCall::new(oracle, call.abi_encode())
}

pub fn all_prices_call(oracle: Address) -> ContractCall {
    ContractCall::new(oracle, getAllPricesCall {}.abi_encode())
}

pub fn integration_status_call(integration: Address) -> ContractCall {
    ContractCall::new(integration, getIntegrationStatusCall {}.abi_encode())
}

/// Decode the return data of `C`
pub fn decode_returns<C: SolCall>(data: &[u8]) -> Result<C::Return, CallError> {
    C::abi_decode_returns(data, true).map_err(|e| CallError::Decode(format!("{}: {}", C::SIGNATURE, e)))
}

/// Decode a `PriceUpdated` log into a notification.
///
/// Anything that fails to decode becomes a missing field; the listener decides
/// what to drop.
pub fn decode_price_updated(log: &RawLog) -> PriceUpdateNotification {
    let event = match PriceUpdated::decode_raw_log(log.topics.iter().copied(), &log.data, true) {
        Ok(event) => event,
        Err(e) => {
            debug!("Undecodable PriceUpdated log: {}", e);
            return PriceUpdateNotification::default();
        }
    };

    PriceUpdateNotification {
        pair: TradingPair::from_topic(&event.pairName),
        new_price: Some(event.newPrice),
        percentage_change_bps: i64::try_from(event.percentageChange).ok(),
        timestamp: u64::try_from(event.timestamp).ok(),
    }
}

/// Decode a `PriceAlertPosted` log; the timestamp is the log's block timestamp
pub fn decode_price_alert(log: &RawLog) -> AlertNotification {
    let event = match PriceAlertPosted::decode_raw_log(log.topics.iter().copied(), &log.data, true) {
        Ok(event) => event,
        Err(e) => {
            debug!("Undecodable PriceAlertPosted log: {}", e);
            return AlertNotification::default();
        }
    };

    AlertNotification {
        pair: TradingPair::from_topic(&event.pairName),
        price_change_bps: i64::try_from(event.priceChange).ok(),
        new_price: Some(event.newPrice),
        message_id: Some(event.messageId),
        timestamp: log.block_timestamp,
    }
}

/// Checked `uint256` to `u64` conversion for timestamps and intervals
pub fn u256_to_u64(value: U256) -> Result<u64, CallError> {
    u64::try_from(value).map_err(|_| CallError::Decode(format!("{} does not fit in u64", value)))
}
