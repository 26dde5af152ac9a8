//! In-memory transports for tests

use alloy_primitives::{Bytes, I256, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;
use crate::domain::network::{NetworkAddressSet, NetworkRegistry};
use crate::domain::price::TradingPair;
use crate::shared::errors::CallError;
use crate::shared::types::SEPOLIA_CHAIN_ID;
use super::abi::{
    self, getAllPricesCall, getFormattedPriceCall, getIntegrationStatusCall, getLatestPriceCall,
    getPriceChangePercentageCall,
};
use super::traits::{CallOutcome, ContractCall, ContractReader, EventSource, LogFilter, RawLog, Subscription};

/// Contract reader answering from a table keyed by `(address, calldata)`
#[derive(Default)]
pub struct MockContractReader {
    responses: Mutex<HashMap<ContractCall, CallOutcome>>,
    calls_seen: Mutex<usize>,
}

impl MockContractReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, call: ContractCall, outcome: CallOutcome) {
        self.responses.lock().unwrap().insert(call, outcome);
    }

    pub fn respond_ok(&self, call: ContractCall, data: Vec<u8>) {
        self.respond(call, Ok(Bytes::from(data)));
    }

    pub fn calls_seen(&self) -> usize {
        *self.calls_seen.lock().unwrap()
    }
}

#[async_trait]
impl ContractReader for MockContractReader {
    async fn call_batch(&self, calls: Vec<ContractCall>) -> Result<Vec<CallOutcome>, CallError> {
        *self.calls_seen.lock().unwrap() += calls.len();
        let responses = self.responses.lock().unwrap();
        Ok(calls
            .iter()
            .map(|call| {
                responses
                    .get(call)
                    .cloned()
                    .unwrap_or_else(|| Err(CallError::Reverted("no mock response".to_string())))
            })
            .collect())
    }
}

/// Event source whose batches are pushed by the test
#[derive(Default)]
pub struct ChannelEventSource {
    senders: Mutex<Vec<(LogFilter, mpsc::Sender<Vec<RawLog>>)>>,
}

impl ChannelEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a batch to every live subscription matching `filter`.
    /// Returns how many subscriptions accepted it.
    pub fn emit(&self, filter: &LogFilter, batch: Vec<RawLog>) -> usize {
        let senders = self.senders.lock().unwrap();
        senders
            .iter()
            .filter(|(f, _)| f == filter)
            .filter(|(_, sender)| sender.try_send(batch.clone()).is_ok())
            .count()
    }

    pub fn subscriptions_opened(&self) -> usize {
        self.senders.lock().unwrap().len()
    }
}

#[async_trait]
impl EventSource for ChannelEventSource {
    async fn subscribe(&self, filter: LogFilter) -> Result<Subscription, CallError> {
        let (sender, receiver) = mpsc::channel(64);
        let id = {
            let mut senders = self.senders.lock().unwrap();
            senders.push((filter, sender));
            format!("mock-{}", senders.len())
        };
        Ok(Subscription::new(id, receiver, None))
    }
}

pub fn sepolia_addresses() -> NetworkAddressSet {
    NetworkRegistry::resolve_addresses(SEPOLIA_CHAIN_ID).unwrap()
}

/// Raw 8-decimal oracle price used by [`oracle_fixture`]
pub fn fixture_price(pair: TradingPair) -> I256 {
    let value: i64 = match pair {
        TradingPair::BtcUsd => 9_750_012_000_000,
        TradingPair::EthUsd => 345_025_000_000,
        TradingPair::BtcEth => 2_826_000_000,
        TradingPair::BnbEth => 17_500_000,
    };
    I256::try_from(value).unwrap()
}

/// Reader answering every Sepolia oracle and integration read.
///
/// Pair `i` (in display order) reports timestamp `1_700_000_000 + i` and a
/// change of `250 * (i + 1)` bps.
pub fn oracle_fixture() -> MockContractReader {
    let reader = MockContractReader::new();
    let addresses = sepolia_addresses();
    let oracle = addresses.price_oracle;

    for (i, pair) in TradingPair::ALL.into_iter().enumerate() {
        reader.respond_ok(
            abi::latest_price_call(oracle, pair),
            getLatestPriceCall::abi_encode_returns(&(
                fixture_price(pair),
                U256::from(1_700_000_000u64 + i as u64),
                8u8,
            )),
        );
        reader.respond_ok(
            abi::price_change_call(oracle, pair),
            getPriceChangePercentageCall::abi_encode_returns(&(I256::try_from(250i64 * (i as i64 + 1)).unwrap(),)),
        );
        reader.respond_ok(
            abi::formatted_price_call(oracle, pair),
            getFormattedPriceCall::abi_encode_returns(&(format!("oracle:{}", pair),)),
        );
    }

    reader.respond_ok(
        abi::all_prices_call(oracle),
        getAllPricesCall::abi_encode_returns(&(
            fixture_price(TradingPair::BtcUsd),
            fixture_price(TradingPair::EthUsd),
            fixture_price(TradingPair::BtcEth),
            fixture_price(TradingPair::BnbEth),
            U256::from(1_700_000_100u64),
        )),
    );

    reader.respond_ok(
        abi::integration_status_call(addresses.integration),
        getIntegrationStatusCall::abi_encode_returns(&(true, false, true, U256::from(3600u64), U256::from(1_700_000_050u64))),
    );
    reader
}
