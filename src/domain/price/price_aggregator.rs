//! Batched oracle reads reconciled into display-ready price records

use alloy_primitives::Address;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use crate::domain::network::NetworkRegistry;
use crate::infrastructure::blockchain::abi::{
    self, getAllPricesCall, getFormattedPriceCall, getLatestPriceCall, getPriceChangePercentageCall,
};
use crate::infrastructure::blockchain::{CallOutcome, ContractCall, ContractReader};
use crate::shared::errors::CallError;
use super::{AllPricesSnapshot, PriceBoard, PriceRecord, TradingPair};

/// The three per-pair reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum PairRead {
    Latest,
    Change,
    Formatted,
}

impl PairRead {
    const ALL: [PairRead; 3] = [PairRead::Latest, PairRead::Change, PairRead::Formatted];

    fn call(&self, oracle: Address, pair: TradingPair) -> ContractCall {
        match self {
            PairRead::Latest => abi::latest_price_call(oracle, pair),
            PairRead::Change => abi::price_change_call(oracle, pair),
            PairRead::Formatted => abi::formatted_price_call(oracle, pair),
        }
    }
}

/// Counters for results the aggregator drops instead of reporting
#[derive(Debug, Default)]
pub struct AggregatorStats {
    pairs_omitted: AtomicU64,
    snapshot_failures: AtomicU64,
}

impl AggregatorStats {
    pub fn pairs_omitted(&self) -> u64 {
        self.pairs_omitted.load(Ordering::Relaxed)
    }

    pub fn snapshot_failures(&self) -> u64 {
        self.snapshot_failures.load(Ordering::Relaxed)
    }
}

/// Reads all oracle prices for the current network
pub struct PriceAggregator {
    reader: Arc<dyn ContractReader>,
    stats: AggregatorStats,
}

impl PriceAggregator {
    pub fn new(reader: Arc<dyn ContractReader>) -> Self {
        Self {
            reader,
            stats: AggregatorStats::default(),
        }
    }

    pub fn stats(&self) -> &AggregatorStats {
        &self.stats
    }

    /// Fetch the snapshot and every pair's record.
    ///
    /// Networks without an oracle yield an empty board without any read. A
    /// pair is listed only when all three of its reads succeeded.
    pub async fn fetch_all_prices(&self, network_id: u64) -> PriceBoard {
        let addresses = match NetworkRegistry::resolve_addresses(network_id) {
            Some(addresses) => addresses,
            None => {
                debug!("No price oracle on network {}", network_id);
                return PriceBoard::unavailable();
            }
        };
        let oracle = addresses.price_oracle;

        let (snapshot, prices) = tokio::join!(self.fetch_snapshot(oracle), self.fetch_pairs(oracle));

        info!(
            "Fetched {}/{} pairs from oracle {:?} on network {}",
            prices.len(),
            TradingPair::ALL.len(),
            oracle,
            network_id
        );

        PriceBoard {
            snapshot,
            prices,
            loading: false,
        }
    }

    async fn fetch_snapshot(&self, oracle: Address) -> Option<AllPricesSnapshot> {
        let outcome = self.reader.call(abi::all_prices_call(oracle)).await;
        match decode_snapshot(outcome) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                self.stats.snapshot_failures.fetch_add(1, Ordering::Relaxed);
                warn!("getAllPrices failed: {}", e);
                None
            }
        }
    }

    async fn fetch_pairs(&self, oracle: Address) -> Vec<PriceRecord> {
        let keys: Vec<(TradingPair, PairRead)> = TradingPair::ALL
            .into_iter()
            .flat_map(|pair| PairRead::ALL.into_iter().map(move |read| (pair, read)))
            .collect();
        let calls = keys.iter().map(|(pair, read)| read.call(oracle, *pair)).collect();

        let outcomes = match self.reader.call_batch(calls).await {
            Ok(outcomes) => outcomes,
            Err(e) => {
                warn!("Price batch failed: {}", e);
                self.stats
                    .pairs_omitted
                    .fetch_add(TradingPair::ALL.len() as u64, Ordering::Relaxed);
                return Vec::new();
            }
        };

        let mut results: HashMap<(TradingPair, PairRead), CallOutcome> = keys.into_iter().zip(outcomes).collect();

        TradingPair::ALL
            .into_iter()
            .filter_map(|pair| {
                let mut take = |read| {
                    results
                        .remove(&(pair, read))
                        .unwrap_or(Err(CallError::MissingResult(0)))
                };
                let latest = take(PairRead::Latest);
                let change = take(PairRead::Change);
                let formatted = take(PairRead::Formatted);

                match reconcile_pair(pair, latest, change, formatted) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        self.stats.pairs_omitted.fetch_add(1, Ordering::Relaxed);
                        debug!("Omitting {}: {}", pair, e);
                        None
                    }
                }
            })
            .collect()
    }
}

fn decode_snapshot(outcome: CallOutcome) -> Result<AllPricesSnapshot, CallError> {
    let data = outcome?;
    let ret = abi::decode_returns::<getAllPricesCall>(&data)?;
    Ok(AllPricesSnapshot {
        btc_usd: ret.btcUsd,
        eth_usd: ret.ethUsd,
        btc_eth: ret.btcEth,
        bnb_eth: ret.bnbEth,
        last_update_seconds: abi::u256_to_u64(ret.lastUpdate)?,
    })
}

/// Build one pair's record from its three outcomes; any failure omits the pair
fn reconcile_pair(
    pair: TradingPair,
    latest: CallOutcome,
    change: CallOutcome,
    formatted: CallOutcome,
) -> Result<PriceRecord, CallError> {
    let latest = abi::decode_returns::<getLatestPriceCall>(&latest?)?;
    let change = abi::decode_returns::<getPriceChangePercentageCall>(&change?)?;
    let formatted = abi::decode_returns::<getFormattedPriceCall>(&formatted?)?;

    let change_bps = i64::try_from(change.percentageChange)
        .map_err(|_| CallError::Decode(format!("percentage change {} out of range", change.percentageChange)))?;

    Ok(PriceRecord::new(
        pair,
        latest.price,
        abi::u256_to_u64(latest.timestamp)?,
        latest.decimals,
        change_bps,
    )
    .with_oracle_formatted(formatted.formattedPrice))
}
