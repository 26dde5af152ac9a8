//! Printable views of prices, status and live events

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use crate::domain::integration::{AlertEvent, IntegrationStatus};
use crate::domain::network::NetworkRegistry;
use crate::domain::price::{
    AllPricesSnapshot, PriceAnalyzer, PriceBoard, PriceRecord, PriceUpdateEvent, TradingPair,
    PRICE_UPDATE_DECIMALS,
};
use crate::shared::utils::{format_percentage_change, format_signed_units};

/// A report printable as human-readable text or JSON
pub trait Render: Serialize {
    fn to_text(&self) -> String;

    fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn to_datetime(seconds: u64) -> Option<DateTime<Utc>> {
    let seconds = i64::try_from(seconds).ok()?;
    Utc.timestamp_opt(seconds, 0).single()
}

fn network_label(network_id: u64) -> String {
    match NetworkRegistry::chain(network_id) {
        Some(chain) => format!("{} ({})", chain.name, network_id),
        None => format!("chain {}", network_id),
    }
}

#[derive(Debug, Serialize)]
pub struct PriceView {
    pub pair: TradingPair,
    pub icon: &'static str,
    pub raw_price: String,
    pub decimals: u8,
    pub formatted_price: String,
    pub display_price: String,
    pub percentage_change: f64,
    pub display_change: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub oracle_formatted: Option<String>,
}

impl From<&PriceRecord> for PriceView {
    fn from(record: &PriceRecord) -> Self {
        Self {
            pair: record.pair(),
            icon: record.pair().icon(),
            raw_price: record.raw_price().to_string(),
            decimals: record.decimals(),
            formatted_price: record.formatted_price().to_string(),
            display_price: PriceAnalyzer::display_price(record),
            percentage_change: record.percentage_change(),
            display_change: PriceAnalyzer::display_change(record),
            updated_at: to_datetime(record.timestamp_seconds()),
            oracle_formatted: record.oracle_formatted().map(str::to_string),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SnapshotView {
    pub btc_usd: String,
    pub eth_usd: String,
    pub btc_eth: String,
    pub bnb_eth: String,
    pub last_update: Option<DateTime<Utc>>,
}

impl From<&AllPricesSnapshot> for SnapshotView {
    fn from(snapshot: &AllPricesSnapshot) -> Self {
        Self {
            btc_usd: snapshot.btc_usd.to_string(),
            eth_usd: snapshot.eth_usd.to_string(),
            btc_eth: snapshot.btc_eth.to_string(),
            bnb_eth: snapshot.bnb_eth.to_string(),
            last_update: to_datetime(snapshot.last_update_seconds),
        }
    }
}

/// Output of the `prices` command
#[derive(Debug, Serialize)]
pub struct PriceReport {
    pub network_id: u64,
    pub available: bool,
    pub snapshot: Option<SnapshotView>,
    pub prices: Vec<PriceView>,
    pub generated_at: DateTime<Utc>,
}

impl PriceReport {
    pub fn new(network_id: u64, board: &PriceBoard) -> Self {
        Self {
            network_id,
            available: NetworkRegistry::is_price_feature_available(network_id),
            snapshot: board.snapshot.as_ref().map(SnapshotView::from),
            prices: board.prices.iter().map(PriceView::from).collect(),
            generated_at: Utc::now(),
        }
    }
}

impl Render for PriceReport {
    fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "📈 Prices on {}", network_label(self.network_id));
        if !self.available {
            let _ = writeln!(out, "   Price feeds are not deployed on this network");
            return out;
        }
        if self.prices.is_empty() {
            let _ = writeln!(out, "   No prices available");
        }
        for price in &self.prices {
            let _ = writeln!(
                out,
                "   {} {:<8} {:>14}  {:>8}  ({})",
                price.icon, price.pair.as_str(), price.display_price, price.display_change, price.formatted_price
            );
        }
        if let Some(last_update) = self.snapshot.as_ref().and_then(|s| s.last_update) {
            let _ = writeln!(out, "   Last oracle update: {}", last_update.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        out
    }
}

/// Automation flags of a deployed integration contract
#[derive(Debug, Serialize)]
pub struct StatusView {
    pub alerts_enabled: bool,
    pub summaries_enabled: bool,
    pub bot_registered: bool,
    pub automation_active: bool,
    pub min_interval_seconds: u64,
    pub last_summary: Option<DateTime<Utc>>,
}

/// Output of the `status` command
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub network_id: u64,
    pub available: bool,
    #[serde(flatten)]
    pub status: Option<StatusView>,
}

impl StatusReport {
    pub fn new(network_id: u64, status: &IntegrationStatus) -> Self {
        Self {
            network_id,
            available: true,
            status: Some(StatusView {
                alerts_enabled: status.alerts_enabled,
                summaries_enabled: status.summaries_enabled,
                bot_registered: status.bot_registered,
                automation_active: status.automation_active(),
                min_interval_seconds: status.min_interval_seconds,
                last_summary: to_datetime(status.last_summary_seconds).filter(|_| status.last_summary_seconds > 0),
            }),
        }
    }

    /// Report for a network without an integration deployment
    pub fn unavailable(network_id: u64) -> Self {
        Self {
            network_id,
            available: false,
            status: None,
        }
    }
}

impl Render for StatusReport {
    fn to_text(&self) -> String {
        let flag = |on: bool| if on { "✅" } else { "❌" };
        let mut out = String::new();
        let _ = writeln!(out, "🤖 Automation on {}", network_label(self.network_id));
        let status = match &self.status {
            Some(status) => status,
            None => {
                let _ = writeln!(out, "   Price integration is not deployed on this network");
                return out;
            }
        };
        let _ = writeln!(out, "   Price alerts:    {}", flag(status.alerts_enabled));
        let _ = writeln!(out, "   Daily summaries: {}", flag(status.summaries_enabled));
        let _ = writeln!(out, "   Bot registered:  {}", flag(status.bot_registered));
        let _ = writeln!(out, "   Automation:      {}", if status.automation_active { "active" } else { "inactive" });
        let _ = writeln!(out, "   Min interval:    {}s", status.min_interval_seconds);
        match status.last_summary {
            Some(at) => {
                let _ = writeln!(out, "   Last summary:    {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
            }
            None => {
                let _ = writeln!(out, "   Last summary:    never");
            }
        }
        out
    }
}

/// One line of `watch` output
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WatchEvent {
    PriceUpdate {
        pair: TradingPair,
        price: String,
        percentage_change: f64,
        at: Option<DateTime<Utc>>,
    },
    Alert {
        pair: TradingPair,
        price_change: f64,
        new_price: String,
        message_id: Option<String>,
        at: Option<DateTime<Utc>>,
    },
}

impl From<&PriceUpdateEvent> for WatchEvent {
    fn from(event: &PriceUpdateEvent) -> Self {
        WatchEvent::PriceUpdate {
            pair: event.pair,
            price: event.formatted_price.clone(),
            percentage_change: event.percentage_change(),
            at: to_datetime(event.timestamp),
        }
    }
}

impl From<&AlertEvent> for WatchEvent {
    fn from(alert: &AlertEvent) -> Self {
        WatchEvent::Alert {
            pair: alert.pair,
            price_change: alert.price_change(),
            new_price: format_signed_units(alert.new_price, PRICE_UPDATE_DECIMALS),
            message_id: alert.message_id.map(|id| id.to_string()),
            at: to_datetime(alert.timestamp),
        }
    }
}

impl Render for WatchEvent {
    /// One JSON object per line
    fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    fn to_text(&self) -> String {
        match self {
            WatchEvent::PriceUpdate { pair, price, percentage_change, .. } => {
                format!("📊 {} {} {}", pair, price, format_percentage_change(*percentage_change))
            }
            WatchEvent::Alert { pair, price_change, new_price, .. } => {
                format!("🚨 Alert {} {} -> {}", pair, format_percentage_change(*price_change), new_price)
            }
        }
    }
}

/// Row of the `networks` command
#[derive(Debug, Serialize)]
pub struct NetworkView {
    pub chain_id: u64,
    pub name: &'static str,
    pub native_symbol: &'static str,
    pub rpc_url: &'static str,
    pub explorer_url: &'static str,
    pub testnet: bool,
    pub price_feeds: bool,
    pub chat_registry: String,
}

/// Output of the `networks` command; a single JSON array
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct NetworkList(pub Vec<NetworkView>);

impl NetworkList {
    pub fn supported() -> Self {
        NetworkList(
            NetworkRegistry::supported_chains()
                .iter()
                .map(|chain| NetworkView {
                    chain_id: chain.id,
                    name: chain.name,
                    native_symbol: chain.native_symbol,
                    rpc_url: chain.rpc_url,
                    explorer_url: chain.explorer_url,
                    testnet: chain.testnet,
                    price_feeds: NetworkRegistry::is_price_feature_available(chain.id),
                    chat_registry: NetworkRegistry::chat_registry_address(chain.id).to_string(),
                })
                .collect(),
        )
    }
}

impl Render for NetworkList {
    fn to_text(&self) -> String {
        let mut out = String::new();
        for network in &self.0 {
            let _ = writeln!(
                out,
                "{:>9}  {:<22} {:<4} price feeds: {:<3}  {}",
                network.chain_id,
                network.name,
                network.native_symbol,
                if network.price_feeds { "yes" } else { "no" },
                network.rpc_url
            );
        }
        out
    }
}
