//! CLI commands and handlers
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use crate::application::report::{NetworkList, PriceReport, Render, StatusReport, WatchEvent};
use crate::application::services::OracleSession;
use crate::domain::integration::{AlertEvent, IntegrationStatusReader};
use crate::domain::network::NetworkRegistry;
use crate::domain::price::{PriceAggregator, PriceBoard, PriceUpdateEvent, TradingPair};
use crate::infrastructure::blockchain::{EvmRpcClient, LogWatcher};
use crate::shared::errors::{AppError, PriceError};
use crate::shared::types::{ClientConfig, TransportConfig};
use crate::shared::utils::format_price_str;

#[derive(Parser)]
#[command(name = "boomer-oracle")]
#[command(version, about = "Read oracle prices and price-chat automation status from EVM testnets")]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Chain id to read from (overrides config)
    #[arg(short, long, global = true)]
    pub network: Option<u64>,

    /// RPC endpoint URL (overrides config and chain default)
    #[arg(long, global = true)]
    pub rpc_url: Option<String>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read all oracle prices
    Prices {
        /// Only show this pair, e.g. BTC/USD
        #[arg(short, long)]
        pair: Option<String>,
    },

    /// Show the price-chat integration status
    Status,

    /// Follow price updates and alerts as they are emitted
    Watch {
        /// Stop after this many seconds
        #[arg(short, long)]
        duration: Option<u64>,

        /// Re-read prices and status every N milliseconds (0 disables)
        #[arg(short, long)]
        refresh: Option<u64>,
    },

    /// List known networks and where the price feature is deployed
    Networks,

    /// Format a raw fixed-point integer
    Format {
        /// Raw integer value, may be negative
        #[arg(allow_hyphen_values = true)]
        raw: String,

        /// Implied decimal places
        #[arg(short, long, default_value_t = 8)]
        decimals: u8,
    },
}

/// RPC URL and transport settings for one chain
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub rpc_url: String,
    pub transport: TransportConfig,
}

/// Pick the endpoint: CLI override, then config, then the chain default
pub fn resolve_endpoint(
    network_id: u64,
    rpc_override: Option<&str>,
    config: &ClientConfig,
) -> Result<Endpoint, AppError> {
    let chain = NetworkRegistry::chain(network_id);
    let rpc_url = rpc_override
        .or_else(|| config.rpc_url_for(network_id))
        .or_else(|| chain.map(|chain| chain.rpc_url))
        .ok_or(AppError::UnsupportedNetwork(network_id))?;
    let transport = config
        .transport
        .clone()
        .or_else(|| chain.map(|chain| chain.transport()))
        .unwrap_or_default();

    Ok(Endpoint {
        rpc_url: rpc_url.to_string(),
        transport,
    })
}

fn print<R: Render>(report: &R, json: bool) -> Result<(), AppError> {
    if json {
        let rendered = report
            .to_json()
            .map_err(|e| AppError::Unknown(format!("Failed to serialize output: {}", e)))?;
        println!("{}", rendered);
    } else {
        print!("{}", report.to_text());
    }
    Ok(())
}

/// Remembers the newest entry printed from a newest-first history
struct HistoryCursor<T> {
    last_seen: Option<T>,
}

impl<T: Clone + PartialEq> HistoryCursor<T> {
    fn new() -> Self {
        Self { last_seen: None }
    }

    /// Entries newer than the last call, oldest first
    fn fresh(&mut self, history: &[T]) -> Vec<T> {
        let mut fresh: Vec<T> = history
            .iter()
            .take_while(|entry| Some(*entry) != self.last_seen.as_ref())
            .cloned()
            .collect();
        fresh.reverse();
        if let Some(newest) = history.first() {
            self.last_seen = Some(newest.clone());
        }
        fresh
    }
}

#[derive(Serialize)]
struct FormatOutput {
    raw: String,
    decimals: u8,
    formatted: String,
}

impl Render for FormatOutput {
    fn to_text(&self) -> String {
        format!("{}\n", self.formatted)
    }
}

pub struct CommandExecutor;

impl CommandExecutor {
    /// Execute the selected command
    pub async fn execute(cli: Cli, config: ClientConfig) -> Result<(), AppError> {
        let network_id = cli.network.unwrap_or(config.network.chain_id);
        let rpc_override = cli.rpc_url.as_deref();

        match cli.command {
            Commands::Prices { pair } => {
                Self::execute_prices_command(network_id, rpc_override, pair, cli.json, &config).await
            }
            Commands::Status => Self::execute_status_command(network_id, rpc_override, cli.json, &config).await,
            Commands::Watch { duration, refresh } => {
                Self::execute_watch_command(network_id, rpc_override, duration, refresh, cli.json, &config).await
            }
            Commands::Networks => Self::execute_networks_command(cli.json),
            Commands::Format { raw, decimals } => Self::execute_format_command(raw, decimals, cli.json),
        }
    }

    fn connect(network_id: u64, rpc_override: Option<&str>, config: &ClientConfig) -> Result<Arc<EvmRpcClient>, AppError> {
        let endpoint = resolve_endpoint(network_id, rpc_override, config)?;
        info!("🔌 Connecting to {} (chain {})", endpoint.rpc_url, network_id);
        Ok(Arc::new(EvmRpcClient::new(endpoint.rpc_url, endpoint.transport)?))
    }

    /// Execute prices command
    async fn execute_prices_command(
        network_id: u64,
        rpc_override: Option<&str>,
        pair: Option<String>,
        json: bool,
        config: &ClientConfig,
    ) -> Result<(), AppError> {
        let pair = pair.map(|pair| pair.parse::<TradingPair>()).transpose()?;

        if !NetworkRegistry::is_price_feature_available(network_id) {
            warn!("Price feeds are not deployed on chain {}", network_id);
            return print(&PriceReport::new(network_id, &PriceBoard::unavailable()), json);
        }

        let client = Self::connect(network_id, rpc_override, config)?;
        let aggregator = PriceAggregator::new(client);
        let mut board = aggregator.fetch_all_prices(network_id).await;

        let omitted = aggregator.stats().pairs_omitted();
        if omitted > 0 {
            warn!("⚠️ {} pair(s) omitted because a read failed", omitted);
        }
        if let Some(pair) = pair {
            board.prices.retain(|record| record.pair() == pair);
        }
        print(&PriceReport::new(network_id, &board), json)
    }

    /// Execute status command
    async fn execute_status_command(
        network_id: u64,
        rpc_override: Option<&str>,
        json: bool,
        config: &ClientConfig,
    ) -> Result<(), AppError> {
        if !NetworkRegistry::is_price_feature_available(network_id) {
            warn!("Price integration is not deployed on chain {}", network_id);
            return print(&StatusReport::unavailable(network_id), json);
        }

        let client = Self::connect(network_id, rpc_override, config)?;
        let reader = IntegrationStatusReader::new(client);
        let report = match reader.fetch_status(network_id).await? {
            Some(status) => StatusReport::new(network_id, &status),
            None => StatusReport::unavailable(network_id),
        };
        print(&report, json)
    }

    /// Execute watch command
    async fn execute_watch_command(
        network_id: u64,
        rpc_override: Option<&str>,
        duration: Option<u64>,
        refresh: Option<u64>,
        json: bool,
        config: &ClientConfig,
    ) -> Result<(), AppError> {
        if !NetworkRegistry::is_price_feature_available(network_id) {
            return Err(AppError::UnsupportedNetwork(network_id));
        }

        let client = Self::connect(network_id, rpc_override, config)?;
        let poll_interval = Duration::from_millis(config.watch.poll_interval_ms.max(1));
        let events = Arc::new(LogWatcher::new(client.clone(), poll_interval));
        let session = OracleSession::start(client, events, network_id).await;

        info!("👀 Watching chain {} (poll every {:?})", network_id, poll_interval);
        print(&PriceReport::new(network_id, &session.refetch_prices().await), json)?;
        if let Some(status) = session.refetch_status().await {
            print(&StatusReport::new(network_id, &status), json)?;
        }

        let refresh_ms = refresh.unwrap_or(config.watch.refresh_interval_ms);
        let mut refresh_ticker = tokio::time::interval(Duration::from_millis(refresh_ms.max(1)));
        refresh_ticker.tick().await;
        let mut print_ticker = tokio::time::interval(poll_interval);

        let deadline = async {
            match duration {
                Some(seconds) => tokio::time::sleep(Duration::from_secs(seconds)).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        let mut updates = HistoryCursor::<PriceUpdateEvent>::new();
        let mut alerts = HistoryCursor::<AlertEvent>::new();

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Interrupted");
                    break;
                }
                _ = &mut deadline => {
                    info!("✅ Watch finished");
                    break;
                }
                _ = print_ticker.tick() => {
                    for update in updates.fresh(&session.price_updates().await) {
                        print(&WatchEvent::from(&update), json)?;
                    }
                    for alert in alerts.fresh(&session.alert_history().await) {
                        print(&WatchEvent::from(&alert), json)?;
                    }
                }
                _ = refresh_ticker.tick(), if refresh_ms > 0 => {
                    let board = session.refetch_prices().await;
                    info!("🔄 Refreshed {} prices", board.prices.len());
                    session.refetch_status().await;
                }
            }
        }

        session.shutdown().await;
        info!(
            "📊 Dropped notifications: {}, omitted pair reads: {}",
            session.dropped_notifications().await,
            session.omitted_pairs()
        );
        Ok(())
    }

    /// Execute networks command
    fn execute_networks_command(json: bool) -> Result<(), AppError> {
        print(&NetworkList::supported(), json)
    }

    /// Execute format command
    fn execute_format_command(raw: String, decimals: u8, json: bool) -> Result<(), AppError> {
        let formatted = format_price_str(&raw, decimals)
            .ok_or_else(|| PriceError::InvalidPriceData(format!("not an integer: {}", raw)))?;
        print(&FormatOutput { raw, decimals, formatted }, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::types::{RpcEndpoint, SEPOLIA_CHAIN_ID};

    #[test]
    fn test_cli_parses_global_flags() {
        let cli = Cli::try_parse_from(["boomer-oracle", "prices", "--network", "4202", "--json"]).unwrap();
        assert_eq!(cli.network, Some(4202));
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Prices { pair: None }));
    }

    #[test]
    fn test_cli_format_accepts_negative() {
        let cli = Cli::try_parse_from(["boomer-oracle", "format", "-150000000", "--decimals", "8"]).unwrap();
        match cli.command {
            Commands::Format { raw, decimals } => {
                assert_eq!(raw, "-150000000");
                assert_eq!(decimals, 8);
            }
            _ => panic!("expected format command"),
        }
    }

    #[test]
    fn test_endpoint_prefers_cli_override() {
        let mut config = ClientConfig::default();
        config.rpc_endpoints.push(RpcEndpoint {
            chain_id: SEPOLIA_CHAIN_ID,
            url: "http://from-config".to_string(),
        });

        let endpoint = resolve_endpoint(SEPOLIA_CHAIN_ID, Some("http://from-cli"), &config).unwrap();
        assert_eq!(endpoint.rpc_url, "http://from-cli");

        let endpoint = resolve_endpoint(SEPOLIA_CHAIN_ID, None, &config).unwrap();
        assert_eq!(endpoint.rpc_url, "http://from-config");
    }

    #[test]
    fn test_endpoint_falls_back_to_chain_defaults() {
        let config = ClientConfig::default();
        let endpoint = resolve_endpoint(4202, None, &config).unwrap();
        assert_eq!(endpoint.rpc_url, "https://rpc.sepolia-api.lisk.com");
        assert_eq!(endpoint.transport.retry_delay_ms, 1000);

        let mut config = ClientConfig::default();
        config.transport = Some(TransportConfig {
            retry_count: 7,
            ..TransportConfig::default()
        });
        assert_eq!(resolve_endpoint(4202, None, &config).unwrap().transport.retry_count, 7);
    }

    #[test]
    fn test_unknown_chain_needs_rpc_url() {
        let config = ClientConfig::default();
        assert!(matches!(resolve_endpoint(1, None, &config), Err(AppError::UnsupportedNetwork(1))));
        assert!(resolve_endpoint(1, Some("http://localhost:8545"), &config).is_ok());
    }

    #[tokio::test]
    async fn test_status_on_undeployed_network_reports_without_rpc() {
        // neither chain has the integration; chain 1 has no endpoint to connect to either
        let config = ClientConfig::default();
        assert!(CommandExecutor::execute_status_command(1, None, true, &config).await.is_ok());
        assert!(CommandExecutor::execute_status_command(4202, None, false, &config).await.is_ok());
    }

    #[test]
    fn test_history_cursor_yields_only_new_entries() {
        let mut cursor = HistoryCursor::<u32>::new();
        assert_eq!(cursor.fresh(&[2, 1]), vec![1, 2]);
        assert!(cursor.fresh(&[2, 1]).is_empty());
        assert_eq!(cursor.fresh(&[4, 3, 2, 1]), vec![3, 4]);
        assert!(cursor.fresh(&[]).is_empty());
    }
}
