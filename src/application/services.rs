//! Network-scoped oracle session

use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use crate::domain::integration::{AlertEvent, AlertListener, IntegrationStatus, IntegrationStatusReader};
use crate::domain::network::{NetworkAddressSet, NetworkRegistry};
use crate::domain::price::{
    merge_latest, AllPricesSnapshot, PriceAggregator, PriceBoard, PriceRecord, PriceUpdateEvent,
    PriceUpdateListener,
};
use crate::infrastructure::blockchain::abi::{self, PriceAlertPosted, PriceUpdated};
use crate::infrastructure::blockchain::{ContractReader, EventSource, LogFilter, Subscription};
use alloy_sol_types::SolEvent;

/// Everything tied to the current network; replaced wholesale on a switch
struct SessionState {
    generation: u64,
    network_id: u64,
    addresses: Option<NetworkAddressSet>,
    board: PriceBoard,
    price_updates: PriceUpdateListener,
    status: Option<IntegrationStatus>,
    /// Fetches started on this network and not yet finished
    price_fetches: u32,
    status_fetches: u32,
    alerts: AlertListener,
}

impl SessionState {
    fn new(generation: u64, network_id: u64) -> Self {
        Self {
            generation,
            network_id,
            addresses: NetworkRegistry::resolve_addresses(network_id),
            board: PriceBoard::unavailable(),
            price_updates: PriceUpdateListener::new(),
            status: None,
            price_fetches: 0,
            status_fetches: 0,
            alerts: AlertListener::new(),
        }
    }
}

/// Reads prices and integration status for one network at a time and keeps
/// the live event histories for it.
///
/// Switching networks tears down the old subscriptions before new ones are
/// created; results that belong to a previous network are discarded.
pub struct OracleSession {
    events: Arc<dyn EventSource>,
    aggregator: PriceAggregator,
    status_reader: IntegrationStatusReader,
    state: Arc<RwLock<SessionState>>,
    listeners: Mutex<Vec<JoinHandle<()>>>,
}

impl OracleSession {
    /// Create a session on `network_id` and start its event listeners
    pub async fn start(reader: Arc<dyn ContractReader>, events: Arc<dyn EventSource>, network_id: u64) -> Self {
        let session = Self {
            events,
            aggregator: PriceAggregator::new(reader.clone()),
            status_reader: IntegrationStatusReader::new(reader),
            state: Arc::new(RwLock::new(SessionState::new(0, network_id))),
            listeners: Mutex::new(Vec::new()),
        };
        session.subscribe_current().await;
        session
    }

    pub async fn network_id(&self) -> u64 {
        self.state.read().await.network_id
    }

    pub async fn addresses(&self) -> Option<NetworkAddressSet> {
        self.state.read().await.addresses
    }

    /// Move the session to another network.
    ///
    /// Old subscriptions are stopped and awaited first, then all per-network
    /// state is dropped, then the new network is subscribed if supported.
    pub async fn switch_network(&self, network_id: u64) {
        let mut listeners = self.listeners.lock().await;
        for listener in listeners.drain(..) {
            listener.abort();
            // wait until the task, and the subscription it owns, is gone
            let _ = listener.await;
        }
        drop(listeners);

        {
            let mut state = self.state.write().await;
            let generation = state.generation + 1;
            info!("Switching network {} -> {}", state.network_id, network_id);
            *state = SessionState::new(generation, network_id);
        }

        self.subscribe_current().await;
    }

    async fn subscribe_current(&self) {
        let (generation, addresses) = {
            let state = self.state.read().await;
            (state.generation, state.addresses)
        };
        let addresses = match addresses {
            Some(addresses) => addresses,
            None => {
                info!("Price feature unavailable on this network, not subscribing");
                return;
            }
        };

        let mut listeners = self.listeners.lock().await;

        let price_filter = LogFilter {
            address: addresses.price_oracle,
            event_signature: PriceUpdated::SIGNATURE_HASH,
        };
        match self.events.subscribe(price_filter).await {
            Ok(subscription) => {
                listeners.push(tokio::spawn(pump_price_updates(self.state.clone(), generation, subscription)));
            }
            Err(e) => warn!("Failed to subscribe to PriceUpdated: {}", e),
        }

        let alert_filter = LogFilter {
            address: addresses.integration,
            event_signature: PriceAlertPosted::SIGNATURE_HASH,
        };
        match self.events.subscribe(alert_filter).await {
            Ok(subscription) => {
                listeners.push(tokio::spawn(pump_alerts(self.state.clone(), generation, subscription)));
            }
            Err(e) => warn!("Failed to subscribe to PriceAlertPosted: {}", e),
        }
    }

    /// Re-read all prices for the current network.
    ///
    /// The board stays flagged as loading until every overlapping fetch has
    /// finished; the last one to finish wins.
    pub async fn refetch_prices(&self) -> PriceBoard {
        let (generation, network_id) = {
            let mut state = self.state.write().await;
            if state.addresses.is_none() {
                return PriceBoard::unavailable();
            }
            state.price_fetches += 1;
            state.board.loading = true;
            (state.generation, state.network_id)
        };

        let board = self.aggregator.fetch_all_prices(network_id).await;

        let mut state = self.state.write().await;
        if state.generation != generation {
            debug!("Discarding prices fetched for network {}", network_id);
            return state.board.clone();
        }
        state.price_fetches = state.price_fetches.saturating_sub(1);
        state.board = PriceBoard {
            loading: state.price_fetches > 0,
            ..board
        };
        state.board.clone()
    }

    /// Re-read the integration status; a failed read keeps the previous value
    pub async fn refetch_status(&self) -> Option<IntegrationStatus> {
        let (generation, network_id) = {
            let mut state = self.state.write().await;
            if state.addresses.is_none() {
                return None;
            }
            state.status_fetches += 1;
            (state.generation, state.network_id)
        };

        let result = self.status_reader.fetch_status(network_id).await;

        let mut state = self.state.write().await;
        if state.generation != generation {
            debug!("Discarding status fetched for network {}", network_id);
            return state.status;
        }
        state.status_fetches = state.status_fetches.saturating_sub(1);
        match result {
            Ok(status) => state.status = status,
            Err(e) => warn!("Integration status read failed, keeping previous: {}", e),
        }
        state.status
    }

    /// Last fetched board, with the current pending flag
    pub async fn prices(&self) -> PriceBoard {
        self.state.read().await.board.clone()
    }

    pub async fn snapshot(&self) -> Option<AllPricesSnapshot> {
        self.state.read().await.board.snapshot.clone()
    }

    /// Newest-first price updates
    pub async fn price_updates(&self) -> Vec<PriceUpdateEvent> {
        self.state.read().await.price_updates.history().to_vec()
    }

    /// Aggregator records overlaid with newer live updates
    pub async fn latest_prices(&self) -> Vec<PriceRecord> {
        let state = self.state.read().await;
        merge_latest(&state.board.prices, state.price_updates.history())
    }

    pub async fn integration_status(&self) -> Option<IntegrationStatus> {
        self.state.read().await.status
    }

    /// Newest-first alerts
    pub async fn alert_history(&self) -> Vec<AlertEvent> {
        self.state.read().await.alerts.history().to_vec()
    }

    pub async fn is_loading(&self) -> bool {
        let state = self.state.read().await;
        state.board.loading || state.status_fetches > 0
    }

    /// Malformed notifications dropped on the current network
    pub async fn dropped_notifications(&self) -> u64 {
        let state = self.state.read().await;
        state.price_updates.dropped() + state.alerts.dropped()
    }

    /// Pairs omitted from any fetch because a read failed
    pub fn omitted_pairs(&self) -> u64 {
        self.aggregator.stats().pairs_omitted()
    }

    /// Stop all listeners
    pub async fn shutdown(&self) {
        let mut listeners = self.listeners.lock().await;
        for listener in listeners.drain(..) {
            listener.abort();
            let _ = listener.await;
        }
    }
}

async fn pump_price_updates(state: Arc<RwLock<SessionState>>, generation: u64, mut subscription: Subscription) {
    debug!("Price update listener {} started", subscription.id());
    while let Some(batch) = subscription.next_batch().await {
        let notifications: Vec<_> = batch.iter().map(abi::decode_price_updated).collect();
        let mut guard = state.write().await;
        if guard.generation != generation {
            break;
        }
        guard.price_updates.apply_batch(&notifications);
    }
    debug!("Price update listener {} stopped", subscription.id());
}

async fn pump_alerts(state: Arc<RwLock<SessionState>>, generation: u64, mut subscription: Subscription) {
    debug!("Alert listener {} started", subscription.id());
    while let Some(batch) = subscription.next_batch().await {
        let notifications: Vec<_> = batch.iter().map(abi::decode_price_alert).collect();
        let mut guard = state.write().await;
        if guard.generation != generation {
            break;
        }
        guard.alerts.apply_batch(&notifications);
    }
    debug!("Alert listener {} stopped", subscription.id());
}
