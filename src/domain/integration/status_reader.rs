//! Integration contract status reads

use std::sync::Arc;
use tracing::debug;
use crate::domain::network::NetworkRegistry;
use crate::infrastructure::blockchain::abi::{self, getIntegrationStatusCall};
use crate::infrastructure::blockchain::ContractReader;
use crate::shared::errors::IntegrationError;
use super::IntegrationStatus;

pub struct IntegrationStatusReader {
    reader: Arc<dyn ContractReader>,
}

impl IntegrationStatusReader {
    pub fn new(reader: Arc<dyn ContractReader>) -> Self {
        Self { reader }
    }

    /// Read the status record; `Ok(None)` when the network has no deployment
    pub async fn fetch_status(&self, network_id: u64) -> Result<Option<IntegrationStatus>, IntegrationError> {
        let addresses = match NetworkRegistry::resolve_addresses(network_id) {
            Some(addresses) => addresses,
            None => {
                debug!("No price integration on network {}", network_id);
                return Ok(None);
            }
        };

        let data = self.reader.call(abi::integration_status_call(addresses.integration)).await?;
        let ret = abi::decode_returns::<getIntegrationStatusCall>(&data)?;

        let min_interval_seconds =
            abi::u256_to_u64(ret.minInterval).map_err(|e| IntegrationError::InvalidStatus(e.to_string()))?;
        let last_summary_seconds =
            abi::u256_to_u64(ret.lastSummary).map_err(|e| IntegrationError::InvalidStatus(e.to_string()))?;

        Ok(Some(IntegrationStatus {
            alerts_enabled: ret.alerts,
            summaries_enabled: ret.summaries,
            bot_registered: ret.botRegistered,
            min_interval_seconds,
            last_summary_seconds,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::blockchain::mock::{oracle_fixture, sepolia_addresses};
    use crate::shared::errors::CallError;
    use crate::shared::types::SEPOLIA_CHAIN_ID;

    #[tokio::test]
    async fn test_fetch_status() {
        let reader = IntegrationStatusReader::new(Arc::new(oracle_fixture()));
        let status = reader.fetch_status(SEPOLIA_CHAIN_ID).await.unwrap().unwrap();

        assert!(status.alerts_enabled);
        assert!(!status.summaries_enabled);
        assert!(status.bot_registered);
        assert_eq!(status.min_interval_seconds, 3600);
        assert_eq!(status.last_summary_seconds, 1_700_000_050);
        assert!(status.automation_active());
    }

    #[tokio::test]
    async fn test_unsupported_network_is_none() {
        let reader = IntegrationStatusReader::new(Arc::new(oracle_fixture()));
        assert_eq!(reader.fetch_status(4202).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_failure_is_error() {
        let mock = oracle_fixture();
        mock.respond(
            abi::integration_status_call(sepolia_addresses().integration),
            Err(CallError::Transport("connection reset".to_string())),
        );
        let reader = IntegrationStatusReader::new(Arc::new(mock));

        let err = reader.fetch_status(SEPOLIA_CHAIN_ID).await.unwrap_err();
        assert!(matches!(err, IntegrationError::StatusUnavailable(CallError::Transport(_))));
    }
}
