//! Ethereum JSON-RPC client for contract reads and log queries

use alloy_primitives::{Address, Bytes, B256, U64};
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};
use crate::shared::errors::{is_rate_limit, AppError, CallError};
use crate::shared::types::TransportConfig;
use super::traits::{CallOutcome, ContractCall, ContractReader, LogFilter, LogProvider, RawLog};

#[derive(Debug, Serialize)]
struct RpcRequest {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: Value,
}

impl RpcRequest {
    fn new(id: u64, method: &'static str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }

    fn eth_call(id: u64, call: &ContractCall) -> Self {
        Self::new(
            id,
            "eth_call",
            json!([
                {
                    "to": call.address,
                    "data": format!("0x{}", hex::encode(&call.data)),
                },
                "latest"
            ]),
        )
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    id: u64,
    result: Option<Value>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    data: Option<Value>,
}

impl From<RpcErrorObject> for CallError {
    fn from(err: RpcErrorObject) -> Self {
        // 3 is the standard code for a reverted eth_call
        if err.code == 3 || err.message.contains("revert") {
            let reason = match err.data {
                Some(Value::String(data)) => format!("{} ({})", err.message, data),
                _ => err.message,
            };
            CallError::Reverted(reason)
        } else {
            CallError::Rpc {
                code: err.code,
                message: err.message,
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
    address: Address,
    topics: Vec<B256>,
    data: Bytes,
    block_number: Option<U64>,
    log_index: Option<U64>,
    block_timestamp: Option<U64>,
    #[serde(default)]
    removed: bool,
}

impl From<RpcLog> for RawLog {
    fn from(log: RpcLog) -> Self {
        Self {
            address: log.address,
            topics: log.topics,
            data: log.data,
            block_number: log.block_number.map(|n| n.to::<u64>()),
            log_index: log.log_index.map(|n| n.to::<u64>()),
            block_timestamp: log.block_timestamp.map(|n| n.to::<u64>()),
        }
    }
}

/// Map a JSON-RPC response to a call outcome
fn outcome_from_response(response: RpcResponse) -> CallOutcome {
    if let Some(error) = response.error {
        return Err(error.into());
    }
    let result = response.result.ok_or(CallError::MissingResult(response.id))?;
    serde_json::from_value::<Bytes>(result).map_err(|e| CallError::Decode(e.to_string()))
}

/// Pair responses with requests `0..len` by id; batch responses may arrive in any order
fn outcomes_by_id(responses: Vec<RpcResponse>, len: usize) -> Vec<CallOutcome> {
    let mut by_id: HashMap<u64, RpcResponse> = responses.into_iter().map(|r| (r.id, r)).collect();
    (0..len as u64)
        .map(|id| match by_id.remove(&id) {
            Some(response) => outcome_from_response(response),
            None => Err(CallError::MissingResult(id)),
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct RpcBlockHeader {
    timestamp: U64,
}

/// Run `send` until it succeeds, fails with a non-retryable error or the retry
/// budget is spent. Retry `n` waits `retry_delay_ms * 2^n` first.
async fn with_retry<T, F, Fut>(transport: &TransportConfig, mut send: F) -> Result<T, CallError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CallError>>,
{
    let mut attempt = 0u32;
    loop {
        match send().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < transport.retry_count => {
                let delay = transport.retry_delay_ms.saturating_mul(1u64 << attempt.min(16));
                warn!("RPC request failed ({}), retry {} in {}ms", err, attempt + 1, delay);
                tokio::time::sleep(Duration::from_millis(delay)).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// EVM JSON-RPC client wrapper
#[derive(Clone)]
pub struct EvmRpcClient {
    client: Client,
    rpc_url: String,
    transport: TransportConfig,
}

impl EvmRpcClient {
    /// Create new RPC client
    pub fn new(rpc_url: String, transport: TransportConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(transport.timeout_ms))
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            rpc_url,
            transport,
        })
    }

    async fn post_once<T, R>(&self, body: &T) -> Result<R, CallError>
    where
        T: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(&self.rpc_url)
            .json(body)
            .send()
            .await
            .map_err(|e| CallError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(CallError::Transport(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            return Err(CallError::Rpc {
                code: status.as_u16() as i64,
                message: format!("HTTP {}", status),
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| CallError::Decode(format!("Invalid JSON-RPC response: {}", e)))
    }

    /// One request; an error object in the body becomes `Err`
    async fn send_request(&self, request: &RpcRequest) -> Result<Value, CallError> {
        let response: RpcResponse = self.post_once(request).await?;
        if let Some(error) = response.error {
            return Err(error.into());
        }
        response.result.ok_or(CallError::MissingResult(response.id))
    }

    /// One batch; a throttled entry fails the whole batch so it is resent
    async fn send_batch(&self, requests: &[RpcRequest]) -> Result<Vec<RpcResponse>, CallError> {
        let responses: Vec<RpcResponse> = self.post_once(requests).await?;
        let throttled = responses
            .iter()
            .filter_map(|response| response.error.as_ref())
            .find(|error| is_rate_limit(error.code, &error.message));
        match throttled {
            Some(error) => Err(CallError::Rpc {
                code: error.code,
                message: error.message.clone(),
            }),
            None => Ok(responses),
        }
    }

    /// Single JSON-RPC request returning the raw `result`
    async fn request(&self, method: &'static str, params: Value) -> Result<Value, CallError> {
        let request = RpcRequest::new(0, method, params);
        let request = &request;
        with_retry(&self.transport, move || self.send_request(request)).await
    }

    /// Latest block number
    pub async fn block_number(&self) -> Result<u64, CallError> {
        let result = self.request("eth_blockNumber", json!([])).await?;
        let number: U64 = serde_json::from_value(result).map_err(|e| CallError::Decode(e.to_string()))?;
        Ok(number.to::<u64>())
    }

    /// Logs matching `filter` in `from_block..=to_block`; removed logs are skipped
    pub async fn get_logs(&self, filter: &LogFilter, from_block: u64, to_block: u64) -> Result<Vec<RawLog>, CallError> {
        let result = self
            .request(
                "eth_getLogs",
                json!([{
                    "address": filter.address,
                    "topics": [filter.event_signature],
                    "fromBlock": format!("0x{:x}", from_block),
                    "toBlock": format!("0x{:x}", to_block),
                }]),
            )
            .await?;

        let logs: Vec<RpcLog> = serde_json::from_value(result).map_err(|e| CallError::Decode(e.to_string()))?;
        Ok(logs
            .into_iter()
            .filter(|log| !log.removed)
            .map(RawLog::from)
            .collect())
    }

    /// Block timestamp from `eth_getBlockByNumber`
    pub async fn block_timestamp(&self, number: u64) -> Result<u64, CallError> {
        let result = self
            .request("eth_getBlockByNumber", json!([format!("0x{:x}", number), false]))
            .await?;
        let header: RpcBlockHeader = serde_json::from_value(result)
            .map_err(|e| CallError::Decode(format!("block {}: {}", number, e)))?;
        Ok(header.timestamp.to::<u64>())
    }
}

#[async_trait]
impl LogProvider for EvmRpcClient {
    async fn block_number(&self) -> Result<u64, CallError> {
        EvmRpcClient::block_number(self).await
    }

    async fn get_logs(&self, filter: &LogFilter, from_block: u64, to_block: u64) -> Result<Vec<RawLog>, CallError> {
        EvmRpcClient::get_logs(self, filter, from_block, to_block).await
    }

    async fn block_timestamp(&self, number: u64) -> Result<u64, CallError> {
        EvmRpcClient::block_timestamp(self, number).await
    }
}

#[async_trait]
impl ContractReader for EvmRpcClient {
    async fn call_batch(&self, calls: Vec<ContractCall>) -> Result<Vec<CallOutcome>, CallError> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }

        let requests: Vec<RpcRequest> = calls
            .iter()
            .enumerate()
            .map(|(id, call)| RpcRequest::eth_call(id as u64, call))
            .collect();

        if self.transport.batch {
            debug!("Sending eth_call batch of {} to {}", requests.len(), self.rpc_url);
            let batch = requests.as_slice();
            let responses = with_retry(&self.transport, move || self.send_batch(batch)).await?;
            return Ok(outcomes_by_id(responses, requests.len()));
        }

        let outcomes = join_all(requests.iter().map(|request| async move {
            with_retry(&self.transport, move || self.send_request(request))
                .await
                .and_then(|result| serde_json::from_value::<Bytes>(result).map_err(|e| CallError::Decode(e.to_string())))
        }))
        .await;
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_eth_call_request_shape() {
        let call = ContractCall::new(address!("4B001ec1F48dAE2883Fa2Dba87bE7ADc66F1B3f7"), vec![0xde, 0xad]);
        let request = serde_json::to_value(RpcRequest::eth_call(7, &call)).unwrap();

        assert_eq!(request["jsonrpc"], "2.0");
        assert_eq!(request["id"], 7);
        assert_eq!(request["method"], "eth_call");
        assert_eq!(request["params"][0]["data"], "0xdead");
        assert_eq!(request["params"][1], "latest");
        let to = request["params"][0]["to"].as_str().unwrap().to_lowercase();
        assert_eq!(to, "0x4b001ec1f48dae2883fa2dba87be7adc66f1b3f7");
    }

    #[test]
    fn test_batch_responses_matched_by_id() {
        let responses: Vec<RpcResponse> = serde_json::from_value(json!([
            {"jsonrpc": "2.0", "id": 1, "error": {"code": 3, "message": "execution reverted", "data": "0x"}},
            {"jsonrpc": "2.0", "id": 0, "result": "0x0102"},
        ]))
        .unwrap();

        let outcomes = outcomes_by_id(responses, 3);
        assert_eq!(outcomes[0], Ok(Bytes::from(vec![0x01, 0x02])));
        assert!(matches!(outcomes[1], Err(CallError::Reverted(_))));
        assert_eq!(outcomes[2], Err(CallError::MissingResult(2)));
    }

    #[test]
    fn test_rpc_error_object_mapping() {
        let err: CallError = RpcErrorObject {
            code: -32005,
            message: "limit exceeded".to_string(),
            data: None,
        }
        .into();
        assert_eq!(
            err,
            CallError::Rpc {
                code: -32005,
                message: "limit exceeded".to_string()
            }
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn test_block_header_timestamp() {
        let header: RpcBlockHeader = serde_json::from_value(json!({
            "number": "0x10",
            "hash": "0x00",
            "timestamp": "0x6553f100",
            "transactions": [],
        }))
        .unwrap();
        assert_eq!(header.timestamp.to::<u64>(), 0x6553f100);
    }

    #[test]
    fn test_standard_log_has_no_timestamp() {
        let log: RpcLog = serde_json::from_value(json!({
            "address": "0x4b001ec1f48dae2883fa2dba87be7adc66f1b3f7",
            "topics": [],
            "data": "0x",
            "blockNumber": "0x10",
            "logIndex": "0x0",
            "removed": false,
        }))
        .unwrap();
        assert_eq!(RawLog::from(log).block_timestamp, None);
    }

    fn transport(retry_count: u32) -> TransportConfig {
        TransportConfig {
            retry_count,
            retry_delay_ms: 100,
            ..TransportConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_request_is_retried() {
        let attempts = AtomicU32::new(0);
        let result = with_retry(&transport(3), || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(CallError::Rpc {
                        code: -32005,
                        message: "request rate exceeded".to_string(),
                    })
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(2));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_is_bounded() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), CallError> = with_retry(&transport(3), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(CallError::Transport("connection reset".to_string())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_revert_is_not_retried() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), CallError> = with_retry(&transport(3), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(CallError::Reverted("execution reverted".to_string())) }
        })
        .await;

        assert_eq!(result, Err(CallError::Reverted("execution reverted".to_string())));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_rpc_log_conversion() {
        let log: RpcLog = serde_json::from_value(json!({
            "address": "0x4b001ec1f48dae2883fa2dba87be7adc66f1b3f7",
            "topics": ["0x0000000000000000000000000000000000000000000000000000000000000001"],
            "data": "0x",
            "blockNumber": "0x10",
            "logIndex": "0x2",
            "blockTimestamp": "0x6553f100",
            "transactionHash": "0x00",
        }))
        .unwrap();

        let raw = RawLog::from(log);
        assert_eq!(raw.block_number, Some(16));
        assert_eq!(raw.log_index, Some(2));
        assert_eq!(raw.block_timestamp, Some(0x6553f100));
        assert!(raw.data.is_empty());
    }
}
