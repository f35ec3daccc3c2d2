use alloy_primitives::Address;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::explorer::ExplorerApi;
use crate::models::common::ExplorerConfig;
use crate::models::datasets::logs::RawLogEntry;
use crate::models::datasets::transactions::RpcTransactionData;
use crate::models::errors::ExplorerError;
use crate::utils::{format_address, strip_html};

const START_BLOCK: &str = "0";
const END_BLOCK: &str = "99999999";

/// Etherscan-compatible (v2, multichain) explorer client.
pub struct EtherscanClient {
    http: reqwest::Client,
    base_url: Url,
    chain_id: u64,
    api_key: String,
    list_timeout: Duration,
    receipt_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ProxyResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ReceiptResult {
    #[serde(default)]
    logs: Vec<RawLogEntry>,
}

impl EtherscanClient {
    pub fn new(config: &ExplorerConfig, chain_id: u64, api_key: &str) -> Result<Self> {
        let base_url: Url = config
            .base_url
            .parse()
            .with_context(|| format!("invalid explorer base URL: {}", config.base_url))?;

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url,
            chain_id,
            api_key: api_key.to_string(),
            list_timeout: Duration::from_secs(config.list_timeout_secs),
            receipt_timeout: Duration::from_secs(config.receipt_timeout_secs),
        })
    }

    async fn get(
        &self,
        params: &[(&str, String)],
        timeout: Duration,
    ) -> Result<String, ExplorerError> {
        let mut query = vec![
            ("chainid", self.chain_id.to_string()),
            ("apikey", self.api_key.clone()),
        ];
        query.extend(params.iter().map(|(k, v)| (*k, v.clone())));

        let response = self
            .http
            .get(self.base_url.clone())
            .query(&query)
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.text().await?)
    }
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, ExplorerError> {
    serde_json::from_str(body).map_err(|e| {
        let snippet: String = body.chars().take(200).collect();
        ExplorerError::Decode(format!("{}: {}", e, strip_html(&snippet)))
    })
}

pub(crate) fn parse_transaction_list(
    body: &str,
) -> Result<Vec<RpcTransactionData>, ExplorerError> {
    let response: StatusResponse = parse_body(body)?;

    if response.status.as_deref() != Some("1") {
        // An address without history is reported as status 0 with an empty list
        if response.result.as_array().is_some_and(|entries| entries.is_empty()) {
            return Ok(Vec::new());
        }
        return Err(ExplorerError::Api {
            message: response
                .message
                .unwrap_or_else(|| "Unknown error".to_string()),
        });
    }

    serde_json::from_value(response.result).map_err(|e| ExplorerError::Decode(e.to_string()))
}

pub(crate) fn parse_receipt(body: &str) -> Result<Option<Vec<RawLogEntry>>, ExplorerError> {
    let response: ProxyResponse = parse_body(body)?;

    match response.result {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(value @ serde_json::Value::Object(_)) => {
            let receipt: ReceiptResult = serde_json::from_value(value)
                .map_err(|e| ExplorerError::Decode(e.to_string()))?;
            Ok(Some(receipt.logs))
        }
        // Rate-limit notices and similar arrive as a bare string in `result`
        Some(serde_json::Value::String(notice)) => Err(ExplorerError::Decode(notice)),
        Some(other) => Err(ExplorerError::Decode(format!(
            "unexpected receipt result: {other}"
        ))),
    }
}

#[async_trait]
impl ExplorerApi for EtherscanClient {
    async fn transaction_list(
        &self,
        address: &Address,
    ) -> Result<Vec<RpcTransactionData>, ExplorerError> {
        debug!("Requesting txlist for {}", format_address(address));
        let body = self
            .get(
                &[
                    ("module", "account".to_string()),
                    ("action", "txlist".to_string()),
                    ("address", format_address(address)),
                    ("startblock", START_BLOCK.to_string()),
                    ("endblock", END_BLOCK.to_string()),
                    ("sort", "desc".to_string()),
                ],
                self.list_timeout,
            )
            .await?;
        parse_transaction_list(&body)
    }

    async fn transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<Option<Vec<RawLogEntry>>, ExplorerError> {
        let body = self
            .get(
                &[
                    ("module", "proxy".to_string()),
                    ("action", "eth_getTransactionReceipt".to_string()),
                    ("txhash", tx_hash.to_string()),
                ],
                self.receipt_timeout,
            )
            .await?;
        parse_receipt(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transaction_list_success() {
        let body = r#"{
            "status": "1",
            "message": "OK",
            "result": [{
                "blockNumber": "20000000",
                "timeStamp": "1751119500",
                "hash": "0xabc",
                "from": "0x1111111111111111111111111111111111111111",
                "to": "0x9dd23a4a0845f10d65d293776b792af1131c7b30",
                "gasPrice": "70000000",
                "gasUsed": "51234",
                "input": "0xdeadbeef",
                "isError": "0"
            }]
        }"#;

        let txs = parse_transaction_list(body).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].hash, "0xabc");
        assert_eq!(txs[0].time_stamp, "1751119500");
        assert_eq!(txs[0].gas_used, "51234");
    }

    #[test]
    fn test_parse_transaction_list_api_error() {
        let body = r#"{"status":"0","message":"NOTOK","result":"Invalid API Key"}"#;
        assert_eq!(
            parse_transaction_list(body),
            Err(ExplorerError::Api {
                message: "NOTOK".to_string()
            })
        );
    }

    #[test]
    fn test_parse_transaction_list_no_history_is_empty() {
        let body = r#"{"status":"0","message":"No transactions found","result":[]}"#;
        assert_eq!(parse_transaction_list(body), Ok(Vec::new()));
    }

    #[test]
    fn test_parse_receipt_logs() {
        let body = r#"{
            "jsonrpc": "2.0",
            "id": 1,
            "result": {
                "status": "0x1",
                "logs": [{
                    "address": "0x176211869ca2b568f2a7d4ee941e073a821ee1ff",
                    "topics": ["0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"],
                    "data": "0x01",
                    "logIndex": "0x0"
                }]
            }
        }"#;

        let logs = parse_receipt(body).unwrap().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].data, "0x01");
        assert_eq!(logs[0].topics.len(), 1);
    }

    #[test]
    fn test_parse_receipt_without_result() {
        assert_eq!(parse_receipt(r#"{"jsonrpc":"2.0","id":1,"result":null}"#), Ok(None));
        assert_eq!(parse_receipt(r#"{"jsonrpc":"2.0","id":1}"#), Ok(None));
    }

    #[test]
    fn test_parse_receipt_rate_limit_notice_is_retryable() {
        let body = r#"{"status":"0","message":"NOTOK","result":"Max rate limit reached"}"#;
        let err = parse_receipt(body).unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_html_body_is_decode_error() {
        let body = "<!doctype html>\n<html>\n<body>\nBad Gateway\n</body>\n</html>";
        match parse_receipt(body) {
            Err(ExplorerError::Decode(message)) => assert!(message.contains("Bad Gateway")),
            other => panic!("expected decode error, got {other:?}"),
        }
    }
}
