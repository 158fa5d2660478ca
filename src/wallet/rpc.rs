//! Minimal JSON-RPC client for the chain node.

use crate::error::{Error, Result};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Native currency has 18 fractional digits.
const WEI_SCALE: u32 = 18;

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// JSON-RPC over HTTP.
pub struct RpcClient {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send a request. A `null` result comes back as `None`.
    async fn call_optional(&self, method: &str, params: Value) -> Result<Option<Value>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });
        debug!("RPC {} #{}", method, id);

        let response: RpcResponse = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(Error::rpc(format!("{} ({})", err.message, err.code)));
        }
        Ok(response.result)
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        self.call_optional(method, params)
            .await?
            .ok_or_else(|| Error::rpc(format!("{} returned no result", method)))
    }

    /// `eth_chainId`.
    pub async fn chain_id(&self) -> Result<u64> {
        let result = self.call("eth_chainId", json!([])).await?;
        let quantity = parse_quantity(as_hex(&result)?)?;
        u64::try_from(quantity).map_err(|_| Error::rpc("chain id out of range"))
    }

    /// `eth_getBalance` at the latest block, in whole currency units.
    pub async fn balance(&self, address: &str) -> Result<Decimal> {
        let result = self
            .call("eth_getBalance", json!([address, "latest"]))
            .await?;
        wei_to_decimal(as_hex(&result)?)
    }

    /// `eth_getTransactionReceipt`. `None` until the transaction is mined.
    pub async fn receipt(&self, tx_hash: &str) -> Result<Option<TransactionReceipt>> {
        self.call_optional("eth_getTransactionReceipt", json!([tx_hash]))
            .await?
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| Error::rpc(format!("malformed receipt: {}", e)))
    }

    /// `eth_getTransactionByHash`.
    pub async fn transaction(&self, tx_hash: &str) -> Result<Option<Transaction>> {
        self.call_optional("eth_getTransactionByHash", json!([tx_hash]))
            .await?
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| Error::rpc(format!("malformed transaction: {}", e)))
    }
}

/// The fields of a receipt the recharge check reads.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionReceipt {
    #[serde(default)]
    pub status: Option<String>,
}

impl TransactionReceipt {
    /// Post-Byzantium status; `0x1` is success.
    pub fn succeeded(&self) -> bool {
        self.status
            .as_deref()
            .and_then(|s| parse_quantity(s).ok())
            .is_some_and(|s| s == 1)
    }
}

/// The fields of a transaction the recharge check reads.
#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    pub from: String,
    /// Absent for contract creation.
    #[serde(default)]
    pub to: Option<String>,
    pub value: String,
}

fn as_hex(value: &Value) -> Result<&str> {
    value
        .as_str()
        .ok_or_else(|| Error::rpc(format!("expected hex quantity, got {}", value)))
}

/// Parse a `0x`-prefixed hex quantity.
pub fn parse_quantity(hex: &str) -> Result<u128> {
    let digits = hex.strip_prefix("0x").unwrap_or(hex);
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| Error::rpc(format!("invalid quantity {}: {}", hex, e)))
}

/// Convert a wei quantity to a decimal amount.
pub fn wei_to_decimal(hex: &str) -> Result<Decimal> {
    let wei = parse_quantity(hex)?;
    let wei = i128::try_from(wei).map_err(|_| Error::rpc("balance out of range"))?;
    Decimal::try_from_i128_with_scale(wei, WEI_SCALE)
        .map(|d| d.normalize())
        .map_err(|e| Error::rpc(format!("balance out of range: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_wei_to_decimal() {
        assert_eq!(wei_to_decimal("0x0").unwrap(), Decimal::ZERO);
        // 1.5 ether
        assert_eq!(wei_to_decimal("0x14d1120d7b160000").unwrap(), dec!(1.5));
        // 1 wei
        assert_eq!(
            wei_to_decimal("0x1").unwrap(),
            Decimal::from_i128_with_scale(1, 18)
        );
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x13882").unwrap(), 80002);
        assert_eq!(parse_quantity("0x").unwrap(), 0);
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn test_rpc_error_body() {
        let response: RpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"method not found"}}"#,
        )
        .unwrap();
        assert!(response.result.is_none());
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[test]
    fn test_pending_receipt_is_null() {
        let response: RpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":3,"result":null}"#).unwrap();
        assert!(response.result.is_none());
    }

    #[test]
    fn test_receipt_status() {
        let ok: TransactionReceipt =
            serde_json::from_value(json!({"status": "0x1", "blockNumber": "0x10"})).unwrap();
        assert!(ok.succeeded());
        let reverted: TransactionReceipt =
            serde_json::from_value(json!({"status": "0x0"})).unwrap();
        assert!(!reverted.succeeded());
        let legacy: TransactionReceipt = serde_json::from_value(json!({"root": "0xab"})).unwrap();
        assert!(!legacy.succeeded());
    }

    #[test]
    fn test_transaction_fields() {
        let tx: Transaction = serde_json::from_value(json!({
            "from": "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf",
            "to": null,
            "value": "0xde0b6b3a7640000",
            "nonce": "0x0"
        }))
        .unwrap();
        assert!(tx.to.is_none());
        assert_eq!(wei_to_decimal(&tx.value).unwrap(), dec!(1));
    }
}
