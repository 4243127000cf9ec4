// src/tron.rs
use alloy::primitives::B256;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::chain::{ensure_owner, ChainAdapter};
use crate::error::ChainError;
use crate::keys;
use crate::models::{Account, Amount, Chain, CostEstimate, TxReference};

/// Bandwidth points consumed by a signed TRX transfer (upper bound)
pub const TRANSFER_BANDWIDTH: u64 = 270;
/// Sun burned per bandwidth point once free bandwidth is exhausted
pub const BANDWIDTH_PRICE_SUN: u64 = 1_000;

#[derive(Debug, Deserialize)]
struct AccountResponse {
    #[serde(default)]
    balance: u64,
    #[serde(rename = "Error")]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResource {
    #[serde(default)]
    free_net_limit: u64,
    #[serde(default)]
    free_net_used: u64,
    #[serde(default, rename = "NetLimit")]
    net_limit: u64,
    #[serde(default, rename = "NetUsed")]
    net_used: u64,
}

impl AccountResource {
    fn available_bandwidth(&self) -> u64 {
        self.free_net_limit.saturating_sub(self.free_net_used)
            + self.net_limit.saturating_sub(self.net_used)
    }
}

#[derive(Debug, Deserialize)]
struct BroadcastResponse {
    #[serde(default)]
    result: bool,
    txid: Option<String>,
    code: Option<String>,
    message: Option<String>,
}

/// Tron full-node HTTP API adapter. Transactions are built by the node,
/// checked locally, signed with the derived key and broadcast.
pub struct TronAdapter {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    signer: PrivateKeySigner,
    account: Account,
}

impl TronAdapter {
    pub fn new(api_url: &str, api_key: Option<String>, signer: PrivateKeySigner) -> Result<Self, ChainError> {
        let client = Client::builder().build()?;
        let address = keys::tron_address(&signer.address());

        info!("Tron adapter for {} → {}", address, api_url);

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            signer,
            account: Account::new(Chain::Tron, address),
        })
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, ChainError> {
        let mut req = self.client.post(format!("{}{}", self.api_url, path)).json(body);
        if let Some(key) = &self.api_key {
            req = req.header("TRON-PRO-API-KEY", key);
        }

        debug!("📡 POST {}", path);
        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(ChainError::Rpc(format!("HTTP {} from {}", resp.status(), path)));
        }

        let text = resp.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ChainError::Rpc(format!("malformed response from {}: {}", path, e)))
    }
}

#[async_trait]
impl ChainAdapter for TronAdapter {
    async fn get_spendable_balance(&self, account: &Account) -> Result<Amount, ChainError> {
        ensure_owner(&self.account, account)?;
        let resp: AccountResponse = self
            .post(
                "/wallet/getaccount",
                &json!({ "address": account.address, "visible": true }),
            )
            .await?;

        if let Some(err) = resp.error {
            return Err(ChainError::Rpc(err));
        }
        // an account that never received TRX comes back as `{}`
        Ok(Amount::from(resp.balance))
    }

    async fn estimate_transfer_cost(&self, account: &Account) -> Result<CostEstimate, ChainError> {
        ensure_owner(&self.account, account)?;
        let res: AccountResource = self
            .post(
                "/wallet/getaccountresource",
                &json!({ "address": account.address, "visible": true }),
            )
            .await?;

        let bandwidth = res.available_bandwidth();
        let units = if bandwidth >= TRANSFER_BANDWIDTH { 0 } else { TRANSFER_BANDWIDTH };
        debug!("Tron bandwidth available {} → {} units billed", bandwidth, units);

        Ok(CostEstimate::new(
            Chain::Tron,
            Amount::from(BANDWIDTH_PRICE_SUN),
            Amount::from(units),
        ))
    }

    async fn submit_transfer(
        &self,
        from: &Account,
        to: &str,
        amount: Amount,
        _quote: &CostEstimate,
    ) -> Result<TxReference, ChainError> {
        ensure_owner(&self.account, from)?;
        keys::parse_tron_address(to)
            .map_err(|_| ChainError::Rejected(format!("invalid destination {}", to)))?;
        let sun = i64::try_from(amount)
            .map_err(|_| ChainError::Rejected(format!("amount {} exceeds TRX range", amount)))?;

        let mut tx: Value = self
            .post(
                "/wallet/createtransaction",
                &json!({
                    "owner_address": from.address,
                    "to_address": to,
                    "amount": sun,
                    "visible": true,
                }),
            )
            .await?;

        if let Some(err) = tx.get("Error").and_then(Value::as_str) {
            return Err(classify_message(err));
        }

        check_transfer(&tx, &from.address, to, sun)?;
        let txid = verified_txid(&tx)?;

        let signature = self
            .signer
            .sign_hash_sync(&txid)
            .map_err(|e| ChainError::Rejected(format!("signing failed: {}", e)))?;
        tx["signature"] = json!([hex::encode(signature.as_bytes())]);

        let resp: BroadcastResponse = self.post("/wallet/broadcasttransaction", &tx).await?;
        if !resp.result {
            let code = resp.code.unwrap_or_else(|| "UNKNOWN".to_string());
            let message = resp.message.as_deref().map(decode_message).unwrap_or_default();
            return Err(classify_message(&format!("{}: {}", code, message)));
        }

        let id = resp.txid.unwrap_or_else(|| hex::encode(txid));
        Ok(TxReference(id))
    }
}

/// The node echoes the transfer contract back; refuse to sign anything else.
fn check_transfer(tx: &Value, owner: &str, to: &str, amount: i64) -> Result<(), ChainError> {
    let value = &tx["raw_data"]["contract"][0]["parameter"]["value"];
    let matches = value["owner_address"].as_str() == Some(owner)
        && value["to_address"].as_str() == Some(to)
        && value["amount"].as_i64() == Some(amount);

    if !matches {
        return Err(ChainError::Rejected(
            "node returned a transaction that does not match the requested transfer".to_string(),
        ));
    }
    Ok(())
}

/// `txID` must be sha256 of the raw transaction bytes.
fn verified_txid(tx: &Value) -> Result<B256, ChainError> {
    let bad = |why: &str| ChainError::Rpc(format!("invalid transaction from node: {}", why));

    let raw_hex = tx["raw_data_hex"].as_str().ok_or_else(|| bad("missing raw_data_hex"))?;
    let txid_hex = tx["txID"].as_str().ok_or_else(|| bad("missing txID"))?;

    let raw = hex::decode(raw_hex).map_err(|_| bad("raw_data_hex is not hex"))?;
    let txid = hex::decode(txid_hex).map_err(|_| bad("txID is not hex"))?;

    let digest = Sha256::digest(&raw);
    if txid.len() != 32 || digest.as_slice() != txid.as_slice() {
        return Err(bad("txID does not match raw_data_hex"));
    }
    Ok(B256::from_slice(&txid))
}

/// Broadcast error messages are hex-encoded UTF-8.
fn decode_message(msg: &str) -> String {
    hex::decode(msg)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| msg.to_string())
}

fn classify_message(msg: &str) -> ChainError {
    if msg.contains("balance is not sufficient") {
        ChainError::InsufficientFunds(msg.to_string())
    } else {
        ChainError::Rejected(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: &str = "TJRabPrwbZy45sbavfcjinPJC18kjpRTv8";
    const TO: &str = "TVDGpn4hCSzJ5nkHPLetk8KQBtwaTppnkr";

    fn tx_with(raw: &[u8], amount: i64) -> Value {
        json!({
            "txID": hex::encode(Sha256::digest(raw)),
            "raw_data_hex": hex::encode(raw),
            "raw_data": {
                "contract": [{
                    "parameter": {
                        "value": {
                            "owner_address": OWNER,
                            "to_address": TO,
                            "amount": amount,
                        }
                    }
                }]
            }
        })
    }

    #[test]
    fn test_verified_txid_accepts_matching_hash() {
        let tx = tx_with(b"raw transfer bytes", 4_900_000);
        let txid = verified_txid(&tx).unwrap();
        assert_eq!(txid.as_slice(), Sha256::digest(b"raw transfer bytes").as_slice());
    }

    #[test]
    fn test_verified_txid_rejects_tampered_id() {
        let mut tx = tx_with(b"raw transfer bytes", 4_900_000);
        tx["txID"] = json!(hex::encode([0u8; 32]));
        assert!(verified_txid(&tx).is_err());

        tx["txID"] = json!("zz");
        assert!(verified_txid(&tx).is_err());
    }

    #[test]
    fn test_check_transfer_requires_exact_contract() {
        let tx = tx_with(b"x", 4_900_000);
        assert!(check_transfer(&tx, OWNER, TO, 4_900_000).is_ok());
        assert!(check_transfer(&tx, OWNER, TO, 5_000_000).is_err());
        assert!(check_transfer(&tx, OWNER, OWNER, 4_900_000).is_err());
    }

    #[test]
    fn test_broadcast_error_decoding() {
        let hex_msg = hex::encode("Validate TransferContract error, balance is not sufficient.");
        let decoded = decode_message(&hex_msg);
        assert!(decoded.contains("balance is not sufficient"));
        assert!(matches!(
            classify_message(&format!("CONTRACT_VALIDATE_ERROR: {}", decoded)),
            ChainError::InsufficientFunds(_)
        ));

        assert_eq!(decode_message("plain text"), "plain text");
        assert!(matches!(classify_message("SIGERROR: bad sig"), ChainError::Rejected(_)));
    }

    #[test]
    fn test_available_bandwidth() {
        let res: AccountResource = serde_json::from_value(json!({
            "freeNetLimit": 600,
            "freeNetUsed": 400,
            "NetLimit": 100,
            "NetUsed": 20
        }))
        .unwrap();
        assert_eq!(res.available_bandwidth(), 280);

        let empty: AccountResource = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty.available_bandwidth(), 0);
    }

    #[test]
    fn test_inactive_account_has_zero_balance() {
        let resp: AccountResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(resp.balance, 0);
        assert!(resp.error.is_none());
    }
}
