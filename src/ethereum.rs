// src/ethereum.rs
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::{RpcError, TransportErrorKind};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::chain::{ensure_owner, ChainAdapter};
use crate::error::ChainError;
use crate::models::{Account, Amount, Chain, CostEstimate, TxReference};

/// Gas used by a plain value transfer
pub const TRANSFER_GAS: u64 = 21_000;

/// EVM JSON-RPC adapter. Sends legacy transfers so the fee is exactly
/// `gas_price * gas_limit` and the sweep leaves nothing behind.
pub struct EthereumAdapter {
    provider: DynProvider,
    account: Account,
    from: Address,
    gas_limit: u64,
}

impl EthereumAdapter {
    pub fn new(rpc_url: &str, signer: PrivateKeySigner, gas_limit: u64) -> Result<Self, ChainError> {
        let url: reqwest::Url = rpc_url
            .parse()
            .map_err(|e| ChainError::Network(format!("invalid RPC url {}: {}", rpc_url, e)))?;

        let from = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();

        info!("Ethereum adapter for {} → {}", from, rpc_url);

        Ok(Self {
            provider,
            account: Account::new(Chain::Ethereum, from.to_checksum(None)),
            from,
            gas_limit,
        })
    }

    pub fn account(&self) -> &Account {
        &self.account
    }
}

#[async_trait]
impl ChainAdapter for EthereumAdapter {
    async fn get_spendable_balance(&self, account: &Account) -> Result<Amount, ChainError> {
        ensure_owner(&self.account, account)?;
        debug!("📡 eth_getBalance {} pending", self.from);
        // pending, so a sweep still in the mempool is already subtracted
        self.provider
            .get_balance(self.from)
            .pending()
            .await
            .map_err(|e| classify(e, false))
    }

    async fn estimate_transfer_cost(&self, account: &Account) -> Result<CostEstimate, ChainError> {
        ensure_owner(&self.account, account)?;
        let gas_price = self
            .provider
            .get_gas_price()
            .await
            .map_err(|e| classify(e, false))?;
        debug!("📡 eth_gasPrice = {} wei", gas_price);

        Ok(CostEstimate::new(
            Chain::Ethereum,
            Amount::from(gas_price),
            Amount::from(self.gas_limit),
        ))
    }

    async fn submit_transfer(
        &self,
        from: &Account,
        to: &str,
        amount: Amount,
        quote: &CostEstimate,
    ) -> Result<TxReference, ChainError> {
        ensure_owner(&self.account, from)?;

        let to: Address = to
            .parse()
            .map_err(|_| ChainError::Rejected(format!("invalid destination {}", to)))?;
        let gas_price = u128::try_from(quote.unit_price)
            .map_err(|_| ChainError::Rejected(format!("gas price {} out of range", quote.unit_price)))?;
        let gas_limit = u64::try_from(quote.units_required)
            .map_err(|_| ChainError::Rejected(format!("gas limit {} out of range", quote.units_required)))?;

        let tx = TransactionRequest::default()
            .with_from(self.from)
            .with_to(to)
            .with_value(amount)
            .with_gas_limit(gas_limit)
            .with_gas_price(gas_price);

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| classify(e, true))?;

        Ok(TxReference(pending.tx_hash().to_string()))
    }
}

/// Map an alloy RPC error onto the adapter taxonomy. Node-side error
/// responses to a submission count as rejections.
fn classify(e: RpcError<TransportErrorKind>, submitting: bool) -> ChainError {
    if let Some(resp) = e.as_error_resp() {
        let msg = resp.message.to_string();
        if msg.to_lowercase().contains("insufficient funds") {
            ChainError::InsufficientFunds(msg)
        } else if submitting {
            ChainError::Rejected(msg)
        } else {
            ChainError::Rpc(msg)
        }
    } else if e.is_transport_error() {
        ChainError::Network(e.to_string())
    } else {
        ChainError::Rpc(e.to_string())
    }
}
