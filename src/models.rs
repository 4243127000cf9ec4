// src/models.rs
use alloy::primitives::U256;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;

/// Integer amount in a chain's smallest unit (wei, sun).
pub type Amount = U256;

/// Supported networks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chain {
    Ethereum,
    Tron,
}

impl Chain {
    pub fn symbol(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ETH",
            Chain::Tron => "TRX",
        }
    }

    /// Decimals between the smallest unit and one whole coin
    pub fn decimals(&self) -> u32 {
        match self {
            Chain::Ethereum => 18,
            Chain::Tron => 6,
        }
    }

    pub fn tx_url(&self, tx: &TxReference) -> String {
        match self {
            Chain::Ethereum => format!("https://etherscan.io/tx/{}", tx),
            Chain::Tron => format!("https://tronscan.org/#/transaction/{}", tx),
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chain::Ethereum => f.write_str("ethereum"),
            Chain::Tron => f.write_str("tron"),
        }
    }
}

/// An address on one chain controlled by the service's secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub chain: Chain,
    pub address: String,
}

impl Account {
    pub fn new(chain: Chain, address: impl Into<String>) -> Self {
        Self {
            chain,
            address: address.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BalanceSnapshot {
    pub chain: Chain,
    pub address: String,
    pub amount: Amount,
    pub observed_at: DateTime<Utc>,
}

/// Fee model for a single transfer at the moment it was quoted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostEstimate {
    pub chain: Chain,
    pub unit_price: Amount,
    pub units_required: Amount,
}

impl CostEstimate {
    pub fn new(chain: Chain, unit_price: impl Into<Amount>, units_required: impl Into<Amount>) -> Self {
        Self {
            chain,
            unit_price: unit_price.into(),
            units_required: units_required.into(),
        }
    }

    /// `unit_price * units_required`, `None` if the product does not fit.
    pub fn total(&self) -> Option<Amount> {
        self.unit_price.checked_mul(self.units_required)
    }
}

/// Transaction hash / id returned by a successful submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReference(pub String);

impl fmt::Display for TxReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub enum SweepOutcome {
    Success {
        chain: Chain,
        amount: Amount,
        tx: TxReference,
        timestamp: DateTime<Utc>,
    },
    Failure {
        chain: Chain,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl SweepOutcome {
    pub fn success(chain: Chain, amount: Amount, tx: TxReference) -> Self {
        SweepOutcome::Success {
            chain,
            amount,
            tx,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(chain: Chain, reason: impl Into<String>) -> Self {
        SweepOutcome::Failure {
            chain,
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn chain(&self) -> Chain {
        match self {
            SweepOutcome::Success { chain, .. } | SweepOutcome::Failure { chain, .. } => *chain,
        }
    }

    /// Operator-facing notification text
    pub fn message(&self) -> String {
        match self {
            SweepOutcome::Success { chain, amount, tx, .. } => format!(
                "⚡ {sym} Forwarded: {} {sym}\nTx: {}",
                format_amount(*amount, chain.decimals()),
                chain.tx_url(tx),
                sym = chain.symbol(),
            ),
            SweepOutcome::Failure { chain, reason, .. } => {
                format!("❌ {} sweep failed: {}", chain.symbol(), reason)
            }
        }
    }
}

/// Render a smallest-unit amount in whole coins, e.g. 4_900_000 sun -> "4.9".
/// Amounts too large for `Decimal` fall back to the raw integer.
pub fn format_amount(amount: Amount, decimals: u32) -> String {
    i128::try_from(amount)
        .ok()
        .and_then(|raw| Decimal::try_from_i128_with_scale(raw, decimals).ok())
        .map(|d| d.normalize().to_string())
        .unwrap_or_else(|| format!("{} (10^-{} units)", amount, decimals))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount_whole_units() {
        assert_eq!(format_amount(U256::from(4_900_000u64), 6), "4.9");
        assert_eq!(format_amount(U256::from(1_000_000u64), 6), "1");
        assert_eq!(
            format_amount(U256::from(1_500_000_000_000_000_000u128), 18),
            "1.5"
        );
        assert_eq!(format_amount(U256::ZERO, 18), "0");
    }

    #[test]
    fn test_format_amount_overflow_falls_back_to_raw() {
        let s = format_amount(U256::MAX, 18);
        assert!(s.starts_with(&U256::MAX.to_string()));
    }

    #[test]
    fn test_cost_total_overflow_is_none() {
        let cost = CostEstimate::new(Chain::Ethereum, U256::MAX, U256::from(2u8));
        assert_eq!(cost.total(), None);

        let cost = CostEstimate::new(Chain::Ethereum, U256::from(2u8), U256::from(21_000u64));
        assert_eq!(cost.total(), Some(U256::from(42_000u64)));
    }

    #[test]
    fn test_success_message_has_amount_and_explorer_link() {
        let outcome = SweepOutcome::success(
            Chain::Tron,
            U256::from(4_900_000u64),
            TxReference("abc123".to_string()),
        );
        let msg = outcome.message();
        assert!(msg.contains("TRX Forwarded: 4.9 TRX"));
        assert!(msg.contains("https://tronscan.org/#/transaction/abc123"));
    }

    #[test]
    fn test_failure_message() {
        let outcome = SweepOutcome::failure(Chain::Ethereum, "Transfer rejected: nonce too low");
        assert_eq!(
            outcome.message(),
            "❌ ETH sweep failed: Transfer rejected: nonce too low"
        );
    }
}
