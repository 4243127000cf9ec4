use async_trait::async_trait;

use crate::error::ChainError;
use crate::models::{Account, Amount, CostEstimate, TxReference};

/// Balance, fee and transfer access for one chain.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    /// Balance available for transfer, in the chain's smallest unit
    async fn get_spendable_balance(&self, account: &Account) -> Result<Amount, ChainError>;

    /// Fee model for a single plain transfer right now
    async fn estimate_transfer_cost(&self, account: &Account) -> Result<CostEstimate, ChainError>;

    /// Sign and broadcast `amount` from `from` to `to`.
    ///
    /// `quote` is the estimate the amount was computed from; fee-deducted
    /// chains must price the transaction at exactly that fee.
    async fn submit_transfer(
        &self,
        from: &Account,
        to: &str,
        amount: Amount,
        quote: &CostEstimate,
    ) -> Result<TxReference, ChainError>;
}

/// Guard used by adapters that only sign for their own account.
pub(crate) fn ensure_owner(owner: &Account, from: &Account) -> Result<(), ChainError> {
    if owner != from {
        return Err(ChainError::Rejected(format!(
            "adapter for {} cannot sign for {}",
            owner.address, from.address
        )));
    }
    Ok(())
}
