// src/policy.rs
//! Sweep amount computation.
//!
//! Two reserve strategies exist across the supported chains:
//! - fee deducted from the transfer: the sender pays `unit_price * units_required`
//!   out of the balance being swept, so the fee is subtracted from the amount;
//! - fixed reserve: a constant amount stays behind untouched (Tron bandwidth).

use crate::models::{Amount, CostEstimate};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepPolicy {
    FeeDeducted,
    FixedReserve(Amount),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Balance does not exceed the reserve cost
    BelowReserve { balance: Amount, reserve: Amount },
    /// The fee quote overflowed; treated as unaffordable
    CostOverflow,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::BelowReserve { balance, reserve } => {
                write!(f, "below reserve (balance {} <= reserve {})", balance, reserve)
            }
            SkipReason::CostOverflow => f.write_str("fee estimate overflow"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepDecision {
    /// `0 < amount <= balance`
    Sweep { amount: Amount },
    Skip { reason: SkipReason },
}

impl SweepDecision {
    pub fn should_sweep(&self) -> bool {
        matches!(self, SweepDecision::Sweep { .. })
    }

    pub fn amount(&self) -> Option<Amount> {
        match self {
            SweepDecision::Sweep { amount } => Some(*amount),
            SweepDecision::Skip { .. } => None,
        }
    }
}

impl SweepPolicy {
    /// Amount that must not leave the account this cycle.
    pub fn reserve_cost(&self, cost: &CostEstimate) -> Option<Amount> {
        match self {
            SweepPolicy::FeeDeducted => cost.total(),
            SweepPolicy::FixedReserve(reserve) => Some(*reserve),
        }
    }

    /// True when a fixed reserve cannot pay for the quoted transfer, e.g. a
    /// Tron account out of free bandwidth that must burn 270 bytes at
    /// 1,000 sun each. The sweep still goes ahead; the node has the last word.
    pub fn fee_exceeds_reserve(&self, cost: &CostEstimate) -> bool {
        match self {
            SweepPolicy::FeeDeducted => false,
            SweepPolicy::FixedReserve(reserve) => cost.total().map_or(true, |fee| fee > *reserve),
        }
    }

    /// Pure: the same inputs always yield the same decision.
    pub fn evaluate(&self, balance: Amount, cost: &CostEstimate) -> SweepDecision {
        let Some(reserve) = self.reserve_cost(cost) else {
            return SweepDecision::Skip {
                reason: SkipReason::CostOverflow,
            };
        };

        // checked_sub is None when reserve > balance
        match balance.checked_sub(reserve) {
            Some(spendable) if !spendable.is_zero() => SweepDecision::Sweep { amount: spendable },
            _ => SweepDecision::Skip {
                reason: SkipReason::BelowReserve { balance, reserve },
            },
        }
    }
}
