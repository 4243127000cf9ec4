// src/worker.rs
//! Per-chain polling loop.
//!
//! Each cycle runs `Querying -> Evaluating -> (Sweeping | Idle) -> Reporting`
//! to completion before the next tick is honoured. Ticks that fire while a
//! cycle is in flight are skipped, so one account never has two cycles
//! (and never two submissions from the same balance read) at once.

use chrono::Utc;
use futures_util::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval, timeout, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::chain::ChainAdapter;
use crate::config::{DEFAULT_CALL_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS};
use crate::error::{ChainError, NotifyError};
use crate::models::{Account, BalanceSnapshot, Chain, CostEstimate, SweepOutcome};
use crate::notifier::Notifier;
use crate::policy::{SkipReason, SweepDecision, SweepPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Querying,
    Evaluating,
    Sweeping,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CyclePhase::Querying => f.write_str("querying"),
            CyclePhase::Evaluating => f.write_str("evaluating"),
            CyclePhase::Sweeping => f.write_str("sweeping"),
        }
    }
}

/// What a single cycle ended with
#[derive(Debug, Clone)]
pub enum CycleReport {
    /// Nothing above the reserve; routine, never notified
    Idle(SkipReason),
    Swept(SweepOutcome),
    Failed { phase: CyclePhase, outcome: SweepOutcome },
}

impl CycleReport {
    /// Notified: successful sweeps, and failures in the `Evaluating` or
    /// `Sweeping` phase. Not notified: idle cycles and `Querying` failures,
    /// which repeat every tick while a node is down and only get logged.
    pub fn should_notify(&self) -> bool {
        match self {
            CycleReport::Idle(_) => false,
            CycleReport::Swept(_) => true,
            CycleReport::Failed { phase, .. } => *phase != CyclePhase::Querying,
        }
    }

    pub fn outcome(&self) -> Option<&SweepOutcome> {
        match self {
            CycleReport::Idle(_) => None,
            CycleReport::Swept(outcome) | CycleReport::Failed { outcome, .. } => Some(outcome),
        }
    }
}

/// Drives one chain adapter on a fixed interval.
pub struct SweepWorker {
    account: Account,
    adapter: Arc<dyn ChainAdapter>,
    policy: SweepPolicy,
    notifier: Option<Arc<dyn Notifier>>,
    destination: String,
    interval: Duration,
    call_timeout: Duration,
}

impl SweepWorker {
    pub fn new(
        account: Account,
        adapter: Arc<dyn ChainAdapter>,
        policy: SweepPolicy,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            account,
            adapter,
            policy,
            notifier: None,
            destination: destination.into(),
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            call_timeout: Duration::from_millis(DEFAULT_CALL_TIMEOUT_MS),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Bound applied to every adapter and notifier call
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn chain(&self) -> Chain {
        self.account.chain
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Poll until `shutdown` changes (or its sender goes away).
    /// A cycle that is running when shutdown arrives is finished first.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let chain = self.chain();
        info!(
            "🔁 {} worker started: {} → {} every {:?}",
            chain, self.account.address, self.destination, self.interval
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {}
            }

            // outside the select so shutdown never cancels a cycle
            self.run_cycle().await;
        }

        info!("{} worker stopped", chain);
    }

    /// Run exactly one cycle including its reporting step.
    pub async fn run_cycle(&self) -> CycleReport {
        let mut phase = CyclePhase::Querying;
        let result = AssertUnwindSafe(self.cycle(&mut phase)).catch_unwind().await;

        let report = match result {
            Ok(report) => report,
            // attributed to whichever phase was running when it unwound
            Err(panic) => CycleReport::Failed {
                phase,
                outcome: SweepOutcome::failure(
                    self.chain(),
                    format!("cycle panicked: {}", panic_message(&*panic)),
                ),
            },
        };

        self.report(&report).await;
        report
    }

    async fn cycle(&self, phase: &mut CyclePhase) -> CycleReport {
        let chain = self.chain();

        *phase = CyclePhase::Querying;
        let (snapshot, cost) = match self.query().await {
            Ok(v) => v,
            Err(e) => {
                return CycleReport::Failed {
                    phase: CyclePhase::Querying,
                    outcome: SweepOutcome::failure(chain, e.to_string()),
                }
            }
        };

        *phase = CyclePhase::Evaluating;
        if cost.chain != chain {
            return CycleReport::Failed {
                phase: CyclePhase::Evaluating,
                outcome: SweepOutcome::failure(
                    chain,
                    format!("cost estimate is for {}, not {}", cost.chain, chain),
                ),
            };
        }

        if self.policy.fee_exceeds_reserve(&cost) {
            warn!(
                "{}: transfer fee {:?} exceeds the fixed reserve {:?}; the transfer may be rejected",
                chain,
                cost.total(),
                self.policy.reserve_cost(&cost)
            );
        }

        let amount = match self.policy.evaluate(snapshot.amount, &cost) {
            SweepDecision::Sweep { amount } => amount,
            SweepDecision::Skip { reason } => return CycleReport::Idle(reason),
        };

        // at most once per cycle, the next poll picks up anything left
        *phase = CyclePhase::Sweeping;
        info!(
            "💸 {}: sweeping {} of {} (reserve {:?}) → {}",
            chain,
            amount,
            snapshot.amount,
            self.policy.reserve_cost(&cost),
            self.destination
        );

        let submission = self
            .adapter
            .submit_transfer(&self.account, &self.destination, amount, &cost);

        match self.bounded(submission).await {
            Ok(tx) => CycleReport::Swept(SweepOutcome::success(chain, amount, tx)),
            Err(ChainError::Timeout(after)) => CycleReport::Failed {
                phase: CyclePhase::Sweeping,
                outcome: SweepOutcome::failure(
                    chain,
                    format!(
                        "submission of {} timed out after {:?}; outcome unknown, not retried",
                        amount, after
                    ),
                ),
            },
            Err(e) => CycleReport::Failed {
                phase: CyclePhase::Sweeping,
                outcome: SweepOutcome::failure(chain, e.to_string()),
            },
        }
    }

    async fn query(&self) -> Result<(BalanceSnapshot, CostEstimate), ChainError> {
        let (amount, cost) = tokio::try_join!(
            self.bounded(self.adapter.get_spendable_balance(&self.account)),
            self.bounded(self.adapter.estimate_transfer_cost(&self.account)),
        )?;

        let snapshot = BalanceSnapshot {
            chain: self.chain(),
            address: self.account.address.clone(),
            amount,
            observed_at: Utc::now(),
        };
        debug!(
            "{}: balance {} at {} (unit price {}, units {})",
            snapshot.chain, snapshot.amount, snapshot.observed_at, cost.unit_price, cost.units_required
        );

        Ok((snapshot, cost))
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, ChainError>
    where
        F: Future<Output = Result<T, ChainError>>,
    {
        timeout(self.call_timeout, call)
            .await
            .map_err(|_| ChainError::Timeout(self.call_timeout))?
    }

    async fn report(&self, report: &CycleReport) {
        let chain = self.chain();

        match report {
            CycleReport::Idle(reason) => {
                debug!("{}: nothing to sweep, {}", chain, reason);
                return;
            }
            CycleReport::Swept(outcome) => info!("✅ {}", outcome.message()),
            CycleReport::Failed { phase, outcome } => match phase {
                CyclePhase::Querying => warn!("{}: {} failed: {}", chain, phase, failure_reason(outcome)),
                _ => error!("{}: {} failed: {}", chain, phase, failure_reason(outcome)),
            },
        }

        if !report.should_notify() {
            return;
        }

        if let (Some(notifier), Some(outcome)) = (&self.notifier, report.outcome()) {
            if let Err(e) = self.notify(notifier.as_ref(), &outcome.message()).await {
                // never escalated: the sweep result above is already logged
                warn!("{}: notification failed: {}", chain, e);
            }
        }
    }

    async fn notify(&self, notifier: &dyn Notifier, text: &str) -> Result<(), NotifyError> {
        timeout(self.call_timeout, notifier.notify(text))
            .await
            .map_err(|_| NotifyError::Timeout(self.call_timeout))?
    }
}

fn failure_reason(outcome: &SweepOutcome) -> &str {
    match outcome {
        SweepOutcome::Failure { reason, .. } => reason.as_str(),
        SweepOutcome::Success { .. } => "",
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
