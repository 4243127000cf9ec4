//! In-memory chain adapter and notifier for driving workers in tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use balance_sweeper::{
    Account, Amount, Chain, ChainAdapter, ChainError, CostEstimate, Notifier, NotifyError,
    TxReference,
};

pub const ETH_DEST: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
pub const TRX_DEST: &str = "TVDGpn4hCSzJ5nkHPLetk8KQBtwaTppnkr";

pub fn account(chain: Chain) -> Account {
    match chain {
        Chain::Ethereum => Account::new(chain, "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
        Chain::Tron => Account::new(chain, "TJRabPrwbZy45sbavfcjinPJC18kjpRTv8"),
    }
}

pub fn amount(v: u64) -> Amount {
    Amount::from(v)
}

pub struct MockAdapter {
    chain: Chain,
    balance: Mutex<Result<Amount, ChainError>>,
    cost: Result<CostEstimate, ChainError>,
    submit_result: Result<TxReference, ChainError>,
    query_delay: Duration,
    submit_delay: Duration,
    drain_on_submit: bool,
    panic_on_submit: bool,
    panic_on_balance: bool,

    pub balance_calls: AtomicUsize,
    pub submits_started: AtomicUsize,
    pub submits_finished: AtomicUsize,
    pub submissions: Mutex<Vec<(String, Amount, CostEstimate)>>,
    submitting: AtomicBool,
    /// set when a balance query ran while a submission was still pending
    pub overlap_seen: AtomicBool,
}

impl MockAdapter {
    pub fn new(chain: Chain, balance: u64, cost: CostEstimate) -> Self {
        Self {
            chain,
            balance: Mutex::new(Ok(amount(balance))),
            cost: Ok(cost),
            submit_result: Ok(TxReference("0xfeed".to_string())),
            query_delay: Duration::ZERO,
            submit_delay: Duration::ZERO,
            drain_on_submit: true,
            panic_on_submit: false,
            panic_on_balance: false,
            balance_calls: AtomicUsize::new(0),
            submits_started: AtomicUsize::new(0),
            submits_finished: AtomicUsize::new(0),
            submissions: Mutex::new(Vec::new()),
            submitting: AtomicBool::new(false),
            overlap_seen: AtomicBool::new(false),
        }
    }

    pub fn ethereum(balance: u64, gas_price: u64) -> Self {
        Self::new(
            Chain::Ethereum,
            balance,
            CostEstimate::new(Chain::Ethereum, amount(gas_price), amount(21_000)),
        )
    }

    pub fn tron(balance: u64) -> Self {
        Self::new(
            Chain::Tron,
            balance,
            CostEstimate::new(Chain::Tron, amount(1_000), amount(0)),
        )
    }

    pub fn failing_balance(mut self, err: ChainError) -> Self {
        self.balance = Mutex::new(Err(err));
        self
    }

    pub fn failing_cost(mut self, err: ChainError) -> Self {
        self.cost = Err(err);
        self
    }

    pub fn failing_submit(mut self, err: ChainError) -> Self {
        self.submit_result = Err(err);
        self
    }

    pub fn panicking_submit(mut self) -> Self {
        self.panic_on_submit = true;
        self
    }

    pub fn panicking_balance(mut self) -> Self {
        self.panic_on_balance = true;
        self
    }

    pub fn query_delay(mut self, d: Duration) -> Self {
        self.query_delay = d;
        self
    }

    pub fn submit_delay(mut self, d: Duration) -> Self {
        self.submit_delay = d;
        self
    }

    /// Keep the balance unchanged after a transfer so every cycle sweeps
    pub fn no_drain(mut self) -> Self {
        self.drain_on_submit = false;
        self
    }

    pub fn submissions(&self) -> Vec<(String, Amount, CostEstimate)> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainAdapter for MockAdapter {
    async fn get_spendable_balance(&self, _account: &Account) -> Result<Amount, ChainError> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        if self.submitting.load(Ordering::SeqCst) {
            self.overlap_seen.store(true, Ordering::SeqCst);
        }
        if self.panic_on_balance {
            panic!("balance decoder exploded");
        }
        if !self.query_delay.is_zero() {
            tokio::time::sleep(self.query_delay).await;
        }
        self.balance.lock().unwrap().clone()
    }

    async fn estimate_transfer_cost(&self, _account: &Account) -> Result<CostEstimate, ChainError> {
        self.cost.clone()
    }

    async fn submit_transfer(
        &self,
        _from: &Account,
        to: &str,
        value: Amount,
        quote: &CostEstimate,
    ) -> Result<TxReference, ChainError> {
        assert_eq!(quote.chain, self.chain);
        self.submits_started.fetch_add(1, Ordering::SeqCst);
        self.submitting.store(true, Ordering::SeqCst);

        if self.panic_on_submit {
            panic!("signer exploded");
        }
        if !self.submit_delay.is_zero() {
            tokio::time::sleep(self.submit_delay).await;
        }

        self.submitting.store(false, Ordering::SeqCst);
        self.submits_finished.fetch_add(1, Ordering::SeqCst);
        self.submissions
            .lock()
            .unwrap()
            .push((to.to_string(), value, *quote));

        if self.submit_result.is_ok() && self.drain_on_submit {
            let mut balance = self.balance.lock().unwrap();
            if let Ok(b) = balance.as_mut() {
                *b = b.saturating_sub(value);
            }
        }
        self.submit_result.clone()
    }
}

#[derive(Default)]
pub struct MockNotifier {
    pub messages: Mutex<Vec<String>>,
    pub attempts: AtomicUsize,
    fail: bool,
    delay: Option<Duration>,
}

impl MockNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn hanging(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, text: &str) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        if self.fail {
            return Err(NotifyError::Transport("connection refused".to_string()));
        }
        self.messages.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
