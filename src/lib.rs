pub mod chain;
pub mod config;
pub mod error;
pub mod ethereum;
pub mod keys;
pub mod models;
pub mod notifier;
pub mod policy;
pub mod scheduler;
pub mod tron;
pub mod worker;

pub use chain::ChainAdapter;
pub use error::{ChainError, ConfigError, NotifyError};
pub use models::{Account, Amount, Chain, CostEstimate, SweepOutcome, TxReference};
pub use notifier::Notifier;
pub use policy::{SweepDecision, SweepPolicy};
pub use scheduler::Scheduler;
pub use worker::{CycleReport, SweepWorker};
