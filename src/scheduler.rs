// src/scheduler.rs
use futures_util::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::models::Chain;
use crate::worker::SweepWorker;

/// Owns one task per configured chain. Chains share nothing, so a stalled
/// or failing chain never holds up another.
pub struct Scheduler {
    shutdown: watch::Sender<bool>,
    tasks: Vec<(Chain, JoinHandle<()>)>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            shutdown,
            tasks: Vec::new(),
        }
    }

    /// Spawn every worker; returns as soon as all are launched.
    pub fn start(&mut self, workers: Vec<SweepWorker>) {
        for worker in workers {
            let chain = worker.chain();
            let rx = self.shutdown.subscribe();
            self.tasks.push((chain, tokio::spawn(worker.run(rx))));
            info!("Launched {} worker", chain);
        }
    }

    pub fn running(&self) -> usize {
        self.tasks.iter().filter(|(_, task)| !task.is_finished()).count()
    }

    /// Stop scheduling new cycles and wait for in-flight ones to finish.
    pub async fn stop(self) {
        info!("Stopping {} workers...", self.tasks.len());
        self.shutdown.send_replace(true);

        let (chains, handles): (Vec<_>, Vec<_>) = self.tasks.into_iter().unzip();
        for (chain, res) in chains.into_iter().zip(join_all(handles).await) {
            if let Err(e) = res {
                error!("{} worker task panicked: {:?}", chain, e);
            }
        }

        info!("All workers stopped");
    }
}
