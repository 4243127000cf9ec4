use std::sync::Arc;

use balance_sweeper::config::{self, Config};
use balance_sweeper::ethereum::EthereumAdapter;
use balance_sweeper::notifier::{Notifier, TelegramNotifier};
use balance_sweeper::tron::TronAdapter;
use balance_sweeper::{keys, Amount, Scheduler, SweepPolicy, SweepWorker};
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stdout)
        .with_target(false)
        .init();

    info!("Balance sweeper starting...");

    // configuration problems are fatal, nothing runs on a partial setup
    let cfg = config::load()?;
    let workers = build_workers(&cfg)?;

    info!("  Poll interval: {:?}", cfg.poll_interval);
    info!("  Call timeout: {:?}", cfg.call_timeout);
    info!("  Notifications: {}", if cfg.telegram.is_some() { "telegram" } else { "disabled" });

    let mut scheduler = Scheduler::new();
    scheduler.start(workers);
    info!("🔁 Sweeper is running ({} chains)", scheduler.running());

    shutdown_signal().await;
    info!("Shutdown signal received, finishing in-flight cycles...");

    scheduler.stop().await;
    info!("Balance sweeper stopped.");
    Ok(())
}

fn build_workers(cfg: &Config) -> eyre::Result<Vec<SweepWorker>> {
    let notifier: Option<Arc<dyn Notifier>> = match &cfg.telegram {
        Some(tg) => Some(Arc::new(TelegramNotifier::new(tg.bot_token.expose(), tg.chat_id.clone())?)),
        None => None,
    };

    let mut workers = Vec::new();

    if let Some(eth) = &cfg.ethereum {
        let signer = keys::ethereum_signer(cfg.seed_phrase.expose())?;
        let adapter = EthereumAdapter::new(&eth.rpc_url, signer, eth.gas_limit)?;
        info!("  ETH: {} → {}", adapter.account().address, eth.forward_to);

        let account = adapter.account().clone();
        workers.push(SweepWorker::new(
            account,
            Arc::new(adapter),
            SweepPolicy::FeeDeducted,
            eth.forward_to.clone(),
        ));
    }

    if let Some(trx) = &cfg.tron {
        let signer = keys::tron_signer(cfg.seed_phrase.expose())?;
        let api_key = trx.api_key.as_ref().map(|k| k.expose().to_string());
        let adapter = TronAdapter::new(&trx.api_url, api_key, signer)?;
        info!("  TRX: {} → {} (reserve {} sun)", adapter.account().address, trx.forward_to, trx.reserve_sun);

        let account = adapter.account().clone();
        workers.push(SweepWorker::new(
            account,
            Arc::new(adapter),
            SweepPolicy::FixedReserve(Amount::from(trx.reserve_sun)),
            trx.forward_to.clone(),
        ));
    }

    Ok(workers
        .into_iter()
        .map(|w| {
            let w = w
                .with_interval(cfg.poll_interval)
                .with_call_timeout(cfg.call_timeout);
            match &notifier {
                Some(n) => w.with_notifier(Arc::clone(n)),
                None => w,
            }
        })
        .collect())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut term = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(term) => term,
            Err(_) => {
                let _ = signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
    }
}
