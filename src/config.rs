use alloy::primitives::Address;
use dotenvy::dotenv;
use std::{env, fmt, time::Duration};
use tracing::info;

use crate::error::ConfigError;
use crate::keys;

pub const DEFAULT_ETH_RPC_URL: &str = "https://ethereum-rpc.publicnode.com";
pub const DEFAULT_TRON_API_URL: &str = "https://api.trongrid.io";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3_000;
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 2_500;
pub const DEFAULT_ETH_GAS_LIMIT: u64 = 21_000;
/// 0.1 TRX left behind for bandwidth
pub const DEFAULT_TRX_RESERVE_SUN: u64 = 100_000;

/// String that never shows up in logs
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Clone)]
pub struct EthereumConfig {
    pub rpc_url: String,
    pub forward_to: String,
    pub gas_limit: u64,
}

#[derive(Debug, Clone)]
pub struct TronConfig {
    pub api_url: String,
    pub api_key: Option<Secret>,
    pub forward_to: String,
    pub reserve_sun: u64,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: Secret,
    pub chat_id: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub seed_phrase: Secret,
    pub ethereum: Option<EthereumConfig>,
    pub tron: Option<TronConfig>,
    pub telegram: Option<TelegramConfig>,
    pub poll_interval: Duration,
    pub call_timeout: Duration,
}

/// Load configuration from the environment (and `.env` if present).
pub fn load() -> Result<Config, ConfigError> {
    dotenv().ok();

    let cfg = from_lookup(|key| env::var(key).ok())?;
    info!("Loaded config: {:?}", cfg);

    Ok(cfg)
}

/// Build and validate a `Config` from an arbitrary key lookup.
pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| {
        lookup(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let seed_phrase = get("SEED_PHRASE")
        .map(Secret)
        .ok_or(ConfigError::Missing("SEED_PHRASE"))?;

    let ethereum = match get("ETH_FORWARD_TO") {
        Some(to) => {
            let addr: Address = to.parse().map_err(|e| ConfigError::Invalid {
                key: "ETH_FORWARD_TO",
                reason: format!("{}", e),
            })?;
            Some(EthereumConfig {
                rpc_url: get("ETH_RPC_URL").unwrap_or_else(|| DEFAULT_ETH_RPC_URL.to_string()),
                forward_to: addr.to_checksum(None),
                gas_limit: parse_u64(&get, "ETH_GAS_LIMIT", DEFAULT_ETH_GAS_LIMIT)?,
            })
        }
        None => None,
    };

    let tron = match get("TRX_FORWARD_TO") {
        Some(to) => {
            keys::parse_tron_address(&to).map_err(|e| ConfigError::Invalid {
                key: "TRX_FORWARD_TO",
                reason: e.to_string(),
            })?;
            Some(TronConfig {
                api_url: get("TRON_API_URL").unwrap_or_else(|| DEFAULT_TRON_API_URL.to_string()),
                api_key: get("TRON_API_KEY").map(Secret),
                forward_to: to,
                reserve_sun: parse_u64(&get, "TRX_RESERVE_SUN", DEFAULT_TRX_RESERVE_SUN)?,
            })
        }
        None => None,
    };

    if ethereum.is_none() && tron.is_none() {
        return Err(ConfigError::Missing("ETH_FORWARD_TO or TRX_FORWARD_TO"));
    }

    let telegram = match (get("TELEGRAM_BOT_TOKEN"), get("TELEGRAM_CHAT_ID")) {
        (Some(token), Some(chat_id)) => Some(TelegramConfig {
            bot_token: Secret(token),
            chat_id,
        }),
        (Some(_), None) => return Err(ConfigError::Missing("TELEGRAM_CHAT_ID")),
        (None, Some(_)) => return Err(ConfigError::Missing("TELEGRAM_BOT_TOKEN")),
        (None, None) => None,
    };

    let poll_interval_ms = parse_u64(&get, "POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?;
    let call_timeout_ms = parse_u64(&get, "CALL_TIMEOUT_MS", DEFAULT_CALL_TIMEOUT_MS)?;

    if poll_interval_ms == 0 {
        return Err(ConfigError::Invalid {
            key: "POLL_INTERVAL_MS",
            reason: "must be greater than zero".to_string(),
        });
    }
    // a hung call must never outlive its cycle's slot
    if call_timeout_ms == 0 || call_timeout_ms >= poll_interval_ms {
        return Err(ConfigError::Invalid {
            key: "CALL_TIMEOUT_MS",
            reason: format!("must be in 1..{} (the poll interval)", poll_interval_ms),
        });
    }

    Ok(Config {
        seed_phrase,
        ethereum,
        tron,
        telegram,
        poll_interval: Duration::from_millis(poll_interval_ms),
        call_timeout: Duration::from_millis(call_timeout_ms),
    })
}

fn parse_u64<G>(get: &G, key: &'static str, default: u64) -> Result<u64, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            key,
            reason: format!("expected an unsigned integer, got {:?}", raw),
        }),
        None => Ok(default),
    }
}
