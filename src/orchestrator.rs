//! One pass over every configured account.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::client::{CheckinApi, ProxyHandle};
use crate::clock::Clock;
use crate::config::{read_lines, BotConfig};
use crate::error::CheckinError;
use crate::processor::{AccountOutcome, AccountPosition, AccountProcessor};
use crate::report;
use crate::store::TokenStore;
use crate::timer::{countdown, Shutdown, WaitOutcome};

#[derive(Debug, Clone)]
pub struct CycleSettings {
    pub private_keys_file: String,
    pub proxies_file: String,
    pub tokens_file: String,
    pub use_proxy: bool,
    pub wallet_delay: Duration,
    /// Refresh rate of the between-wallet countdown
    pub countdown_tick: Duration,
}

impl CycleSettings {
    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            private_keys_file: config.files.private_keys.clone(),
            proxies_file: config.files.proxies.clone(),
            tokens_file: config.files.tokens.clone(),
            use_proxy: config.network.use_proxy,
            wallet_delay: config.schedule.wallet_delay(),
            countdown_tick: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub cycle: u64,
    /// Accounts configured for the cycle, processed or not
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub interrupted: bool,
}

impl RunSummary {
    pub fn processed(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Proxy for the account at `index`, cycling through the list.
pub fn assign_proxy(index: usize, proxies: &[ProxyHandle]) -> Option<&ProxyHandle> {
    if proxies.is_empty() {
        None
    } else {
        proxies.get(index % proxies.len())
    }
}

pub struct CycleOrchestrator<A> {
    api: A,
    clock: Arc<dyn Clock>,
    settings: CycleSettings,
}

impl<A: CheckinApi> CycleOrchestrator<A> {
    pub fn new(api: A, clock: Arc<dyn Clock>, settings: CycleSettings) -> Self {
        Self { api, clock, settings }
    }

    /// Key and proxy lists are re-read every cycle so edits take effect
    /// without a restart.
    pub fn load_inputs(&self) -> Result<(Vec<String>, Vec<ProxyHandle>), CheckinError> {
        let keys = read_lines(&self.settings.private_keys_file);
        if keys.is_empty() {
            return Err(CheckinError::Config(format!(
                "No private keys found in {}",
                self.settings.private_keys_file
            )));
        }

        let proxies: Vec<ProxyHandle> = if self.settings.use_proxy {
            let proxies: Vec<ProxyHandle> = read_lines(&self.settings.proxies_file)
                .iter()
                .map(|line| ProxyHandle::parse(line))
                .collect();
            if proxies.is_empty() {
                return Err(CheckinError::Config(format!(
                    "Proxy mode is enabled but no proxies found in {}",
                    self.settings.proxies_file
                )));
            }
            proxies
        } else {
            Vec::new()
        };

        Ok((keys, proxies))
    }

    pub async fn run_cycle(&self, cycle: u64, shutdown: &mut Shutdown) -> Result<RunSummary, CheckinError> {
        let started_at = self.clock.now();
        let timer = Instant::now();
        report::cycle_header(cycle, started_at);

        let (keys, proxies) = self.load_inputs()?;
        info!("📝 Found {} wallets", keys.len());
        if self.settings.use_proxy {
            info!("🌐 Found {} proxies", proxies.len());
        } else {
            info!("🌐 Running without proxies");
        }

        let mut store = TokenStore::load(&self.settings.tokens_file);
        let processor = AccountProcessor::new(&self.api, self.clock.as_ref());
        let total = keys.len();
        let mut succeeded = 0;
        let mut failed = 0;
        let mut interrupted = false;

        for (index, key) in keys.iter().enumerate() {
            if shutdown.is_triggered() {
                interrupted = true;
                break;
            }

            report::separator();
            let proxy = assign_proxy(index, &proxies);
            let outcome = processor
                .process(AccountPosition { index, total }, key, proxy, &mut store)
                .await;
            match &outcome {
                AccountOutcome::Failed { address, stage, reason } => {
                    warn!(
                        "❌ Wallet {} failed at {}: {}",
                        address.as_deref().unwrap_or("<invalid key>"),
                        stage,
                        reason
                    );
                    failed += 1;
                }
                _ => succeeded += 1,
            }

            if index + 1 < total && !self.settings.wallet_delay.is_zero() {
                info!("⏳ Waiting {} seconds before next wallet...", self.settings.wallet_delay.as_secs());
                let waited = countdown(self.settings.wallet_delay, self.settings.countdown_tick, shutdown, |left| {
                    report::countdown_line("Next wallet in", left)
                })
                .await;
                if waited == WaitOutcome::Cancelled {
                    report::countdown_done("⛔ Wait cancelled");
                    interrupted = true;
                    break;
                }
                report::countdown_done("▶️  Continuing");
            }
        }

        Ok(RunSummary {
            cycle,
            total,
            succeeded,
            failed,
            elapsed: timer.elapsed(),
            started_at,
            finished_at: self.clock.now(),
            interrupted,
        })
    }
}
