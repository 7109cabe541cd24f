//! Per-account state machine: resolve, probe proxy, authenticate, fetch status,
//! decide, check in.

use chrono::{DateTime, Utc};
use std::fmt;
use tracing::{debug, error, info, warn};

use crate::client::{CheckInReceipt, CheckinApi, ProxyHandle};
use crate::clock::Clock;
use crate::crypto::{resolve, Account, Resolution};
use crate::report;
use crate::store::TokenStore;

/// Hours between check-ins.
pub const CHECK_IN_PERIOD_HOURS: f64 = 24.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountState {
    Resolving,
    ProxyCheck,
    Authenticating,
    FetchingStatus,
    Deciding,
    CheckingIn,
    Done,
    Failed,
}

impl fmt::Display for AccountState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccountState::Resolving => "RESOLVING",
            AccountState::ProxyCheck => "PROXY_CHECK",
            AccountState::Authenticating => "AUTHENTICATING",
            AccountState::FetchingStatus => "FETCHING_STATUS",
            AccountState::Deciding => "DECIDING",
            AccountState::CheckingIn => "CHECKING_IN",
            AccountState::Done => "DONE",
            AccountState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AccountOutcome {
    CheckedIn {
        address: String,
        receipt: CheckInReceipt,
        /// Points after the check-in, if the follow-up status fetch worked
        total_points: Option<f64>,
    },
    NotDue {
        address: String,
        hours_remaining: f64,
    },
    Failed {
        address: Option<String>,
        stage: AccountState,
        reason: String,
    },
}

impl AccountOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, AccountOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Eligibility {
    Eligible,
    NotYet { hours_remaining: f64 },
}

/// Eligible when never checked in or at least 24 fractional hours have passed.
pub fn check_in_eligibility(last_check_in: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Eligibility {
    let Some(last) = last_check_in else {
        return Eligibility::Eligible;
    };
    let hours_since = (now - last).num_milliseconds() as f64 / 3_600_000.0;
    if hours_since >= CHECK_IN_PERIOD_HOURS {
        Eligibility::Eligible
    } else {
        Eligibility::NotYet {
            hours_remaining: CHECK_IN_PERIOD_HOURS - hours_since,
        }
    }
}

/// Where an account sits in the current cycle, for progress lines.
#[derive(Debug, Clone, Copy)]
pub struct AccountPosition {
    pub index: usize,
    pub total: usize,
}

pub struct AccountProcessor<'a, A: ?Sized> {
    api: &'a A,
    clock: &'a dyn Clock,
}

impl<'a, A: CheckinApi + ?Sized> AccountProcessor<'a, A> {
    pub fn new(api: &'a A, clock: &'a dyn Clock) -> Self {
        Self { api, clock }
    }

    /// Run one account to `Done` or `Failed`. Never returns an error: every
    /// failure is folded into the outcome so the caller can move on.
    pub async fn process(
        &self,
        position: AccountPosition,
        credential: &str,
        proxy: Option<&ProxyHandle>,
        store: &mut TokenStore,
    ) -> AccountOutcome {
        let mut trail = StateTrail::new();
        self.run(position, credential, proxy, store, &mut trail).await
    }

    async fn run(
        &self,
        position: AccountPosition,
        credential: &str,
        proxy: Option<&ProxyHandle>,
        store: &mut TokenStore,
        trail: &mut StateTrail,
    ) -> AccountOutcome {
        let account = match resolve(credential) {
            Resolution::Valid(account) => account,
            Resolution::Invalid(reason) => {
                warn!("Skipping invalid private key at index {}: {}", position.index + 1, reason);
                return trail.fail(None, format!("Invalid private key: {}", reason));
            }
        };
        let address = account.address.clone();
        trail.address = address.clone();
        info!("[{}/{}] Processing wallet: {}", position.index + 1, position.total, address);

        if let Some(proxy) = proxy {
            trail.advance(AccountState::ProxyCheck);
            info!("Testing proxy: {}", proxy);
            match self.api.verify_proxy(proxy).await {
                Ok(ip) => info!("✅ Proxy working - IP: {}", ip),
                Err(e) => {
                    warn!("❌ Proxy not working, skipping this wallet ({})", e.detail());
                    return trail.fail(Some(address), format!("Proxy probe failed: {}", e));
                }
            }
        }

        let token = match store.get(&address) {
            Some(token) => {
                info!("Using existing token");
                token.to_string()
            }
            None => {
                trail.advance(AccountState::Authenticating);
                info!("No token found. Creating new token...");
                match self.authenticate(&account, proxy, store).await {
                    Ok(token) => token,
                    Err(reason) => return trail.fail(Some(address), reason),
                }
            }
        };

        trail.advance(AccountState::FetchingStatus);
        info!("Fetching user info...");
        let status = match self.api.fetch_status(&token, proxy).await {
            Ok(status) => status,
            Err(e) => {
                error!("Error fetching user info: {}", e.detail());
                warn!("❌ Invalid token. Removing from storage...");
                if let Err(store_err) = store.remove(&address) {
                    error!("Failed to persist token removal: {}", store_err);
                }
                return trail.fail(Some(address), format!("Status fetch failed: {}", e));
            }
        };
        report::session_status("User Info", &status);

        trail.advance(AccountState::Deciding);
        if let Eligibility::NotYet { hours_remaining } = check_in_eligibility(status.last_check_in, self.clock.now()) {
            info!("⏰ Check-in not available yet");
            info!("└─ Next check-in in: {:.1} hours", hours_remaining);
            trail.advance(AccountState::Done);
            return AccountOutcome::NotDue {
                address,
                hours_remaining,
            };
        }

        trail.advance(AccountState::CheckingIn);
        info!("🎯 Performing daily check-in...");
        let receipt = match self.api.submit_check_in(&token, proxy).await {
            Ok(receipt) => receipt,
            Err(e) => {
                error!("Error performing check-in: {}", e.detail());
                warn!("❌ Check-in failed");
                return trail.fail(Some(address), format!("Check-in failed: {}", e));
            }
        };
        report::check_in_receipt(&receipt);

        let total_points = match self.api.fetch_status(&token, proxy).await {
            Ok(updated) => {
                info!("📊 Updated Stats:");
                info!("└─ Total Points: {}", updated.points);
                Some(updated.points)
            }
            Err(e) => {
                warn!("Could not refresh stats after check-in: {}", e);
                None
            }
        };

        trail.advance(AccountState::Done);
        AccountOutcome::CheckedIn {
            address,
            receipt,
            total_points,
        }
    }

    /// challenge -> sign -> submit proof, then cache the token.
    async fn authenticate(
        &self,
        account: &Account,
        proxy: Option<&ProxyHandle>,
        store: &mut TokenStore,
    ) -> Result<String, String> {
        let message = self.api.request_challenge(&account.address, proxy).await.map_err(|e| {
            error!("Error fetching sign message for {}: {}", account.address, e.detail());
            format!("Failed to get sign message: {}", e)
        })?;

        info!("Signing message...");
        let signature = account.sign_message(&message).map_err(|e| {
            error!("Error signing message: {}", e);
            format!("Failed to sign message: {}", e)
        })?;

        info!("Verifying signature...");
        let token = self
            .api
            .submit_proof(&account.address, &message, &signature, proxy)
            .await
            .map_err(|e| {
                error!("Error verifying signature for {}: {}", account.address, e.detail());
                format!("Failed to get token: {}", e)
            })?;

        match store.set(&account.address, &token) {
            Ok(()) => info!("✅ Token saved successfully"),
            // The token is still usable for this cycle
            Err(e) => error!("⚠️ Token obtained but not persisted: {}", e),
        }
        Ok(token)
    }
}

/// Current state of one account plus every state it has passed through.
struct StateTrail {
    address: String,
    visited: Vec<AccountState>,
}

impl StateTrail {
    fn new() -> Self {
        Self {
            address: "<invalid>".to_string(),
            visited: vec![AccountState::Resolving],
        }
    }

    fn current(&self) -> AccountState {
        self.visited.last().copied().unwrap_or(AccountState::Resolving)
    }

    fn advance(&mut self, to: AccountState) {
        debug!("{}: {} -> {}", self.address, self.current(), to);
        self.visited.push(to);
    }

    /// Failure is attributed to the state the account was in.
    fn fail(&mut self, address: Option<String>, reason: String) -> AccountOutcome {
        let stage = self.current();
        self.advance(AccountState::Failed);
        AccountOutcome::Failed { address, stage, reason }
    }
}
