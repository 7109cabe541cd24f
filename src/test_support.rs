//! Scripted `CheckinApi` for unit tests. No network.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::client::{CheckInReceipt, CheckinApi, ProxyHandle, SessionStatus};
use crate::error::ApiError;

// anvil / hardhat default development accounts
pub const KEYS: [&str; 3] = [
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
    "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
    "0x5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a",
];

pub const ADDRS: [&str; 3] = [
    "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
    "0x70997970C51812dc3A010C7d01b50e0d17dc79C8",
    "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC",
];

pub fn token_for(address: &str) -> String {
    format!("token-{}", address)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Probe(String),
    Challenge(String),
    Proof(String),
    Status(String),
    CheckIn(String),
}

#[derive(Default)]
pub struct MockApi {
    calls: Mutex<Vec<Call>>,
    dead_proxies: HashSet<String>,
    failing_challenges: HashSet<String>,
    rejected_tokens: HashSet<String>,
    last_check_ins: HashMap<String, DateTime<Utc>>,
    refuse_check_in: bool,
    panic_on_challenge: bool,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dead_proxy(mut self, url: &str) -> Self {
        self.dead_proxies.insert(url.to_string());
        self
    }

    pub fn with_failing_challenge(mut self, address: &str) -> Self {
        self.failing_challenges.insert(address.to_string());
        self
    }

    pub fn with_rejected_token(mut self, token: &str) -> Self {
        self.rejected_tokens.insert(token.to_string());
        self
    }

    pub fn with_last_check_in(mut self, token: &str, at: DateTime<Utc>) -> Self {
        self.last_check_ins.insert(token.to_string(), at);
        self
    }

    pub fn refusing_check_in(mut self) -> Self {
        self.refuse_check_in = true;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic_on_challenge = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls other than proxy probes.
    pub fn session_calls(&self) -> usize {
        self.calls().iter().filter(|c| !matches!(c, Call::Probe(_))).count()
    }

    pub fn probed_proxies(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Probe(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn check_ins(&self) -> usize {
        self.calls().iter().filter(|c| matches!(c, Call::CheckIn(_))).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl CheckinApi for MockApi {
    async fn verify_proxy(&self, proxy: &ProxyHandle) -> Result<String, ApiError> {
        self.record(Call::Probe(proxy.as_url().to_string()));
        if self.dead_proxies.contains(proxy.as_url()) {
            return Err(ApiError::new("connection refused").with_proxy(Some(proxy.masked())));
        }
        Ok("203.0.113.7".to_string())
    }

    async fn request_challenge(&self, address: &str, _proxy: Option<&ProxyHandle>) -> Result<String, ApiError> {
        self.record(Call::Challenge(address.to_string()));
        if self.panic_on_challenge {
            panic!("upstream exploded");
        }
        if self.failing_challenges.contains(address) {
            return Err(ApiError::new("Request failed with status code 500").with_status(500));
        }
        Ok(format!("Sign in to X Ink as {}", address))
    }

    async fn submit_proof(
        &self,
        address: &str,
        message: &str,
        signature: &str,
        _proxy: Option<&ProxyHandle>,
    ) -> Result<String, ApiError> {
        self.record(Call::Proof(address.to_string()));
        let signer = crate::crypto::recover_signer(message, signature)
            .map_err(|e| ApiError::new(format!("Signature verification failed: {}", e)))?;
        if signer != address {
            return Err(ApiError::new("Signature verification failed: signer mismatch"));
        }
        Ok(token_for(address))
    }

    async fn fetch_status(&self, token: &str, _proxy: Option<&ProxyHandle>) -> Result<SessionStatus, ApiError> {
        self.record(Call::Status(token.to_string()));
        if self.rejected_tokens.contains(token) {
            return Err(ApiError::new("Request failed with status code 401").with_status(401));
        }
        Ok(SessionStatus {
            invite_count: 0,
            check_in_count: 4,
            points: 120.0,
            last_check_in: self.last_check_ins.get(token).copied(),
        })
    }

    async fn submit_check_in(&self, token: &str, _proxy: Option<&ProxyHandle>) -> Result<CheckInReceipt, ApiError> {
        self.record(Call::CheckIn(token.to_string()));
        if self.refuse_check_in {
            return Err(ApiError::new("Check-in failed: Already checked in today"));
        }
        Ok(CheckInReceipt {
            points_earned: 10.0,
            check_in_count: 5,
        })
    }
}
