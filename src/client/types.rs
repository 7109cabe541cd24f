//! Wire schema of the x.ink API and its normalization into domain types.
//!
//! Upstream field names have drifted between camelCase and snake_case, and
//! numbers sometimes arrive as strings, so every field here is optional and
//! aliased. Nothing outside this module sees the raw shapes.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::ApiError;

/// Account status as reported by the profile endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    pub invite_count: u64,
    pub check_in_count: u64,
    pub points: f64,
    pub last_check_in: Option<DateTime<Utc>>,
}

/// Result of a successful check-in
#[derive(Debug, Clone, PartialEq)]
pub struct CheckInReceipt {
    pub points_earned: f64,
    pub check_in_count: u64,
}

#[derive(Debug, Deserialize)]
pub struct SignMessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

impl SignMessageResponse {
    pub fn into_message(self) -> Result<String, ApiError> {
        match self.message {
            Some(m) if !m.is_empty() => Ok(m),
            _ => Err(ApiError::new("Invalid response format: No message field")),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifySignatureRequest<'a> {
    pub wallet_address: &'a str,
    pub sign_message: &'a str,
    pub signature: &'a str,
    pub referrer: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct VerifySignatureResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, alias = "accessToken", alias = "access_token")]
    pub token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl VerifySignatureResponse {
    pub fn into_token(self) -> Result<String, ApiError> {
        match (self.success, self.token) {
            (true, Some(token)) if !token.is_empty() => Ok(token),
            (true, _) => Err(ApiError::new("Signature verification succeeded without a token")),
            (false, _) => Err(ApiError::new(format!(
                "Signature verification failed: {}",
                self.message.unwrap_or_else(|| "no reason given".to_string())
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProfileEnvelope {
    #[serde(default)]
    pub data: Option<ProfileWire>,
}

#[derive(Debug, Deserialize)]
pub struct ProfileWire {
    #[serde(default, rename = "inviteCount", alias = "invite_count")]
    pub invite_count: Option<Value>,
    #[serde(default, rename = "check_in_count", alias = "checkInCount")]
    pub check_in_count: Option<Value>,
    #[serde(default)]
    pub points: Option<Value>,
    #[serde(default, rename = "lastCheckIn", alias = "last_check_in")]
    pub last_check_in: Option<Value>,
}

impl ProfileEnvelope {
    pub fn into_status(self) -> Result<SessionStatus, ApiError> {
        let data = self
            .data
            .ok_or_else(|| ApiError::new("Invalid response format: No data field"))?;

        Ok(SessionStatus {
            invite_count: data.invite_count.as_ref().and_then(as_u64).unwrap_or(0),
            check_in_count: data.check_in_count.as_ref().and_then(as_u64).unwrap_or(0),
            points: data.points.as_ref().and_then(as_f64).unwrap_or(0.0),
            last_check_in: data.last_check_in.as_ref().and_then(parse_timestamp),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckInResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, rename = "pointsEarned", alias = "points_earned")]
    pub points_earned: Option<Value>,
    #[serde(default, rename = "check_in_count", alias = "checkInCount")]
    pub check_in_count: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

impl CheckInResponse {
    pub fn into_receipt(self) -> Result<CheckInReceipt, ApiError> {
        if !self.success {
            return Err(ApiError::new(format!(
                "Check-in failed: {}",
                self.message.unwrap_or_else(|| "no reason given".to_string())
            )));
        }
        Ok(CheckInReceipt {
            points_earned: self.points_earned.as_ref().and_then(as_f64).unwrap_or(0.0),
            check_in_count: self.check_in_count.as_ref().and_then(as_u64).unwrap_or(0),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ProbeResponse {
    #[serde(default)]
    pub ip: Option<String>,
}

impl ProbeResponse {
    pub fn into_ip(self) -> Result<String, ApiError> {
        self.ip
            .filter(|ip| !ip.is_empty())
            .ok_or_else(|| ApiError::new("Probe response has no ip field"))
    }
}

fn as_u64(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Accepts RFC 3339, ISO or space separated date-times without an offset (UTC,
/// optional fractional seconds) and unix seconds or milliseconds.
fn parse_timestamp(v: &Value) -> Option<DateTime<Utc>> {
    let parsed = match v {
        Value::Null => return None,
        Value::String(s) if s.trim().is_empty() => return None,
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                        .iter()
                        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                        .map(|naive| Utc.from_utc_datetime(&naive))
                })
                .or_else(|| s.parse::<i64>().ok().and_then(from_unix))
        }
        Value::Number(n) => n.as_i64().and_then(from_unix),
        _ => None,
    };

    if parsed.is_none() {
        warn!("⚠️ Unrecognised lastCheckIn value {}, treating as never", v);
    }
    parsed
}

fn from_unix(n: i64) -> Option<DateTime<Utc>> {
    // Anything past year 5138 in seconds is really milliseconds
    if n.abs() >= 100_000_000_000 {
        Utc.timestamp_millis_opt(n).single()
    } else {
        Utc.timestamp_opt(n, 0).single()
    }
}
