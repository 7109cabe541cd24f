use k256::ecdsa::{SigningKey, VerifyingKey};
use sha3::{Digest, Keccak256};
use std::fmt;

use crate::error::CheckinError;

/// secp256k1 wallet key
pub struct KeyPair {
    pub signing_key: SigningKey,
}

impl KeyPair {
    /// Parse a hex private key (`0x` prefix optional)
    pub fn from_hex(private_key: &str) -> Result<Self, CheckinError> {
        let trimmed = private_key.trim();
        let hex_part = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if hex_part.len() != 64 {
            return Err(CheckinError::InvalidCredential(format!(
                "expected 64 hex characters, got {}",
                hex_part.len()
            )));
        }

        let bytes = hex::decode(hex_part)
            .map_err(|e| CheckinError::InvalidCredential(format!("not valid hex: {}", e)))?;
        // Rejects zero and values >= the curve order
        let signing_key = SigningKey::from_slice(&bytes)
            .map_err(|_| CheckinError::InvalidCredential("scalar out of range".to_string()))?;

        Ok(KeyPair { signing_key })
    }

    /// EIP-55 checksummed address
    pub fn address(&self) -> String {
        address_from_verifying_key(self.signing_key.verifying_key())
    }

    /// EIP-191 `personal_sign`, returned as 0x-prefixed r || s || v
    pub fn sign_message(&self, message: &str) -> Result<String, CheckinError> {
        let digest = personal_message_hash(message);
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(&digest)
            .map_err(|e| CheckinError::Signing(e.to_string()))?;

        let mut out = Vec::with_capacity(65);
        out.extend_from_slice(&signature.to_bytes());
        out.push(27 + recovery_id.to_byte());
        Ok(format!("0x{}", hex::encode(out)))
    }
}

/// Keccak-256 of the EIP-191 prefixed message
pub fn personal_message_hash(message: &str) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(format!("\x19Ethereum Signed Message:\n{}", message.len()).as_bytes());
    hasher.update(message.as_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

fn address_from_verifying_key(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    // Drop the 0x04 SEC1 tag
    let hash = Keccak256::digest(&point.as_bytes()[1..]);
    to_checksum_address(&hash[12..])
}

fn to_checksum_address(bytes: &[u8]) -> String {
    let lower = hex::encode(bytes);
    let hash = Keccak256::digest(lower.as_bytes());

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = (hash[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Recover the signer address of a `personal_sign` signature
#[cfg(test)]
pub fn recover_signer(message: &str, signature_hex: &str) -> Result<String, CheckinError> {
    use k256::ecdsa::{RecoveryId, Signature};

    let raw = signature_hex.trim_start_matches("0x");
    let bytes = hex::decode(raw).map_err(|e| CheckinError::Signing(e.to_string()))?;
    if bytes.len() != 65 {
        return Err(CheckinError::Signing(format!("signature must be 65 bytes, got {}", bytes.len())));
    }

    let signature = Signature::from_slice(&bytes[..64]).map_err(|e| CheckinError::Signing(e.to_string()))?;
    let recovery_id = RecoveryId::from_byte(bytes[64].wrapping_sub(27))
        .ok_or_else(|| CheckinError::Signing(format!("bad recovery byte {}", bytes[64])))?;

    let digest = personal_message_hash(message);
    let key = VerifyingKey::recover_from_prehash(&digest, &signature, recovery_id)
        .map_err(|e| CheckinError::Signing(e.to_string()))?;
    Ok(address_from_verifying_key(&key))
}

/// A wallet the bot operates on behalf of.
pub struct Account {
    pub address: String,
    key: KeyPair,
}

impl Account {
    pub fn sign_message(&self, message: &str) -> Result<String, CheckinError> {
        self.key.sign_message(message)
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account").field("address", &self.address).finish_non_exhaustive()
    }
}

/// Outcome of turning a configured credential into an account.
#[derive(Debug)]
pub enum Resolution {
    Valid(Account),
    Invalid(String),
}

/// Derive the account for a private key. Malformed keys are reported, never raised.
pub fn resolve(credential: &str) -> Resolution {
    match KeyPair::from_hex(credential) {
        Ok(key) => Resolution::Valid(Account {
            address: key.address(),
            key,
        }),
        Err(CheckinError::InvalidCredential(reason)) => Resolution::Invalid(reason),
        Err(e) => Resolution::Invalid(e.to_string()),
    }
}
