//! Address -> session token cache, persisted as a pretty-printed JSON object.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::CheckinError;

/// Token cache. File-backed stores write through on every mutation.
#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    tokens: BTreeMap<String, String>,
    path: Option<PathBuf>,
}

impl TokenStore {
    /// Store with no backing file
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load from `path`. A missing or unparsable file gives an empty store.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let tokens = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => match serde_json::from_str::<BTreeMap<String, String>>(&content) {
                Ok(tokens) => tokens,
                Err(e) => {
                    warn!("⚠️ Token file {} is not valid JSON ({}), starting empty", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!("⚠️ Could not read token file {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };

        debug!("Loaded {} cached tokens from {}", tokens.len(), path.display());
        Self {
            tokens,
            path: Some(path),
        }
    }

    pub fn get(&self, address: &str) -> Option<&str> {
        self.tokens.get(address).map(String::as_str)
    }

    pub fn contains(&self, address: &str) -> bool {
        self.tokens.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tokens.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Insert or replace the token for `address`, then persist.
    pub fn set(&mut self, address: &str, token: &str) -> Result<(), CheckinError> {
        self.tokens.insert(address.to_string(), token.to_string());
        self.save()
    }

    /// Drop the token for `address`, then persist. Returns whether one existed.
    pub fn remove(&mut self, address: &str) -> Result<bool, CheckinError> {
        let existed = self.tokens.remove(address).is_some();
        if existed {
            self.save()?;
        }
        Ok(existed)
    }

    pub fn clear(&mut self) -> Result<usize, CheckinError> {
        let count = self.tokens.len();
        self.tokens.clear();
        self.save()?;
        Ok(count)
    }

    /// Write the whole map to disk via a synced sibling temp file and a rename.
    pub fn save(&self) -> Result<(), CheckinError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let json = serde_json::to_string_pretty(&self.tokens)?;
        let tmp = temp_path(path);
        let persist = || -> std::io::Result<()> {
            let mut file = File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp, path)
        };

        persist().map_err(|e| {
            let _ = fs::remove_file(&tmp);
            CheckinError::Storage(format!("failed to write {}: {}", path.display(), e))
        })
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "tokens.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}
