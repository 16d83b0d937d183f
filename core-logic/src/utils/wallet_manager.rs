use crate::config::ProxyConfig;
use crate::error::WalletError;
use crate::utils::proxy_manager::ProxyManager;
use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::info;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Raw hex private key as read from the key file, with its 1-based line.
/// Wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    hex: String,
    line: usize,
}

impl SecretKey {
    pub fn parse(raw: &str, line: usize) -> Result<Self, WalletError> {
        let trimmed = raw.trim();
        let hex_part = trimmed.strip_prefix("0x").unwrap_or(trimmed);

        if hex_part.len() != 64 {
            return Err(WalletError::InvalidKeyLength {
                line,
                length: hex_part.len(),
            });
        }
        if hex::decode(hex_part).is_err() {
            return Err(WalletError::InvalidKeyFormat { line });
        }

        Ok(Self {
            hex: hex_part.to_string(),
            line,
        })
    }

    pub fn expose(&self) -> &str {
        &self.hex
    }

    pub fn line(&self) -> usize {
        self.line
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(***REDACTED***)")
    }
}

pub struct WalletManager;

impl WalletManager {
    /// Reads one key per line. Blank lines and `#` comments are ignored.
    pub fn load_keys(path: impl AsRef<Path>) -> Result<Vec<SecretKey>> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read key file {}", path.display()))?;

        let keys = Self::parse_keys(&content)?;
        if keys.is_empty() {
            return Err(WalletError::Empty {
                path: path.display().to_string(),
            }
            .into());
        }

        info!("Loaded {} keys from {}", keys.len(), path.display());
        Ok(keys)
    }

    pub fn parse_keys(content: &str) -> Result<Vec<SecretKey>, WalletError> {
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with('#')
            })
            .map(|(i, line)| SecretKey::parse(line, i + 1))
            .collect()
    }
}

/// An account slot in the batch together with its pinned proxy.
#[derive(Debug, Clone)]
pub struct BatchEntry<T> {
    pub item: T,
    pub proxy: Option<ProxyConfig>,
    /// 1-based processing position.
    pub position: usize,
}

/// Ordered accounts for one run. Proxies are paired by load order before any
/// shuffle, and a shuffle moves each account together with its proxy.
#[derive(Debug, Clone)]
pub struct Batch<T> {
    entries: Vec<BatchEntry<T>>,
}

impl<T> Batch<T> {
    pub fn new(items: Vec<T>, proxies: &[ProxyConfig]) -> Self {
        let entries = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| BatchEntry {
                item,
                proxy: ProxyManager::assign(proxies, i + 1).cloned(),
                position: i + 1,
            })
            .collect();

        Self { entries }
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.entries.shuffle(rng);
        for (i, entry) in self.entries.iter_mut().enumerate() {
            entry.position = i + 1;
        }
    }

    pub fn entries(&self) -> &[BatchEntry<T>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
