use core_logic::{BatchItem, SecretKey, WalletError};
use ethers::prelude::*;
use ethers::utils::to_checksum;
use std::fmt;

/// A signing key and the address it controls. Built once per key at load.
#[derive(Clone)]
pub struct Account {
    wallet: LocalWallet,
    address: Address,
}

impl Account {
    pub fn from_secret(key: &SecretKey, chain_id: u64) -> Result<Self, WalletError> {
        let wallet = key
            .expose()
            .parse::<LocalWallet>()
            .map_err(|_| WalletError::InvalidKeyFormat { line: key.line() })?
            .with_chain_id(chain_id);
        let address = wallet.address();
        Ok(Self { wallet, address })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// EIP-55 checksummed address.
    pub fn checksum(&self) -> String {
        to_checksum(&self.address, None)
    }

    pub fn wallet(&self) -> &LocalWallet {
        &self.wallet
    }

    /// Same key, re-bound to another chain id (bridging from L2s).
    pub fn on_chain(&self, chain_id: u64) -> Self {
        Self {
            wallet: self.wallet.clone().with_chain_id(chain_id),
            address: self.address,
        }
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.checksum())
            .finish()
    }
}

impl BatchItem for Account {
    fn id(&self) -> String {
        self.checksum()
    }
}
