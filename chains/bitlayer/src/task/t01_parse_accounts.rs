//! Read-only account overview: transaction count and native balance per
//! account (with its USD value when a price is known), printed as a coloured
//! table and written to `tx_count.csv`.

use crate::account::Account;
use crate::client::ChainClient;
use crate::utils::units::{to_decimal, NATIVE_DECIMALS};
use anyhow::{Context, Result};
use colored::Colorize;
use core_logic::CsvReport;
use tracing::info;

pub const TX_COUNT_HEADER: [&str; 5] = ["№", "Wallet", "TX count", "BTC balance", "USD"];

#[derive(Debug, Clone, PartialEq)]
pub struct AccountStats {
    pub index: usize,
    pub address: String,
    pub tx_count: u64,
    pub balance: f64,
    pub balance_usd: Option<f64>,
}

impl AccountStats {
    pub fn row(&self) -> Vec<String> {
        vec![
            self.index.to_string(),
            self.address.clone(),
            self.tx_count.to_string(),
            format!("{:.8}", self.balance),
            self.balance_usd
                .map(|usd| format!("{:.2}", usd))
                .unwrap_or_default(),
        ]
    }

    fn line(&self) -> String {
        let usd = self
            .balance_usd
            .map(|usd| format!(" (${:.2})", usd))
            .unwrap_or_default();
        format!(
            "{:02} {}: {} txn: {:.8} BTC{}",
            self.index, self.address, self.tx_count, self.balance, usd
        )
    }
}

pub struct ParseAccounts;

impl ParseAccounts {
    /// `btc_price` in USD; the USD column stays empty without it.
    pub async fn run(
        accounts: &[Account],
        client: &dyn ChainClient,
        report: &CsvReport,
        btc_price: Option<f64>,
    ) -> Result<Vec<AccountStats>> {
        info!(
            "Parsing {} accounts and their transaction counts...",
            accounts.len()
        );

        let mut stats = Vec::with_capacity(accounts.len());
        for (i, account) in accounts.iter().enumerate() {
            let address = account.address();
            let nonce = client
                .get_nonce(address)
                .await
                .with_context(|| format!("Failed to read nonce of {}", account.checksum()))?;
            let balance = client
                .get_balance(address, None)
                .await
                .with_context(|| format!("Failed to read balance of {}", account.checksum()))?;

            let balance = to_decimal(balance, NATIVE_DECIMALS);
            let entry = AccountStats {
                index: i + 1,
                address: account.checksum(),
                tx_count: nonce.low_u64(),
                balance,
                balance_usd: btc_price.map(|price| (balance * price * 100.0).round() / 100.0),
            };

            let line = entry.line();
            match entry.tx_count {
                n if n >= 100 => println!("{}", line.green()),
                n if n >= 50 => println!("{}", line.yellow()),
                _ => println!("{}", line),
            }
            stats.push(entry);
        }

        let rows: Vec<Vec<String>> = stats.iter().map(AccountStats::row).collect();
        report.overwrite(&rows)?;
        info!("Saved {}", report.path().display());

        Ok(stats)
    }
}
