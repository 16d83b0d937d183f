use bitlayer_project::account::Account;
use bitlayer_project::api::btc_usd_price;
use bitlayer_project::client::{ChainConnector, RpcConnector};
use bitlayer_project::config::{BitlayerConfig, HOME_CHAIN};
use bitlayer_project::executor::ExecutorPolicy;
use bitlayer_project::task::t01_parse_accounts::TX_COUNT_HEADER;
use bitlayer_project::task::{menu, Environment, MenuAction, ParseAccounts, TaskAction};

use anyhow::{Context, Result};
use clap::Parser;
use core_logic::{
    setup_logger, Batch, BatchRunner, ConfigError, CsvReport, Pacer, ProxyManager, TokioPacer,
    WalletManager, OUTCOME_HEADER,
};
use dialoguer::{theme::ColorfulTheme, Select};
use dotenv::dotenv;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "chains/bitlayer/config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    let config = BitlayerConfig::load(&args.config)?;
    let reports_dir = Path::new(&config.files.reports_dir).to_path_buf();
    // Keep guard alive for file logging
    let _log_guard = setup_logger(&reports_dir)?;
    info!("Configuration loaded from: {}", args.config);

    let home = config.home_chain()?.clone();
    let accounts = WalletManager::load_keys(&config.files.keys)?
        .iter()
        .map(|key| Account::from_secret(key, home.chain_id))
        .collect::<Result<Vec<_>, _>>()?;

    let proxies = if config.settings.use_proxy {
        match ProxyManager::load_proxies(&config.files.proxies, true) {
            Ok(proxies) => proxies,
            Err(e) => match e.downcast_ref::<ConfigError>() {
                Some(ConfigError::MissingProxies { path }) => {
                    warn!(
                        "Proxy mode is on but {} has no proxies. Fill it or set use_proxy = false",
                        path
                    );
                    return Ok(());
                }
                _ => return Err(e),
            },
        }
    } else {
        Vec::new()
    };

    let config = Arc::new(config);
    let entries = menu(&config);
    let labels: Vec<&str> = entries.iter().map(|(label, _)| label.as_str()).collect();

    let choice = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select module")
        .items(&labels)
        .default(0)
        .interact_opt()
        .context("Menu selection failed")?;
    let Some(choice) = choice else {
        info!("Nothing selected, exiting");
        return Ok(());
    };

    let connector = Arc::new(RpcConnector::new(
        config.chains.clone(),
        config.gas.receipt_poll_interval(),
    ));

    let task = match &entries[choice].1 {
        MenuAction::ParseAccounts => {
            let client = connector.connect(HOME_CHAIN)?;
            let report = CsvReport::new(reports_dir.join("tx_count.csv"), &TX_COUNT_HEADER);
            let btc_price = match btc_usd_price(&config.api.btc_price).await {
                Ok(price) => Some(price),
                Err(e) => {
                    warn!("BTC price unavailable, USD column left empty: {:#}", e);
                    None
                }
            };
            ParseAccounts::run(&accounts, client.as_ref(), &report, btc_price).await?;
            info!("Saved to {}", report.path().display());
            return Ok(());
        }
        MenuAction::Run(task) => task.clone(),
    };

    let mut batch = Batch::new(accounts, &proxies);
    if config.settings.shuffle_wallets {
        batch.shuffle(&mut rand::thread_rng());
    }

    let cancel = CancellationToken::new();
    let pacer: Arc<dyn Pacer> = Arc::new(TokioPacer::new(cancel.clone()));
    let env = Environment {
        connector,
        config: config.clone(),
        pacer: pacer.clone(),
        policy: ExecutorPolicy::from_config(&config.settings, &config.gas),
    };
    let action = TaskAction::new(task, env);
    let runner = BatchRunner::new(config.settings.clone(), pacer, cancel.clone())
        .with_report(CsvReport::dated(&reports_dir, "outcomes", &OUTCOME_HEADER));

    info!(
        "Running {} for {} accounts ({} proxies)",
        labels[choice],
        batch.len(),
        proxies.len()
    );

    // Report rows are single whole-line writes, so dropping the run mid-account is safe.
    tokio::select! {
        result = runner.run(&batch, &action) => {
            if let Err(e) = result {
                error!("Run aborted: {:#}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            cancel.cancel();
            warn!("Cancelled by user");
        }
    }

    Ok(())
}
