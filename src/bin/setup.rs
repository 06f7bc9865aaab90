use dotenvy::dotenv;
use ethers::types::Address;
use std::str::FromStr;
use tracing::info;

use aave_rebalancer::config::Config;
use aave_rebalancer::constants::{USDC_ADDRESS, WETH_ADDRESS};
use aave_rebalancer::fork;
use aave_rebalancer::logging;
use aave_rebalancer::tokens::AssetToken;
use aave_rebalancer::wallet::WalletManager;

/// 1. Give ourselves some ETH
/// 2. Give ourselves some USDC and WETH
#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenv().ok();

    if let Err(e) = logging::init_logging(env!("CARGO_BIN_NAME")) {
        eprintln!("Failed to initialize logging: {}", e);
        return Err(e);
    }

    let cfg = Config::load().await;
    info!(network_mode = %cfg.network_mode, "Starting setup script");

    let wallet = WalletManager::new(&cfg)?;
    let usdc = AssetToken::load(Address::from_str(USDC_ADDRESS)?, wallet.signer.clone()).await?;
    let weth = AssetToken::load(Address::from_str(WETH_ADDRESS)?, wallet.signer.clone()).await?;

    if cfg.is_forked_network() {
        fork::fund_account(&cfg, &wallet, &usdc, &weth).await?;
    } else {
        info!("Not a forked network, skipping funding");
    }

    wallet.log_all_balances(&[&usdc, &weth]).await?;

    tokio::time::sleep(std::time::Duration::from_secs(1)).await; // Allow time for logging to flush

    Ok(())
}
