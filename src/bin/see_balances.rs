use dotenvy::dotenv;
use ethers::types::Address;
use std::str::FromStr;
use tracing::info;

use aave_rebalancer::config::Config;
use aave_rebalancer::constants::{USDC_ADDRESS, WETH_ADDRESS};
use aave_rebalancer::logging;
use aave_rebalancer::tokens::AssetToken;
use aave_rebalancer::wallet::WalletManager;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Initialize logging
    if let Err(e) = logging::init_logging(env!("CARGO_BIN_NAME")) {
        eprintln!("Failed to initialize logging: {}", e);
        return Err(e);
    }

    // Load configuration (including provider)
    let cfg = Config::load().await;
    info!(network_mode = %cfg.network_mode, "Configuration loaded and logging initialized");

    // Initialize wallet manager
    let wallet = WalletManager::new(&cfg)?;
    info!(address = ?wallet.address, "Wallet manager initialized");

    // Log wallet token balances
    let usdc = AssetToken::load(Address::from_str(USDC_ADDRESS)?, wallet.signer.clone()).await?;
    let weth = AssetToken::load(Address::from_str(WETH_ADDRESS)?, wallet.signer.clone()).await?;
    wallet.log_all_balances(&[&usdc, &weth]).await?;

    tokio::time::sleep(std::time::Duration::from_secs(1)).await; // Allow time for logging to flush

    Ok(())
}
