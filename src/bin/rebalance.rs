use dotenvy::dotenv;
use ethers::types::Address;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::info;

use aave_rebalancer::aave::{self, LendingPool};
use aave_rebalancer::config::Config;
use aave_rebalancer::constants::{
    ETH_USD_FEED, MIN_AMOUNT_OUT_FACTOR, REBALANCE_TOLERANCE, TARGET_USDC_WEIGHT,
    TARGET_WETH_WEIGHT, USDC_ADDRESS, USDC_USD_FEED, WETH_ADDRESS,
};
use aave_rebalancer::fork;
use aave_rebalancer::logging;
use aave_rebalancer::oracle::PriceFeed;
use aave_rebalancer::rebalance::{self, AssetPosition};
use aave_rebalancer::swap::SwapRouter;
use aave_rebalancer::tokens::AssetToken;
use aave_rebalancer::wallet::WalletManager;

/// 1. Fund the account (fork only)
/// 2. Supply USDC and WETH into Aave
/// 3. Read aToken balances and oracle prices
/// 4. If the allocation drifted past the tolerance band, swap back to target
/// 5. Re-supply everything into Aave
#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenv().ok();

    if let Err(e) = logging::init_logging(env!("CARGO_BIN_NAME")) {
        eprintln!("Failed to initialize logging: {}", e);
        return Err(e);
    }

    let cfg = Config::load().await;
    info!(network_mode = %cfg.network_mode, "Starting rebalance script");

    let wallet = WalletManager::new(&cfg)?;
    let usdc = AssetToken::load(Address::from_str(USDC_ADDRESS)?, wallet.signer.clone()).await?;
    let weth = AssetToken::load(Address::from_str(WETH_ADDRESS)?, wallet.signer.clone()).await?;

    if cfg.is_forked_network() {
        fork::fund_account(&cfg, &wallet, &usdc, &weth).await?;
    }

    // Put everything we hold to work in Aave
    let pool = LendingPool::connect(&wallet).await?;
    supply_all(&pool, &wallet, &usdc).await?;
    supply_all(&pool, &wallet, &weth).await?;
    pool.user_account_data(wallet.address).await?.log();

    // The interest-bearing aTokens track our supplied balances
    let a_usdc = aave::a_token_for(&wallet, &usdc.symbol).await?;
    let a_weth = aave::a_token_for(&wallet, &weth.symbol).await?;

    let usdc_price = PriceFeed::new("usdc_usd", USDC_USD_FEED)?.fetch_price(&cfg).await?;
    let weth_price = PriceFeed::new("eth_usd", ETH_USD_FEED)?.fetch_price(&cfg).await?;
    info!(usdc_price = %usdc_price, weth_price = %weth_price, "Fetched oracle prices");

    let targets: HashMap<String, Decimal> = HashMap::from([
        (usdc.symbol.clone(), TARGET_USDC_WEIGHT),
        (weth.symbol.clone(), TARGET_WETH_WEIGHT),
    ]);

    let positions =
        portfolio_snapshot(&wallet, &usdc, &a_usdc, usdc_price, &weth, &a_weth, weth_price).await?;
    log_allocations("current", &positions, &targets)?;

    let rebalance_needed =
        rebalance::needs_rebalancing(&positions, &targets, REBALANCE_TOLERANCE)?;
    info!(rebalance_needed, tolerance = %REBALANCE_TOLERANCE, "Checked allocation drift");
    if !rebalance_needed {
        info!("Allocation within tolerance band, nothing to do");
        return Ok(());
    }

    let trades = rebalance::compute_trades(&positions, &targets)?;
    for (asset, trade) in &trades {
        info!(asset = %asset, signed_amount = %trade.signed_amount, "Rebalancing trade");
    }

    // The asset with the negative signed amount is sold, the other bought
    let (sell, a_sell, buy) = if trades[&usdc.symbol].signed_amount < Decimal::ZERO {
        (&usdc, &a_usdc, &weth)
    } else {
        (&weth, &a_weth, &usdc)
    };
    let amount_in = trades[&sell.symbol].signed_amount.abs();
    let min_amount_out = trades[&buy.symbol].signed_amount * MIN_AMOUNT_OUT_FACTOR;

    // Pull the whole sell-side position out of Aave so the swap has inventory
    let a_sell_balance = wallet.get_raw_token_balance(a_sell).await?;
    pool.withdraw(sell, a_sell_balance, wallet.address).await?;
    wallet.log_all_balances(&[&usdc, &weth]).await?;

    let router = SwapRouter::new(&wallet)?;
    router
        .exact_input_single(&wallet, sell, buy, amount_in, min_amount_out, wallet.address)
        .await?;

    // Park every loose balance back in Aave
    supply_all(&pool, &wallet, &usdc).await?;
    supply_all(&pool, &wallet, &weth).await?;
    wallet.log_all_balances(&[&usdc, &weth]).await?;

    let positions =
        portfolio_snapshot(&wallet, &usdc, &a_usdc, usdc_price, &weth, &a_weth, weth_price).await?;
    log_allocations("final", &positions, &targets)?;

    tokio::time::sleep(std::time::Duration::from_secs(1)).await; // Allow time for logging to flush

    Ok(())
}

/// Supply the wallet's entire balance of `token` into the pool, if any.
async fn supply_all(
    pool: &LendingPool,
    wallet: &WalletManager,
    token: &AssetToken,
) -> eyre::Result<()> {
    let balance = wallet.get_raw_token_balance(token).await?;
    if !balance.is_zero() {
        pool.supply(token, balance, wallet.address).await?;
    }
    Ok(())
}

/// Snapshot the supplied positions: normalized aToken balances priced by
/// the oracle, keyed by the underlying token symbol.
async fn portfolio_snapshot(
    wallet: &WalletManager,
    usdc: &AssetToken,
    a_usdc: &AssetToken,
    usdc_price: Decimal,
    weth: &AssetToken,
    a_weth: &AssetToken,
    weth_price: Decimal,
) -> eyre::Result<HashMap<String, AssetPosition>> {
    let a_usdc_balance = wallet.get_token_balance(a_usdc).await?;
    let a_weth_balance = wallet.get_token_balance(a_weth).await?;
    Ok(HashMap::from([
        (usdc.symbol.clone(), AssetPosition::new(a_usdc_balance, usdc_price)),
        (weth.symbol.clone(), AssetPosition::new(a_weth_balance, weth_price)),
    ]))
}

fn log_allocations(
    stage: &str,
    positions: &HashMap<String, AssetPosition>,
    targets: &HashMap<String, Decimal>,
) -> eyre::Result<()> {
    let weights = rebalance::actual_weights(positions)?;
    for (asset, weight) in &weights {
        let actual_pct = (weight * Decimal::from(100)).round_dp(2);
        let target_pct = (targets[asset] * Decimal::from(100)).round_dp(2);
        info!(
            asset = %asset,
            actual = %format!("{actual_pct}%"),
            target = %format!("{target_pct}%"),
            "{} allocation",
            stage
        );
    }
    Ok(())
}
