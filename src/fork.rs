//! Funding helpers for a forked network.
//!
//! These lean on anvil cheat-codes (balance setting, account impersonation)
//! and on privileged token paths (the USDC master-minter, the WETH deposit
//! function). Every entry point refuses to run unless the active network is
//! a fork.

use ethers::prelude::*;
use eyre::Result;
use serde_json::json;
use std::str::FromStr;
use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::constants::{
    STARTING_ETH_BALANCE_WEI, STARTING_USDC_BALANCE_RAW, STARTING_WETH_BALANCE_WEI,
    USDC_ADDRESS, WETH_ADDRESS,
};
use crate::tokens::AssetToken;
use crate::wallet::WalletManager;

abigen!(
    WETH9,
    r#"[
        function deposit() public payable
        function withdraw(uint wad) public
    ]"#
);

abigen!(
    USDCv2,
    r#"[
        function owner() external view returns (address)
        function updateMasterMinter(address _newMasterMinter) external
        function configureMinter(address minter, uint256 minterAllowedAmount) external returns (bool)
        function mint(address _to, uint256 _amount) external returns (bool)
    ]"#
);

/// Give the account its starting balances: ETH via cheat-code, WETH by
/// wrapping, USDC through the master-minter path.
#[instrument(skip(config, wallet, usdc, weth))]
pub async fn fund_account(
    config: &Config,
    wallet: &WalletManager,
    usdc: &AssetToken,
    weth: &AssetToken,
) -> Result<()> {
    ensure_fork(config)?;

    fund_eth(config, wallet.address, U256::from(STARTING_ETH_BALANCE_WEI)).await?;

    let starting_weth = wallet.get_token_balance(weth).await?;
    wrap_eth(wallet, U256::from(STARTING_WETH_BALANCE_WEI)).await?;
    let ending_weth = wallet.get_token_balance(weth).await?;
    info!(starting = %starting_weth, ending = %ending_weth, "WETH balance funded");

    let starting_usdc = wallet.get_token_balance(usdc).await?;
    mint_usdc(config, wallet, U256::from(STARTING_USDC_BALANCE_RAW)).await?;
    let ending_usdc = wallet.get_token_balance(usdc).await?;
    info!(starting = %starting_usdc, ending = %ending_usdc, "USDC balance funded");

    Ok(())
}

/// Set the account's ETH balance outright via `anvil_setBalance`.
#[instrument(skip(config))]
pub async fn fund_eth(config: &Config, account: Address, wei: U256) -> Result<()> {
    ensure_fork(config)?;
    config
        .rpc_provider
        .request::<_, ()>("anvil_setBalance", [json!(account), json!(wei)])
        .await?;
    debug!(account = ?account, wei = %wei, "Set native balance");
    Ok(())
}

/// Wrap native ETH into WETH through the deposit function.
#[instrument(skip(wallet))]
pub async fn wrap_eth(wallet: &WalletManager, amount_wei: U256) -> Result<()> {
    let weth_address = Address::from_str(WETH_ADDRESS)?;
    let weth = WETH9::new(weth_address, wallet.signer.clone());
    let receipt = weth.deposit().value(amount_wei).send().await?.await?;
    confirm(receipt, "WETH deposit")?;
    Ok(())
}

/// Mint USDC to the wallet.
///
/// The USDC contract is centralized: impersonate its owner long enough to
/// hand the wallet master-minter rights, then configure the wallet as a
/// regular minter and mint as ourselves.
#[instrument(skip(config, wallet))]
pub async fn mint_usdc(config: &Config, wallet: &WalletManager, amount: U256) -> Result<()> {
    ensure_fork(config)?;
    let usdc_address = Address::from_str(USDC_ADDRESS)?;
    let provider = config.rpc_provider.clone();

    let usdc_view = USDCv2::new(usdc_address, provider.clone());
    let owner = usdc_view.owner().call().await?;
    debug!(owner = ?owner, "Impersonating USDC owner");

    impersonate(config, owner).await?;
    let mut tx = usdc_view.update_master_minter(wallet.address).tx.clone();
    tx.set_from(owner);
    let receipt = provider.send_transaction(tx, None).await?.await?;
    confirm(receipt, "updateMasterMinter")?;
    stop_impersonating(config, owner).await?;

    // As the new master minter, grant ourselves a minting allowance and mint
    let usdc = USDCv2::new(usdc_address, wallet.signer.clone());
    let receipt = usdc.configure_minter(wallet.address, amount).send().await?.await?;
    confirm(receipt, "configureMinter")?;
    let receipt = usdc.mint(wallet.address, amount).send().await?.await?;
    confirm(receipt, "mint")?;

    Ok(())
}

/// Start executing transactions as `account` via `anvil_impersonateAccount`.
pub async fn impersonate(config: &Config, account: Address) -> Result<()> {
    ensure_fork(config)?;
    config
        .rpc_provider
        .request::<_, ()>("anvil_impersonateAccount", [json!(account)])
        .await?;
    Ok(())
}

/// Undo [`impersonate`].
pub async fn stop_impersonating(config: &Config, account: Address) -> Result<()> {
    ensure_fork(config)?;
    config
        .rpc_provider
        .request::<_, ()>("anvil_stopImpersonatingAccount", [json!(account)])
        .await?;
    Ok(())
}

fn ensure_fork(config: &Config) -> Result<()> {
    if !config.is_forked_network() {
        eyre::bail!("Cheat-codes are only available on a forked network, not {}", config.network_mode);
    }
    Ok(())
}

fn confirm(receipt: Option<TransactionReceipt>, what: &str) -> Result<TransactionReceipt> {
    match receipt {
        Some(receipt) => {
            if receipt.status == Some(U64::from(1)) {
                Ok(receipt)
            } else {
                Err(eyre::eyre!("Funding {} transaction failed: {:?}", what, receipt))
            }
        }
        None => Err(eyre::eyre!("Funding {} transaction receipt not found", what)),
    }
}
