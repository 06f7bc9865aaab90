use ethers::prelude::*;
use std::str::FromStr;
use std::sync::Arc;
use eyre::Result;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::tokens::AssetToken;
use crate::units;

abigen!(
    IERC20,
    r#"[
        function balanceOf(address owner) external view returns (uint256)
    ]"#
);

const NATIVE_DECIMALS: u8 = 18;

pub struct WalletManager {
    pub signer: Arc<SignerMiddleware<Arc<Provider<Http>>, LocalWallet>>,
    pub address: Address,
}

impl WalletManager {
    pub fn new(config: &Config) -> Result<Self> {
        let signer = Self::get_wallet_signer(config)?;
        Ok(Self {
            signer: Arc::new(signer.clone()),
            address: signer.address(),
        })
    }

    /// Returns a Wallet + Provider combo as a `SignerMiddleware`
    fn get_wallet_signer(config: &Config) -> Result<
        SignerMiddleware<Arc<Provider<Http>>, LocalWallet>
    > {
        // Load wallet from private key
        let wallet = LocalWallet::from_str(&config.wallet_private_key)?
            .with_chain_id(config.chain_id);

        // Use already-built provider (already Arc-wrapped)
        let provider = config.rpc_provider.clone();

        // Combine wallet and provider
        let client = SignerMiddleware::new(provider, wallet);
        Ok(client)
    }

    /// Get native token (ETH) balance
    #[instrument(skip(self))]
    pub async fn get_native_balance(&self) -> Result<Decimal> {
        let balance = self.signer.get_balance(self.address, None).await?;
        let balance = units::normalize(balance, NATIVE_DECIMALS)?;
        debug!(
            balance = %balance,
            "Retrieved native balance"
        );
        Ok(balance)
    }

    /// Get an ERC20 token balance in raw on-chain units
    #[instrument(skip(self, token), fields(token = %token.symbol))]
    pub async fn get_raw_token_balance(&self, token: &AssetToken) -> Result<U256> {
        let contract = IERC20::new(token.address, self.signer.clone());
        let balance = contract.balance_of(self.address).call().await?;
        Ok(balance)
    }

    /// Get an ERC20 token balance in the token's natural unit
    #[instrument(skip(self, token), fields(token = %token.symbol))]
    pub async fn get_token_balance(&self, token: &AssetToken) -> Result<Decimal> {
        let raw = self.get_raw_token_balance(token).await?;
        let balance = units::normalize(raw, token.decimals)?;

        debug!(
            token_address = ?token.address,
            token_symbol = %token.symbol,
            balance = %balance,
            "Retrieved token balance"
        );

        Ok(balance)
    }

    /// Log native and token balances for the given tokens
    #[instrument(skip(self, tokens))]
    pub async fn log_all_balances(&self, tokens: &[&AssetToken]) -> Result<()> {
        let native_balance = self.get_native_balance().await?;
        let mut lines = vec![format!("ETH: {}", native_balance)];
        for token in tokens {
            let balance = self.get_token_balance(token).await?;
            lines.push(format!("{} ({}): {}", token.symbol, token.address, balance));
        }
        info!(balances = %lines.join("\n"), "Wallet balances");
        Ok(())
    }
}
