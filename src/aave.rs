use ethers::prelude::*;
use eyre::Result;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::constants::{
    AAVE_BASE_CURRENCY_DECIMALS, AAVE_POOL_ADDRESSES_PROVIDER, AAVE_PROTOCOL_DATA_PROVIDER,
    AAVE_REFERRAL_CODE,
};
use crate::tokens::AssetToken;
use crate::units;
use crate::wallet::WalletManager;

abigen!(
    IPoolAddressesProvider,
    r#"[
        function getPool() external view returns (address)
    ]"#
);

abigen!(
    IPool,
    r#"[
        function supply(address asset, uint256 amount, address onBehalfOf, uint16 referralCode) external
        function withdraw(address asset, uint256 amount, address to) external returns (uint256)
        function getUserAccountData(address user) external view returns (uint256, uint256, uint256, uint256, uint256, uint256)
    ]"#
);

abigen!(
    IAaveProtocolDataProvider,
    r#"[
        {
            "type": "function",
            "name": "getAllATokens",
            "stateMutability": "view",
            "inputs": [],
            "outputs": [
                {
                    "name": "tokens",
                    "type": "tuple[]",
                    "components": [
                        {"name": "symbol", "type": "string"},
                        {"name": "tokenAddress", "type": "address"}
                    ]
                }
            ]
        }
    ]"#
);

abigen!(
    IERC20Approve,
    r#"[
        function approve(address spender, uint256 amount) external returns (bool)
        function allowance(address owner, address spender) external view returns (uint256)
    ]"#
);

type Client = SignerMiddleware<Arc<Provider<Http>>, LocalWallet>;

/// The user's collateral and debt snapshot, in the pool's base currency
/// (8-decimal USD).
#[derive(Debug, Clone)]
pub struct UserAccountData {
    pub total_collateral_base: Decimal,
    pub total_debt_base: Decimal,
    pub available_borrows_base: Decimal,
    pub current_liquidation_threshold: U256,
    pub ltv: U256,
    pub health_factor: U256,
}

impl UserAccountData {
    pub fn log(&self) {
        info!(
            total_collateral_base = %self.total_collateral_base,
            total_debt_base = %self.total_debt_base,
            available_borrows_base = %self.available_borrows_base,
            current_liquidation_threshold = %self.current_liquidation_threshold,
            ltv = %self.ltv,
            health_factor = %self.health_factor,
            "User account data"
        );
    }
}

/// Aave v3 pool bound to the wallet signer. The pool address is resolved
/// through the addresses provider on every connect since it can change.
pub struct LendingPool {
    pool: IPool<Client>,
    client: Arc<Client>,
}

impl LendingPool {
    #[instrument(skip(wallet))]
    pub async fn connect(wallet: &WalletManager) -> Result<Self> {
        let provider_address = Address::from_str(AAVE_POOL_ADDRESSES_PROVIDER)?;
        let addresses_provider = IPoolAddressesProvider::new(provider_address, wallet.signer.clone());
        let pool_address = addresses_provider.get_pool().call().await?;
        debug!(pool = ?pool_address, "Resolved Aave pool address");
        Ok(Self {
            pool: IPool::new(pool_address, wallet.signer.clone()),
            client: wallet.signer.clone(),
        })
    }

    pub fn address(&self) -> Address {
        self.pool.address()
    }

    /// Supply `amount` of `token` into the pool, approving first if the
    /// current allowance falls short.
    #[instrument(skip(self, token), fields(token = %token.symbol))]
    pub async fn supply(&self, token: &AssetToken, amount: U256, on_behalf_of: Address) -> Result<()> {
        let erc20 = IERC20Approve::new(token.address, self.client.clone());
        let allowed = erc20.allowance(on_behalf_of, self.pool.address()).call().await?;
        if allowed < amount {
            let receipt = erc20
                .approve(self.pool.address(), amount)
                .send()
                .await?
                .await?;
            confirm(receipt, "token approval")?;
        }

        info!(
            token = %token.symbol,
            amount = %amount,
            pool = ?self.pool.address(),
            "Supplying into Aave pool"
        );
        let receipt = self
            .pool
            .supply(token.address, amount, on_behalf_of, AAVE_REFERRAL_CODE)
            .send()
            .await?
            .await?;
        confirm(receipt, "supply")?;
        Ok(())
    }

    /// Withdraw `amount` of the underlying `token` to `to`.
    #[instrument(skip(self, token), fields(token = %token.symbol))]
    pub async fn withdraw(&self, token: &AssetToken, amount: U256, to: Address) -> Result<()> {
        info!(
            token = %token.symbol,
            amount = %amount,
            "Withdrawing from Aave pool"
        );
        let receipt = self
            .pool
            .withdraw(token.address, amount, to)
            .send()
            .await?
            .await?;
        confirm(receipt, "withdraw")?;
        Ok(())
    }

    /// Fetch the user's account snapshot, normalized to the pool's
    /// 8-decimal base currency.
    #[instrument(skip(self))]
    pub async fn user_account_data(&self, user: Address) -> Result<UserAccountData> {
        let (
            total_collateral_base,
            total_debt_base,
            available_borrows_base,
            current_liquidation_threshold,
            ltv,
            health_factor,
        ) = self.pool.get_user_account_data(user).call().await?;

        Ok(UserAccountData {
            total_collateral_base: units::normalize(total_collateral_base, AAVE_BASE_CURRENCY_DECIMALS)?,
            total_debt_base: units::normalize(total_debt_base, AAVE_BASE_CURRENCY_DECIMALS)?,
            available_borrows_base: units::normalize(available_borrows_base, AAVE_BASE_CURRENCY_DECIMALS)?,
            current_liquidation_threshold,
            ltv,
            health_factor,
        })
    }
}

/// Find the interest-bearing aToken whose symbol contains `fragment`
/// (e.g. "USDC" matches "aEthUSDC") and load its metadata.
#[instrument(skip(wallet))]
pub async fn a_token_for(wallet: &WalletManager, fragment: &str) -> Result<AssetToken> {
    let data_provider_address = Address::from_str(AAVE_PROTOCOL_DATA_PROVIDER)?;
    let data_provider = IAaveProtocolDataProvider::new(data_provider_address, wallet.signer.clone());
    let a_tokens = data_provider.get_all_a_tokens().call().await?;

    for (symbol, address) in a_tokens {
        if symbol.contains(fragment) {
            debug!(symbol = %symbol, address = ?address, "Found aToken");
            return AssetToken::load(address, wallet.signer.clone()).await;
        }
    }
    Err(eyre::eyre!("No aToken found matching symbol fragment {}", fragment))
}

fn confirm(receipt: Option<TransactionReceipt>, what: &str) -> Result<TransactionReceipt> {
    match receipt {
        Some(receipt) => {
            if receipt.status == Some(U64::from(1)) {
                Ok(receipt)
            } else {
                Err(eyre::eyre!("Aave {} transaction failed: {:?}", what, receipt))
            }
        }
        None => Err(eyre::eyre!("Aave {} transaction receipt not found", what)),
    }
}
