use ethers::prelude::*;
use eyre::Result;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::constants::{UNISWAP_FEE_TIER, UNISWAP_SWAP_ROUTER};
use crate::tokens::AssetToken;
use crate::units;
use crate::wallet::WalletManager;

abigen!(
    ISwapRouter,
    r#"[
        {
            "type": "function",
            "name": "exactInputSingle",
            "stateMutability": "payable",
            "inputs": [
                {
                    "name": "params",
                    "type": "tuple",
                    "components": [
                        {"name": "tokenIn", "type": "address"},
                        {"name": "tokenOut", "type": "address"},
                        {"name": "fee", "type": "uint24"},
                        {"name": "recipient", "type": "address"},
                        {"name": "amountIn", "type": "uint256"},
                        {"name": "amountOutMinimum", "type": "uint256"},
                        {"name": "sqrtPriceLimitX96", "type": "uint160"}
                    ]
                }
            ],
            "outputs": [{"name": "amountOut", "type": "uint256"}]
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

/// Uniswap v3 swap router bound to the wallet signer.
pub struct SwapRouter {
    router: ISwapRouter<Client>,
    client: Arc<Client>,
}

impl SwapRouter {
    pub fn new(wallet: &WalletManager) -> Result<Self> {
        let router_address = Address::from_str(UNISWAP_SWAP_ROUTER)?;
        Ok(Self {
            router: ISwapRouter::new(router_address, wallet.signer.clone()),
            client: wallet.signer.clone(),
        })
    }

    /// Sell exactly `amount_in` of `sell` for `buy` through the 0.3% fee
    /// pool, reverting unless at least `min_amount_out` comes back.
    #[instrument(skip(self, wallet, sell, buy), fields(sell = %sell.symbol, buy = %buy.symbol))]
    pub async fn exact_input_single(
        &self,
        wallet: &WalletManager,
        sell: &AssetToken,
        buy: &AssetToken,
        amount_in: Decimal,
        min_amount_out: Decimal,
        recipient: Address,
    ) -> Result<()> {
        let amount_in_raw = units::denormalize(amount_in, sell.decimals)?;
        let min_out_raw = units::denormalize(min_amount_out, buy.decimals)?;

        let swap_log_string = format!(
            "SWAP | {} -> {} | SELL {} {} |",
            sell.symbol, buy.symbol, amount_in, sell.symbol
        );

        // Validate we hold what we are about to sell
        let sell_balance = wallet.get_raw_token_balance(sell).await?;
        if sell_balance < amount_in_raw {
            return Err(eyre::eyre!(
                "Insufficient balance: need {} but have {} of token {:?}",
                amount_in_raw,
                sell_balance,
                sell.address
            ));
        }

        let initial_buy_balance = wallet.get_token_balance(buy).await?;
        info!(
            amount_in = %amount_in,
            min_amount_out = %min_amount_out,
            initial_buy_balance = %initial_buy_balance,
            "{} Swap Initiated",
            swap_log_string
        );

        self.ensure_token_approval(sell, amount_in_raw).await?;
        debug!("{} Token Approval Ensured", swap_log_string);

        let params = (
            sell.address,      // what are we selling
            buy.address,       // what are we buying
            UNISWAP_FEE_TIER,  // fee structure, 3000 stands for the 0.3% fee pool
            recipient,
            amount_in_raw,
            min_out_raw,
            U256::zero(),      // sqrtPriceLimitX96, no price limit
        );
        let receipt = self.router.exact_input_single(params).send().await?.await?;
        let receipt = confirm(receipt, "exactInputSingle")?;

        let gas_used = receipt.gas_used.unwrap_or(U256::zero());
        let gas_price = receipt.effective_gas_price.unwrap_or(U256::zero());
        info!(
            tx_hash = ?receipt.transaction_hash,
            block_number = ?receipt.block_number.unwrap_or(U64::zero()),
            gas_used = %gas_used,
            gas_price = %gas_price,
            "{} Swap Executed Successfully",
            swap_log_string,
        );

        let final_sell_balance = wallet.get_token_balance(sell).await?;
        let final_buy_balance = wallet.get_token_balance(buy).await?;
        info!(
            final_sell_balance = %final_sell_balance,
            final_buy_balance = %final_buy_balance,
            "{} Swap Completed",
            swap_log_string
        );

        Ok(())
    }

    /// Ensure the router has sufficient allowance to spend our tokens
    #[instrument(skip(self, token), fields(token = %token.symbol))]
    async fn ensure_token_approval(&self, token: &AssetToken, required_amount: U256) -> Result<()> {
        let erc20 = IERC20Approve::new(token.address, self.client.clone());
        let owner = self.client.address();

        let current_allowance = erc20
            .allowance(owner, self.router.address())
            .call()
            .await?;

        if current_allowance < required_amount {
            debug!(
                current_allowance = %current_allowance,
                required_amount = %required_amount,
                "Insufficient allowance, approving tokens"
            );

            // Approve maximum amount to avoid repeated approvals
            let receipt = erc20
                .approve(self.router.address(), U256::MAX)
                .send()
                .await?
                .await?;
            confirm(receipt, "approve")?;
        } else {
            debug!(
                current_allowance = %current_allowance,
                required_amount = %required_amount,
                "Sufficient allowance already exists"
            );
        }

        Ok(())
    }
}

fn confirm(receipt: Option<TransactionReceipt>, what: &str) -> Result<TransactionReceipt> {
    match receipt {
        Some(receipt) => {
            if receipt.status == Some(U64::from(1)) {
                Ok(receipt)
            } else {
                Err(eyre::eyre!("Swap {} transaction failed: {:?}", what, receipt))
            }
        }
        None => Err(eyre::eyre!("Swap {} transaction receipt not found", what)),
    }
}
