use ethers::prelude::*;
use eyre::Result;
use tracing::debug;

use std::sync::Arc;

abigen!(
    IERC20Metadata,
    r#"[
        function symbol() external view returns (string)
        function decimals() external view returns (uint8)
    ]"#
);

/// Metadata for one ERC-20 asset handled by the harness.
#[derive(Debug, Clone)]
pub struct AssetToken {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
}

impl AssetToken {
    /// Load a token's symbol and decimal precision from the chain.
    ///
    /// Decimals drive every normalize/denormalize conversion, so they are
    /// always read from the contract rather than assumed.
    pub async fn load<M: Middleware + 'static>(address: Address, client: Arc<M>) -> Result<Self> {
        let contract = IERC20Metadata::new(address, client);
        let symbol = contract.symbol().call().await.map_err(|e| {
            eyre::eyre!("Failed to read symbol of token {:?}: {}", address, e)
        })?;
        let decimals = contract.decimals().call().await.map_err(|e| {
            eyre::eyre!("Failed to read decimals of token {:?}: {}", address, e)
        })?;
        debug!(symbol = %symbol, address = ?address, decimals, "Loaded token metadata");
        Ok(Self { symbol, address, decimals })
    }
}
