use ethers::prelude::*;
use eyre::Result;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::debug;

use crate::config::Config;
use crate::units;

// ABI for Chainlink AggregatorV3Interface
abigen!(
    AggregatorV3Interface,
    r#"[
        function latestRoundData() external view returns (uint80, int256, uint256, uint256, uint80)
        function decimals() external view returns (uint8)
    ]"#
);

/// An individual Chainlink price feed (e.g., ETH/USD)
#[derive(Debug, Clone)]
pub struct PriceFeed {
    pub name: String,
    pub aggregator: Address,
}

impl PriceFeed {
    pub fn new(name: &str, aggregator: &str) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            aggregator: Address::from_str(aggregator)?,
        })
    }

    /// Fetch the latest answer and scale it down by the feed's decimals.
    ///
    /// Non-positive answers are rejected here so a broken feed can never
    /// hand a zero price to the trade calculation.
    pub async fn fetch_price(&self, config: &Config) -> Result<Decimal> {
        let contract = AggregatorV3Interface::new(self.aggregator, config.rpc_provider.clone());
        let decimals = contract.decimals().call().await?;
        let round_data = contract.latest_round_data().call().await?;
        let raw_answer = round_data.1;

        if raw_answer <= I256::zero() {
            eyre::bail!(
                "Price feed {} at {:?} returned non-positive answer {}",
                self.name,
                self.aggregator,
                raw_answer
            );
        }

        let price = units::normalize(raw_answer.into_raw(), decimals)?;
        debug!(feed = %self.name, price = %price, "Fetched oracle price");
        Ok(price)
    }
}
