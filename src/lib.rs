pub mod aave;
pub mod config;
pub mod constants;
pub mod error;
pub mod fork;
pub mod logging;
pub mod oracle;
pub mod rebalance;
pub mod swap;
pub mod tokens;
pub mod units;
pub mod wallet;
