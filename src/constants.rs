// Mainnet contract addresses and harness parameters. Addresses are the
// canonical Ethereum mainnet deployments, reachable through an anvil fork.
use rust_decimal::{Decimal, dec};

// Tokens
pub const USDC_ADDRESS: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
pub const WETH_ADDRESS: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";
pub const USDC_DECIMALS: u8 = 6;
pub const WETH_DECIMALS: u8 = 18;

// Aave v3
pub const AAVE_POOL_ADDRESSES_PROVIDER: &str = "0x2f39d218133AFaB8F2B819B1066c7E434Ad94E9e";
pub const AAVE_PROTOCOL_DATA_PROVIDER: &str = "0x7B4EB56E7CD4b454BA8ff71E4518426369a138a3";
pub const AAVE_REFERRAL_CODE: u16 = 0;
pub const AAVE_BASE_CURRENCY_DECIMALS: u8 = 8; // getUserAccountData reports in 8-decimal USD

// Chainlink price feeds
pub const USDC_USD_FEED: &str = "0x8fFfFfd4AfB6115b954Bd326cbe7B4BA576818f6";
pub const ETH_USD_FEED: &str = "0x5f4eC3Df9cbd43714FE2740f5E3616155c5b8419";

// Uniswap v3
pub const UNISWAP_SWAP_ROUTER: &str = "0xE592427A0AEce92De3Edee1F18E0157C05861564";
pub const UNISWAP_FEE_TIER: u32 = 3000; // 0.3% fee pool

// Starting balances on a forked network
pub const STARTING_ETH_BALANCE_WEI: u128 = 1_000_000_000_000_000_000_000; // 1000 ETH
pub const STARTING_WETH_BALANCE_WEI: u128 = 1_000_000_000_000_000_000; // 1 WETH
pub const STARTING_USDC_BALANCE_RAW: u128 = 100_000_000; // 100 USDC, 6 decimals not 18

// Rebalancing policy
pub const TARGET_USDC_WEIGHT: Decimal = dec!(0.3);
pub const TARGET_WETH_WEIGHT: Decimal = dec!(0.7);
pub const REBALANCE_TOLERANCE: Decimal = dec!(0.1);
pub const MIN_AMOUNT_OUT_FACTOR: Decimal = dec!(0.90); // accept at least 90% of the computed buy
