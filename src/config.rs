use dotenvy::dotenv;
use std::env;
use std::sync::Arc;
use ethers::providers::{Http, Middleware, Provider};

/// Runtime configuration, loaded from the environment.
///
/// `NETWORK_MODE=fork` (the default) points at a local anvil fork of
/// mainnet and unlocks the cheat-code paths; `NETWORK_MODE=live` requires
/// an explicit RPC url and wallet key and never touches cheat-codes.
pub struct Config {
    pub rpc_provider: Arc<Provider<Http>>,
    pub wallet_private_key: String,
    pub network_mode: String,
    pub chain_id: u64,
}

// anvil's well-known account #0 key, usable only against a local fork
const ANVIL_DEFAULT_KEY: &str =
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

impl Config {
    pub async fn load() -> Self {
        dotenv().ok();

        let network_mode = env::var("NETWORK_MODE").unwrap_or_else(|_| "fork".to_string());

        let rpc_url = match network_mode.as_str() {
            "fork" => env::var("RPC_URL").unwrap_or_else(|_| "http://localhost:8545".to_string()),
            "live" => env::var("RPC_URL").expect("Missing RPC_URL"),
            _ => panic!("Invalid NETWORK_MODE value (must be 'fork' or 'live')"),
        };

        let wallet_private_key = match network_mode.as_str() {
            "fork" => env::var("WALLET_PRIVATE_KEY").unwrap_or_else(|_| ANVIL_DEFAULT_KEY.to_string()),
            "live" => env::var("WALLET_PRIVATE_KEY").expect("Missing WALLET_PRIVATE_KEY"),
            _ => panic!("Invalid NETWORK_MODE"),
        };

        let provider = Provider::<Http>::try_from(rpc_url)
            .expect("Failed to create RPC provider");

        let chain_id = provider
            .get_chainid()
            .await
            .expect("Failed to query chain id from RPC provider")
            .as_u64();

        Config {
            rpc_provider: Arc::new(provider),
            wallet_private_key,
            network_mode,
            chain_id,
        }
    }

    /// Cheat-codes (balance setting, impersonation, minting) are only legal
    /// against a local or forked network.
    pub fn is_forked_network(&self) -> bool {
        self.network_mode == "fork"
    }
}
