use anyhow::{anyhow, Context, Result};
use ethers::providers::{Http, Provider};
use ethers::types::Address;
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// A predefined EVM-compatible network with label, chain ID, native token, and default RPC.
#[derive(Clone, Debug)]
pub struct EvmNetwork {
    pub label: &'static str,
    pub chain_id: u64,
    pub native_token: &'static str,
    pub default_rpc: &'static str,
}

impl EvmNetwork {
    pub const fn new(
        label: &'static str,
        chain_id: u64,
        native_token: &'static str,
        default_rpc: &'static str,
    ) -> Self {
        Self {
            label,
            chain_id,
            native_token,
            default_rpc,
        }
    }
}

/// Networks with a known public RPC endpoint.
pub const NETWORKS: &[EvmNetwork] = &[
    EvmNetwork::new("Ethereum", 1, "ETH", "https://ethereum-rpc.publicnode.com"),
    EvmNetwork::new("Sepolia", 11155111, "ETH", "https://ethereum-sepolia-rpc.publicnode.com"),
    EvmNetwork::new("Optimism", 10, "ETH", "https://mainnet.optimism.io"),
    EvmNetwork::new("Base", 8453, "ETH", "https://mainnet.base.org"),
    EvmNetwork::new("Arbitrum One", 42161, "ETH", "https://arb1.arbitrum.io/rpc"),
    EvmNetwork::new("Polygon", 137, "POL", "https://polygon-rpc.com"),
    EvmNetwork::new("zkSync Era", 324, "ETH", "https://mainnet.era.zksync.io"),
    EvmNetwork::new("Anvil", 31337, "ETH", "http://127.0.0.1:8545"),
];

/// Default network when nothing else is configured
pub const DEFAULT_CHAIN_ID: u64 = 11155111;

/// Default number of seconds to wait for a transaction receipt
pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 120;

/// Default receipt polling interval
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Find a network by chain ID
pub fn find_network_by_chain_id(chain_id: u64) -> Option<&'static EvmNetwork> {
    NETWORKS.iter().find(|n| n.chain_id == chain_id)
}

/// Get the block explorer URL for a given chain ID
pub fn get_block_explorer_url(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        1 => Some("https://etherscan.io"),
        11155111 => Some("https://sepolia.etherscan.io"),
        10 => Some("https://optimistic.etherscan.io"),
        8453 => Some("https://basescan.org"),
        42161 => Some("https://arbiscan.io"),
        137 => Some("https://polygonscan.com"),
        324 => Some("https://explorer.zksync.io"),
        _ => None,
    }
}

/// Get the full URL to view a transaction on the block explorer
pub fn get_tx_explorer_url(chain_id: u64, tx_hash: &str) -> Option<String> {
    get_block_explorer_url(chain_id).map(|base| format!("{}/tx/{}", base, tx_hash))
}

/// Where airdrops are sent on a given chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainTarget {
    pub airdrop_contract: Address,
}

/// Static chain id → airdrop contract table. Supplied by settings/env, read-only afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChainTargets {
    targets: HashMap<u64, ChainTarget>,
}

impl ChainTargets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and CLI overrides
    pub fn with(mut self, chain_id: u64, airdrop_contract: Address) -> Self {
        self.insert(chain_id, airdrop_contract);
        self
    }

    pub fn insert(&mut self, chain_id: u64, airdrop_contract: Address) {
        self.targets.insert(chain_id, ChainTarget { airdrop_contract });
    }

    pub fn resolve(&self, chain_id: u64) -> Option<&ChainTarget> {
        self.targets.get(&chain_id)
    }

    /// Parse a `chain_id -> "0x.."` table (as stored in the settings file)
    pub fn from_strings(entries: &HashMap<u64, String>) -> Result<Self> {
        let mut targets = Self::new();
        for (chain_id, addr) in entries {
            let contract: Address = addr
                .trim()
                .parse()
                .map_err(|_| anyhow!("Invalid airdrop contract address for chain {}: {}", chain_id, addr))?;
            targets.insert(*chain_id, contract);
        }
        Ok(targets)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub rpc_url: String,
    pub chain_id: u64,
    pub confirmation_timeout: Duration,
    pub poll_interval: Duration,
    pub targets: ChainTargets,
}

impl Config {
    pub fn new(rpc_url: String, chain_id: u64) -> Self {
        Self {
            rpc_url,
            chain_id,
            confirmation_timeout: Duration::from_secs(DEFAULT_CONFIRMATION_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            targets: ChainTargets::new(),
        }
    }

    pub fn from_network(network: &EvmNetwork) -> Self {
        Self::new(network.default_rpc.to_string(), network.chain_id)
    }

    /// Build a config from persisted settings. The RPC URL comes from the
    /// settings override if present, otherwise from the built-in network table.
    pub fn from_settings(settings: &crate::settings::Settings) -> Result<Self> {
        let chain_id = settings.selected_chain_id;
        let rpc_url = match settings.get_custom_rpc(chain_id) {
            Some(rpc) => rpc.clone(),
            None => find_network_by_chain_id(chain_id)
                .map(|n| n.default_rpc.to_string())
                .ok_or_else(|| anyhow!("No RPC URL known for chain {}; set one in the settings file", chain_id))?,
        };

        let mut config = Self::new(rpc_url, chain_id);
        config.confirmation_timeout = Duration::from_secs(settings.confirmation_timeout_secs);
        config.poll_interval = Duration::from_millis(settings.poll_interval_ms);
        config.targets = ChainTargets::from_strings(&settings.airdrop_contracts)
            .context("Invalid airdrop contract table in settings")?;
        Ok(config)
    }

    /// Apply `RPC_URL`, `CHAIN_ID`, `AIRDROP_CONTRACT` and
    /// `CONFIRMATION_TIMEOUT_SECS` from the environment.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(chain_id) = env::var("CHAIN_ID") {
            self.set_chain(chain_id.trim().parse().context("CHAIN_ID must be an integer")?);
        }
        if let Ok(rpc) = env::var("RPC_URL") {
            self.set_rpc_url(&rpc);
        }
        if let Ok(contract) = env::var("AIRDROP_CONTRACT") {
            self.set_airdrop_contract(&contract)?;
        }
        if let Some(secs) = env::var("CONFIRMATION_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse().ok())
        {
            self.confirmation_timeout = Duration::from_secs(secs);
        }
        Ok(())
    }

    /// Switch the active chain, picking up its default RPC when one is known.
    pub fn set_chain(&mut self, chain_id: u64) {
        if chain_id == self.chain_id {
            return;
        }
        self.chain_id = chain_id;
        if let Some(network) = find_network_by_chain_id(chain_id) {
            self.rpc_url = network.default_rpc.to_string();
        }
    }

    /// Override the RPC endpoint. Blank input keeps the current one.
    pub fn set_rpc_url(&mut self, rpc: &str) {
        let rpc = rpc.trim();
        if !rpc.is_empty() {
            self.rpc_url = rpc.to_string();
        }
    }

    /// Register (or replace) the airdrop contract for the active chain.
    pub fn set_airdrop_contract(&mut self, address: &str) -> Result<()> {
        let contract: Address = address
            .trim()
            .parse()
            .map_err(|_| anyhow!("Invalid airdrop contract address: {}", address))?;
        self.targets.insert(self.chain_id, contract);
        Ok(())
    }

    pub fn native_token(&self) -> &str {
        find_network_by_chain_id(self.chain_id)
            .map(|n| n.native_token)
            .unwrap_or("ETH")
    }

    pub fn network_label(&self) -> &str {
        find_network_by_chain_id(self.chain_id)
            .map(|n| n.label)
            .unwrap_or("Unknown")
    }

    pub async fn get_provider(&self) -> Result<Arc<Provider<Http>>> {
        let url = Url::parse(&self.rpc_url)
            .with_context(|| format!("Invalid RPC URL: {}", self.rpc_url))?;
        let provider = Provider::<Http>::try_from(url.as_str())?;
        Ok(Arc::new(provider))
    }
}

impl Default for Config {
    fn default() -> Self {
        if let Some(sepolia) = find_network_by_chain_id(DEFAULT_CHAIN_ID) {
            Self::from_network(sepolia)
        } else {
            Self::new("https://rpc.sepolia.org".to_string(), DEFAULT_CHAIN_ID)
        }
    }
}
