//! Best-effort token details (name, symbol, decimals, supply) for display.
//!
//! Nothing here is on the submission path: a failed lookup only changes what
//! the caller shows next to the token address.

use crate::amounts::parse_address;
use crate::chain::ChainClient;
use crate::contracts;
use crate::error::MetadataError;
use ethers::abi::{Function, Token};
use ethers::types::{Address, U256};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenMetadata {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u32>,
    pub total_supply: Option<String>,
}

async fn read_first(
    client: &dyn ChainClient,
    token: Address,
    function: &Function,
) -> Result<Token, MetadataError> {
    client
        .read(token, function, &[])
        .await
        .map_err(|e| MetadataError::Unresolvable(e.to_string()))?
        .into_iter()
        .next()
        .ok_or_else(|| MetadataError::Unresolvable(format!("{}() returned nothing", function.name)))
}

async fn read_string(
    client: &dyn ChainClient,
    token: Address,
    function: &Function,
) -> Result<String, MetadataError> {
    read_first(client, token, function)
        .await?
        .into_string()
        .ok_or_else(|| MetadataError::Unresolvable(format!("{}() is not a string", function.name)))
}

async fn read_uint(
    client: &dyn ChainClient,
    token: Address,
    function: &Function,
) -> Result<U256, MetadataError> {
    read_first(client, token, function)
        .await?
        .into_uint()
        .ok_or_else(|| MetadataError::Unresolvable(format!("{}() is not an integer", function.name)))
}

/// Read the token's details.
///
/// `name`, `symbol` and `decimals` are required; if any of them fails the
/// token is [`MetadataError::Unresolvable`]. `totalSupply` is optional and is
/// simply left out when it cannot be read.
pub async fn resolve(client: &dyn ChainClient, token: Address) -> Result<TokenMetadata, MetadataError> {
    let (name_fn, symbol_fn, decimals_fn) = (
        contracts::erc20_name(),
        contracts::erc20_symbol(),
        contracts::erc20_decimals(),
    );

    let (name, symbol, decimals) = tokio::try_join!(
        read_string(client, token, &name_fn),
        read_string(client, token, &symbol_fn),
        read_uint(client, token, &decimals_fn),
    )?;

    if decimals > U256::from(u32::MAX) {
        return Err(MetadataError::Unresolvable(format!("decimals() out of range: {}", decimals)));
    }

    let total_supply = match read_uint(client, token, &contracts::erc20_total_supply()).await {
        Ok(supply) => Some(supply.to_string()),
        Err(e) => {
            debug!("totalSupply unavailable for {:?}: {}", token, e);
            None
        }
    };

    Ok(TokenMetadata {
        name: Some(name),
        symbol: Some(symbol),
        decimals: Some(decimals.as_u32()),
        total_supply,
    })
}

/// Latest metadata lookup outcome, tagged with the address it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataStatus {
    NotRequested,
    Loading { token: Address },
    Resolved { token: Address, metadata: TokenMetadata },
    Unresolvable { token: Address, error: MetadataError },
}

impl MetadataStatus {
    pub fn token(&self) -> Option<Address> {
        match self {
            MetadataStatus::NotRequested => None,
            MetadataStatus::Loading { token }
            | MetadataStatus::Resolved { token, .. }
            | MetadataStatus::Unresolvable { token, .. } => Some(*token),
        }
    }
}

/// Interpret raw address-field text. Anything the submission path would not
/// accept as a token address means "nothing to look up".
pub fn parse_token_input(input: &str) -> Option<Address> {
    parse_address(input.trim())
}

struct Tracked {
    token: Option<Address>,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

struct Shared {
    status: watch::Sender<MetadataStatus>,
    tracked: Mutex<Tracked>,
}

impl Shared {
    fn tracked(&self) -> MutexGuard<'_, Tracked> {
        self.tracked.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Publish the outcome of lookup `generation` for `token`, unless a newer
    /// `track` call has superseded it. Returns whether it was published.
    fn publish(
        &self,
        generation: u64,
        token: Address,
        outcome: Result<TokenMetadata, MetadataError>,
    ) -> bool {
        let tracked = self.tracked();
        if tracked.generation != generation || tracked.token != Some(token) {
            debug!("Discarding stale metadata for {:?}", token);
            return false;
        }
        let status = match outcome {
            Ok(metadata) => {
                info!("Resolved token {:?}: {:?} ({:?})", token, metadata.name, metadata.symbol);
                MetadataStatus::Resolved { token, metadata }
            }
            Err(error) => {
                warn!("Token {:?} unresolvable: {}", token, error);
                MetadataStatus::Unresolvable { token, error }
            }
        };
        // Sent while holding the lock so `track` cannot interleave
        self.status.send_replace(status);
        true
    }
}

/// Keeps the metadata of the most recently entered token address.
///
/// Each new address cancels the lookup for the previous one. A lookup that
/// still finishes after being superseded is dropped instead of published.
pub struct MetadataTracker {
    client: Arc<dyn ChainClient>,
    shared: Arc<Shared>,
}

impl MetadataTracker {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        let (status, _) = watch::channel(MetadataStatus::NotRequested);
        Self {
            client,
            shared: Arc::new(Shared {
                status,
                tracked: Mutex::new(Tracked {
                    token: None,
                    generation: 0,
                    task: None,
                }),
            }),
        }
    }

    /// Follow the token address field. Must be called inside a tokio runtime.
    pub fn track(&self, input: &str) {
        let token = parse_token_input(input);
        let mut tracked = self.shared.tracked();
        if tracked.token == token {
            return;
        }

        if let Some(task) = tracked.task.take() {
            task.abort();
        }
        tracked.generation += 1;
        tracked.token = token;

        let Some(token) = token else {
            self.shared.status.send_replace(MetadataStatus::NotRequested);
            return;
        };

        self.shared.status.send_replace(MetadataStatus::Loading { token });
        let generation = tracked.generation;
        let client = self.client.clone();
        let shared = self.shared.clone();

        tracked.task = Some(tokio::spawn(async move {
            let outcome = resolve(client.as_ref(), token).await;
            shared.publish(generation, token, outcome);
        }));
    }

    pub fn status(&self) -> MetadataStatus {
        self.shared.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MetadataStatus> {
        self.shared.status.subscribe()
    }

    /// Latest outcome for `token`; `NotRequested` if a different address is tracked.
    pub fn metadata_for(&self, token: Address) -> MetadataStatus {
        let status = self.status();
        if status.token() == Some(token) {
            status
        } else {
            MetadataStatus::NotRequested
        }
    }
}

impl Drop for MetadataTracker {
    fn drop(&mut self) {
        if let Some(task) = self.shared.tracked().task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockChain, MockToken, TOKEN, TOKEN_B};
    use std::time::Duration;
    use tokio::time::timeout;

    fn addr_text(addr: Address) -> String {
        format!("{:?}", addr)
    }

    fn finished_lookup(name: &str, symbol: &str) -> Result<TokenMetadata, MetadataError> {
        Ok(TokenMetadata {
            name: Some(name.to_string()),
            symbol: Some(symbol.to_string()),
            decimals: Some(18),
            total_supply: None,
        })
    }

    async fn wait_until(
        rx: &mut watch::Receiver<MetadataStatus>,
        f: impl FnMut(&MetadataStatus) -> bool,
    ) -> MetadataStatus {
        timeout(Duration::from_secs(5), rx.wait_for(f))
            .await
            .expect("timed out waiting for metadata status")
            .expect("status channel closed")
            .clone()
    }

    // ==================== resolve tests ====================

    #[tokio::test]
    async fn test_resolve_full_metadata() {
        let chain = MockChain::new().with_token(TOKEN, MockToken::erc20("Mock Token", "MOCK", 18));
        let metadata = resolve(&chain, TOKEN).await.unwrap();
        assert_eq!(
            metadata,
            TokenMetadata {
                name: Some("Mock Token".to_string()),
                symbol: Some("MOCK".to_string()),
                decimals: Some(18),
                total_supply: Some("1000000".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_resolve_without_total_supply_is_partial() {
        let mut token = MockToken::erc20("Mock Token", "MOCK", 6);
        token.total_supply = None;
        let chain = MockChain::new().with_token(TOKEN, token);

        let metadata = resolve(&chain, TOKEN).await.unwrap();
        assert_eq!(metadata.decimals, Some(6));
        assert!(metadata.total_supply.is_none());
    }

    #[tokio::test]
    async fn test_resolve_missing_symbol_is_unresolvable() {
        let mut token = MockToken::erc20("Mock Token", "MOCK", 18);
        token.symbol = None;
        let chain = MockChain::new().with_token(TOKEN, token);

        let err = resolve(&chain, TOKEN).await.unwrap_err();
        assert!(matches!(err, MetadataError::Unresolvable(_)));
    }

    #[tokio::test]
    async fn test_resolve_not_a_token() {
        let chain = MockChain::new();
        assert!(resolve(&chain, TOKEN).await.is_err());
    }

    #[tokio::test]
    async fn test_resolve_rejects_absurd_decimals() {
        let mut token = MockToken::erc20("Mock Token", "MOCK", 0);
        token.decimals = Some(U256::from(u64::MAX));
        let chain = MockChain::new().with_token(TOKEN, token);
        assert!(resolve(&chain, TOKEN).await.is_err());
    }

    // ==================== parse_token_input tests ====================

    #[test]
    fn test_parse_token_input() {
        assert_eq!(parse_token_input(&format!("  {}  ", addr_text(TOKEN))), Some(TOKEN));
        assert_eq!(parse_token_input(""), None);
        assert_eq!(parse_token_input("0x12"), None);
        // Bare hex without the 0x prefix is not treated as an address
        assert_eq!(parse_token_input(&addr_text(TOKEN)[2..]), None);
        // Same checksum rule as the submission path
        assert!(parse_token_input("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").is_some());
        assert_eq!(parse_token_input("0x5aaeb6053F3E94C9b9A09f33669435E7Ef1BeAed"), None);
    }

    // ==================== MetadataTracker tests ====================

    #[tokio::test]
    async fn test_tracker_resolves_tracked_address() {
        let chain = Arc::new(MockChain::new().with_token(TOKEN, MockToken::erc20("A", "AAA", 18)));
        let tracker = MetadataTracker::new(chain.clone());
        let mut rx = tracker.subscribe();

        tracker.track(&addr_text(TOKEN));
        let status = wait_until(&mut rx, |s| matches!(s, MetadataStatus::Resolved { .. })).await;
        assert_eq!(status.token(), Some(TOKEN));
        assert!(matches!(tracker.metadata_for(TOKEN), MetadataStatus::Resolved { .. }));
        assert_eq!(tracker.metadata_for(TOKEN_B), MetadataStatus::NotRequested);
    }

    #[tokio::test]
    async fn test_tracker_reports_unresolvable() {
        let chain = Arc::new(MockChain::new());
        let tracker = MetadataTracker::new(chain);
        let mut rx = tracker.subscribe();

        tracker.track(&addr_text(TOKEN));
        let status = wait_until(&mut rx, |s| matches!(s, MetadataStatus::Unresolvable { .. })).await;
        assert_eq!(status.token(), Some(TOKEN));
    }

    #[tokio::test]
    async fn test_tracker_newer_address_wins_over_pending_one() {
        let chain = Arc::new(
            MockChain::new()
                .with_token(TOKEN, MockToken::erc20("A", "AAA", 18))
                .with_token(TOKEN_B, MockToken::erc20("B", "BBB", 6)),
        );
        let gate_a = chain.gate_reads(TOKEN);
        let tracker = MetadataTracker::new(chain.clone());
        let mut rx = tracker.subscribe();

        tracker.track(&addr_text(TOKEN));
        assert_eq!(tracker.status(), MetadataStatus::Loading { token: TOKEN });

        tracker.track(&addr_text(TOKEN_B));
        let status = wait_until(&mut rx, |s| matches!(s, MetadataStatus::Resolved { .. })).await;
        assert_eq!(status.token(), Some(TOKEN_B));

        // Let A's lookup run to completion if it is still alive
        gate_a.open();
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }

        match tracker.status() {
            MetadataStatus::Resolved { token, metadata } => {
                assert_eq!(token, TOKEN_B);
                assert_eq!(metadata.symbol.as_deref(), Some("BBB"));
            }
            other => panic!("unexpected status {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_late_result_for_superseded_lookup_is_discarded() {
        let chain = Arc::new(
            MockChain::new()
                .with_token(TOKEN, MockToken::erc20("A", "AAA", 18))
                .with_token(TOKEN_B, MockToken::erc20("B", "BBB", 6)),
        );
        let _gate_a = chain.gate_reads(TOKEN);
        let _gate_b = chain.gate_reads(TOKEN_B);
        let tracker = MetadataTracker::new(chain.clone());

        tracker.track(&addr_text(TOKEN));
        let generation_a = tracker.shared.tracked().generation;
        tracker.track(&addr_text(TOKEN_B));
        let generation_b = tracker.shared.tracked().generation;
        assert_ne!(generation_a, generation_b);

        // A's lookup finished after B was entered, too late to be aborted
        let late_a = finished_lookup("A", "AAA");
        assert!(!tracker.shared.publish(generation_a, TOKEN, late_a.clone()));
        assert_eq!(tracker.status(), MetadataStatus::Loading { token: TOKEN_B });

        // Current generation but a different address is also stale
        assert!(!tracker.shared.publish(generation_b, TOKEN, late_a));
        assert_eq!(tracker.status(), MetadataStatus::Loading { token: TOKEN_B });

        assert!(tracker.shared.publish(generation_b, TOKEN_B, finished_lookup("B", "BBB")));
        match tracker.metadata_for(TOKEN_B) {
            MetadataStatus::Resolved { metadata, .. } => {
                assert_eq!(metadata.symbol.as_deref(), Some("BBB"))
            }
            other => panic!("unexpected status {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_tracker_same_address_is_idempotent() {
        let chain = Arc::new(MockChain::new().with_token(TOKEN, MockToken::erc20("A", "AAA", 18)));
        let tracker = MetadataTracker::new(chain.clone());
        let mut rx = tracker.subscribe();

        tracker.track(&addr_text(TOKEN));
        wait_until(&mut rx, |s| matches!(s, MetadataStatus::Resolved { .. })).await;
        let reads = chain.reads().len();

        tracker.track(&format!(" {} ", addr_text(TOKEN)));
        tokio::task::yield_now().await;
        assert_eq!(chain.reads().len(), reads);
        assert!(matches!(tracker.status(), MetadataStatus::Resolved { .. }));
    }

    #[tokio::test]
    async fn test_tracker_cleared_by_invalid_input() {
        let chain = Arc::new(MockChain::new().with_token(TOKEN, MockToken::erc20("A", "AAA", 18)));
        let gate = chain.gate_reads(TOKEN);
        let tracker = MetadataTracker::new(chain.clone());

        tracker.track(&addr_text(TOKEN));
        tracker.track("0xabc");
        assert_eq!(tracker.status(), MetadataStatus::NotRequested);

        gate.open();
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        assert_eq!(tracker.status(), MetadataStatus::NotRequested);
    }
}
