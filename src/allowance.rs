//! Allowance lookup and the approve-or-not decision.

use crate::chain::ChainClient;
use crate::config::ChainTargets;
use crate::contracts;
use crate::error::{AirdropError, ChainReadError};
use ethers::abi::Token;
use ethers::types::{Address, U256};
use tracing::info;

/// Snapshot of an on-chain allowance. Never cached across submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowanceState {
    pub spender: Address,
    pub owner: Address,
    pub token: Address,
    pub current_allowance: U256,
}

impl AllowanceState {
    /// Approval is needed iff the current allowance is strictly below `total`.
    pub fn requires_approval(&self, total: U256) -> bool {
        self.current_allowance < total
    }
}

/// Read `token.allowance(owner, spender)`.
pub async fn read_allowance(
    client: &dyn ChainClient,
    token: Address,
    owner: Address,
    spender: Address,
) -> Result<U256, ChainReadError> {
    let output = client
        .read(
            token,
            &contracts::erc20_allowance(),
            &[Token::Address(owner), Token::Address(spender)],
        )
        .await?;

    output
        .into_iter()
        .next()
        .and_then(Token::into_uint)
        .ok_or_else(|| ChainReadError(format!("allowance() on {:?} returned no uint256", token)))
}

/// Resolve the spender for the client's active chain and read the allowance.
///
/// Fails with `UnsupportedChain` before touching the chain when no airdrop
/// contract is configured for that chain.
pub async fn check_allowance(
    client: &dyn ChainClient,
    targets: &ChainTargets,
    token: Address,
    owner: Address,
) -> Result<AllowanceState, AirdropError> {
    let chain_id = client.chain_id();
    let spender = targets
        .resolve(chain_id)
        .map(|t| t.airdrop_contract)
        .ok_or(AirdropError::UnsupportedChain(chain_id))?;

    let current_allowance = read_allowance(client, token, owner, spender).await?;
    info!(
        "Allowance of {:?} for spender {:?} on token {:?}: {}",
        owner, spender, token, current_allowance
    );

    Ok(AllowanceState {
        spender,
        owner,
        token,
        current_allowance,
    })
}
