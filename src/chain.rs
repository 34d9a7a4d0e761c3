//! The boundary to the wallet and the chain.
//!
//! [`ChainClient`] is everything the core needs from the outside world: a
//! read-only contract call, a wallet-signed contract call, and a way to wait
//! for inclusion. [`EthersClient`] implements it over an HTTP provider and a
//! local private-key signer.

use crate::config::Config;
use crate::error::{ChainReadError, ConfirmationError, WalletError};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ethers::abi::{Function, Token};
use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// What the confirmation wait reports once a transaction is included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u64,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Chain the connected wallet/provider is on.
    fn chain_id(&self) -> u64;

    /// Address of the connected account, if any.
    fn account(&self) -> Option<Address>;

    /// Read-only contract call; returns the decoded outputs of `function`.
    async fn read(
        &self,
        contract: Address,
        function: &Function,
        args: &[Token],
    ) -> Result<Vec<Token>, ChainReadError>;

    /// Ask the wallet to sign and broadcast a contract call.
    /// Resolves once the transaction is broadcast.
    async fn submit(
        &self,
        contract: Address,
        function: &Function,
        args: &[Token],
    ) -> Result<TxHash, WalletError>;

    /// Suspend until `tx_hash` is included. Timeouts and reverts are errors.
    async fn await_confirmation(&self, tx_hash: TxHash) -> Result<Confirmation, ConfirmationError>;
}

type SigningClient = SignerMiddleware<Arc<Provider<Http>>, LocalWallet>;

/// [`ChainClient`] over ethers-rs. Without a signer it can only read.
pub struct EthersClient {
    provider: Arc<Provider<Http>>,
    signer: Option<Arc<SigningClient>>,
    chain_id: u64,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

impl EthersClient {
    /// Read-only client: metadata and allowance lookups, no submissions.
    pub async fn read_only(config: &Config) -> Result<Self> {
        let provider = config.get_provider().await?;
        verify_chain_id(&provider, config.chain_id).await?;
        Ok(Self {
            provider,
            signer: None,
            chain_id: config.chain_id,
            confirmation_timeout: config.confirmation_timeout,
            poll_interval: config.poll_interval,
        })
    }

    /// Client that signs with a hex-encoded private key.
    pub async fn with_private_key(config: &Config, private_key: &str) -> Result<Self> {
        let provider = config.get_provider().await?;
        verify_chain_id(&provider, config.chain_id).await?;

        let wallet: LocalWallet = private_key
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid private key: {}", e))?;
        let wallet = wallet.with_chain_id(config.chain_id);
        info!("Using account {:?} on chain {}", wallet.address(), config.chain_id);

        let signer = SignerMiddleware::new(provider.clone(), wallet);
        Ok(Self {
            provider,
            signer: Some(Arc::new(signer)),
            chain_id: config.chain_id,
            confirmation_timeout: config.confirmation_timeout,
            poll_interval: config.poll_interval,
        })
    }
}

async fn verify_chain_id(provider: &Provider<Http>, expected: u64) -> Result<()> {
    let actual = provider
        .get_chainid()
        .await
        .context("Failed to query chain id from RPC")?
        .as_u64();
    if actual != expected {
        return Err(anyhow!(
            "RPC endpoint is on chain {} but chain {} is configured",
            actual,
            expected
        ));
    }
    Ok(())
}

/// Map a wallet/provider error message to the wallet error taxonomy.
pub fn classify_wallet_error(error: &str) -> WalletError {
    let lower = error.to_lowercase();
    if lower.contains("rejected") || lower.contains("denied") {
        WalletError::Rejected(error.to_string())
    } else {
        WalletError::ConnectionLost(error.to_string())
    }
}

#[async_trait]
impl ChainClient for EthersClient {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn account(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address())
    }

    async fn read(
        &self,
        contract: Address,
        function: &Function,
        args: &[Token],
    ) -> Result<Vec<Token>, ChainReadError> {
        let calldata = function
            .encode_input(args)
            .map_err(|e| ChainReadError(format!("failed to encode {}: {}", function.name, e)))?;
        debug!(
            "eth_call {:?} {} (0x{})",
            contract,
            function.name,
            ::hex::encode(function.short_signature())
        );

        let mut tx = TransactionRequest::new().to(contract).data(calldata);
        if let Some(from) = self.account() {
            tx = tx.from(from);
        }

        let output = self
            .provider
            .call(&tx.into(), None)
            .await
            .map_err(|e| ChainReadError(format!("{} on {:?}: {}", function.name, contract, e)))?;

        function
            .decode_output(&output)
            .map_err(|e| ChainReadError(format!("failed to decode {} from {:?}: {}", function.name, contract, e)))
    }

    async fn submit(
        &self,
        contract: Address,
        function: &Function,
        args: &[Token],
    ) -> Result<TxHash, WalletError> {
        let signer = self.signer.as_ref().ok_or(WalletError::NotConnected)?;
        let calldata = function
            .encode_input(args)
            .map_err(|e| WalletError::ConnectionLost(format!("failed to encode {}: {}", function.name, e)))?;

        let tx = TransactionRequest::new().to(contract).data(calldata);
        info!("Requesting signature for {} on {:?}", function.name, contract);

        let pending = signer
            .send_transaction(tx, None)
            .await
            .map_err(|e| classify_wallet_error(&e.to_string()))?;
        let tx_hash = *pending;
        info!("{} broadcast: {:?}", function.name, tx_hash);
        Ok(tx_hash)
    }

    async fn await_confirmation(&self, tx_hash: TxHash) -> Result<Confirmation, ConfirmationError> {
        let deadline = Instant::now() + self.confirmation_timeout;

        loop {
            match self.provider.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => {
                    if receipt.status == Some(U64::zero()) {
                        return Err(ConfirmationError(format!("transaction {:?} reverted", tx_hash)));
                    }
                    return Ok(Confirmation {
                        tx_hash,
                        block_number: receipt.block_number.map(|n| n.as_u64()),
                        gas_used: receipt.gas_used.map(|g| g.low_u64()).unwrap_or(0),
                    });
                }
                Ok(None) => {}
                Err(e) => warn!("Receipt lookup for {:?} failed: {}", tx_hash, e),
            }

            if Instant::now() >= deadline {
                return Err(ConfirmationError(format!(
                    "timed out after {} seconds waiting for {:?}",
                    self.confirmation_timeout.as_secs(),
                    tx_hash
                )));
            }
            sleep(self.poll_interval).await;
        }
    }
}
