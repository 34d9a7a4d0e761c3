//! Error taxonomy for parsing, allowance checks, submission and metadata lookup.
//!
//! Everything here is `Clone + PartialEq` because failures are stored inside
//! [`SubmissionState`](crate::orchestrator::SubmissionState) and broadcast to observers.

use thiserror::Error;

/// Input problems detected before any wallet interaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Number of recipients ({recipients}) and amounts ({amounts}) must match")]
    CountMismatch { recipients: usize, amounts: usize },

    #[error("No recipients specified")]
    NoRecipients,

    #[error("Entry {position}: invalid recipient address '{value}'")]
    InvalidAddress { position: usize, value: String },

    #[error("Entry {position}: invalid amount '{value}' (expected a positive whole number)")]
    InvalidAmount { position: usize, value: String },

    #[error("Invalid token address '{0}'")]
    InvalidTokenAddress(String),

    #[error("Sum of amounts overflows uint256")]
    TotalOverflow,
}

/// A read-only contract call could not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Chain read failed: {0}")]
pub struct ChainReadError(pub String);

/// The wallet refused or failed to produce a signed, broadcast transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("Transaction was rejected in the wallet: {0}")]
    Rejected(String),

    #[error("Wallet connection lost: {0}")]
    ConnectionLost(String),

    #[error("No wallet account connected")]
    NotConnected,
}

/// A broadcast transaction was not confirmed (timeout, dropped or reverted).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Transaction confirmation failed: {0}")]
pub struct ConfirmationError(pub String);

/// Everything that can end a submission attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AirdropError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    ChainRead(#[from] ChainReadError),

    #[error("Unsupported chain {0}: no airdrop contract configured")]
    UnsupportedChain(u64),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Confirmation(#[from] ConfirmationError),

    #[error("An airdrop submission is already in progress")]
    AlreadyInFlight,

    #[error("Submission was interrupted before it finished")]
    Interrupted,
}

impl AirdropError {
    /// True when the failure happened before anything was sent to the wallet,
    /// i.e. the user can fix the input and resubmit with no on-chain effect.
    pub fn is_pre_wallet(&self) -> bool {
        matches!(
            self,
            AirdropError::Validation(_)
                | AirdropError::ChainRead(_)
                | AirdropError::UnsupportedChain(_)
                | AirdropError::Wallet(WalletError::NotConnected)
        )
    }
}

/// Token metadata could not be read. Never affects submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    #[error("Could not read token details ({0}). Make sure the address is a valid ERC-20.")]
    Unresolvable(String),
}
