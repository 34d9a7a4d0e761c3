//! Batch ERC-20 airdrops from free-text recipient and amount lists.
//!
//! - [`amounts`] parses the lists and computes the total
//! - [`allowance`] decides whether an approval transaction is needed
//! - [`orchestrator`] sequences approval and airdrop and tracks progress
//! - [`metadata`] looks up token details for display
//!
//! The wallet and RPC node sit behind [`chain::ChainClient`].

pub mod allowance;
pub mod amounts;
pub mod chain;
pub mod config;
pub mod contracts;
pub mod error;
pub mod import;
pub mod metadata;
pub mod operation_log;
pub mod orchestrator;
pub mod settings;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use amounts::{build_pairs, compute_total, AirdropRequest, RecipientAmount};
pub use chain::{ChainClient, EthersClient};
pub use error::{AirdropError, MetadataError, ValidationError, WalletError};
pub use metadata::{MetadataStatus, MetadataTracker, TokenMetadata};
pub use orchestrator::{AirdropOrchestrator, AirdropReceipt, SubmissionState};
