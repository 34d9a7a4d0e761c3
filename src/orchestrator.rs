//! Airdrop submission state machine.
//!
//! One submission runs strictly in sequence: validate input, read the
//! allowance, optionally approve (prompt + confirmation), then airdrop
//! (prompt + confirmation). Both allowance branches share the same path; the
//! approval round-trip is simply skipped when the allowance already covers
//! the total.
//!
//! The current [`SubmissionState`] is published on a `watch` channel so a
//! front end can tell "waiting for signature" apart from "waiting for
//! confirmation". While a submission is in flight every new `submit` call is
//! refused.

use crate::allowance;
use crate::amounts::AirdropRequest;
use crate::chain::ChainClient;
use crate::config::ChainTargets;
use crate::contracts;
use crate::error::{AirdropError, WalletError};
use crate::operation_log::OperationLog;
use ethers::abi::Token;
use ethers::types::{Address, TxHash, U256};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

const OPERATION_NAME: &str = "ERC-20 Airdrop";

/// Outcome of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AirdropReceipt {
    pub chain_id: u64,
    pub token: Address,
    pub airdrop_contract: Address,
    pub approval_tx: Option<TxHash>,
    pub airdrop_tx: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    pub recipients: usize,
    pub total: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    /// Validating input and reading the current allowance
    CheckingAllowance,
    /// Wallet is prompting the user to sign the approval
    AwaitingWalletApproval,
    /// Approval broadcast, waiting for inclusion
    AwaitingApprovalConfirmation { tx_hash: TxHash },
    /// Wallet is prompting the user to sign the airdrop
    AwaitingWalletAirdropSignature,
    /// Airdrop broadcast, waiting for inclusion
    AwaitingAirdropConfirmation { tx_hash: TxHash },
    Completed(AirdropReceipt),
    Failed(AirdropError),
}

impl SubmissionState {
    /// A new submission may start from here.
    pub fn accepts_submission(&self) -> bool {
        matches!(
            self,
            SubmissionState::Idle | SubmissionState::Completed(_) | SubmissionState::Failed(_)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionState::Completed(_) | SubmissionState::Failed(_))
    }

    pub fn is_wallet_prompt(&self) -> bool {
        matches!(
            self,
            SubmissionState::AwaitingWalletApproval | SubmissionState::AwaitingWalletAirdropSignature
        )
    }

    pub fn is_awaiting_confirmation(&self) -> bool {
        matches!(
            self,
            SubmissionState::AwaitingApprovalConfirmation { .. }
                | SubmissionState::AwaitingAirdropConfirmation { .. }
        )
    }

    pub fn display_text(&self) -> String {
        match self {
            SubmissionState::Idle => "Ready".to_string(),
            SubmissionState::CheckingAllowance => "Checking allowance...".to_string(),
            SubmissionState::AwaitingWalletApproval => {
                "Waiting for wallet signature (approval)".to_string()
            }
            SubmissionState::AwaitingApprovalConfirmation { tx_hash } => {
                format!("Waiting for approval confirmation ({:?})", tx_hash)
            }
            SubmissionState::AwaitingWalletAirdropSignature => {
                "Waiting for wallet signature (airdrop)".to_string()
            }
            SubmissionState::AwaitingAirdropConfirmation { tx_hash } => {
                format!("Waiting for airdrop confirmation ({:?})", tx_hash)
            }
            SubmissionState::Completed(receipt) => {
                format!("Airdrop confirmed: {:?}", receipt.airdrop_tx)
            }
            SubmissionState::Failed(e) => format!("Failed: {}", e),
        }
    }
}

/// Marks the submission interrupted if the `submit` future is dropped midway.
struct InFlight<'a> {
    state: &'a watch::Sender<SubmissionState>,
    finished: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("Airdrop submission dropped before completion");
            self.state
                .send_replace(SubmissionState::Failed(AirdropError::Interrupted));
        }
    }
}

pub struct AirdropOrchestrator {
    client: Arc<dyn ChainClient>,
    targets: ChainTargets,
    state: watch::Sender<SubmissionState>,
    operation_log: Option<OperationLog>,
}

impl AirdropOrchestrator {
    pub fn new(client: Arc<dyn ChainClient>, targets: ChainTargets) -> Self {
        let (state, _) = watch::channel(SubmissionState::Idle);
        Self {
            client,
            targets,
            state,
            operation_log: None,
        }
    }

    /// Record completed airdrops in `log`
    pub fn with_operation_log(mut self, log: OperationLog) -> Self {
        self.operation_log = Some(log);
        self
    }

    pub fn state(&self) -> SubmissionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SubmissionState> {
        self.state.subscribe()
    }

    /// Return to `Idle` after a finished submission.
    pub fn reset(&self) -> Result<(), AirdropError> {
        let mut busy = false;
        self.state.send_if_modified(|state| {
            if state.is_terminal() {
                *state = SubmissionState::Idle;
                true
            } else {
                busy = *state != SubmissionState::Idle;
                false
            }
        });
        if busy {
            Err(AirdropError::AlreadyInFlight)
        } else {
            Ok(())
        }
    }

    fn transition(&self, next: SubmissionState) {
        info!("Airdrop state: {}", next.display_text());
        self.state.send_replace(next);
    }

    /// Run one airdrop from raw form input.
    ///
    /// Returns `AlreadyInFlight` without touching the state if another
    /// submission is still running. Every other failure is also published as
    /// `Failed(reason)`. Nothing is retried automatically.
    pub async fn submit(
        &self,
        token: &str,
        recipients_text: &str,
        amounts_text: &str,
    ) -> Result<AirdropReceipt, AirdropError> {
        let mut accepted = false;
        self.state.send_if_modified(|state| {
            if state.accepts_submission() {
                *state = SubmissionState::CheckingAllowance;
                accepted = true;
            }
            accepted
        });
        if !accepted {
            warn!("Refusing airdrop submission: another one is in progress");
            return Err(AirdropError::AlreadyInFlight);
        }

        let mut in_flight = InFlight {
            state: &self.state,
            finished: false,
        };
        let outcome = self.run(token, recipients_text, amounts_text).await;
        in_flight.finished = true;

        match &outcome {
            Ok(receipt) => {
                self.record(receipt);
                self.transition(SubmissionState::Completed(receipt.clone()));
            }
            Err(e) => {
                error!("Airdrop failed: {}", e);
                self.transition(SubmissionState::Failed(e.clone()));
            }
        }
        outcome
    }

    async fn run(
        &self,
        token: &str,
        recipients_text: &str,
        amounts_text: &str,
    ) -> Result<AirdropReceipt, AirdropError> {
        let request = AirdropRequest::parse(token, recipients_text, amounts_text)?;
        let owner = self.client.account().ok_or(WalletError::NotConnected)?;
        let chain_id = self.client.chain_id();
        let total = request.total();

        info!(
            "Airdrop of {} (raw units) of token {:?} to {} recipients on chain {}",
            total,
            request.token(),
            request.pairs().len(),
            chain_id
        );

        let allowance =
            allowance::check_allowance(self.client.as_ref(), &self.targets, request.token(), owner)
                .await?;
        let airdrop_contract = allowance.spender;

        let approval_tx = if allowance.requires_approval(total) {
            info!(
                "Allowance {} is below total {}; requesting approval",
                allowance.current_allowance, total
            );
            self.transition(SubmissionState::AwaitingWalletApproval);
            let tx_hash = self
                .client
                .submit(
                    request.token(),
                    &contracts::erc20_approve(),
                    &[Token::Address(airdrop_contract), Token::Uint(total)],
                )
                .await?;

            self.transition(SubmissionState::AwaitingApprovalConfirmation { tx_hash });
            self.client.await_confirmation(tx_hash).await?;
            Some(tx_hash)
        } else {
            info!("Existing allowance covers the total; skipping approval");
            None
        };

        self.transition(SubmissionState::AwaitingWalletAirdropSignature);
        let recipients = request.recipients().into_iter().map(Token::Address).collect();
        let amounts = request.amounts().into_iter().map(Token::Uint).collect();
        let tx_hash = self
            .client
            .submit(
                airdrop_contract,
                &contracts::airdrop_erc20(),
                &[
                    Token::Address(request.token()),
                    Token::Array(recipients),
                    Token::Array(amounts),
                    Token::Uint(total),
                ],
            )
            .await?;

        self.transition(SubmissionState::AwaitingAirdropConfirmation { tx_hash });
        let confirmation = self.client.await_confirmation(tx_hash).await?;

        Ok(AirdropReceipt {
            chain_id,
            token: request.token(),
            airdrop_contract,
            approval_tx,
            airdrop_tx: confirmation.tx_hash,
            block_number: confirmation.block_number,
            gas_used: confirmation.gas_used,
            recipients: request.pairs().len(),
            total,
        })
    }

    fn record(&self, receipt: &AirdropReceipt) {
        let Some(log) = &self.operation_log else {
            return;
        };

        let approval = match receipt.approval_tx {
            Some(tx) => format!("{:?}", tx),
            None => "not needed".to_string(),
        };
        let details = format!(
            "Token: {:?}\nAirdrop contract: {:?}\nRecipients: {}\nTotal (raw units): {}\nApproval tx: {}\nAirdrop tx: {:?}\nBlock: {:?}\nGas used: {}",
            receipt.token,
            receipt.airdrop_contract,
            receipt.recipients,
            receipt.total,
            approval,
            receipt.airdrop_tx,
            receipt.block_number,
            receipt.gas_used
        );

        if let Err(e) = log.append(OPERATION_NAME, receipt.chain_id, details) {
            warn!("Failed to write operation log: {}", e);
        }
    }
}
