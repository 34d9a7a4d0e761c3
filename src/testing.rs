//! Scripted [`ChainClient`] for unit tests.

use crate::chain::{ChainClient, Confirmation};
use crate::error::{ChainReadError, ConfirmationError, WalletError};
use async_trait::async_trait;
use ethers::abi::{Function, Token};
use ethers::types::{Address, TxHash, U256};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

pub const CHAIN_ID: u64 = 31337;
pub const OWNER: Address = Address::repeat_byte(0x01);
pub const SPENDER: Address = Address::repeat_byte(0x5e);
pub const TOKEN: Address = Address::repeat_byte(0x7a);
pub const TOKEN_B: Address = Address::repeat_byte(0x7b);

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub contract: Address,
    pub function: String,
    pub args: Vec<Token>,
}

/// Answers for the ERC-20 metadata getters; `None` makes that read fail.
#[derive(Debug, Clone, Default)]
pub struct MockToken {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<U256>,
    pub total_supply: Option<U256>,
}

impl MockToken {
    pub fn erc20(name: &str, symbol: &str, decimals: u64) -> Self {
        Self {
            name: Some(name.to_string()),
            symbol: Some(symbol.to_string()),
            decimals: Some(U256::from(decimals)),
            total_supply: Some(U256::from(1_000_000u64)),
        }
    }
}

/// A gate that holds calls until [`Gate::open`] is called.
#[derive(Clone)]
pub struct Gate(Arc<Semaphore>);

impl Gate {
    fn new() -> Self {
        Self(Arc::new(Semaphore::new(0)))
    }

    pub fn open(&self) {
        self.0.close();
    }

    async fn pass(&self) {
        // Acquire only fails once the semaphore is closed, which is the signal to proceed
        let _ = self.0.acquire().await;
    }
}

#[derive(Default)]
struct Inner {
    allowance: U256,
    allowance_read_fails: bool,
    tokens: HashMap<Address, MockToken>,
    submit_errors: HashMap<String, WalletError>,
    confirmation_failures: HashSet<String>,
    pending: HashMap<TxHash, String>,
    reads: Vec<RecordedCall>,
    submissions: Vec<RecordedCall>,
    confirmations: Vec<TxHash>,
    next_tx: u64,
}

pub struct MockChain {
    account: Option<Address>,
    inner: Mutex<Inner>,
    read_gates: Mutex<HashMap<Address, Gate>>,
    submit_gate: Mutex<Option<Gate>>,
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            account: Some(OWNER),
            inner: Mutex::new(Inner::default()),
            read_gates: Mutex::new(HashMap::new()),
            submit_gate: Mutex::new(None),
        }
    }

    pub fn with_allowance(self, allowance: U256) -> Self {
        self.inner.lock().unwrap().allowance = allowance;
        self
    }

    pub fn with_token(self, address: Address, token: MockToken) -> Self {
        self.inner.lock().unwrap().tokens.insert(address, token);
        self
    }

    pub fn without_account(mut self) -> Self {
        self.account = None;
        self
    }

    pub fn failing_allowance_read(self) -> Self {
        self.inner.lock().unwrap().allowance_read_fails = true;
        self
    }

    /// Make the wallet refuse to sign calls to `function`.
    pub fn rejecting(self, function: &str, error: WalletError) -> Self {
        self.inner
            .lock()
            .unwrap()
            .submit_errors
            .insert(function.to_string(), error);
        self
    }

    /// Make confirmation of `function` transactions fail.
    pub fn failing_confirmation(self, function: &str) -> Self {
        self.inner
            .lock()
            .unwrap()
            .confirmation_failures
            .insert(function.to_string());
        self
    }

    /// Hold every metadata read on `token` until the returned gate is opened.
    pub fn gate_reads(&self, token: Address) -> Gate {
        let gate = Gate::new();
        self.read_gates.lock().unwrap().insert(token, gate.clone());
        gate
    }

    /// Hold every wallet prompt until the returned gate is opened.
    pub fn gate_submissions(&self) -> Gate {
        let gate = Gate::new();
        *self.submit_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn reads(&self) -> Vec<RecordedCall> {
        self.inner.lock().unwrap().reads.clone()
    }

    pub fn submissions(&self) -> Vec<RecordedCall> {
        self.inner.lock().unwrap().submissions.clone()
    }

    pub fn submissions_of(&self, function: &str) -> Vec<RecordedCall> {
        self.submissions()
            .into_iter()
            .filter(|c| c.function == function)
            .collect()
    }

    pub fn confirmations(&self) -> Vec<TxHash> {
        self.inner.lock().unwrap().confirmations.clone()
    }
}

fn missing(what: &str, token: Address) -> ChainReadError {
    ChainReadError(format!("execution reverted: {} on {:?}", what, token))
}

#[async_trait]
impl ChainClient for MockChain {
    fn chain_id(&self) -> u64 {
        CHAIN_ID
    }

    fn account(&self) -> Option<Address> {
        self.account
    }

    async fn read(
        &self,
        contract: Address,
        function: &Function,
        args: &[Token],
    ) -> Result<Vec<Token>, ChainReadError> {
        self.inner.lock().unwrap().reads.push(RecordedCall {
            contract,
            function: function.name.clone(),
            args: args.to_vec(),
        });

        let gate = self.read_gates.lock().unwrap().get(&contract).cloned();
        if let Some(gate) = gate {
            gate.pass().await;
        }

        let inner = self.inner.lock().unwrap();
        if function.name == "allowance" {
            if inner.allowance_read_fails {
                return Err(ChainReadError("connection reset by peer".to_string()));
            }
            return Ok(vec![Token::Uint(inner.allowance)]);
        }

        let token = inner.tokens.get(&contract).cloned().unwrap_or_default();
        match function.name.as_str() {
            "name" => token.name.map(|v| vec![Token::String(v)]).ok_or_else(|| missing("name", contract)),
            "symbol" => token.symbol.map(|v| vec![Token::String(v)]).ok_or_else(|| missing("symbol", contract)),
            "decimals" => token.decimals.map(|v| vec![Token::Uint(v)]).ok_or_else(|| missing("decimals", contract)),
            "totalSupply" => token
                .total_supply
                .map(|v| vec![Token::Uint(v)])
                .ok_or_else(|| missing("totalSupply", contract)),
            other => Err(ChainReadError(format!("unexpected read {}", other))),
        }
    }

    async fn submit(
        &self,
        contract: Address,
        function: &Function,
        args: &[Token],
    ) -> Result<TxHash, WalletError> {
        self.inner.lock().unwrap().submissions.push(RecordedCall {
            contract,
            function: function.name.clone(),
            args: args.to_vec(),
        });

        let gate = self.submit_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.pass().await;
        }

        let mut inner = self.inner.lock().unwrap();
        if let Some(err) = inner.submit_errors.get(&function.name) {
            return Err(err.clone());
        }
        inner.next_tx += 1;
        let tx_hash = TxHash::from_low_u64_be(inner.next_tx);
        inner.pending.insert(tx_hash, function.name.clone());

        // A successful approve sets the allowance once confirmed; model it eagerly
        if function.name == "approve" {
            if let Some(amount) = args.get(1).cloned().and_then(Token::into_uint) {
                inner.allowance = amount;
            }
        }
        Ok(tx_hash)
    }

    async fn await_confirmation(&self, tx_hash: TxHash) -> Result<Confirmation, ConfirmationError> {
        let mut inner = self.inner.lock().unwrap();
        inner.confirmations.push(tx_hash);
        let function = inner
            .pending
            .get(&tx_hash)
            .cloned()
            .ok_or_else(|| ConfirmationError(format!("unknown transaction {:?}", tx_hash)))?;
        if inner.confirmation_failures.contains(&function) {
            return Err(ConfirmationError(format!("transaction {:?} reverted", tx_hash)));
        }
        Ok(Confirmation {
            tx_hash,
            block_number: Some(100 + inner.confirmations.len() as u64),
            gas_used: 21_000,
        })
    }
}
