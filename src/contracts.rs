//! ABI descriptors for the contract calls this crate makes.
//! Built by hand with `ethers::abi` so no JSON ABI files are needed.

use ethers::abi::{Function, Param, ParamType, StateMutability};

fn param(name: &str, kind: ParamType) -> Param {
    Param {
        name: name.to_string(),
        kind,
        internal_type: None,
    }
}

#[allow(deprecated)]
fn function(
    name: &str,
    inputs: Vec<Param>,
    outputs: Vec<Param>,
    state_mutability: StateMutability,
) -> Function {
    Function {
        name: name.to_string(),
        inputs,
        outputs,
        constant: None,
        state_mutability,
    }
}

/// function allowance(address owner, address spender) external view returns (uint256)
pub fn erc20_allowance() -> Function {
    function(
        "allowance",
        vec![
            param("owner", ParamType::Address),
            param("spender", ParamType::Address),
        ],
        vec![param("", ParamType::Uint(256))],
        StateMutability::View,
    )
}

/// function approve(address spender, uint256 amount) external returns (bool)
pub fn erc20_approve() -> Function {
    function(
        "approve",
        vec![
            param("spender", ParamType::Address),
            param("amount", ParamType::Uint(256)),
        ],
        vec![param("", ParamType::Bool)],
        StateMutability::NonPayable,
    )
}

pub fn erc20_name() -> Function {
    function("name", vec![], vec![param("", ParamType::String)], StateMutability::View)
}

pub fn erc20_symbol() -> Function {
    function("symbol", vec![], vec![param("", ParamType::String)], StateMutability::View)
}

/// Declared as uint256 rather than uint8: some tokens return a wider type and
/// ABI decoding of a 32-byte word works for both.
pub fn erc20_decimals() -> Function {
    function("decimals", vec![], vec![param("", ParamType::Uint(256))], StateMutability::View)
}

pub fn erc20_total_supply() -> Function {
    function("totalSupply", vec![], vec![param("", ParamType::Uint(256))], StateMutability::View)
}

/// Airdrop contract entry point:
/// airdropERC20(address tokenAddress, address[] recipients, uint256[] amounts, uint256 totalAmount)
pub fn airdrop_erc20() -> Function {
    function(
        "airdropERC20",
        vec![
            param("tokenAddress", ParamType::Address),
            param("recipients", ParamType::Array(Box::new(ParamType::Address))),
            param("amounts", ParamType::Array(Box::new(ParamType::Uint(256)))),
            param("totalAmount", ParamType::Uint(256)),
        ],
        vec![],
        StateMutability::NonPayable,
    )
}
