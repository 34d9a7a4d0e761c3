//! Parsing of the free-text recipient and amount lists.
//!
//! Both lists are separated by commas and/or newlines with arbitrary
//! surrounding whitespace. Amounts are raw base-unit integers and are passed
//! through unchanged (no scaling by the token's decimals).
//!
//! There are two entry points with different strictness:
//! [`compute_total`] is used for live feedback and silently skips entries it
//! cannot parse, while [`build_pairs`] gates a real submission and rejects them.

use crate::error::ValidationError;
use ethers::types::{Address, U256};
use ethers::utils::to_checksum;

/// One recipient and the amount it receives, matched by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecipientAmount {
    pub recipient: Address,
    pub amount: U256,
}

/// A validated airdrop: the token, the ordered pairs and their exact sum.
///
/// Only constructible through [`AirdropRequest::parse`], so `total` always
/// equals the sum of the pair amounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AirdropRequest {
    token: Address,
    pairs: Vec<RecipientAmount>,
    total: U256,
}

impl AirdropRequest {
    /// Validate the raw form inputs and build a request.
    pub fn parse(
        token: &str,
        recipients_text: &str,
        amounts_text: &str,
    ) -> Result<Self, ValidationError> {
        let token_trimmed = token.trim();
        let token = parse_address(token_trimmed)
            .ok_or_else(|| ValidationError::InvalidTokenAddress(token_trimmed.to_string()))?;

        let pairs = build_pairs(recipients_text, amounts_text)?;
        let total = pairs
            .iter()
            .try_fold(U256::zero(), |acc, p| acc.checked_add(p.amount))
            .ok_or(ValidationError::TotalOverflow)?;

        Ok(Self { token, pairs, total })
    }

    pub fn token(&self) -> Address {
        self.token
    }

    pub fn pairs(&self) -> &[RecipientAmount] {
        &self.pairs
    }

    pub fn total(&self) -> U256 {
        self.total
    }

    pub fn recipients(&self) -> Vec<Address> {
        self.pairs.iter().map(|p| p.recipient).collect()
    }

    pub fn amounts(&self) -> Vec<U256> {
        self.pairs.iter().map(|p| p.amount).collect()
    }
}

/// Parse a `0x`-prefixed, 40 hex digit address.
///
/// All-lowercase and all-uppercase digits are accepted as is. Mixed case must
/// be the exact EIP-55 checksum, so a single mistyped letter is rejected.
pub fn parse_address(entry: &str) -> Option<Address> {
    let digits = entry.strip_prefix("0x")?;
    if digits.len() != 40 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let address: Address = digits.parse().ok()?;

    let has_lower = digits.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = digits.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper && to_checksum(&address, None) != entry {
        return None;
    }
    Some(address)
}

/// Split on any run of commas/newlines, trim, and drop empty entries.
pub fn tokenize(input: &str) -> Vec<&str> {
    input
        .split(|c| c == '\n' || c == ',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse a single amount entry as an unsigned decimal integer.
pub fn parse_amount(entry: &str) -> Option<U256> {
    let trimmed = entry.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    U256::from_dec_str(trimmed).ok()
}

/// Sum of every parseable amount in `amounts_text`.
///
/// Never fails: unparseable entries are ignored, empty input yields zero and
/// the sum saturates at `U256::MAX` instead of overflowing.
pub fn compute_total(amounts_text: &str) -> U256 {
    tokenize(amounts_text)
        .into_iter()
        .filter_map(parse_amount)
        .fold(U256::zero(), |acc, n| acc.saturating_add(n))
}

/// Strictly parse both lists into ordered recipient/amount pairs.
///
/// Counts are compared first, then every recipient is checked, then every
/// amount. Positions in errors are 1-based.
pub fn build_pairs(
    recipients_text: &str,
    amounts_text: &str,
) -> Result<Vec<RecipientAmount>, ValidationError> {
    let recipients = tokenize(recipients_text);
    let amounts = tokenize(amounts_text);

    if recipients.len() != amounts.len() {
        return Err(ValidationError::CountMismatch {
            recipients: recipients.len(),
            amounts: amounts.len(),
        });
    }
    if recipients.is_empty() {
        return Err(ValidationError::NoRecipients);
    }

    let addresses = recipients
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            parse_address(raw).ok_or_else(|| ValidationError::InvalidAddress {
                position: i + 1,
                value: raw.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let values = amounts
        .iter()
        .enumerate()
        .map(|(i, raw)| match parse_amount(raw) {
            Some(v) if !v.is_zero() => Ok(v),
            _ => Err(ValidationError::InvalidAmount {
                position: i + 1,
                value: raw.to_string(),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(addresses
        .into_iter()
        .zip(values)
        .map(|(recipient, amount)| RecipientAmount { recipient, amount })
        .collect())
}
