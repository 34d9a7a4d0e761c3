use ethers::types::U256;

/// Render a raw token amount for display, scaled by `decimals` when known.
///
/// Only used for showing values; submitted amounts are never scaled.
pub fn format_token_amount(raw: U256, decimals: Option<u32>) -> String {
    match decimals {
        Some(0) | None => raw.to_string(),
        Some(d) => ethers::utils::format_units(raw, d).unwrap_or_else(|_| raw.to_string()),
    }
}

/// Like [`format_token_amount`], with the symbol appended when there is one.
pub fn format_with_symbol(raw: U256, decimals: Option<u32>, symbol: Option<&str>) -> String {
    let amount = format_token_amount(raw, decimals);
    match symbol {
        Some(s) if !s.is_empty() => format!("{} {}", amount, s),
        _ => amount,
    }
}
