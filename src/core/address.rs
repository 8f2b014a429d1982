//! Address parsing and display helpers

use alloy_primitives::Address;

/// Parse a hex address string to Address
///
/// Accepts an optional `0x`/`0X` prefix and either hex case.
pub fn parse_address(s: &str) -> Option<Address> {
    let trimmed = s.trim();
    let normalized = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if normalized.len() != 40 {
        return None;
    }
    let bytes = hex::decode(normalized).ok()?;
    Some(Address::from_slice(&bytes))
}

/// Canonical lookup/compare form: `0x` + 40 lowercase hex chars
pub fn canonical(address: Address) -> String {
    format!("0x{}", hex::encode(address.as_slice()))
}

/// Abbreviated display form, e.g. `0x1234..7890`
pub fn short(address: Address) -> String {
    let full = canonical(address);
    format!("{}..{}", &full[..6], &full[full.len() - 4..])
}

/// Whether a string looks like a hex-encoded account address
pub fn is_address_shaped(value: &str) -> bool {
    let trimmed = value.trim();
    let Some(payload) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    else {
        return false;
    };
    payload.len() == 40 && payload.chars().all(|c| c.is_ascii_hexdigit())
}
