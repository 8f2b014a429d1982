//! Resolved-name invariants and the resolver's final answer

use std::fmt;

use alloy_primitives::Address;

use crate::core::{canonical, is_address_shaped};

/// A human-readable name accepted from a backend.
///
/// Construction is the single gate for the real-name checks: the value is
/// trimmed and non-empty, never hex-address-shaped, and never the queried
/// address echoed back (backends have been observed doing exactly that).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName(String);

impl ResolvedName {
    /// Validate a raw candidate returned for `queried`.
    pub fn parse(raw: &str, queried: Address) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
            return None;
        }
        if is_address_shaped(trimmed) || trimmed.eq_ignore_ascii_case(&canonical(queried)) {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResolvedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The resolver's final, strategy-independent answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// A strategy produced a usable name.
    Found(ResolvedName),
    /// Every strategy ran and none produced a usable name.
    NotFound,
    /// Interim value while strategies are still being tried; `resolve`
    /// always settles on `Found` or `NotFound`.
    Inconclusive,
}

impl ResolutionOutcome {
    pub fn name(&self) -> Option<&ResolvedName> {
        match self {
            ResolutionOutcome::Found(name) => Some(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parse_address;

    fn addr() -> Address {
        parse_address("0x1234567890123456789012345678901234567890").unwrap()
    }

    #[test]
    fn accepts_plain_name() {
        let name = ResolvedName::parse("nora.eth", addr()).unwrap();
        assert_eq!(name.as_str(), "nora.eth");
    }

    #[test]
    fn trims_whitespace() {
        let name = ResolvedName::parse("  nora.eth \n", addr()).unwrap();
        assert_eq!(name.as_str(), "nora.eth");
    }

    #[test]
    fn rejects_empty_and_blank() {
        assert!(ResolvedName::parse("", addr()).is_none());
        assert!(ResolvedName::parse("   ", addr()).is_none());
    }

    #[test]
    fn rejects_address_echo_any_case() {
        assert!(ResolvedName::parse("0x1234567890123456789012345678901234567890", addr()).is_none());
        assert!(ResolvedName::parse("0X1234567890123456789012345678901234567890", addr()).is_none());
    }

    #[test]
    fn rejects_any_other_address_shaped_value() {
        assert!(ResolvedName::parse("0xffffffffffffffffffffffffffffffffffffffff", addr()).is_none());
    }

    #[test]
    fn rejects_hex_prefixed_non_address() {
        assert!(ResolvedName::parse("0xnora", addr()).is_none());
    }
}
