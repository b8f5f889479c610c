//! Wire identifiers.
//!
//! Every id the radio hands out - stream ids, client handles - is a 32-bit
//! value printed as an 8-hex-digit uppercase string with a `0x` prefix.
//! Inputs are accepted with or without the prefix, in any case, and are
//! canonicalized on parse so the same id always hashes and prints the same.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Errors canonicalizing a wire identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("invalid hex identifier: {0:?}")]
    InvalidHex(String),
}

fn parse_hex_id(s: &str) -> Result<u32, IdError> {
    let trimmed = s.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.is_empty() || digits.len() > 8 {
        return Err(IdError::InvalidHex(s.to_string()));
    }
    u32::from_str_radix(digits, 16).map_err(|_| IdError::InvalidHex(s.to_string()))
}

/// Identifier of a data-plane stream (panadapter, waterfall, audio stream)
/// or of a control-plane entity keyed the same way (slices, meters).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct StreamId(pub u32);

impl StreamId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

impl FromStr for StreamId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_id(s).map(StreamId)
    }
}

impl From<u32> for StreamId {
    fn from(raw: u32) -> Self {
        StreamId(raw)
    }
}

/// The radio-assigned handle identifying one connected client.
///
/// Arrives on the `H` control line and prefixes every status line, which is
/// how entity ownership (`is_owned_by_local_client`) is decided.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ClientHandle(pub u32);

impl ClientHandle {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

impl FromStr for ClientHandle {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_id(s).map(ClientHandle)
    }
}

impl From<u32> for ClientHandle {
    fn from(raw: u32) -> Self {
        ClientHandle(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn canonical_display() {
        assert_eq!(StreamId(0x40000001).to_string(), "0x40000001");
        assert_eq!(StreamId(0x2A).to_string(), "0x0000002A");
        assert_eq!(ClientHandle(0xABCD1234).to_string(), "0xABCD1234");
    }

    #[test]
    fn parse_accepts_any_case_and_prefix() {
        let canonical: StreamId = "0x40000001".parse().unwrap();
        assert_eq!("40000001".parse::<StreamId>().unwrap(), canonical);
        assert_eq!("0X40000001".parse::<StreamId>().unwrap(), canonical);
        assert_eq!("0x40000001".parse::<StreamId>().unwrap(), canonical);

        let short: StreamId = "2a".parse().unwrap();
        assert_eq!(short, StreamId(0x2A));
        assert_eq!(short.to_string(), "0x0000002A");
    }

    #[test]
    fn parse_roundtrips_through_display() {
        for raw in [0u32, 1, 0xDEADBEEF, u32::MAX] {
            let id = StreamId(raw);
            assert_eq!(id.to_string().parse::<StreamId>().unwrap(), id);
        }
    }

    #[test]
    fn rejects_garbage() {
        assert!("".parse::<StreamId>().is_err());
        assert!("0x".parse::<StreamId>().is_err());
        assert!("0x123456789".parse::<StreamId>().is_err());
        assert!("zzz".parse::<StreamId>().is_err());
        assert!("12 34".parse::<ClientHandle>().is_err());
    }
}
