//! Attribute value conversions.
//!
//! Status attributes and command arguments are literal tokens. Conversion
//! is centralized here so the state-store parsers and the controller write
//! path agree byte-for-byte: booleans are `1`/`0`, frequencies are
//! megahertz with exactly six fractional digits, enumerations are
//! lowercase.

/// Errors converting a single attribute value. These are never fatal to a
/// status frame - callers skip the attribute and keep going.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    #[error("invalid boolean: {0:?}")]
    InvalidBool(String),
    #[error("invalid number: {0:?}")]
    InvalidNumber(String),
    #[error("invalid hex value: {0:?}")]
    InvalidHex(String),
}

/// Token the radio uses for embedded spaces (profile names and the like).
pub const SPACE_ESCAPE: char = '\x7f';

/// Parse a boolean token. The radio writes `1`/`0` but is read liberally.
pub fn parse_bool(s: &str) -> Result<bool, ValueError> {
    match s {
        "1" | "T" | "t" | "true" | "True" | "on" => Ok(true),
        "0" | "F" | "f" | "false" | "False" | "off" => Ok(false),
        other => Err(ValueError::InvalidBool(other.to_string())),
    }
}

/// Format a boolean the way the radio expects it.
pub fn format_bool(v: bool) -> &'static str {
    if v {
        "1"
    } else {
        "0"
    }
}

/// Parse an integer token. Decimal-valued tokens (`"10.0"`) are rounded,
/// matching how the radio itself reports some nominally-integer fields.
pub fn parse_i64(s: &str) -> Result<i64, ValueError> {
    if let Ok(v) = s.parse::<i64>() {
        return Ok(v);
    }
    s.parse::<f64>()
        .map(|v| v.round() as i64)
        .map_err(|_| ValueError::InvalidNumber(s.to_string()))
}

pub fn parse_i32(s: &str) -> Result<i32, ValueError> {
    parse_i64(s).map(|v| v as i32)
}

pub fn parse_u32(s: &str) -> Result<u32, ValueError> {
    let v = parse_i64(s)?;
    u32::try_from(v).map_err(|_| ValueError::InvalidNumber(s.to_string()))
}

pub fn parse_f64(s: &str) -> Result<f64, ValueError> {
    s.parse::<f64>()
        .map_err(|_| ValueError::InvalidNumber(s.to_string()))
}

/// Parse a hex token, `0x` prefix optional.
pub fn parse_hex_u32(s: &str) -> Result<u32, ValueError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u32::from_str_radix(digits, 16).map_err(|_| ValueError::InvalidHex(s.to_string()))
}

/// Round a frequency to the canonical 1 uHz (six decimal) grid.
pub fn round_mhz(mhz: f64) -> f64 {
    (mhz * 1e6).round() / 1e6
}

/// Parse a megahertz token and snap it to the canonical grid.
pub fn parse_mhz(s: &str) -> Result<f64, ValueError> {
    parse_f64(s).map(round_mhz)
}

/// Format a frequency with exactly six fractional digits.
///
/// `parse_mhz(&format_mhz(x)) == round_mhz(x)` for any finite `x`.
pub fn format_mhz(mhz: f64) -> String {
    format!("{:.6}", round_mhz(mhz))
}

/// Split a comma-separated list attribute. Empty input yields an empty
/// list, not one empty element.
pub fn parse_list(s: &str) -> Vec<String> {
    if s.is_empty() {
        return Vec::new();
    }
    s.split(',').map(|p| p.to_string()).collect()
}

pub fn format_list(items: &[String]) -> String {
    items.join(",")
}

/// Replace spaces with the wire escape so a value survives tokenization.
pub fn escape_spaces(s: &str) -> String {
    s.replace(' ', &SPACE_ESCAPE.to_string())
}

/// Undo [`escape_spaces`] after tokenization.
pub fn unescape_spaces(s: &str) -> String {
    s.replace(SPACE_ESCAPE, " ")
}
