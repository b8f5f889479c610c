//! Multi-line attribute blocks.
//!
//! The `info` and `version` replies carry `key=value` records separated by
//! commas and/or newlines, values optionally double-quoted:
//!
//! ```text
//! model="FLEX-6600",serial="1234-5678-9012-3456"
//! name="Shack Radio",callsign="N0CALL"
//! ```
//!
//! A comma inside a quoted value does not split a record.

/// Parse an info/version block into key/value pairs, in input order.
/// Records without `=` are skipped.
pub fn parse_info_block(block: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();

    for record in split_records(block) {
        let record = record.trim();
        if record.is_empty() {
            continue;
        }
        if let Some((key, value)) = record.split_once('=') {
            pairs.push((key.trim().to_string(), unquote(value.trim()).to_string()));
        }
    }

    pairs
}

/// Split on `,` and newlines, honoring double quotes.
fn split_records(block: &str) -> Vec<&str> {
    let mut records = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;

    for (i, c) in block.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' | '\n' | '\r' if !in_quotes => {
                records.push(&block[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    records.push(&block[start..]);
    records
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}
