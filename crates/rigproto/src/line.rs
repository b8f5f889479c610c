//! Control-channel line protocol.
//!
//! The control plane is a bidirectional line-oriented stream. Outbound
//! lines are commands:
//!
//! ```text
//! C<seq>|<command>
//! ```
//!
//! with `seq` a strictly-increasing decimal u32 that wraps at 2^31.
//! Inbound lines begin with one of five tag characters:
//!
//! ```text
//! H<hex>                       radio-assigned client handle
//! V<string>                    protocol version, informational
//! R<seq>|<code-hex>|<message>  reply, correlated by seq
//! S<handle>|<scope> <k=v ...>  status
//! M<code-hex>|<text>           notice
//! ```
//!
//! Framing (reading to `\n`, trimming `\r`, dropping empty lines) belongs
//! to the transport adapter; this module takes one trimmed line at a time.

use serde::{Deserialize, Serialize};

use crate::ids::ClientHandle;
use crate::status::StatusMessage;
use crate::values::parse_hex_u32;

/// Sequence numbers wrap here, not at u32::MAX.
pub const SEQ_WRAP: u32 = 1 << 31;

/// Next command sequence number.
pub fn next_seq(seq: u32) -> u32 {
    let n = seq.wrapping_add(1);
    if n >= SEQ_WRAP {
        1
    } else {
        n
    }
}

/// Format an outbound command line (no trailing newline).
pub fn format_command(seq: u32, text: &str) -> String {
    format!("C{}|{}", seq, text)
}

/// Errors parsing one inbound line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineError {
    #[error("empty line")]
    Empty,
    #[error("unknown line tag {0:?}")]
    UnknownTag(char),
    #[error("malformed {kind} line: {line:?}")]
    Malformed { kind: &'static str, line: String },
}

/// A correlated reply: `R<seq>|<code-hex>|<message>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyLine {
    pub seq: u32,
    pub code: u32,
    pub message: String,
}

/// An uncorrelated notice: `M<code-hex>|<text>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoticeLine {
    pub code: u32,
    pub text: String,
}

/// One parsed inbound control line.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundLine {
    Handle(ClientHandle),
    Version(String),
    Reply(ReplyLine),
    Status(StatusMessage),
    Notice(NoticeLine),
}

/// Parse one trimmed inbound line.
pub fn parse_line(line: &str) -> Result<InboundLine, LineError> {
    let mut chars = line.chars();
    let tag = chars.next().ok_or(LineError::Empty)?;
    let rest = chars.as_str();

    match tag {
        'H' => {
            let handle = rest.parse::<ClientHandle>().map_err(|_| LineError::Malformed {
                kind: "handle",
                line: line.to_string(),
            })?;
            Ok(InboundLine::Handle(handle))
        }
        'V' => Ok(InboundLine::Version(rest.to_string())),
        'R' => {
            let mut parts = rest.splitn(3, '|');
            let seq = parts
                .next()
                .and_then(|s| s.parse::<u32>().ok())
                .ok_or_else(|| LineError::Malformed {
                    kind: "reply",
                    line: line.to_string(),
                })?;
            let code = parts
                .next()
                .and_then(|s| parse_hex_u32(s).ok())
                .ok_or_else(|| LineError::Malformed {
                    kind: "reply",
                    line: line.to_string(),
                })?;
            let message = parts.next().unwrap_or("").to_string();
            Ok(InboundLine::Reply(ReplyLine { seq, code, message }))
        }
        'S' => {
            let (handle_str, payload) =
                rest.split_once('|').ok_or_else(|| LineError::Malformed {
                    kind: "status",
                    line: line.to_string(),
                })?;
            let handle = handle_str
                .parse::<ClientHandle>()
                .map_err(|_| LineError::Malformed {
                    kind: "status",
                    line: line.to_string(),
                })?;
            let status =
                StatusMessage::parse(handle, payload).map_err(|_| LineError::Malformed {
                    kind: "status",
                    line: line.to_string(),
                })?;
            Ok(InboundLine::Status(status))
        }
        'M' => {
            let (code_str, text) = rest.split_once('|').ok_or_else(|| LineError::Malformed {
                kind: "notice",
                line: line.to_string(),
            })?;
            let code = parse_hex_u32(code_str).map_err(|_| LineError::Malformed {
                kind: "notice",
                line: line.to_string(),
            })?;
            Ok(InboundLine::Notice(NoticeLine {
                code,
                text: text.to_string(),
            }))
        }
        other => Err(LineError::UnknownTag(other)),
    }
}
