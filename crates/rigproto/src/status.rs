//! Status-line payload parsing.
//!
//! The payload after `S<handle>|` is `<scope> <identifier> <k=v ...>`.
//! Scopes are a closed set plus an `Other` passthrough for scopes this
//! library does not model. Tokens are split on single spaces; a value that
//! needs an embedded space carries `\x7f` instead, undone after splitting.

use serde::{Deserialize, Serialize};

use crate::ids::ClientHandle;
use crate::values::unescape_spaces;

/// Errors parsing a status payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatusError {
    #[error("empty status payload")]
    Empty,
}

/// Status scopes observed on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusScope {
    Radio,
    Slice,
    DisplayPan,
    DisplayWaterfall,
    Meter,
    AudioStream,
    Client,
    Tx,
    Atu,
    Interlock,
    Amplifier,
    Xvtr,
    Memories,
    Daxiq,
    Dax,
    Cwx,
    Gps,
    Log,
    Apd,
    License,
    UsbCable,
    Tnf,
    Spot,
    Other(String),
}

impl StatusScope {
    pub fn as_str(&self) -> &str {
        match self {
            StatusScope::Radio => "radio",
            StatusScope::Slice => "slice",
            StatusScope::DisplayPan => "display pan",
            StatusScope::DisplayWaterfall => "display waterfall",
            StatusScope::Meter => "meter",
            StatusScope::AudioStream => "audio_stream",
            StatusScope::Client => "client",
            StatusScope::Tx => "tx",
            StatusScope::Atu => "atu",
            StatusScope::Interlock => "interlock",
            StatusScope::Amplifier => "amplifier",
            StatusScope::Xvtr => "xvtr",
            StatusScope::Memories => "memories",
            StatusScope::Daxiq => "daxiq",
            StatusScope::Dax => "dax",
            StatusScope::Cwx => "cwx",
            StatusScope::Gps => "gps",
            StatusScope::Log => "log",
            StatusScope::Apd => "apd",
            StatusScope::License => "license",
            StatusScope::UsbCable => "usb_cable",
            StatusScope::Tnf => "tnf",
            StatusScope::Spot => "spot",
            StatusScope::Other(s) => s.as_str(),
        }
    }

    fn from_word(word: &str) -> StatusScope {
        match word {
            "radio" => StatusScope::Radio,
            "slice" => StatusScope::Slice,
            "meter" => StatusScope::Meter,
            "audio_stream" => StatusScope::AudioStream,
            "client" => StatusScope::Client,
            "tx" => StatusScope::Tx,
            "atu" => StatusScope::Atu,
            "interlock" => StatusScope::Interlock,
            "amplifier" => StatusScope::Amplifier,
            "xvtr" => StatusScope::Xvtr,
            "memories" => StatusScope::Memories,
            "daxiq" => StatusScope::Daxiq,
            "dax" => StatusScope::Dax,
            "cwx" => StatusScope::Cwx,
            "gps" => StatusScope::Gps,
            "log" => StatusScope::Log,
            "apd" => StatusScope::Apd,
            "license" => StatusScope::License,
            "usb_cable" => StatusScope::UsbCable,
            "tnf" => StatusScope::Tnf,
            "spot" => StatusScope::Spot,
            other => StatusScope::Other(other.to_string()),
        }
    }
}

/// One payload token, positional or `key=value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusToken {
    Positional(String),
    KeyValue { key: String, value: String },
}

/// A parsed status line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusMessage {
    /// Handle of the client this status concerns (or a broadcast handle).
    pub handle: ClientHandle,
    pub scope: StatusScope,
    pub tokens: Vec<StatusToken>,
}

impl StatusMessage {
    /// Parse the payload after `S<handle>|`.
    pub fn parse(handle: ClientHandle, payload: &str) -> Result<Self, StatusError> {
        let mut words = payload.split(' ').filter(|w| !w.is_empty());
        let first = words.next().ok_or(StatusError::Empty)?;

        // `display pan` / `display waterfall` are two-word scopes.
        let scope = if first == "display" {
            match words.next() {
                Some("pan") | Some("panadapter") => StatusScope::DisplayPan,
                Some("waterfall") => StatusScope::DisplayWaterfall,
                Some(other) => StatusScope::Other(format!("display {other}")),
                None => StatusScope::Other("display".to_string()),
            }
        } else {
            StatusScope::from_word(first)
        };

        let tokens = words
            .map(|word| match word.split_once('=') {
                Some((key, value)) => StatusToken::KeyValue {
                    key: key.to_string(),
                    value: unescape_spaces(value),
                },
                None => StatusToken::Positional(unescape_spaces(word)),
            })
            .collect();

        Ok(StatusMessage {
            handle,
            scope,
            tokens,
        })
    }

    /// Iterate over `key=value` tokens.
    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tokens.iter().filter_map(|t| match t {
            StatusToken::KeyValue { key, value } => Some((key.as_str(), value.as_str())),
            StatusToken::Positional(_) => None,
        })
    }

    /// Look up one attribute by key.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// N-th positional (non-`k=v`) token. Position 0 is usually the
    /// entity identifier.
    pub fn positional(&self, n: usize) -> Option<&str> {
        self.tokens
            .iter()
            .filter_map(|t| match t {
                StatusToken::Positional(p) => Some(p.as_str()),
                StatusToken::KeyValue { .. } => None,
            })
            .nth(n)
    }

    /// True when the frame deletes its entity.
    pub fn is_removal(&self) -> bool {
        matches!(self.attr("removed"), Some("1"))
    }
}
