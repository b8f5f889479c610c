//! Audio stream snapshots.

use std::collections::BTreeMap;

use rigproto::values::{parse_u32, ValueError};
use rigproto::ClientHandle;
use serde::Serialize;

use super::{parse_handle, set_attr, AttrOutcome};

/// The kinds of audio stream the radio serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AudioStreamType {
    #[default]
    RemoteAudioRx,
    RemoteAudioTx,
    DaxRx,
    DaxTx,
    DaxMic,
    Other(String),
}

impl AudioStreamType {
    pub fn from_token(token: &str) -> Self {
        match token {
            "remote_audio_rx" => AudioStreamType::RemoteAudioRx,
            "remote_audio_tx" => AudioStreamType::RemoteAudioTx,
            "dax_rx" => AudioStreamType::DaxRx,
            "dax_tx" => AudioStreamType::DaxTx,
            "dax_mic" => AudioStreamType::DaxMic,
            other => AudioStreamType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AudioStreamType::RemoteAudioRx => "remote_audio_rx",
            AudioStreamType::RemoteAudioTx => "remote_audio_tx",
            AudioStreamType::DaxRx => "dax_rx",
            AudioStreamType::DaxTx => "dax_tx",
            AudioStreamType::DaxMic => "dax_mic",
            AudioStreamType::Other(s) => s.as_str(),
        }
    }
}

/// Stream payload compression, as negotiated at create time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StreamCompression {
    #[default]
    None,
    Opus,
}

impl StreamCompression {
    fn parse(token: &str) -> Result<Self, ValueError> {
        match token {
            "none" | "NONE" | "0" => Ok(StreamCompression::None),
            "opus" | "OPUS" | "1" => Ok(StreamCompression::Opus),
            other => Err(ValueError::InvalidBool(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StreamCompression::None => "none",
            StreamCompression::Opus => "opus",
        }
    }
}

/// One audio stream endpoint on the data plane.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct AudioStream {
    pub stream_type: AudioStreamType,
    pub compression: StreamCompression,
    pub sample_rate_hz: u32,
    pub channels: u32,
    pub client_handle: ClientHandle,
    pub is_owned_by_local_client: bool,
    pub dax_channel: Option<u32>,
    /// Attributes this library does not model, verbatim.
    pub raw: BTreeMap<String, String>,
}

impl AudioStream {
    pub(crate) fn apply_attr(&mut self, key: &str, value: &str) -> AttrOutcome {
        match key {
            "type" => set_attr!(self.stream_type, Ok(AudioStreamType::from_token(value))),
            "compression" => set_attr!(self.compression, StreamCompression::parse(value)),
            "sample_rate" => set_attr!(self.sample_rate_hz, parse_u32(value)),
            "channels" => set_attr!(self.channels, parse_u32(value)),
            "client_handle" => set_attr!(self.client_handle, parse_handle(value)),
            "dax_channel" => set_attr!(self.dax_channel, parse_u32(value).map(Some)),
            _ => {
                self.raw.insert(key.to_string(), value.to_string());
                AttrOutcome::Unknown
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn typed_attrs() {
        let mut stream = AudioStream::default();
        stream.apply_attr("type", "dax_rx");
        stream.apply_attr("compression", "opus");
        stream.apply_attr("sample_rate", "24000");
        stream.apply_attr("channels", "2");
        stream.apply_attr("dax_channel", "3");
        assert_eq!(stream.stream_type, AudioStreamType::DaxRx);
        assert_eq!(stream.compression, StreamCompression::Opus);
        assert_eq!(stream.sample_rate_hz, 24_000);
        assert_eq!(stream.dax_channel, Some(3));
    }

    #[test]
    fn bad_compression_is_a_parse_error() {
        let mut stream = AudioStream::default();
        assert!(matches!(
            stream.apply_attr("compression", "zstd"),
            AttrOutcome::ParseError(_)
        ));
        assert_eq!(stream.compression, StreamCompression::None);
    }
}
