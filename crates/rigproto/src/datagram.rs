//! Data-plane datagrams.
//!
//! Every UDP datagram from the radio starts with a fixed 26-byte
//! big-endian header:
//!
//! ```text
//! stream_id:u32  class:u16  packet_type:u16
//! timestamp_int_sec:u32  timestamp_frac_sec:u32
//! payload_size:u16  sample_rate_hz:u32  frame_index:u32
//! ```
//!
//! followed by a class-specific payload:
//!
//! - panadapter `0x8003`: `start_bin:u16 num_bins:u16 total_bins:u16
//!   reserved:u16 bins:u16[num_bins]`
//! - waterfall `0x8004`: `start_bin:u16 num_bins:u16 reserved:u16
//!   reserved:u16 bins:u16[num_bins]` - one spectrogram line, with no
//!   line width on the wire
//! - meter `0x8002`: repeating `meter_id:u16 value:i16` pairs (Q15)
//! - audio `0x8005`: `channels:u8 compression:u8 reserved:u16 payload[..]`
//!
//! A datagram whose length fields exceed the buffer is truncated on the
//! wire (the radio never intentionally fragments) and is rejected whole;
//! payloads are never spliced.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::ids::StreamId;

/// Fixed header length in bytes.
pub const HEADER_LEN: usize = 26;

/// Bin-slice payload subheader length (pan and waterfall).
const BIN_SUBHEADER_LEN: usize = 8;

/// Audio payload subheader length.
const AUDIO_SUBHEADER_LEN: usize = 4;

pub const CLASS_METER: u16 = 0x8002;
pub const CLASS_PAN: u16 = 0x8003;
pub const CLASS_WATERFALL: u16 = 0x8004;
pub const CLASS_AUDIO: u16 = 0x8005;

/// Errors parsing a datagram.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DatagramError {
    #[error("datagram truncated: need {expected} bytes, have {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("unknown audio compression {0}")]
    UnknownCompression(u8),
}

/// The fixed datagram header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatagramHeader {
    pub stream_id: StreamId,
    pub class: u16,
    pub packet_type: u16,
    pub timestamp_int_sec: u32,
    pub timestamp_frac_sec: u32,
    pub payload_size: u16,
    pub sample_rate_hz: u32,
    pub frame_index: u32,
}

/// One slice of a panadapter frame.
///
/// `total_bins` is the full width of the frame this slice belongs to;
/// assembly completes when `start_bin + num_bins >= total_bins`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinPacket {
    pub start_bin: u16,
    pub num_bins: u16,
    pub total_bins: u16,
    pub bins: Vec<u16>,
}

/// One slice of a waterfall line.
///
/// Unlike [`BinPacket`] there is no width field: both trailing subheader
/// u16s are reserved and never interpreted. The consumer decides when a
/// line is complete from the display geometry it already knows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePacket {
    pub start_bin: u16,
    pub num_bins: u16,
    pub bins: Vec<u16>,
}

/// One meter sample. `value` is raw Q15; per-meter unit scaling happens
/// in the state store where the meter's unit is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeterReading {
    pub meter_id: u16,
    pub value: i16,
}

/// Audio payload compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioCompression {
    None,
    Opus,
}

impl AudioCompression {
    pub fn from_u8(v: u8) -> Result<Self, DatagramError> {
        match v {
            0 => Ok(AudioCompression::None),
            1 => Ok(AudioCompression::Opus),
            other => Err(DatagramError::UnknownCompression(other)),
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            AudioCompression::None => 0,
            AudioCompression::Opus => 1,
        }
    }
}

/// Audio payload: raw PCM planar float or a single Opus packet. Decode
/// and buffering belong to the audio consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioPacket {
    pub channels: u8,
    pub compression: AudioCompression,
    pub payload: Bytes,
}

/// Class-specific payload.
#[derive(Debug, Clone, PartialEq)]
pub enum DatagramPayload {
    Panadapter(BinPacket),
    Waterfall(LinePacket),
    Meter(Vec<MeterReading>),
    Audio(AudioPacket),
    /// Classes this library does not interpret; bytes preserved.
    Unknown { class: u16, payload: Bytes },
}

/// One parsed data-plane datagram.
#[derive(Debug, Clone, PartialEq)]
pub struct Datagram {
    pub header: DatagramHeader,
    pub payload: DatagramPayload,
}

/// Parse one full datagram. Truncation anywhere is an error for the whole
/// datagram.
pub fn parse_datagram(mut buf: Bytes) -> Result<Datagram, DatagramError> {
    if buf.len() < HEADER_LEN {
        return Err(DatagramError::Truncated {
            expected: HEADER_LEN,
            actual: buf.len(),
        });
    }

    let header = DatagramHeader {
        stream_id: StreamId(buf.get_u32()),
        class: buf.get_u16(),
        packet_type: buf.get_u16(),
        timestamp_int_sec: buf.get_u32(),
        timestamp_frac_sec: buf.get_u32(),
        payload_size: buf.get_u16(),
        sample_rate_hz: buf.get_u32(),
        frame_index: buf.get_u32(),
    };

    let payload_len = header.payload_size as usize;
    if buf.len() < payload_len {
        return Err(DatagramError::Truncated {
            expected: HEADER_LEN + payload_len,
            actual: HEADER_LEN + buf.len(),
        });
    }
    // Anything past payload_size is padding; drop it.
    let mut payload = buf.split_to(payload_len);

    let parsed = match header.class {
        CLASS_PAN => DatagramPayload::Panadapter(parse_bins(&mut payload)?),
        CLASS_WATERFALL => DatagramPayload::Waterfall(parse_line_bins(&mut payload)?),
        CLASS_METER => DatagramPayload::Meter(parse_meters(&mut payload)),
        CLASS_AUDIO => DatagramPayload::Audio(parse_audio(&mut payload)?),
        class => DatagramPayload::Unknown {
            class,
            payload,
        },
    };

    Ok(Datagram {
        header,
        payload: parsed,
    })
}

fn parse_bins(payload: &mut Bytes) -> Result<BinPacket, DatagramError> {
    if payload.len() < BIN_SUBHEADER_LEN {
        return Err(DatagramError::Truncated {
            expected: HEADER_LEN + BIN_SUBHEADER_LEN,
            actual: HEADER_LEN + payload.len(),
        });
    }
    let start_bin = payload.get_u16();
    let num_bins = payload.get_u16();
    let total_bins = payload.get_u16();
    let _reserved = payload.get_u16();

    let need = num_bins as usize * 2;
    if payload.len() < need {
        return Err(DatagramError::Truncated {
            expected: HEADER_LEN + BIN_SUBHEADER_LEN + need,
            actual: HEADER_LEN + BIN_SUBHEADER_LEN + payload.len(),
        });
    }
    let mut bins = Vec::with_capacity(num_bins as usize);
    for _ in 0..num_bins {
        bins.push(payload.get_u16());
    }

    Ok(BinPacket {
        start_bin,
        num_bins,
        total_bins,
        bins,
    })
}

fn parse_line_bins(payload: &mut Bytes) -> Result<LinePacket, DatagramError> {
    if payload.len() < BIN_SUBHEADER_LEN {
        return Err(DatagramError::Truncated {
            expected: HEADER_LEN + BIN_SUBHEADER_LEN,
            actual: HEADER_LEN + payload.len(),
        });
    }
    let start_bin = payload.get_u16();
    let num_bins = payload.get_u16();
    let _reserved = payload.get_u16();
    let _reserved = payload.get_u16();

    let need = num_bins as usize * 2;
    if payload.len() < need {
        return Err(DatagramError::Truncated {
            expected: HEADER_LEN + BIN_SUBHEADER_LEN + need,
            actual: HEADER_LEN + BIN_SUBHEADER_LEN + payload.len(),
        });
    }
    let mut bins = Vec::with_capacity(num_bins as usize);
    for _ in 0..num_bins {
        bins.push(payload.get_u16());
    }

    Ok(LinePacket {
        start_bin,
        num_bins,
        bins,
    })
}

fn parse_meters(payload: &mut Bytes) -> Vec<MeterReading> {
    let mut readings = Vec::with_capacity(payload.len() / 4);
    while payload.len() >= 4 {
        readings.push(MeterReading {
            meter_id: payload.get_u16(),
            value: payload.get_i16(),
        });
    }
    // A trailing odd pair is padding from the radio; ignore it.
    readings
}

fn parse_audio(payload: &mut Bytes) -> Result<AudioPacket, DatagramError> {
    if payload.len() < AUDIO_SUBHEADER_LEN {
        return Err(DatagramError::Truncated {
            expected: HEADER_LEN + AUDIO_SUBHEADER_LEN,
            actual: HEADER_LEN + payload.len(),
        });
    }
    let channels = payload.get_u8();
    let compression = AudioCompression::from_u8(payload.get_u8())?;
    let _reserved = payload.get_u16();

    Ok(AudioPacket {
        channels,
        compression,
        payload: payload.clone(),
    })
}

impl Datagram {
    /// Encode back to wire bytes. The header's `payload_size` is
    /// recomputed from the payload being encoded.
    pub fn encode(&self) -> Bytes {
        let body = self.encode_payload();
        let mut buf = BytesMut::with_capacity(HEADER_LEN + body.len());
        buf.put_u32(self.header.stream_id.0);
        buf.put_u16(self.header.class);
        buf.put_u16(self.header.packet_type);
        buf.put_u32(self.header.timestamp_int_sec);
        buf.put_u32(self.header.timestamp_frac_sec);
        buf.put_u16(body.len() as u16);
        buf.put_u32(self.header.sample_rate_hz);
        buf.put_u32(self.header.frame_index);
        buf.put(body);
        buf.freeze()
    }

    fn encode_payload(&self) -> Bytes {
        match &self.payload {
            DatagramPayload::Panadapter(bins) => {
                let mut buf = BytesMut::with_capacity(BIN_SUBHEADER_LEN + bins.bins.len() * 2);
                buf.put_u16(bins.start_bin);
                buf.put_u16(bins.num_bins);
                buf.put_u16(bins.total_bins);
                buf.put_u16(0);
                for bin in &bins.bins {
                    buf.put_u16(*bin);
                }
                buf.freeze()
            }
            DatagramPayload::Waterfall(line) => {
                let mut buf = BytesMut::with_capacity(BIN_SUBHEADER_LEN + line.bins.len() * 2);
                buf.put_u16(line.start_bin);
                buf.put_u16(line.num_bins);
                buf.put_u16(0);
                buf.put_u16(0);
                for bin in &line.bins {
                    buf.put_u16(*bin);
                }
                buf.freeze()
            }
            DatagramPayload::Meter(readings) => {
                let mut buf = BytesMut::with_capacity(readings.len() * 4);
                for r in readings {
                    buf.put_u16(r.meter_id);
                    buf.put_i16(r.value);
                }
                buf.freeze()
            }
            DatagramPayload::Audio(audio) => {
                let mut buf = BytesMut::with_capacity(AUDIO_SUBHEADER_LEN + audio.payload.len());
                buf.put_u8(audio.channels);
                buf.put_u8(audio.compression.to_u8());
                buf.put_u16(0);
                buf.put(audio.payload.clone());
                buf.freeze()
            }
            DatagramPayload::Unknown { payload, .. } => payload.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn header(class: u16, stream: u32) -> DatagramHeader {
        DatagramHeader {
            stream_id: StreamId(stream),
            class,
            packet_type: 0,
            timestamp_int_sec: 1000,
            timestamp_frac_sec: 500,
            payload_size: 0,
            sample_rate_hz: 24_000,
            frame_index: 7,
        }
    }

    #[test]
    fn panadapter_roundtrip() {
        let dgram = Datagram {
            header: header(CLASS_PAN, 0x40000001),
            payload: DatagramPayload::Panadapter(BinPacket {
                start_bin: 512,
                num_bins: 4,
                total_bins: 1024,
                bins: vec![10, 20, 30, 40],
            }),
        };
        let wire = dgram.encode();
        let parsed = parse_datagram(wire).unwrap();

        assert_eq!(parsed.header.stream_id, StreamId(0x40000001));
        assert_eq!(parsed.header.class, CLASS_PAN);
        assert_eq!(parsed.header.payload_size, 16);
        assert_eq!(parsed.header.frame_index, 7);
        match parsed.payload {
            DatagramPayload::Panadapter(bins) => {
                assert_eq!(bins.start_bin, 512);
                assert_eq!(bins.total_bins, 1024);
                assert_eq!(bins.bins, vec![10, 20, 30, 40]);
            }
            other => panic!("expected panadapter payload, got {other:?}"),
        }
    }

    #[test]
    fn waterfall_roundtrip_without_width_field() {
        let dgram = Datagram {
            header: header(CLASS_WATERFALL, 0x42000000),
            payload: DatagramPayload::Waterfall(LinePacket {
                start_bin: 0,
                num_bins: 3,
                bins: vec![7, 8, 9],
            }),
        };
        let wire = dgram.encode();
        // both reserved subheader fields go out as zero
        assert_eq!(&wire[HEADER_LEN + 4..HEADER_LEN + 8], &[0u8, 0, 0, 0][..]);

        let parsed = parse_datagram(wire).unwrap();
        match parsed.payload {
            DatagramPayload::Waterfall(line) => {
                assert_eq!(line.start_bin, 0);
                assert_eq!(line.num_bins, 3);
                assert_eq!(line.bins, vec![7, 8, 9]);
            }
            other => panic!("expected waterfall payload, got {other:?}"),
        }
    }

    #[test]
    fn waterfall_reserved_fields_are_not_interpreted() {
        // hand-build a line whose reserved fields carry garbage
        let mut wire = BytesMut::new();
        wire.put_u32(0x42000000);
        wire.put_u16(CLASS_WATERFALL);
        wire.put_u16(0);
        wire.put_u32(0);
        wire.put_u32(0);
        wire.put_u16(12); // subheader + 2 bins
        wire.put_u32(0);
        wire.put_u32(1);
        wire.put_u16(0); // start
        wire.put_u16(2); // num
        wire.put_u16(0xDEAD); // reserved
        wire.put_u16(0xBEEF); // reserved
        wire.put_u16(10);
        wire.put_u16(20);

        let parsed = parse_datagram(wire.freeze()).unwrap();
        match parsed.payload {
            DatagramPayload::Waterfall(line) => {
                assert_eq!(line.bins, vec![10, 20]);
            }
            other => panic!("expected waterfall payload, got {other:?}"),
        }
    }

    #[test]
    fn meter_payload() {
        let dgram = Datagram {
            header: header(CLASS_METER, 0x00000700),
            payload: DatagramPayload::Meter(vec![
                MeterReading {
                    meter_id: 1,
                    value: -16384,
                },
                MeterReading {
                    meter_id: 2,
                    value: 4096,
                },
            ]),
        };
        let parsed = parse_datagram(dgram.encode()).unwrap();
        match parsed.payload {
            DatagramPayload::Meter(readings) => {
                assert_eq!(readings.len(), 2);
                assert_eq!(readings[0].meter_id, 1);
                assert_eq!(readings[0].value, -16384);
            }
            other => panic!("expected meter payload, got {other:?}"),
        }
    }

    #[test]
    fn audio_payload() {
        let dgram = Datagram {
            header: header(CLASS_AUDIO, 0x04000001),
            payload: DatagramPayload::Audio(AudioPacket {
                channels: 2,
                compression: AudioCompression::Opus,
                payload: Bytes::from_static(b"opus-frame-bytes"),
            }),
        };
        let parsed = parse_datagram(dgram.encode()).unwrap();
        match parsed.payload {
            DatagramPayload::Audio(audio) => {
                assert_eq!(audio.channels, 2);
                assert_eq!(audio.compression, AudioCompression::Opus);
                assert_eq!(audio.payload.as_ref(), b"opus-frame-bytes");
            }
            other => panic!("expected audio payload, got {other:?}"),
        }
    }

    #[test]
    fn unknown_class_preserved() {
        let dgram = Datagram {
            header: header(0x9999, 0x12345678),
            payload: DatagramPayload::Unknown {
                class: 0x9999,
                payload: Bytes::from_static(&[1, 2, 3]),
            },
        };
        let parsed = parse_datagram(dgram.encode()).unwrap();
        match parsed.payload {
            DatagramPayload::Unknown { class, payload } => {
                assert_eq!(class, 0x9999);
                assert_eq!(payload.as_ref(), &[1, 2, 3]);
            }
            other => panic!("expected unknown payload, got {other:?}"),
        }
    }

    #[test]
    fn truncated_header_rejected() {
        let err = parse_datagram(Bytes::from_static(&[0; 10])).unwrap_err();
        assert_eq!(
            err,
            DatagramError::Truncated {
                expected: HEADER_LEN,
                actual: 10,
            }
        );
    }

    #[test]
    fn truncated_payload_rejected_not_spliced() {
        let dgram = Datagram {
            header: header(CLASS_PAN, 0x40000001),
            payload: DatagramPayload::Panadapter(BinPacket {
                start_bin: 0,
                num_bins: 8,
                total_bins: 8,
                bins: vec![0; 8],
            }),
        };
        let wire = dgram.encode();
        // chop mid-payload: payload_size now exceeds the buffer
        let truncated = wire.slice(..wire.len() - 4);
        assert!(matches!(
            parse_datagram(truncated),
            Err(DatagramError::Truncated { .. })
        ));
    }

    #[test]
    fn bin_count_validated_against_payload() {
        let mut wire = BytesMut::new();
        wire.put_u32(0x40000001);
        wire.put_u16(CLASS_PAN);
        wire.put_u16(0);
        wire.put_u32(0);
        wire.put_u32(0);
        wire.put_u16(12); // subheader + 2 bins only
        wire.put_u32(24_000);
        wire.put_u32(0);
        wire.put_u16(0); // start
        wire.put_u16(100); // claims 100 bins
        wire.put_u16(100);
        wire.put_u16(0);
        wire.put_u16(1);
        wire.put_u16(2);
        assert!(matches!(
            parse_datagram(wire.freeze()),
            Err(DatagramError::Truncated { .. })
        ));
    }
}
