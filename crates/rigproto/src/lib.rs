//! rigproto - Wire protocol for split control/data plane SDR transceivers
//!
//! The radios this family of crates talks to expose two planes:
//!
//! - a line-oriented TCP **control plane**: `C<seq>|<command>` out,
//!   tagged `H`/`V`/`R`/`S`/`M` lines back in
//! - a binary UDP **data plane**: fixed 26-byte big-endian header followed
//!   by a class-specific payload (spectrum bins, waterfall lines, meter
//!   samples, audio)
//!
//! This crate is sans-I/O: it defines the types and the parse/format pairs
//! for both planes. Sockets, sessions, and state live in `riglink`.

pub mod datagram;
pub mod ids;
pub mod info;
pub mod line;
pub mod reply;
pub mod status;
pub mod values;

pub use datagram::{
    AudioCompression, AudioPacket, BinPacket, Datagram, DatagramError, DatagramHeader,
    DatagramPayload, LinePacket, MeterReading, CLASS_AUDIO, CLASS_METER, CLASS_PAN,
    CLASS_WATERFALL, HEADER_LEN,
};
pub use ids::{ClientHandle, IdError, StreamId};
pub use info::parse_info_block;
pub use line::{format_command, next_seq, parse_line, InboundLine, LineError, NoticeLine, ReplyLine, SEQ_WRAP};
pub use reply::{describe_reply_code, ReplySeverity};
pub use status::{StatusError, StatusMessage, StatusScope, StatusToken};
