//! Data-plane demultiplexer.
//!
//! Ingests parsed datagrams on the session task and fans bin frames,
//! waterfall lines, and audio out to per-stream subscribers. Meter
//! datagrams never come here - the session routes them into the store.
//!
//! Frame assembly: bins within a frame arrive in order; a frame completes
//! when `start_bin + num_bins >= total_bins`. A gap in the bin sequence
//! invalidates the frame, which restarts at the next `start_bin == 0`. A
//! `frame_index` that regresses (or repeats a completed frame) is dropped
//! silently; a skipped frame surfaces as a [`StreamPacket::Gap`].
//!
//! Panadapter packets carry their frame width on the wire. Waterfall
//! packets do not (both subheader trailer fields are reserved), so the
//! line width comes from the waterfall snapshot's display geometry: the
//! session feeds `set_line_width` on every waterfall change. Until a
//! width is known, each frame-start packet is taken as one whole line.
//!
//! Subscribers are tokio broadcast receivers with a bounded queue: a slow
//! subscriber loses the oldest packets and observes the loss as a lag
//! notification on `recv`. Handlers must not block the session task -
//! hand work off to your own task.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use rigproto::datagram::{AudioCompression, Datagram, DatagramPayload};
use rigproto::StreamId;
use tokio::sync::broadcast;
use tracing::trace;

/// One delivery to a stream subscriber.
#[derive(Debug, Clone)]
pub enum StreamPacket {
    /// A fully assembled panadapter spectrum frame.
    PanFrame {
        stream: StreamId,
        frame_index: u32,
        bins: Arc<Vec<u16>>,
    },
    /// One fully assembled waterfall line.
    WaterfallLine {
        stream: StreamId,
        frame_index: u32,
        bins: Arc<Vec<u16>>,
    },
    /// One audio payload; decode and buffering belong to the consumer.
    Audio {
        stream: StreamId,
        payload: Bytes,
        compression: AudioCompression,
        channels: u8,
        sample_rate_hz: u32,
        pts_usec: u64,
    },
    /// A frame was skipped or invalidated; `frame_index` names the frame
    /// that will never complete.
    Gap { stream: StreamId, frame_index: u32 },
}

/// Demux counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DemuxStats {
    pub datagrams: u64,
    pub frames_completed: u64,
    pub gaps: u64,
    pub parse_errors: u64,
}

struct FrameAssembly {
    frame_index: u32,
    total_bins: u16,
    next_bin: u16,
    bins: Vec<u16>,
}

struct DemuxInner {
    capacity: usize,
    senders: HashMap<StreamId, broadcast::Sender<StreamPacket>>,
    assembly: HashMap<StreamId, FrameAssembly>,
    last_complete: HashMap<StreamId, u32>,
    /// Waterfall line widths, from the entity's display geometry.
    line_widths: HashMap<StreamId, u16>,
    stats: DemuxStats,
}

/// Per-session stream demultiplexer. Cheap to clone; all clones share
/// state.
#[derive(Clone)]
pub struct StreamDemux {
    inner: Arc<Mutex<DemuxInner>>,
}

impl StreamDemux {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(DemuxInner {
                capacity,
                senders: HashMap::new(),
                assembly: HashMap::new(),
                last_complete: HashMap::new(),
                line_widths: HashMap::new(),
                stats: DemuxStats::default(),
            })),
        }
    }

    /// Subscribe to one stream. Dropping the receiver cancels.
    pub fn subscribe(&self, stream: StreamId) -> broadcast::Receiver<StreamPacket> {
        let mut inner = self.inner.lock().expect("demux poisoned");
        let capacity = inner.capacity;
        inner
            .senders
            .entry(stream)
            .or_insert_with(|| broadcast::channel(capacity).0)
            .subscribe()
    }

    pub fn stats(&self) -> DemuxStats {
        self.inner.lock().expect("demux poisoned").stats
    }

    pub(crate) fn note_parse_error(&self) {
        self.inner.lock().expect("demux poisoned").stats.parse_errors += 1;
    }

    /// Record a waterfall stream's line width (in bins) from its
    /// snapshot geometry.
    pub(crate) fn set_line_width(&self, stream: StreamId, bins: u16) {
        self.inner
            .lock()
            .expect("demux poisoned")
            .line_widths
            .insert(stream, bins);
    }

    /// Forget per-stream state when the entity goes away.
    pub(crate) fn clear_stream(&self, stream: StreamId) {
        let mut inner = self.inner.lock().expect("demux poisoned");
        inner.line_widths.remove(&stream);
        inner.assembly.remove(&stream);
        inner.last_complete.remove(&stream);
    }

    /// Ingest one parsed datagram (single-threaded per session).
    pub(crate) fn ingest(&self, dgram: Datagram) {
        let mut inner = self.inner.lock().expect("demux poisoned");
        inner.stats.datagrams += 1;

        let stream = dgram.header.stream_id;
        let frame_index = dgram.header.frame_index;
        let mut out = Vec::new();

        match dgram.payload {
            DatagramPayload::Panadapter(packet) => {
                ingest_bins(
                    &mut inner,
                    stream,
                    frame_index,
                    packet.start_bin,
                    packet.num_bins,
                    Some(packet.total_bins),
                    packet.bins,
                    true,
                    &mut out,
                );
            }
            DatagramPayload::Waterfall(line) => {
                let width = inner.line_widths.get(&stream).copied();
                ingest_bins(
                    &mut inner,
                    stream,
                    frame_index,
                    line.start_bin,
                    line.num_bins,
                    width,
                    line.bins,
                    false,
                    &mut out,
                );
            }
            DatagramPayload::Audio(audio) => {
                let pts_usec = dgram.header.timestamp_int_sec as u64 * 1_000_000
                    + ((dgram.header.timestamp_frac_sec as u64 * 1_000_000) >> 32);
                out.push(StreamPacket::Audio {
                    stream,
                    payload: audio.payload,
                    compression: audio.compression,
                    channels: audio.channels,
                    sample_rate_hz: dgram.header.sample_rate_hz,
                    pts_usec,
                });
            }
            DatagramPayload::Meter(_) => {
                // Routed into the store by the session, never here.
            }
            DatagramPayload::Unknown { class, .. } => {
                trace!(%stream, class, "ignoring datagram of unknown class");
            }
        }

        for packet in out {
            if let Some(sender) = inner.senders.get(&stream) {
                // No receivers is fine; lagged receivers observe the
                // drop themselves.
                let _ = sender.send(packet);
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn ingest_bins(
    inner: &mut DemuxInner,
    stream: StreamId,
    frame_index: u32,
    start_bin: u16,
    num_bins: u16,
    total_bins: Option<u16>,
    bins: Vec<u16>,
    pan: bool,
    out: &mut Vec<StreamPacket>,
) {
    if let Some(&last) = inner.last_complete.get(&stream) {
        if frame_index <= last {
            // Regressed or duplicate frame: silent drop.
            return;
        }
    }

    // A packet older than the frame being assembled is a reorder: drop
    // it, keep the frame. A newer one abandons the stale partial frame.
    if let Some(asm) = inner.assembly.get(&stream) {
        if frame_index < asm.frame_index {
            return;
        }
        if frame_index > asm.frame_index {
            inner.stats.gaps += 1;
            out.push(StreamPacket::Gap {
                stream,
                frame_index: asm.frame_index,
            });
            inner.assembly.remove(&stream);
        }
    }

    // No width known (waterfall before its geometry arrives): take each
    // frame-start packet as one whole line; a mid-line fragment cannot
    // be placed and is dropped.
    let Some(total_bins) = total_bins else {
        if start_bin != 0 {
            return;
        }
        inner.last_complete.insert(stream, frame_index);
        inner.stats.frames_completed += 1;
        out.push(StreamPacket::WaterfallLine {
            stream,
            frame_index,
            bins: Arc::new(bins),
        });
        return;
    };

    match inner.assembly.get_mut(&stream) {
        Some(asm) => {
            if start_bin != asm.next_bin {
                // In-frame gap: invalidate, restart at the next start=0.
                inner.stats.gaps += 1;
                out.push(StreamPacket::Gap {
                    stream,
                    frame_index,
                });
                inner.assembly.remove(&stream);
                return;
            }
            asm.bins.extend_from_slice(&bins);
            asm.next_bin = asm.next_bin.saturating_add(num_bins);
        }
        None => {
            if start_bin != 0 {
                // Joined mid-frame; wait for the next frame start.
                return;
            }
            let mut frame_bins = Vec::with_capacity(total_bins as usize);
            frame_bins.extend_from_slice(&bins);
            inner.assembly.insert(
                stream,
                FrameAssembly {
                    frame_index,
                    total_bins,
                    next_bin: num_bins,
                    bins: frame_bins,
                },
            );
        }
    }

    let complete = inner
        .assembly
        .get(&stream)
        .map(|asm| asm.next_bin >= asm.total_bins)
        .unwrap_or(false);
    if complete {
        let asm = inner.assembly.remove(&stream).expect("assembly present");
        inner.last_complete.insert(stream, asm.frame_index);
        inner.stats.frames_completed += 1;
        let bins = Arc::new(asm.bins);
        out.push(if pan {
            StreamPacket::PanFrame {
                stream,
                frame_index: asm.frame_index,
                bins,
            }
        } else {
            StreamPacket::WaterfallLine {
                stream,
                frame_index: asm.frame_index,
                bins,
            }
        });
    }
}
