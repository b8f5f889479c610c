//! Session configuration.

use std::time::Duration;

/// Tunables for one radio session. Defaults match the radio's expected
/// cadence; hosts override with the `with_*` builders.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Program name reported in `client program`.
    pub program: String,
    /// Station name reported in `client station`.
    pub station: String,
    /// Register as a GUI client during handshake.
    pub gui: bool,
    /// Create a compressed remote-audio stream once the data plane is up.
    pub compressed_audio: bool,
    /// Per-command reply deadline.
    pub command_timeout: Duration,
    /// Deadline for the radio's `H` line during handshake.
    pub handle_timeout: Duration,
    /// Keep-alive ping cadence once ready.
    pub ping_interval: Duration,
    /// Consecutive unanswered pings before the session fails.
    pub max_ping_failures: u32,
    /// Outbound line queue depth; overflowing it fails the session.
    pub write_watermark: usize,
    /// Per-stream subscriber queue depth; overflow drops the oldest.
    pub stream_queue_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            program: "riglink".to_string(),
            station: "riglink".to_string(),
            gui: false,
            compressed_audio: false,
            command_timeout: Duration::from_millis(5000),
            handle_timeout: Duration::from_millis(5000),
            ping_interval: Duration::from_millis(1000),
            max_ping_failures: 3,
            write_watermark: 256,
            stream_queue_capacity: 64,
        }
    }
}

impl SessionConfig {
    pub fn new(program: &str, station: &str) -> Self {
        Self {
            program: program.to_string(),
            station: station.to_string(),
            ..Self::default()
        }
    }

    pub fn with_gui(mut self, gui: bool) -> Self {
        self.gui = gui;
        self
    }

    pub fn with_compressed_audio(mut self, enabled: bool) -> Self {
        self.compressed_audio = enabled;
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn with_handle_timeout(mut self, timeout: Duration) -> Self {
        self.handle_timeout = timeout;
        self
    }

    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    pub fn with_write_watermark(mut self, lines: usize) -> Self {
        self.write_watermark = lines;
        self
    }

    pub fn with_stream_queue_capacity(mut self, packets: usize) -> Self {
        self.stream_queue_capacity = packets;
        self
    }
}
