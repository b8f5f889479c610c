//! riglink - the radio session engine.
//!
//! Sits between a host application and one software-defined transceiver:
//!
//! - **session**: control-channel framing, correlated request/reply,
//!   keep-alive, handshake, graceful shutdown
//! - **state**: a typed, observable store of every entity the radio
//!   reports (radio, slices, panadapters, waterfalls, meters, audio
//!   streams, GUI clients, licenses), kept coherent with outbound writes
//! - **demux**: UDP ingest, frame assembly, per-stream fan-out
//! - **controllers**: the write path - optimistic patch, clamped and
//!   canonically formatted commands, resync on rejection
//!
//! The wire protocol itself lives in the `rigproto` crate.
//!
//! ```no_run
//! use riglink::{RadioSession, SessionConfig, TcpControlConnector, UdpDataConnector};
//!
//! # async fn demo() -> Result<(), riglink::RigError> {
//! let control = TcpControlConnector::new("192.168.1.42:4992");
//! let data = UdpDataConnector::new("192.168.1.42:4991");
//! let session = RadioSession::connect(
//!     SessionConfig::new("myapp", "shack-mac"),
//!     &control,
//!     Some(&data),
//! )
//! .await?;
//!
//! let slice_id = session.create_slice(14.250, "ANT1", "usb").await?;
//! session.slice(slice_id).set_filter(100, 2800).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controllers;
pub mod demux;
pub mod discovery;
pub mod error;
pub mod events;
pub mod session;
pub mod state;
pub mod transport;

pub use config::SessionConfig;
pub use controllers::{
    AudioStreamController, PanadapterController, ProfileKind, RadioController, SharpnessMode,
    SliceController, WaterfallController,
};
pub use demux::{DemuxStats, StreamDemux, StreamPacket};
pub use discovery::{discover_radios, DiscoveryAdapter, RadioDescriptor};
pub use error::RigError;
pub use events::{ConnectStage, EventBus, SessionEvent, Subscription};
pub use session::{CommandReply, RadioSession, SessionState};
pub use state::{
    AudioStream, AudioStreamType, ChangeRecord, EntityChange, EntityKind, FeatureLicense,
    GuiClient, Meter, MeterSource, Panadapter, Radio, RadioStore, Slice, StoreSnapshot,
    StoreStats, StreamCompression, Waterfall,
};
pub use transport::{
    ControlChannel, ControlConnector, ControlPeer, DataChannel, DataConnector, DataPeer,
    TcpControlConnector, UdpDataConnector,
};
