//! Transport adapters.
//!
//! The session never touches sockets. Adapters hand it channel pairs:
//! lines in / lines out for the control plane, datagrams in / datagrams
//! out for the data plane. The tokio TCP/UDP adapters below are the
//! defaults; a host with its own transport (a WebSocket bridge, a test
//! harness) implements the connector traits instead.
//!
//! Framing lives in the adapter: read to `\n`, trim `\r`, drop empties.
//! The outbound channel is bounded at the session's write watermark -
//! writes never block reads, and overflowing the queue is a session
//! failure, not a stall.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::error::RigError;

/// Depth of the inbound line/datagram queues. Inbound is drained by the
/// session task continuously; this only absorbs bursts.
const INBOUND_QUEUE: usize = 1024;

/// Control-plane endpoint: trimmed lines, both directions.
pub struct ControlChannel {
    /// Outbound command lines (no newline).
    pub tx: mpsc::Sender<String>,
    /// Inbound lines, already trimmed, empties dropped. `None` on EOF.
    pub rx: mpsc::Receiver<String>,
}

impl ControlChannel {
    /// An in-memory pair for tests and bridged transports: the returned
    /// peer injects inbound lines and observes outbound ones.
    pub fn pair(watermark: usize) -> (ControlChannel, ControlPeer) {
        let (in_tx, in_rx) = mpsc::channel(INBOUND_QUEUE);
        let (out_tx, out_rx) = mpsc::channel(watermark);
        (
            ControlChannel {
                tx: out_tx,
                rx: in_rx,
            },
            ControlPeer {
                tx: in_tx,
                rx: out_rx,
            },
        )
    }
}

/// The far side of an in-memory [`ControlChannel`].
pub struct ControlPeer {
    /// Inject inbound lines (what the radio would say).
    pub tx: mpsc::Sender<String>,
    /// Observe outbound command lines.
    pub rx: mpsc::Receiver<String>,
}

/// Data-plane endpoint: raw datagrams, both directions.
pub struct DataChannel {
    /// Outbound datagrams (registration only; the session is not a
    /// general UDP writer).
    pub tx: mpsc::Sender<Bytes>,
    /// Inbound datagrams, one `Bytes` per datagram. `None` when the
    /// adapter stops.
    pub rx: mpsc::Receiver<Bytes>,
}

impl DataChannel {
    /// An in-memory pair for tests and bridged transports.
    pub fn pair() -> (DataChannel, DataPeer) {
        let (in_tx, in_rx) = mpsc::channel(INBOUND_QUEUE);
        let (out_tx, out_rx) = mpsc::channel(INBOUND_QUEUE);
        (
            DataChannel {
                tx: out_tx,
                rx: in_rx,
            },
            DataPeer {
                tx: in_tx,
                rx: out_rx,
            },
        )
    }
}

/// The far side of an in-memory [`DataChannel`].
pub struct DataPeer {
    pub tx: mpsc::Sender<Bytes>,
    pub rx: mpsc::Receiver<Bytes>,
}

/// Opens the control plane.
#[async_trait]
pub trait ControlConnector: Send + Sync {
    async fn connect(&self, watermark: usize) -> Result<ControlChannel, RigError>;
}

/// Opens the data plane. Returns the channel and the local UDP port the
/// radio must be told to send to (`client udpport <port>`).
#[async_trait]
pub trait DataConnector: Send + Sync {
    async fn connect(&self) -> Result<(DataChannel, u16), RigError>;
}

/// Default control-plane adapter: a tokio TCP line socket.
pub struct TcpControlConnector {
    addr: String,
}

impl TcpControlConnector {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

#[async_trait]
impl ControlConnector for TcpControlConnector {
    async fn connect(&self, watermark: usize) -> Result<ControlChannel, RigError> {
        let stream = TcpStream::connect(&self.addr).await?;
        stream.set_nodelay(true)?;
        debug!(addr = %self.addr, "control transport connected");

        let (read_half, mut write_half) = stream.into_split();
        let (in_tx, in_rx) = mpsc::channel::<String>(INBOUND_QUEUE);
        let (out_tx, mut out_rx) = mpsc::channel::<String>(watermark);

        // Reader task: frame lines, trim, drop empties. Dropping `in_tx`
        // on EOF/error is the closed signal the session sees.
        tokio::spawn(async move {
            let mut lines = BufReader::new(read_half).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim_end_matches('\r');
                        if line.is_empty() {
                            continue;
                        }
                        trace!(line, "control rx");
                        if in_tx.send(line.to_string()).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        debug!("control transport EOF");
                        break;
                    }
                    Err(err) => {
                        warn!(%err, "control transport read failed");
                        break;
                    }
                }
            }
        });

        // Writer task: independent of the reader, so writes never block
        // reads. Exits when the session drops its sender.
        tokio::spawn(async move {
            while let Some(line) = out_rx.recv().await {
                trace!(line, "control tx");
                let framed = format!("{line}\n");
                if let Err(err) = write_half.write_all(framed.as_bytes()).await {
                    warn!(%err, "control transport write failed");
                    break;
                }
            }
        });

        Ok(ControlChannel {
            tx: out_tx,
            rx: in_rx,
        })
    }
}

/// Default data-plane adapter: a tokio UDP socket bound to an ephemeral
/// port, connected to the radio. The reader task is the socket's only
/// reader; the session writes nothing but the registration datagram.
pub struct UdpDataConnector {
    radio_addr: String,
}

impl UdpDataConnector {
    pub fn new(radio_addr: impl Into<String>) -> Self {
        Self {
            radio_addr: radio_addr.into(),
        }
    }
}

#[async_trait]
impl DataConnector for UdpDataConnector {
    async fn connect(&self) -> Result<(DataChannel, u16), RigError> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(&self.radio_addr).await?;
        let local_port = socket.local_addr()?.port();
        debug!(addr = %self.radio_addr, local_port, "data transport connected");

        let socket = std::sync::Arc::new(socket);
        let (in_tx, in_rx) = mpsc::channel::<Bytes>(INBOUND_QUEUE);
        let (out_tx, mut out_rx) = mpsc::channel::<Bytes>(INBOUND_QUEUE);

        let reader = socket.clone();
        tokio::spawn(async move {
            // Full datagrams only; 16 KiB covers the largest bin frame.
            let mut buf = vec![0u8; 16 * 1024];
            loop {
                match reader.recv(&mut buf).await {
                    Ok(len) => {
                        if in_tx
                            .send(Bytes::copy_from_slice(&buf[..len]))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(%err, "data transport read failed");
                        break;
                    }
                }
            }
        });

        tokio::spawn(async move {
            while let Some(dgram) = out_rx.recv().await {
                if let Err(err) = socket.send(&dgram).await {
                    warn!(%err, "data transport write failed");
                    break;
                }
            }
        });

        Ok((
            DataChannel {
                tx: out_tx,
                rx: in_rx,
            },
            local_port,
        ))
    }
}
