//! The radio session.
//!
//! One logical task per session multiplexes control I/O, UDP ingest, the
//! keep-alive timer, command deadlines, and handle waiters. The store is
//! owned by this task: every mutation - status frame, optimistic patch,
//! handle assignment, meter update - flows through the reactor, so no
//! lock is ever held across a suspension point and subscribers observe
//! changes in application order.
//!
//! A caller awaiting [`RadioSession::command`] is guaranteed that every
//! status line the radio emitted before its reply has been applied to the
//! store by the time the reply resolves: the control channel is a single
//! total order and the reactor processes it sequentially.

mod pending;

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use bytes::Bytes;
use rigproto::datagram::{parse_datagram, DatagramPayload};
use rigproto::values::escape_spaces;
use rigproto::{
    format_command, next_seq, parse_info_block, parse_line, ClientHandle, InboundLine,
    ReplySeverity, StreamId,
};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

use crate::config::SessionConfig;
use crate::controllers::{
    AudioStreamController, PanadapterController, RadioController, SliceController,
    WaterfallController,
};
use crate::demux::{DemuxStats, StreamDemux, StreamPacket};
use crate::error::RigError;
use crate::events::{ConnectStage, EventBus, SessionEvent, Subscription};
use crate::state::{
    AudioStreamType, EntityChange, EntityKind, RadioStore, StoreSnapshot, StoreStats,
    StreamCompression,
};
use crate::transport::{ControlChannel, ControlConnector, DataChannel, DataConnector};

use pending::{PendingCommand, PendingKind, PendingTable};

/// The fixed, ordered subscription priming sent during handshake.
const HANDSHAKE_SUBSCRIPTIONS: &[&str] = &[
    "profile global info",
    "profile tx info",
    "profile mic info",
    "profile display info",
    "sub client all",
    "sub tx all",
    "sub atu all",
    "sub amplifier all",
    "sub meter all",
    "sub pan all",
    "sub slice all",
    "sub gps all",
    "sub audio_stream all",
    "sub cwx all",
    "sub xvtr all",
    "sub memories all",
    "sub daxiq all",
    "sub dax all",
    "sub license all",
    "sub usb_cable all",
    "sub tnf all",
    "sub spot all",
    "sub rapidm all",
    "sub ale all",
    "sub log_manager",
    "sub radio all",
    "sub apd all",
    "keepalive enable",
];

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Handshaking,
    Ready,
    Closed,
    Failed,
}

/// An accepted reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    pub seq: u32,
    pub code: u32,
    pub message: String,
    pub description: &'static str,
}

/// An optimistic store mutation riding along with a command.
pub(crate) struct PatchRequest {
    pub kind: EntityKind,
    pub id: String,
    pub attrs: Vec<(String, String)>,
}

enum SessionMsg {
    Command {
        text: String,
        timeout: Duration,
        patch: Option<PatchRequest>,
        resync: Option<String>,
        reply_tx: oneshot::Sender<Result<CommandReply, RigError>>,
    },
    WaitHandle {
        timeout: Duration,
        tx: oneshot::Sender<Result<ClientHandle, RigError>>,
    },
    ApplyRadioAttrs {
        attrs: Vec<(String, String)>,
    },
    AttachData {
        channel: DataChannel,
        done: oneshot::Sender<()>,
    },
    MarkReady {
        done: oneshot::Sender<()>,
    },
    Close {
        done: oneshot::Sender<()>,
    },
}

struct SessionShared {
    cmd_tx: mpsc::Sender<SessionMsg>,
    events: EventBus,
    store: Arc<RwLock<RadioStore>>,
    demux: StreamDemux,
    config: SessionConfig,
    state: Mutex<SessionState>,
    handle: Mutex<Option<ClientHandle>>,
}

impl SessionShared {
    fn set_state(&self, state: SessionState) {
        *self.state.lock().expect("session state poisoned") = state;
    }

    fn get_state(&self) -> SessionState {
        *self.state.lock().expect("session state poisoned")
    }
}

/// Handle to one radio session. Cheap to clone.
#[derive(Clone)]
pub struct RadioSession {
    shared: Arc<SessionShared>,
}

impl RadioSession {
    /// Spawn the session reactor over an already-open control channel and
    /// begin handshaking. Most hosts want [`RadioSession::connect`]
    /// instead, which also drives the handshake to completion.
    pub fn open(config: SessionConfig, control: ControlChannel) -> RadioSession {
        let (cmd_tx, mailbox) = mpsc::channel(64);
        let shared = Arc::new(SessionShared {
            cmd_tx,
            events: EventBus::new(),
            store: Arc::new(RwLock::new(RadioStore::new())),
            demux: StreamDemux::new(config.stream_queue_capacity),
            config,
            state: Mutex::new(SessionState::Handshaking),
            handle: Mutex::new(None),
        });

        let actor = SessionActor {
            shared: shared.clone(),
            control,
            data: None,
            mailbox,
            pending: PendingTable::default(),
            waiters: Vec::new(),
            seq: 0,
            keepalive: false,
            ping_failures: 0,
        };
        tokio::spawn(actor.run());

        RadioSession { shared }
    }

    /// Open the control plane, drive the full handshake, optionally
    /// attach the data plane, and return a ready session. On any
    /// handshake failure the session is closed and the error returned.
    pub async fn connect(
        config: SessionConfig,
        control: &dyn ControlConnector,
        data: Option<&dyn DataConnector>,
    ) -> Result<RadioSession, RigError> {
        let channel = control.connect(config.write_watermark).await?;
        let session = RadioSession::open(config, channel);
        session
            .shared
            .events
            .emit(SessionEvent::Progress(ConnectStage::Control));

        match session.handshake(data).await {
            Ok(()) => Ok(session),
            Err(err) => {
                session.close().await;
                Err(err)
            }
        }
    }

    /// Drive the handshake on a session created with [`RadioSession::open`]:
    /// wait for the handle, identify, refresh info/version/antenna/mic,
    /// prime subscriptions, attach the data plane, start keep-alive.
    /// [`RadioSession::connect`] calls this once; it is not re-entrant.
    pub async fn handshake(&self, data: Option<&dyn DataConnector>) -> Result<(), RigError> {
        let config = self.shared.config.clone();
        let events = &self.shared.events;

        self.wait_for_handle(config.handle_timeout).await?;
        events.emit(SessionEvent::Progress(ConnectStage::Handle));

        self.command(format!("client program {}", escape_spaces(&config.program)))
            .await?;
        self.command(format!("client station {}", escape_spaces(&config.station)))
            .await?;
        if config.gui {
            self.command("client gui".to_string()).await?;
        }

        let info = self.command("info".to_string()).await?;
        self.apply_radio_attrs(parse_info_block(&info.message)).await;
        let version = self.command("version".to_string()).await?;
        self.apply_radio_attrs(parse_info_block(&version.message))
            .await;
        let ants = self.command("ant list".to_string()).await?;
        self.apply_radio_attrs(vec![("ant_list".to_string(), ants.message.trim().to_string())])
            .await;
        let mics = self.command("mic list".to_string()).await?;
        self.apply_radio_attrs(vec![("mic_list".to_string(), mics.message.trim().to_string())])
            .await;

        for sub in HANDSHAKE_SUBSCRIPTIONS {
            self.command(sub.to_string()).await?;
        }
        events.emit(SessionEvent::Progress(ConnectStage::Sync));

        if let Some(connector) = data {
            let (channel, local_port) = connector.connect().await?;
            let (done_tx, done_rx) = oneshot::channel();
            self.send_msg(SessionMsg::AttachData {
                channel,
                done: done_tx,
            })
            .await?;
            let _ = done_rx.await;
            self.command(format!("client udpport {local_port}")).await?;
            events.emit(SessionEvent::Progress(ConnectStage::DataPlane));

            if self.shared.config.compressed_audio {
                self.command("stream create type=remote_audio_rx compression=opus".to_string())
                    .await?;
            }
        }

        let (done_tx, done_rx) = oneshot::channel();
        self.send_msg(SessionMsg::MarkReady { done: done_tx }).await?;
        done_rx.await.map_err(|_| RigError::SessionClosed)?;
        Ok(())
    }

    async fn send_msg(&self, msg: SessionMsg) -> Result<(), RigError> {
        self.shared
            .cmd_tx
            .send(msg)
            .await
            .map_err(|_| RigError::SessionClosed)
    }

    async fn apply_radio_attrs(&self, attrs: Vec<(String, String)>) {
        let _ = self
            .shared
            .cmd_tx
            .send(SessionMsg::ApplyRadioAttrs { attrs })
            .await;
    }

    /// Send one command and await its terminal outcome.
    pub async fn command(&self, text: impl Into<String>) -> Result<CommandReply, RigError> {
        self.command_full(text.into(), self.shared.config.command_timeout, None, None)
            .await
    }

    /// Send one command with an explicit deadline.
    pub async fn command_with_timeout(
        &self,
        text: impl Into<String>,
        timeout: Duration,
    ) -> Result<CommandReply, RigError> {
        self.command_full(text.into(), timeout, None, None).await
    }

    pub(crate) async fn command_full(
        &self,
        text: String,
        timeout: Duration,
        patch: Option<PatchRequest>,
        resync: Option<String>,
    ) -> Result<CommandReply, RigError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send_msg(SessionMsg::Command {
            text,
            timeout,
            patch,
            resync,
            reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| RigError::SessionClosed)?
    }

    /// Wait for the radio-assigned client handle. Resolves immediately
    /// once known; rejects with `HandleTimeout` otherwise.
    pub async fn wait_for_handle(&self, timeout: Duration) -> Result<ClientHandle, RigError> {
        let (tx, rx) = oneshot::channel();
        self.send_msg(SessionMsg::WaitHandle { timeout, tx }).await?;
        rx.await.map_err(|_| RigError::SessionClosed)?
    }

    /// Close the session: reject pending work, cancel timers, emit
    /// `Disconnected`.
    pub async fn close(&self) {
        let (done, done_rx) = oneshot::channel();
        if self.send_msg(SessionMsg::Close { done }).await.is_ok() {
            let _ = done_rx.await;
        }
    }

    // ---- observation ---------------------------------------------------

    pub fn state(&self) -> SessionState {
        self.shared.get_state()
    }

    pub fn client_handle(&self) -> Option<ClientHandle> {
        *self.shared.handle.lock().expect("session handle poisoned")
    }

    /// Subscribe to session events.
    pub fn on<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        self.shared.events.on(handler)
    }

    /// Subscribe for the next session event only.
    pub fn once<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        self.shared.events.once(handler)
    }

    pub fn events(&self) -> EventBus {
        self.shared.events.clone()
    }

    /// Subscribe to one data-plane stream.
    pub fn subscribe_stream(&self, stream: StreamId) -> broadcast::Receiver<StreamPacket> {
        self.shared.demux.subscribe(stream)
    }

    /// A frozen view of the whole store.
    pub fn snapshot(&self) -> StoreSnapshot {
        self.store().snapshot()
    }

    pub fn store_stats(&self) -> StoreStats {
        self.store().stats()
    }

    pub fn demux_stats(&self) -> DemuxStats {
        self.shared.demux.stats()
    }

    pub(crate) fn store(&self) -> std::sync::RwLockReadGuard<'_, RadioStore> {
        self.shared.store.read().expect("store poisoned")
    }

    pub(crate) fn command_timeout(&self) -> Duration {
        self.shared.config.command_timeout
    }

    // ---- controllers ---------------------------------------------------

    pub fn slice(&self, id: StreamId) -> SliceController {
        SliceController::new(self.clone(), id)
    }

    pub fn panadapter(&self, id: StreamId) -> PanadapterController {
        PanadapterController::new(self.clone(), id)
    }

    pub fn waterfall(&self, id: StreamId) -> WaterfallController {
        WaterfallController::new(self.clone(), id)
    }

    pub fn radio(&self) -> RadioController {
        RadioController::new(self.clone())
    }

    pub fn audio_stream(&self, id: StreamId) -> AudioStreamController {
        AudioStreamController::new(self.clone(), id)
    }

    /// Create a slice; the returned id is also how the radio will key the
    /// slice's status frames.
    pub async fn create_slice(
        &self,
        frequency_mhz: f64,
        rx_ant: &str,
        mode: &str,
    ) -> Result<StreamId, RigError> {
        let reply = self
            .command(format!(
                "slice create RF_frequency={} rxant={} mode={}",
                rigproto::values::format_mhz(frequency_mhz),
                rx_ant,
                mode.to_ascii_lowercase()
            ))
            .await?;
        parse_created_id(&reply, "slice")
    }

    /// Create an audio stream of the given type.
    pub async fn create_audio_stream(
        &self,
        stream_type: AudioStreamType,
        compression: StreamCompression,
        dax_channel: Option<u32>,
    ) -> Result<StreamId, RigError> {
        let mut text = format!(
            "stream create type={} compression={}",
            stream_type.as_str(),
            compression.as_str()
        );
        if let Some(channel) = dax_channel {
            text.push_str(&format!(" dax_channel={channel}"));
        }
        let reply = self.command(text).await?;
        parse_created_id(&reply, "audio_stream")
    }
}

/// Replies to `create` commands carry the new entity's id as the first
/// token of the message.
fn parse_created_id(reply: &CommandReply, entity: &'static str) -> Result<StreamId, RigError> {
    reply
        .message
        .split_whitespace()
        .next()
        .and_then(|token| token.parse::<StreamId>().ok())
        .ok_or_else(|| RigError::StateUnavailable {
            entity,
            id: reply.message.clone(),
        })
}

struct HandleWaiter {
    deadline: Instant,
    tx: oneshot::Sender<Result<ClientHandle, RigError>>,
}

struct SessionActor {
    shared: Arc<SessionShared>,
    control: ControlChannel,
    data: Option<DataChannel>,
    mailbox: mpsc::Receiver<SessionMsg>,
    pending: PendingTable,
    waiters: Vec<HandleWaiter>,
    seq: u32,
    keepalive: bool,
    ping_failures: u32,
}

async fn recv_data(data: &mut Option<DataChannel>) -> Option<Bytes> {
    match data {
        Some(channel) => channel.rx.recv().await,
        None => std::future::pending().await,
    }
}

impl SessionActor {
    async fn run(mut self) {
        let mut ping = tokio::time::interval(self.shared.config.ping_interval);
        ping.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let next_deadline = self
                .pending
                .next_deadline()
                .into_iter()
                .chain(self.waiters.iter().map(|w| w.deadline))
                .min()
                .unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

            tokio::select! {
                biased;

                msg = self.mailbox.recv() => match msg {
                    Some(msg) => self.handle_msg(msg),
                    None => {
                        // Every session handle dropped.
                        self.shutdown(SessionState::Closed, "session dropped");
                    }
                },

                line = self.control.rx.recv() => match line {
                    Some(line) => self.process_line(&line),
                    None => {
                        self.fail(RigError::Transport("control transport closed".to_string()));
                    }
                },

                dgram = recv_data(&mut self.data) => match dgram {
                    Some(bytes) => self.process_datagram(bytes),
                    None => {
                        debug!("data transport detached");
                        self.data = None;
                    }
                },

                _ = ping.tick() => {
                    if self.keepalive {
                        self.send_ping();
                    }
                }

                _ = sleep_until(next_deadline) => {
                    self.sweep_deadlines();
                }
            }

            if matches!(
                self.shared.get_state(),
                SessionState::Closed | SessionState::Failed
            ) {
                break;
            }
        }

        debug!("session reactor exiting");
    }

    fn handle_msg(&mut self, msg: SessionMsg) {
        match msg {
            SessionMsg::Command {
                text,
                timeout,
                patch,
                resync,
                reply_tx,
            } => {
                if let Some(patch) = patch {
                    let change = {
                        let mut store = self.shared.store.write().expect("store poisoned");
                        store.patch(patch.kind, &patch.id, &patch.attrs)
                    };
                    self.emit_changes(change.into_iter().collect());
                }
                match self.transmit(&text) {
                    Ok(seq) => {
                        self.pending.insert(
                            seq,
                            PendingCommand {
                                deadline: Instant::now() + timeout,
                                kind: PendingKind::User,
                                reply_tx: Some(reply_tx),
                                resync,
                            },
                        );
                    }
                    Err(err) => {
                        let _ = reply_tx.send(Err(err.clone()));
                        self.fail(err);
                    }
                }
            }
            SessionMsg::WaitHandle { timeout, tx } => {
                let known = *self.shared.handle.lock().expect("session handle poisoned");
                match known {
                    Some(handle) => {
                        let _ = tx.send(Ok(handle));
                    }
                    None => self.waiters.push(HandleWaiter {
                        deadline: Instant::now() + timeout,
                        tx,
                    }),
                }
            }
            SessionMsg::ApplyRadioAttrs { attrs } => {
                let changes = {
                    let mut store = self.shared.store.write().expect("store poisoned");
                    store.apply_radio_info(&attrs)
                };
                self.emit_changes(changes);
            }
            SessionMsg::AttachData { channel, done } => {
                self.data = Some(channel);
                let _ = done.send(());
            }
            SessionMsg::MarkReady { done } => {
                self.keepalive = true;
                self.shared.set_state(SessionState::Ready);
                self.shared
                    .events
                    .emit(SessionEvent::Progress(ConnectStage::Ready));
                self.shared.events.emit(SessionEvent::Ready);
                let _ = done.send(());
            }
            SessionMsg::Close { done } => {
                self.shutdown(SessionState::Closed, "closed");
                let _ = done.send(());
            }
        }
    }

    fn transmit(&mut self, text: &str) -> Result<u32, RigError> {
        self.seq = next_seq(self.seq);
        let line = format_command(self.seq, text);
        match self.control.tx.try_send(line) {
            Ok(()) => Ok(self.seq),
            Err(mpsc::error::TrySendError::Full(_)) => Err(RigError::TransportOverrun),
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(RigError::Transport("control transport closed".to_string()))
            }
        }
    }

    fn send_ping(&mut self) {
        match self.transmit("ping") {
            Ok(seq) => {
                self.pending.insert(
                    seq,
                    PendingCommand {
                        deadline: Instant::now() + self.shared.config.command_timeout,
                        kind: PendingKind::Ping,
                        reply_tx: None,
                        resync: None,
                    },
                );
            }
            Err(err) => self.fail(err),
        }
    }

    fn send_internal(&mut self, text: &str) {
        match self.transmit(text) {
            Ok(seq) => {
                self.pending.insert(
                    seq,
                    PendingCommand {
                        deadline: Instant::now() + self.shared.config.command_timeout,
                        kind: PendingKind::Internal,
                        reply_tx: None,
                        resync: None,
                    },
                );
            }
            Err(err) => self.fail(err),
        }
    }

    fn process_line(&mut self, line: &str) {
        self.shared
            .events
            .emit(SessionEvent::Message(line.to_string()));

        let parsed = match parse_line(line) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(%err, line, "discarding malformed control line");
                return;
            }
        };

        match parsed {
            InboundLine::Handle(handle) => {
                *self.shared.handle.lock().expect("session handle poisoned") = Some(handle);
                let changes = {
                    let mut store = self.shared.store.write().expect("store poisoned");
                    store.set_local_client_handle(handle)
                };
                self.shared.events.emit(SessionEvent::HandleAssigned(handle));
                self.emit_changes(changes);
                for waiter in self.waiters.drain(..) {
                    let _ = waiter.tx.send(Ok(handle));
                }
            }
            InboundLine::Version(version) => {
                let changes = {
                    let mut store = self.shared.store.write().expect("store poisoned");
                    store.apply_radio_info(&[("protocol_ver".to_string(), version)])
                };
                self.emit_changes(changes);
            }
            InboundLine::Reply(reply) => self.process_reply(reply),
            InboundLine::Status(status) => {
                let changes = {
                    let mut store = self.shared.store.write().expect("store poisoned");
                    store.apply(&status)
                };
                self.shared.events.emit(SessionEvent::Status(status));
                self.emit_changes(changes);
            }
            InboundLine::Notice(notice) => {
                self.shared.events.emit(SessionEvent::Notice {
                    code: notice.code,
                    text: notice.text,
                });
            }
        }
    }

    fn process_reply(&mut self, reply: rigproto::ReplyLine) {
        self.shared.events.emit(SessionEvent::Reply {
            seq: reply.seq,
            code: reply.code,
            message: reply.message.clone(),
        });

        let Some(entry) = self.pending.remove(reply.seq) else {
            debug!(seq = reply.seq, "discarding reply for unknown seq");
            return;
        };

        let accepted = ReplySeverity::from_code(reply.code).is_accepted();

        match entry.kind {
            PendingKind::Ping => {
                // Any reply to a ping proves liveness.
                self.ping_failures = 0;
            }
            PendingKind::Internal => {
                if !accepted {
                    debug!(
                        seq = reply.seq,
                        code = reply.code,
                        "internal command rejected"
                    );
                }
            }
            PendingKind::User => {
                if accepted {
                    let out = CommandReply {
                        seq: reply.seq,
                        code: reply.code,
                        message: reply.message,
                        description: rigproto::describe_reply_code(reply.code),
                    };
                    if let Some(tx) = entry.reply_tx {
                        let _ = tx.send(Ok(out));
                    }
                } else {
                    // Resync the touched entity so the store reverts to
                    // the authoritative state, then surface the rejection.
                    if let Some(resync) = entry.resync {
                        self.send_internal(&resync);
                    }
                    if let Some(tx) = entry.reply_tx {
                        let _ = tx.send(Err(RigError::rejected(reply.code, reply.message)));
                    }
                }
            }
        }
    }

    fn process_datagram(&mut self, bytes: Bytes) {
        match parse_datagram(bytes) {
            Ok(dgram) => {
                if let DatagramPayload::Meter(readings) = &dgram.payload {
                    let changes = {
                        let mut store = self.shared.store.write().expect("store poisoned");
                        store.update_meter_values(readings)
                    };
                    self.emit_changes(changes);
                } else {
                    self.shared.demux.ingest(dgram);
                }
            }
            Err(err) => {
                self.shared.demux.note_parse_error();
                warn!(%err, "discarding malformed datagram");
            }
        }
    }

    fn sweep_deadlines(&mut self) {
        let now = Instant::now();

        for (seq, entry) in self.pending.take_expired(now) {
            match entry.kind {
                PendingKind::Ping => {
                    self.ping_failures += 1;
                    warn!(
                        failures = self.ping_failures,
                        "keep-alive ping timed out"
                    );
                    if self.ping_failures >= self.shared.config.max_ping_failures {
                        self.fail(RigError::PingTimeout {
                            failures: self.ping_failures,
                        });
                        return;
                    }
                }
                PendingKind::Internal => {
                    debug!(seq, "internal command timed out");
                }
                PendingKind::User => {
                    trace!(seq, "command timed out");
                    if let Some(tx) = entry.reply_tx {
                        let _ = tx.send(Err(RigError::CommandTimeout));
                    }
                }
            }
        }

        let mut expired = Vec::new();
        self.waiters.retain_mut(|waiter| {
            if now >= waiter.deadline {
                expired.push(std::mem::replace(
                    &mut waiter.tx,
                    oneshot::channel().0,
                ));
                false
            } else {
                true
            }
        });
        for tx in expired {
            let _ = tx.send(Err(RigError::HandleTimeout));
        }
    }

    fn emit_changes(&self, changes: Vec<EntityChange>) {
        for change in changes {
            // Waterfall datagrams carry no line width; the demux gets it
            // from the entity's display geometry.
            if let EntityChange::Waterfall(record) = &change {
                if let Ok(stream) = record.id.parse::<StreamId>() {
                    match record.next.as_deref() {
                        Some(wf) if wf.width_px > 0 => {
                            let width = wf.width_px.min(u16::MAX as u32) as u16;
                            self.shared.demux.set_line_width(stream, width);
                        }
                        Some(_) => {}
                        None => self.shared.demux.clear_stream(stream),
                    }
                }
            }
            self.shared.events.emit(SessionEvent::Change(change));
        }
    }

    /// Unrecoverable failure: reject everything, emit `Disconnected`.
    fn fail(&mut self, err: RigError) {
        if matches!(
            self.shared.get_state(),
            SessionState::Closed | SessionState::Failed
        ) {
            return;
        }
        warn!(%err, "session failed");
        self.shared.set_state(SessionState::Failed);
        self.reject_outstanding();
        self.shared.events.emit(SessionEvent::Disconnected {
            reason: err.to_string(),
        });
    }

    fn shutdown(&mut self, state: SessionState, reason: &str) {
        if matches!(
            self.shared.get_state(),
            SessionState::Closed | SessionState::Failed
        ) {
            return;
        }
        self.shared.set_state(state);
        self.reject_outstanding();
        self.shared.events.emit(SessionEvent::Disconnected {
            reason: reason.to_string(),
        });
    }

    fn reject_outstanding(&mut self) {
        self.keepalive = false;
        for (_, entry) in self.pending.drain() {
            if let Some(tx) = entry.reply_tx {
                let _ = tx.send(Err(RigError::SessionClosed));
            }
        }
        for waiter in self.waiters.drain(..) {
            let _ = waiter.tx.send(Err(RigError::SessionClosed));
        }
    }
}
