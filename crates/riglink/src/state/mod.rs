//! The reactive radio state store.
//!
//! One store per session, owned by the session task (single writer). All
//! snapshots are immutable `Arc` records; readers hold them freely. A new
//! record is published only when the typed diff is non-empty; applying
//! the same frame twice is a no-op.
//!
//! Per entity the store owns a parser: a closed set of recognized
//! attributes, each converted with a declared parser. Unknown attributes
//! are retained in the entity's `raw` bag and logged once per key per
//! entity. A parse failure on one attribute skips that attribute only.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rigproto::datagram::MeterReading;
use rigproto::values::ValueError;
use rigproto::{ClientHandle, StatusMessage, StatusScope, StreamId};
use tracing::{trace, warn};

/// Outcome of applying one attribute to one entity.
#[derive(Debug, PartialEq)]
pub(crate) enum AttrOutcome {
    Changed(&'static str),
    Unchanged,
    Unknown,
    ParseError(ValueError),
}

/// Set a typed field from a parsed value, recording the field name when
/// the value actually differs.
macro_rules! set_attr {
    ($self:ident . $field:ident, $parsed:expr) => {
        match $parsed {
            Ok(v) => {
                if $self.$field == v {
                    crate::state::AttrOutcome::Unchanged
                } else {
                    $self.$field = v;
                    crate::state::AttrOutcome::Changed(stringify!($field))
                }
            }
            Err(e) => crate::state::AttrOutcome::ParseError(e),
        }
    };
}
pub(crate) use set_attr;

pub mod audio_stream;
pub mod change;
pub mod gui_client;
pub mod license;
pub mod meter;
pub mod panadapter;
pub mod radio;
pub mod slice;
pub mod waterfall;

pub use audio_stream::{AudioStream, AudioStreamType, StreamCompression};
pub use change::{ChangeRecord, EntityChange, EntityKind};
pub use gui_client::GuiClient;
pub use license::FeatureLicense;
pub use meter::{Meter, MeterSource};
pub use panadapter::Panadapter;
pub use radio::Radio;
pub use slice::Slice;
pub use waterfall::Waterfall;

pub(crate) fn ok_string(value: &str) -> Result<String, ValueError> {
    Ok(value.to_string())
}

pub(crate) fn ok_lower(value: &str) -> Result<String, ValueError> {
    Ok(value.to_ascii_lowercase())
}

pub(crate) fn parse_handle(value: &str) -> Result<ClientHandle, ValueError> {
    value
        .parse::<ClientHandle>()
        .map_err(|_| ValueError::InvalidHex(value.to_string()))
}

pub(crate) fn parse_stream_id(value: &str) -> Result<StreamId, ValueError> {
    value
        .parse::<StreamId>()
        .map_err(|_| ValueError::InvalidHex(value.to_string()))
}

/// Non-fatal parse accounting. Attribute errors never propagate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub attr_parse_errors: u64,
    pub frames_discarded: u64,
    pub unknown_attrs: u64,
}

/// A frozen view of the whole store.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    pub radio: Option<Arc<Radio>>,
    pub slices: HashMap<StreamId, Arc<Slice>>,
    pub panadapters: HashMap<StreamId, Arc<Panadapter>>,
    pub waterfalls: HashMap<StreamId, Arc<Waterfall>>,
    pub meters: HashMap<StreamId, Arc<Meter>>,
    pub audio_streams: HashMap<StreamId, Arc<AudioStream>>,
    pub gui_clients: HashMap<ClientHandle, Arc<GuiClient>>,
    pub licenses: HashMap<String, Arc<FeatureLicense>>,
    pub local_handle: Option<ClientHandle>,
}

/// Fold attributes into a cloned entity, collecting the typed diff and
/// the raw by-attribute diff.
fn fold_attrs<T>(
    kind: EntityKind,
    entity: &mut T,
    attrs: &[(String, String)],
    mut apply: impl FnMut(&mut T, &str, &str) -> AttrOutcome,
    warned: &mut HashSet<(EntityKind, String)>,
    stats: &mut StoreStats,
) -> (Vec<&'static str>, Vec<(String, String)>) {
    let mut changed = Vec::new();
    let mut raw = Vec::new();

    for (key, value) in attrs {
        if key == "removed" {
            continue;
        }
        raw.push((key.clone(), value.clone()));
        match apply(entity, key, value) {
            AttrOutcome::Changed(field) => changed.push(field),
            AttrOutcome::Unchanged => {}
            AttrOutcome::Unknown => {
                stats.unknown_attrs += 1;
                if warned.insert((kind, key.clone())) {
                    warn!(
                        entity = kind.as_str(),
                        key = key.as_str(),
                        "unrecognized status attribute"
                    );
                } else {
                    trace!(
                        entity = kind.as_str(),
                        key = key.as_str(),
                        "unrecognized status attribute"
                    );
                }
            }
            AttrOutcome::ParseError(err) => {
                stats.attr_parse_errors += 1;
                warn!(
                    entity = kind.as_str(),
                    key = key.as_str(),
                    value = value.as_str(),
                    %err,
                    "skipping unparseable attribute"
                );
            }
        }
    }

    (changed, raw)
}

fn owned_attrs(msg: &StatusMessage) -> Vec<(String, String)> {
    msg.attrs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Session-scoped store of every entity the radio reports.
#[derive(Default)]
pub struct RadioStore {
    radio: Option<Arc<Radio>>,
    slices: HashMap<StreamId, Arc<Slice>>,
    panadapters: HashMap<StreamId, Arc<Panadapter>>,
    waterfalls: HashMap<StreamId, Arc<Waterfall>>,
    meters: HashMap<StreamId, Arc<Meter>>,
    audio_streams: HashMap<StreamId, Arc<AudioStream>>,
    gui_clients: HashMap<ClientHandle, Arc<GuiClient>>,
    licenses: HashMap<String, Arc<FeatureLicense>>,
    local_handle: Option<ClientHandle>,
    warned_unknown: HashSet<(EntityKind, String)>,
    stats: StoreStats,
}

impl RadioStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- readers -------------------------------------------------------

    pub fn radio(&self) -> Option<Arc<Radio>> {
        self.radio.clone()
    }

    pub fn slice(&self, id: StreamId) -> Option<Arc<Slice>> {
        self.slices.get(&id).cloned()
    }

    pub fn slices(&self) -> Vec<(StreamId, Arc<Slice>)> {
        let mut all: Vec<_> = self.slices.iter().map(|(k, v)| (*k, v.clone())).collect();
        all.sort_by_key(|(id, _)| *id);
        all
    }

    pub fn panadapter(&self, id: StreamId) -> Option<Arc<Panadapter>> {
        self.panadapters.get(&id).cloned()
    }

    pub fn panadapters(&self) -> Vec<(StreamId, Arc<Panadapter>)> {
        let mut all: Vec<_> = self
            .panadapters
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect();
        all.sort_by_key(|(id, _)| *id);
        all
    }

    pub fn waterfall(&self, id: StreamId) -> Option<Arc<Waterfall>> {
        self.waterfalls.get(&id).cloned()
    }

    pub fn meter(&self, id: StreamId) -> Option<Arc<Meter>> {
        self.meters.get(&id).cloned()
    }

    pub fn meters(&self) -> Vec<(StreamId, Arc<Meter>)> {
        let mut all: Vec<_> = self.meters.iter().map(|(k, v)| (*k, v.clone())).collect();
        all.sort_by_key(|(id, _)| *id);
        all
    }

    /// Meters filtered by source and source index, e.g. one slice's meters.
    pub fn meters_for(&self, source: &MeterSource, index: u32) -> Vec<(StreamId, Arc<Meter>)> {
        self.meters()
            .into_iter()
            .filter(|(_, m)| m.source == *source && m.source_index == index)
            .collect()
    }

    pub fn audio_stream(&self, id: StreamId) -> Option<Arc<AudioStream>> {
        self.audio_streams.get(&id).cloned()
    }

    pub fn gui_client(&self, handle: ClientHandle) -> Option<Arc<GuiClient>> {
        self.gui_clients.get(&handle).cloned()
    }

    pub fn license(&self, feature: &str) -> Option<Arc<FeatureLicense>> {
        self.licenses.get(feature).cloned()
    }

    pub fn licenses(&self) -> Vec<(String, Arc<FeatureLicense>)> {
        let mut all: Vec<_> = self
            .licenses
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    pub fn local_handle(&self) -> Option<ClientHandle> {
        self.local_handle
    }

    pub fn stats(&self) -> StoreStats {
        self.stats
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            radio: self.radio.clone(),
            slices: self.slices.clone(),
            panadapters: self.panadapters.clone(),
            waterfalls: self.waterfalls.clone(),
            meters: self.meters.clone(),
            audio_streams: self.audio_streams.clone(),
            gui_clients: self.gui_clients.clone(),
            licenses: self.licenses.clone(),
            local_handle: self.local_handle,
        }
    }

    // ---- writers -------------------------------------------------------

    /// Fold one status frame into zero or more change records.
    pub fn apply(&mut self, msg: &StatusMessage) -> Vec<EntityChange> {
        match &msg.scope {
            StatusScope::Radio => self.apply_radio_msg(msg),
            StatusScope::Tx => self.apply_radio_prefixed(msg, "tx_"),
            StatusScope::Atu => self.apply_radio_prefixed(msg, "atu_"),
            StatusScope::Interlock => self.apply_radio_prefixed(msg, "interlock_"),
            StatusScope::Gps => self.apply_radio_prefixed(msg, "gps_"),
            StatusScope::Slice => self.apply_slice(msg),
            StatusScope::DisplayPan => self.apply_panadapter(msg),
            StatusScope::DisplayWaterfall => self.apply_waterfall(msg),
            StatusScope::Meter => self.apply_meter(msg),
            StatusScope::AudioStream => self.apply_audio_stream(msg),
            StatusScope::Client => self.apply_gui_client(msg),
            StatusScope::License => self.apply_license(msg),
            // Observed but not modeled; surfaced via the status event only.
            _ => Vec::new(),
        }
    }

    /// Optimistic local mutation through the same per-entity parsers as
    /// [`apply`]. Returns `None` when the entity does not exist or the
    /// typed diff is empty.
    pub fn patch(
        &mut self,
        kind: EntityKind,
        id: &str,
        attrs: &[(String, String)],
    ) -> Option<EntityChange> {
        match kind {
            EntityKind::Radio => self.apply_radio_attrs(attrs).into_iter().next(),
            EntityKind::Slice => {
                let id = id.parse::<StreamId>().ok()?;
                if !self.slices.contains_key(&id) {
                    return None;
                }
                self.upsert_slice(id, attrs).into_iter().next()
            }
            EntityKind::Panadapter => {
                let id = id.parse::<StreamId>().ok()?;
                if !self.panadapters.contains_key(&id) {
                    return None;
                }
                self.upsert_panadapter(id, attrs).into_iter().next()
            }
            EntityKind::Waterfall => {
                let id = id.parse::<StreamId>().ok()?;
                if !self.waterfalls.contains_key(&id) {
                    return None;
                }
                self.upsert_waterfall(id, attrs).into_iter().next()
            }
            EntityKind::AudioStream => {
                let id = id.parse::<StreamId>().ok()?;
                if !self.audio_streams.contains_key(&id) {
                    return None;
                }
                self.upsert_audio_stream(id, attrs).into_iter().next()
            }
            // Meters, clients, and licenses have no write path.
            _ => None,
        }
    }

    /// Record the session's own handle and recompute the ownership flag
    /// on every entity. Idempotent for the same handle.
    pub fn set_local_client_handle(&mut self, handle: ClientHandle) -> Vec<EntityChange> {
        self.local_handle = Some(handle);
        let mut changes = Vec::new();

        let slice_ids: Vec<StreamId> = self.slices.keys().copied().collect();
        for id in slice_ids {
            let current = self.slices[&id].clone();
            let owned = current.client_handle == handle;
            if current.is_owned_by_local_client != owned {
                let mut next = current.as_ref().clone();
                next.is_owned_by_local_client = owned;
                let next = Arc::new(next);
                self.slices.insert(id, next.clone());
                changes.push(EntityChange::Slice(ChangeRecord {
                    id: id.to_string(),
                    previous: Some(current),
                    next: Some(next),
                    changed: vec!["is_owned_by_local_client"],
                    raw: Vec::new(),
                    removed: false,
                }));
            }
        }

        let pan_ids: Vec<StreamId> = self.panadapters.keys().copied().collect();
        for id in pan_ids {
            let current = self.panadapters[&id].clone();
            let owned = current.client_handle == handle;
            if current.is_owned_by_local_client != owned {
                let mut next = current.as_ref().clone();
                next.is_owned_by_local_client = owned;
                let next = Arc::new(next);
                self.panadapters.insert(id, next.clone());
                changes.push(EntityChange::Panadapter(ChangeRecord {
                    id: id.to_string(),
                    previous: Some(current),
                    next: Some(next),
                    changed: vec!["is_owned_by_local_client"],
                    raw: Vec::new(),
                    removed: false,
                }));
            }
        }

        let wf_ids: Vec<StreamId> = self.waterfalls.keys().copied().collect();
        for id in wf_ids {
            let current = self.waterfalls[&id].clone();
            let owned = current.client_handle == handle;
            if current.is_owned_by_local_client != owned {
                let mut next = current.as_ref().clone();
                next.is_owned_by_local_client = owned;
                let next = Arc::new(next);
                self.waterfalls.insert(id, next.clone());
                changes.push(EntityChange::Waterfall(ChangeRecord {
                    id: id.to_string(),
                    previous: Some(current),
                    next: Some(next),
                    changed: vec!["is_owned_by_local_client"],
                    raw: Vec::new(),
                    removed: false,
                }));
            }
        }

        let stream_ids: Vec<StreamId> = self.audio_streams.keys().copied().collect();
        for id in stream_ids {
            let current = self.audio_streams[&id].clone();
            let owned = current.client_handle == handle;
            if current.is_owned_by_local_client != owned {
                let mut next = current.as_ref().clone();
                next.is_owned_by_local_client = owned;
                let next = Arc::new(next);
                self.audio_streams.insert(id, next.clone());
                changes.push(EntityChange::AudioStream(ChangeRecord {
                    id: id.to_string(),
                    previous: Some(current),
                    next: Some(next),
                    changed: vec!["is_owned_by_local_client"],
                    raw: Vec::new(),
                    removed: false,
                }));
            }
        }

        let client_handles: Vec<ClientHandle> = self.gui_clients.keys().copied().collect();
        for ch in client_handles {
            let current = self.gui_clients[&ch].clone();
            let local = ch == handle;
            if current.is_local_client != local {
                let mut next = current.as_ref().clone();
                next.is_local_client = local;
                let next = Arc::new(next);
                self.gui_clients.insert(ch, next.clone());
                changes.push(EntityChange::GuiClient(ChangeRecord {
                    id: ch.to_string(),
                    previous: Some(current),
                    next: Some(next),
                    changed: vec!["is_local_client"],
                    raw: Vec::new(),
                    removed: false,
                }));
            }
        }

        changes
    }

    /// Latest-sample meter updates from the data plane.
    pub fn update_meter_values(&mut self, readings: &[MeterReading]) -> Vec<EntityChange> {
        let mut changes = Vec::new();
        for reading in readings {
            let id = StreamId(reading.meter_id as u32);
            let Some(current) = self.meters.get(&id).cloned() else {
                // Values for meters we have no description of yet.
                continue;
            };
            let scaled = current.scale_raw_value(reading.value);
            if scaled == current.value {
                continue;
            }
            let mut next = current.as_ref().clone();
            next.value = scaled;
            let next = Arc::new(next);
            self.meters.insert(id, next.clone());
            changes.push(EntityChange::Meter(ChangeRecord {
                id: id.to_string(),
                previous: Some(current),
                next: Some(next),
                changed: vec!["value"],
                raw: Vec::new(),
                removed: false,
            }));
        }
        changes
    }

    /// Fold an `info`/`version` reply block into the radio singleton.
    pub fn apply_radio_info(&mut self, pairs: &[(String, String)]) -> Vec<EntityChange> {
        self.apply_radio_attrs(pairs)
    }

    // ---- per-scope application ----------------------------------------

    fn apply_radio_msg(&mut self, msg: &StatusMessage) -> Vec<EntityChange> {
        // Sub-scoped radio lines fold into prefixed keys so the radio
        // parser stays one closed set.
        let attrs: Vec<(String, String)> = match msg.positional(0) {
            Some("filter_sharpness") => {
                let mode = msg
                    .positional(1)
                    .map(|m| m.to_ascii_lowercase())
                    .unwrap_or_default();
                msg.attrs()
                    .map(|(k, v)| {
                        let key = match k {
                            "level" => format!("filter_sharpness_{mode}"),
                            "auto_level" => format!("filter_sharpness_{mode}_auto"),
                            other => format!("filter_sharpness_{mode}_{other}"),
                        };
                        (key, v.to_string())
                    })
                    .collect()
            }
            Some("oscillator") => msg
                .attrs()
                .map(|(k, v)| (format!("oscillator_{k}"), v.to_string()))
                .collect(),
            _ => owned_attrs(msg),
        };
        self.apply_radio_attrs(&attrs)
    }

    fn apply_radio_prefixed(&mut self, msg: &StatusMessage, prefix: &str) -> Vec<EntityChange> {
        let attrs: Vec<(String, String)> = msg
            .attrs()
            .map(|(k, v)| {
                let key = if k.starts_with(prefix) {
                    k.to_string()
                } else {
                    format!("{prefix}{k}")
                };
                (key, v.to_string())
            })
            .collect();
        self.apply_radio_attrs(&attrs)
    }

    fn apply_radio_attrs(&mut self, attrs: &[(String, String)]) -> Vec<EntityChange> {
        let previous = self.radio.clone();
        let is_new = previous.is_none();
        let mut next = previous
            .as_ref()
            .map(|r| r.as_ref().clone())
            .unwrap_or_default();

        let (changed, raw) = fold_attrs(
            EntityKind::Radio,
            &mut next,
            attrs,
            |radio, k, v| radio.apply_attr(k, v),
            &mut self.warned_unknown,
            &mut self.stats,
        );

        if is_new || !changed.is_empty() {
            let next = Arc::new(next);
            self.radio = Some(next.clone());
            vec![EntityChange::Radio(ChangeRecord {
                id: "radio".to_string(),
                previous,
                next: Some(next),
                changed,
                raw,
                removed: false,
            })]
        } else {
            if previous.as_deref() != Some(&next) {
                // raw-bag only; swap without publishing
                self.radio = Some(Arc::new(next));
            }
            Vec::new()
        }
    }

    fn entity_id(&mut self, msg: &StatusMessage) -> Option<StreamId> {
        match msg.positional(0).map(|p| p.parse::<StreamId>()) {
            Some(Ok(id)) => Some(id),
            _ => {
                self.stats.frames_discarded += 1;
                warn!(scope = msg.scope.as_str(), "status frame without a parseable id");
                None
            }
        }
    }

    fn apply_slice(&mut self, msg: &StatusMessage) -> Vec<EntityChange> {
        let Some(id) = self.entity_id(msg) else {
            return Vec::new();
        };
        if msg.is_removal() {
            return self.remove_slice(id);
        }
        self.upsert_slice(id, &owned_attrs(msg))
    }

    fn upsert_slice(&mut self, id: StreamId, attrs: &[(String, String)]) -> Vec<EntityChange> {
        let previous = self.slices.get(&id).cloned();
        let is_new = previous.is_none();
        let mut next = previous
            .as_ref()
            .map(|s| s.as_ref().clone())
            .unwrap_or_default();

        let (mut changed, raw) = fold_attrs(
            EntityKind::Slice,
            &mut next,
            attrs,
            |slice, k, v| slice.apply_attr(k, v),
            &mut self.warned_unknown,
            &mut self.stats,
        );

        let owned = self.local_handle == Some(next.client_handle);
        if next.is_owned_by_local_client != owned {
            next.is_owned_by_local_client = owned;
            changed.push("is_owned_by_local_client");
        }

        if is_new || !changed.is_empty() {
            let next = Arc::new(next);
            self.slices.insert(id, next.clone());
            vec![EntityChange::Slice(ChangeRecord {
                id: id.to_string(),
                previous,
                next: Some(next),
                changed,
                raw,
                removed: false,
            })]
        } else {
            if previous.as_deref() != Some(&next) {
                self.slices.insert(id, Arc::new(next));
            }
            Vec::new()
        }
    }

    fn remove_slice(&mut self, id: StreamId) -> Vec<EntityChange> {
        let Some(previous) = self.slices.remove(&id) else {
            return Vec::new();
        };
        let mut changes = vec![EntityChange::Slice(ChangeRecord {
            id: id.to_string(),
            previous: Some(previous.clone()),
            next: None,
            changed: Vec::new(),
            raw: Vec::new(),
            removed: true,
        })];

        // Removing a diversity parent may not leave an orphaned child at
        // any step; clear the pairing in the same batch.
        if previous.diversity_parent {
            let orphan = self.slices.iter().find_map(|(sid, s)| {
                (s.diversity_child && s.diversity_index == previous.diversity_index)
                    .then(|| (*sid, s.clone()))
            });
            if let Some((child_id, child)) = orphan {
                let mut next = child.as_ref().clone();
                next.diversity_child = false;
                let next = Arc::new(next);
                self.slices.insert(child_id, next.clone());
                changes.push(EntityChange::Slice(ChangeRecord {
                    id: child_id.to_string(),
                    previous: Some(child),
                    next: Some(next),
                    changed: vec!["diversity_child"],
                    raw: Vec::new(),
                    removed: false,
                }));
            }
        }

        changes
    }

    fn apply_panadapter(&mut self, msg: &StatusMessage) -> Vec<EntityChange> {
        let Some(id) = self.entity_id(msg) else {
            return Vec::new();
        };
        if msg.is_removal() {
            return self.remove_panadapter(id);
        }
        self.upsert_panadapter(id, &owned_attrs(msg))
    }

    fn upsert_panadapter(&mut self, id: StreamId, attrs: &[(String, String)]) -> Vec<EntityChange> {
        let previous = self.panadapters.get(&id).cloned();
        let is_new = previous.is_none();
        let mut next = previous
            .as_ref()
            .map(|p| p.as_ref().clone())
            .unwrap_or_default();

        let (mut changed, raw) = fold_attrs(
            EntityKind::Panadapter,
            &mut next,
            attrs,
            |pan, k, v| pan.apply_attr(k, v),
            &mut self.warned_unknown,
            &mut self.stats,
        );

        let owned = self.local_handle == Some(next.client_handle);
        if next.is_owned_by_local_client != owned {
            next.is_owned_by_local_client = owned;
            changed.push("is_owned_by_local_client");
        }

        if is_new || !changed.is_empty() {
            let next = Arc::new(next);
            self.panadapters.insert(id, next.clone());
            vec![EntityChange::Panadapter(ChangeRecord {
                id: id.to_string(),
                previous,
                next: Some(next),
                changed,
                raw,
                removed: false,
            })]
        } else {
            if previous.as_deref() != Some(&next) {
                self.panadapters.insert(id, Arc::new(next));
            }
            Vec::new()
        }
    }

    fn remove_panadapter(&mut self, id: StreamId) -> Vec<EntityChange> {
        let Some(previous) = self.panadapters.remove(&id) else {
            return Vec::new();
        };
        let mut changes = vec![EntityChange::Panadapter(ChangeRecord {
            id: id.to_string(),
            previous: Some(previous.clone()),
            next: None,
            changed: Vec::new(),
            raw: Vec::new(),
            removed: true,
        })];

        // The companion waterfall goes in the same batch so the pairing
        // invariant holds at every step.
        let wf_id = previous.waterfall_stream_id;
        if let Some(wf) = self.waterfalls.remove(&wf_id) {
            changes.push(EntityChange::Waterfall(ChangeRecord {
                id: wf_id.to_string(),
                previous: Some(wf),
                next: None,
                changed: Vec::new(),
                raw: Vec::new(),
                removed: true,
            }));
        }

        changes
    }

    fn apply_waterfall(&mut self, msg: &StatusMessage) -> Vec<EntityChange> {
        let Some(id) = self.entity_id(msg) else {
            return Vec::new();
        };
        if msg.is_removal() {
            let Some(previous) = self.waterfalls.remove(&id) else {
                return Vec::new();
            };
            return vec![EntityChange::Waterfall(ChangeRecord {
                id: id.to_string(),
                previous: Some(previous),
                next: None,
                changed: Vec::new(),
                raw: Vec::new(),
                removed: true,
            })];
        }
        self.upsert_waterfall(id, &owned_attrs(msg))
    }

    fn upsert_waterfall(&mut self, id: StreamId, attrs: &[(String, String)]) -> Vec<EntityChange> {
        let previous = self.waterfalls.get(&id).cloned();
        let is_new = previous.is_none();
        let mut next = previous
            .as_ref()
            .map(|w| w.as_ref().clone())
            .unwrap_or_default();

        let (mut changed, raw) = fold_attrs(
            EntityKind::Waterfall,
            &mut next,
            attrs,
            |wf, k, v| wf.apply_attr(k, v),
            &mut self.warned_unknown,
            &mut self.stats,
        );

        let owned = self.local_handle == Some(next.client_handle);
        if next.is_owned_by_local_client != owned {
            next.is_owned_by_local_client = owned;
            changed.push("is_owned_by_local_client");
        }

        if is_new || !changed.is_empty() {
            let next = Arc::new(next);
            self.waterfalls.insert(id, next.clone());
            vec![EntityChange::Waterfall(ChangeRecord {
                id: id.to_string(),
                previous,
                next: Some(next),
                changed,
                raw,
                removed: false,
            })]
        } else {
            if previous.as_deref() != Some(&next) {
                self.waterfalls.insert(id, Arc::new(next));
            }
            Vec::new()
        }
    }

    fn apply_meter(&mut self, msg: &StatusMessage) -> Vec<EntityChange> {
        let Some(id) = self.entity_id(msg) else {
            return Vec::new();
        };
        if msg.is_removal() {
            let Some(previous) = self.meters.remove(&id) else {
                return Vec::new();
            };
            return vec![EntityChange::Meter(ChangeRecord {
                id: id.to_string(),
                previous: Some(previous),
                next: None,
                changed: Vec::new(),
                raw: Vec::new(),
                removed: true,
            })];
        }

        let previous = self.meters.get(&id).cloned();
        let is_new = previous.is_none();
        let mut next = previous
            .as_ref()
            .map(|m| m.as_ref().clone())
            .unwrap_or_default();

        let (changed, raw) = fold_attrs(
            EntityKind::Meter,
            &mut next,
            &owned_attrs(msg),
            |meter, k, v| meter.apply_attr(k, v),
            &mut self.warned_unknown,
            &mut self.stats,
        );

        if is_new || !changed.is_empty() {
            let next = Arc::new(next);
            self.meters.insert(id, next.clone());
            vec![EntityChange::Meter(ChangeRecord {
                id: id.to_string(),
                previous,
                next: Some(next),
                changed,
                raw,
                removed: false,
            })]
        } else {
            if previous.as_deref() != Some(&next) {
                self.meters.insert(id, Arc::new(next));
            }
            Vec::new()
        }
    }

    fn apply_audio_stream(&mut self, msg: &StatusMessage) -> Vec<EntityChange> {
        let Some(id) = self.entity_id(msg) else {
            return Vec::new();
        };
        if msg.is_removal() {
            let Some(previous) = self.audio_streams.remove(&id) else {
                return Vec::new();
            };
            return vec![EntityChange::AudioStream(ChangeRecord {
                id: id.to_string(),
                previous: Some(previous),
                next: None,
                changed: Vec::new(),
                raw: Vec::new(),
                removed: true,
            })];
        }
        self.upsert_audio_stream(id, &owned_attrs(msg))
    }

    fn upsert_audio_stream(
        &mut self,
        id: StreamId,
        attrs: &[(String, String)],
    ) -> Vec<EntityChange> {
        let previous = self.audio_streams.get(&id).cloned();
        let is_new = previous.is_none();
        let mut next = previous
            .as_ref()
            .map(|s| s.as_ref().clone())
            .unwrap_or_default();

        let (mut changed, raw) = fold_attrs(
            EntityKind::AudioStream,
            &mut next,
            attrs,
            |stream, k, v| stream.apply_attr(k, v),
            &mut self.warned_unknown,
            &mut self.stats,
        );

        let owned = self.local_handle == Some(next.client_handle);
        if next.is_owned_by_local_client != owned {
            next.is_owned_by_local_client = owned;
            changed.push("is_owned_by_local_client");
        }

        if is_new || !changed.is_empty() {
            let next = Arc::new(next);
            self.audio_streams.insert(id, next.clone());
            vec![EntityChange::AudioStream(ChangeRecord {
                id: id.to_string(),
                previous,
                next: Some(next),
                changed,
                raw,
                removed: false,
            })]
        } else {
            if previous.as_deref() != Some(&next) {
                self.audio_streams.insert(id, Arc::new(next));
            }
            Vec::new()
        }
    }

    fn apply_gui_client(&mut self, msg: &StatusMessage) -> Vec<EntityChange> {
        let Some(handle) = msg
            .positional(0)
            .and_then(|p| p.parse::<ClientHandle>().ok())
        else {
            self.stats.frames_discarded += 1;
            warn!("client status without a parseable handle");
            return Vec::new();
        };

        let disconnected = msg.positional(1) == Some("disconnected") || msg.is_removal();
        if disconnected {
            let Some(previous) = self.gui_clients.remove(&handle) else {
                return Vec::new();
            };
            return vec![EntityChange::GuiClient(ChangeRecord {
                id: handle.to_string(),
                previous: Some(previous),
                next: None,
                changed: Vec::new(),
                raw: Vec::new(),
                removed: true,
            })];
        }

        let previous = self.gui_clients.get(&handle).cloned();
        let is_new = previous.is_none();
        let mut next = previous
            .as_ref()
            .map(|c| c.as_ref().clone())
            .unwrap_or_default();

        let (mut changed, raw) = fold_attrs(
            EntityKind::GuiClient,
            &mut next,
            &owned_attrs(msg),
            |client, k, v| client.apply_attr(k, v),
            &mut self.warned_unknown,
            &mut self.stats,
        );

        let local = self.local_handle == Some(handle);
        if next.is_local_client != local {
            next.is_local_client = local;
            changed.push("is_local_client");
        }

        if is_new || !changed.is_empty() {
            let next = Arc::new(next);
            self.gui_clients.insert(handle, next.clone());
            vec![EntityChange::GuiClient(ChangeRecord {
                id: handle.to_string(),
                previous,
                next: Some(next),
                changed,
                raw,
                removed: false,
            })]
        } else {
            if previous.as_deref() != Some(&next) {
                self.gui_clients.insert(handle, Arc::new(next));
            }
            Vec::new()
        }
    }

    fn apply_license(&mut self, msg: &StatusMessage) -> Vec<EntityChange> {
        let Some(feature) = msg
            .attr("feature")
            .map(str::to_string)
            .or_else(|| msg.positional(0).map(str::to_string))
        else {
            self.stats.frames_discarded += 1;
            warn!("license status without a feature name");
            return Vec::new();
        };

        if msg.is_removal() {
            let Some(previous) = self.licenses.remove(&feature) else {
                return Vec::new();
            };
            return vec![EntityChange::License(ChangeRecord {
                id: feature,
                previous: Some(previous),
                next: None,
                changed: Vec::new(),
                raw: Vec::new(),
                removed: true,
            })];
        }

        let previous = self.licenses.get(&feature).cloned();
        let is_new = previous.is_none();
        let mut next = previous
            .as_ref()
            .map(|l| l.as_ref().clone())
            .unwrap_or_default();

        let attrs: Vec<(String, String)> = msg
            .attrs()
            .filter(|(k, _)| *k != "feature")
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let (changed, raw) = fold_attrs(
            EntityKind::License,
            &mut next,
            &attrs,
            |lic, k, v| lic.apply_attr(k, v),
            &mut self.warned_unknown,
            &mut self.stats,
        );

        if is_new || !changed.is_empty() {
            let next = Arc::new(next);
            self.licenses.insert(feature.clone(), next.clone());
            vec![EntityChange::License(ChangeRecord {
                id: feature,
                previous,
                next: Some(next),
                changed,
                raw,
                removed: false,
            })]
        } else {
            if previous.as_deref() != Some(&next) {
                self.licenses.insert(feature, Arc::new(next));
            }
            Vec::new()
        }
    }

    // ---- invariants ----------------------------------------------------

    /// Check the cross-entity invariants; returns violation descriptions.
    pub fn check_invariants(&self) -> Vec<String> {
        let mut violations = Vec::new();

        for (id, slice) in &self.slices {
            if slice.diversity_child {
                let parents = self
                    .slices
                    .values()
                    .filter(|p| p.diversity_parent && p.diversity_index == slice.diversity_index)
                    .count();
                if parents != 1 {
                    violations.push(format!(
                        "slice {id} is a diversity child with {parents} parents at index {}",
                        slice.diversity_index
                    ));
                }
            }
            for (name, level) in [
                ("audio_gain", slice.audio_gain),
                ("agc_threshold", slice.agc_threshold),
                ("anf_level", slice.anf_level),
                ("apf_level", slice.apf_level),
                ("wnb_level", slice.wnb_level),
                ("nb_level", slice.nb_level),
                ("nr_level", slice.nr_level),
                ("rnn_level", slice.rnn_level),
                ("esc_level", slice.esc_level),
            ] {
                if !(0..=100).contains(&level) {
                    violations.push(format!("slice {id} {name} {level} outside 0..=100"));
                }
            }
        }

        for (id, pan) in &self.panadapters {
            let wf = pan.waterfall_stream_id;
            if wf != StreamId(0) && !self.waterfalls.contains_key(&wf) {
                violations.push(format!("panadapter {id} references missing waterfall {wf}"));
            }
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rigproto::{parse_line, InboundLine};

    fn status(line: &str) -> StatusMessage {
        match parse_line(line).unwrap() {
            InboundLine::Status(msg) => msg,
            other => panic!("expected status, got {other:?}"),
        }
    }

    #[test]
    fn slice_creation_publishes_one_change() {
        let mut store = RadioStore::new();
        let changes = store.apply(&status(
            "S0x1234|slice 0x00000001 RF_frequency=14.250000 mode=USB filter_lo=100 filter_hi=2800",
        ));
        assert_eq!(changes.len(), 1);
        assert!(matches!(&changes[0], EntityChange::Slice(c) if c.is_creation()));

        let slice = store.slice(StreamId(1)).unwrap();
        assert_eq!(slice.frequency_mhz, 14.25);
        assert_eq!(slice.mode, "usb");
        assert_eq!(slice.filter_low_hz, 100);
    }

    #[test]
    fn apply_is_idempotent() {
        let mut store = RadioStore::new();
        let frame = status("S0x1234|slice 0x00000001 RF_frequency=14.250000 mode=USB");
        assert_eq!(store.apply(&frame).len(), 1);
        assert!(store.apply(&frame).is_empty());
        assert!(store.apply(&frame).is_empty());
    }

    #[test]
    fn snapshot_identity_changes_only_with_content() {
        let mut store = RadioStore::new();
        store.apply(&status("S0x1234|slice 0x00000001 mode=USB"));
        let before = store.slice(StreamId(1)).unwrap();
        store.apply(&status("S0x1234|slice 0x00000001 mode=USB"));
        let after = store.slice(StreamId(1)).unwrap();
        assert!(Arc::ptr_eq(&before, &after));

        store.apply(&status("S0x1234|slice 0x00000001 mode=CW"));
        let changed = store.slice(StreamId(1)).unwrap();
        assert!(!Arc::ptr_eq(&before, &changed));
    }

    #[test]
    fn removal_emits_removed_change() {
        let mut store = RadioStore::new();
        store.apply(&status("S0x1234|slice 0x00000001 mode=USB"));
        let changes = store.apply(&status("S0x1234|slice 0x00000001 removed=1"));
        assert_eq!(changes.len(), 1);
        assert!(changes[0].is_removal());
        match &changes[0] {
            EntityChange::Slice(c) => {
                assert!(c.previous.is_some());
                assert!(c.next.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(store.slice(StreamId(1)).is_none());
    }

    #[test]
    fn diversity_parent_removal_clears_child_in_same_batch() {
        let mut store = RadioStore::new();
        store.apply(&status(
            "S0x1234|slice 0x00000002 diversity_parent=1 diversity_index=5",
        ));
        store.apply(&status(
            "S0x1234|slice 0x00000003 diversity_child=1 diversity_index=5",
        ));
        assert!(store.check_invariants().is_empty());

        let changes = store.apply(&status("S0x1234|slice 0x00000002 removed=1"));
        assert_eq!(changes.len(), 2);
        assert!(changes[0].is_removal());
        assert_eq!(changes[1].changed(), &["diversity_child"]);
        assert!(!store.slice(StreamId(3)).unwrap().diversity_child);
        assert!(store.check_invariants().is_empty());
    }

    #[test]
    fn panadapter_removal_takes_companion_waterfall() {
        let mut store = RadioStore::new();
        store.apply(&status(
            "S0x1234|display pan 0x40000000 center=14.100000 waterfall=0x42000000",
        ));
        store.apply(&status(
            "S0x1234|display waterfall 0x42000000 panadapter=0x40000000 line_duration=100",
        ));
        assert!(store.check_invariants().is_empty());

        let changes = store.apply(&status("S0x1234|display pan 0x40000000 removed=1"));
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|c| c.is_removal()));
        assert!(store.panadapter(StreamId(0x40000000)).is_none());
        assert!(store.waterfall(StreamId(0x42000000)).is_none());
    }

    #[test]
    fn missing_waterfall_is_an_invariant_violation() {
        let mut store = RadioStore::new();
        store.apply(&status(
            "S0x1234|display pan 0x40000000 waterfall=0x42000000",
        ));
        let violations = store.check_invariants();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("missing waterfall"));
    }

    #[test]
    fn set_local_client_handle_flips_ownership_and_is_idempotent() {
        let mut store = RadioStore::new();
        store.apply(&status(
            "S0x1234|slice 0x00000001 client_handle=0xABCD1234 mode=USB",
        ));
        assert!(!store.slice(StreamId(1)).unwrap().is_owned_by_local_client);

        let changes = store.set_local_client_handle(ClientHandle(0xABCD1234));
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].changed(), &["is_owned_by_local_client"]);
        assert!(store.slice(StreamId(1)).unwrap().is_owned_by_local_client);

        // idempotent for the same handle
        assert!(store
            .set_local_client_handle(ClientHandle(0xABCD1234))
            .is_empty());
    }

    #[test]
    fn ownership_computed_for_late_entities() {
        let mut store = RadioStore::new();
        store.set_local_client_handle(ClientHandle(0xABCD1234));
        let changes = store.apply(&status(
            "S0x1234|slice 0x00000001 client_handle=0xABCD1234",
        ));
        assert_eq!(changes.len(), 1);
        assert!(store.slice(StreamId(1)).unwrap().is_owned_by_local_client);
    }

    #[test]
    fn bad_attribute_does_not_drop_frame() {
        let mut store = RadioStore::new();
        let changes = store.apply(&status(
            "S0x1234|slice 0x00000001 RF_frequency=bogus mode=USB",
        ));
        assert_eq!(changes.len(), 1);
        let slice = store.slice(StreamId(1)).unwrap();
        assert_eq!(slice.frequency_mhz, 0.0);
        assert_eq!(slice.mode, "usb");
        assert_eq!(store.stats().attr_parse_errors, 1);
    }

    #[test]
    fn meter_lifecycle_and_value_updates() {
        let mut store = RadioStore::new();
        store.apply(&status(
            "S0x1234|meter 0x00000005 src=SLC num=0 nam=LEVEL unit=dBm low=-150.0 hi=20.0 fps=10",
        ));

        let changes = store.update_meter_values(&[MeterReading {
            meter_id: 5,
            value: -9344,
        }]);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].changed(), &["value"]);
        assert_eq!(store.meter(StreamId(5)).unwrap().value, -73.0);

        // same raw value: latest-only, no new change
        assert!(store
            .update_meter_values(&[MeterReading {
                meter_id: 5,
                value: -9344,
            }])
            .is_empty());

        // values for undescribed meters are ignored
        assert!(store
            .update_meter_values(&[MeterReading {
                meter_id: 99,
                value: 1,
            }])
            .is_empty());
    }

    #[test]
    fn patch_goes_through_the_same_parser() {
        let mut store = RadioStore::new();
        store.apply(&status("S0x1234|slice 0x00000001 filter_lo=100"));

        let change = store.patch(
            EntityKind::Slice,
            "0x00000001",
            &[("filter_lo".to_string(), "-999999".to_string())],
        );
        assert!(change.is_some());
        assert_eq!(store.slice(StreamId(1)).unwrap().filter_low_hz, -999999);

        // patching an absent entity is a no-op
        assert!(store
            .patch(
                EntityKind::Slice,
                "0x00000009",
                &[("filter_lo".to_string(), "0".to_string())],
            )
            .is_none());
    }

    #[test]
    fn unmodeled_scope_yields_no_changes() {
        let mut store = RadioStore::new();
        assert!(store
            .apply(&status("S0x1234|cwx wpm=25 delay=100"))
            .is_empty());
    }

    #[test]
    fn gui_client_connect_and_disconnect() {
        let mut store = RadioStore::new();
        store.set_local_client_handle(ClientHandle(0xAA));
        let changes = store.apply(&status(
            "S0x1234|client 0x000000AA connected program=PanPilot station=Shack\x7fMac",
        ));
        assert_eq!(changes.len(), 1);
        let client = store.gui_client(ClientHandle(0xAA)).unwrap();
        assert!(client.is_local_client);
        assert_eq!(client.station, "Shack Mac");

        let changes = store.apply(&status("S0x1234|client 0x000000AA disconnected"));
        assert_eq!(changes.len(), 1);
        assert!(changes[0].is_removal());
        assert!(store.gui_client(ClientHandle(0xAA)).is_none());
    }

    #[test]
    fn license_map() {
        let mut store = RadioStore::new();
        let changes = store.apply(&status(
            "S0x1234|license feature=transmit enabled=1 expires=2027-01-31",
        ));
        assert_eq!(changes.len(), 1);
        let lic = store.license("transmit").unwrap();
        assert!(lic.enabled);
        assert_eq!(lic.expires_at.as_deref(), Some("2027-01-31"));
    }

    #[test]
    fn radio_scope_folds_tx_and_gps() {
        let mut store = RadioStore::new();
        store.apply(&status("S0x1234|radio slices=4 panadapters=4"));
        store.apply(&status("S0x1234|tx rfpower=75 filter_low=100 filter_high=2900"));
        store.apply(&status("S0x1234|gps grid=EN35 lat=44.98"));
        store.apply(&status("S0x1234|interlock state=READY timeout=120000"));

        let radio = store.radio().unwrap();
        assert_eq!(radio.max_slices, 4);
        assert_eq!(radio.tx_rf_power, 75);
        assert_eq!(radio.tx_filter_low_hz, 100);
        assert_eq!(radio.gps_grid, "EN35");
        assert_eq!(radio.interlock_state, "ready");
        assert_eq!(radio.interlock_timeout_ms, 120_000);
    }

    #[test]
    fn radio_filter_sharpness_submode() {
        let mut store = RadioStore::new();
        store.apply(&status(
            "S0x1234|radio filter_sharpness VOICE level=2 auto_level=1",
        ));
        let radio = store.radio().unwrap();
        assert_eq!(radio.filter_sharpness_voice, 2);
        assert!(radio.filter_sharpness_voice_auto);
    }

    #[test]
    fn snapshots_serialize_for_hosts() {
        let mut store = RadioStore::new();
        store.apply(&status(
            "S0x1234|slice 0x00000001 RF_frequency=14.250000 mode=USB filter_lo=100",
        ));
        let slice = store.slice(StreamId(1)).unwrap();
        let json = serde_json::to_value(slice.as_ref()).unwrap();
        assert_eq!(json["frequency_mhz"], 14.25);
        assert_eq!(json["mode"], "usb");
        assert_eq!(json["filter_low_hz"], 100);
    }

    #[test]
    fn unknown_attrs_do_not_publish_but_are_kept() {
        let mut store = RadioStore::new();
        store.apply(&status("S0x1234|slice 0x00000001 mode=USB"));
        // unknown-only frame: no typed diff, no change record
        let changes = store.apply(&status("S0x1234|slice 0x00000001 future_knob=7"));
        assert!(changes.is_empty());
        let slice = store.slice(StreamId(1)).unwrap();
        assert_eq!(slice.raw.get("future_knob").map(String::as_str), Some("7"));
        assert_eq!(store.stats().unknown_attrs, 1);
    }
}
