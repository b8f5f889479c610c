//! Atomic change records.
//!
//! Every store mutation - status frame, optimistic patch, handle
//! assignment - yields zero or more of these. Snapshots are `Arc`-frozen;
//! a record shares the previous and next snapshot read-only with every
//! subscriber.

use std::sync::Arc;

use serde::Serialize;

use crate::state::audio_stream::AudioStream;
use crate::state::gui_client::GuiClient;
use crate::state::license::FeatureLicense;
use crate::state::meter::Meter;
use crate::state::panadapter::Panadapter;
use crate::state::radio::Radio;
use crate::state::slice::Slice;
use crate::state::waterfall::Waterfall;

/// The entity families the store models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Radio,
    Slice,
    Panadapter,
    Waterfall,
    Meter,
    AudioStream,
    GuiClient,
    License,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Radio => "radio",
            EntityKind::Slice => "slice",
            EntityKind::Panadapter => "panadapter",
            EntityKind::Waterfall => "waterfall",
            EntityKind::Meter => "meter",
            EntityKind::AudioStream => "audio_stream",
            EntityKind::GuiClient => "gui_client",
            EntityKind::License => "license",
        }
    }
}

/// One atomic change to one entity.
///
/// `changed` names the typed fields that differ between `previous` and
/// `next`; `raw` is the by-attribute diff exactly as received. A removal
/// has `next == None` and `removed == true`.
#[derive(Debug, Clone)]
pub struct ChangeRecord<T> {
    /// Canonical string id (`0x`-prefixed hex, or the feature name for
    /// licenses).
    pub id: String,
    pub previous: Option<Arc<T>>,
    pub next: Option<Arc<T>>,
    pub changed: Vec<&'static str>,
    pub raw: Vec<(String, String)>,
    pub removed: bool,
}

impl<T> ChangeRecord<T> {
    pub fn is_creation(&self) -> bool {
        self.previous.is_none() && self.next.is_some()
    }
}

/// A change record, tagged by entity kind.
#[derive(Debug, Clone)]
pub enum EntityChange {
    Radio(ChangeRecord<Radio>),
    Slice(ChangeRecord<Slice>),
    Panadapter(ChangeRecord<Panadapter>),
    Waterfall(ChangeRecord<Waterfall>),
    Meter(ChangeRecord<Meter>),
    AudioStream(ChangeRecord<AudioStream>),
    GuiClient(ChangeRecord<GuiClient>),
    License(ChangeRecord<FeatureLicense>),
}

impl EntityChange {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityChange::Radio(_) => EntityKind::Radio,
            EntityChange::Slice(_) => EntityKind::Slice,
            EntityChange::Panadapter(_) => EntityKind::Panadapter,
            EntityChange::Waterfall(_) => EntityKind::Waterfall,
            EntityChange::Meter(_) => EntityKind::Meter,
            EntityChange::AudioStream(_) => EntityKind::AudioStream,
            EntityChange::GuiClient(_) => EntityKind::GuiClient,
            EntityChange::License(_) => EntityKind::License,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            EntityChange::Radio(c) => &c.id,
            EntityChange::Slice(c) => &c.id,
            EntityChange::Panadapter(c) => &c.id,
            EntityChange::Waterfall(c) => &c.id,
            EntityChange::Meter(c) => &c.id,
            EntityChange::AudioStream(c) => &c.id,
            EntityChange::GuiClient(c) => &c.id,
            EntityChange::License(c) => &c.id,
        }
    }

    pub fn is_removal(&self) -> bool {
        match self {
            EntityChange::Radio(c) => c.removed,
            EntityChange::Slice(c) => c.removed,
            EntityChange::Panadapter(c) => c.removed,
            EntityChange::Waterfall(c) => c.removed,
            EntityChange::Meter(c) => c.removed,
            EntityChange::AudioStream(c) => c.removed,
            EntityChange::GuiClient(c) => c.removed,
            EntityChange::License(c) => c.removed,
        }
    }

    /// Typed field names that changed.
    pub fn changed(&self) -> &[&'static str] {
        match self {
            EntityChange::Radio(c) => &c.changed,
            EntityChange::Slice(c) => &c.changed,
            EntityChange::Panadapter(c) => &c.changed,
            EntityChange::Waterfall(c) => &c.changed,
            EntityChange::Meter(c) => &c.changed,
            EntityChange::AudioStream(c) => &c.changed,
            EntityChange::GuiClient(c) => &c.changed,
            EntityChange::License(c) => &c.changed,
        }
    }
}
