//! GUI client snapshots: remote UIs attached to the same radio.

use std::collections::BTreeMap;

use serde::Serialize;

use super::{ok_string, set_attr, AttrOutcome};

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct GuiClient {
    pub program: String,
    pub station: String,
    pub ip: String,
    pub host: String,
    /// True when this entry is the session's own client.
    pub is_local_client: bool,
    /// Attributes this library does not model, verbatim.
    pub raw: BTreeMap<String, String>,
}

impl GuiClient {
    pub(crate) fn apply_attr(&mut self, key: &str, value: &str) -> AttrOutcome {
        match key {
            "program" => set_attr!(self.program, ok_string(value)),
            "station" => set_attr!(self.station, ok_string(value)),
            "ip" => set_attr!(self.ip, ok_string(value)),
            "host" => set_attr!(self.host, ok_string(value)),
            _ => {
                self.raw.insert(key.to_string(), value.to_string());
                AttrOutcome::Unknown
            }
        }
    }
}
