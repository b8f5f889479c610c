//! Waterfall snapshots.

use std::collections::BTreeMap;

use rigproto::values::{parse_bool, parse_i32, parse_mhz, parse_u32};
use rigproto::{ClientHandle, StreamId};
use serde::Serialize;

use super::{parse_handle, parse_stream_id, set_attr, AttrOutcome};

/// The scrolling spectrogram paired with a panadapter. Mirrors the pan
/// geometry plus its own rendering knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Waterfall {
    pub center_mhz: f64,
    pub bandwidth_mhz: f64,
    pub width_px: u32,
    pub line_duration_ms: u32,
    pub color_gain: i32,
    pub auto_black: bool,
    pub black_level: i32,
    pub gradient_index: u32,
    pub panadapter_stream_id: StreamId,
    pub client_handle: ClientHandle,
    pub is_owned_by_local_client: bool,
    /// Attributes this library does not model, verbatim.
    pub raw: BTreeMap<String, String>,
}

impl Waterfall {
    pub(crate) fn apply_attr(&mut self, key: &str, value: &str) -> AttrOutcome {
        match key {
            "center" => set_attr!(self.center_mhz, parse_mhz(value)),
            "bandwidth" => set_attr!(self.bandwidth_mhz, parse_mhz(value)),
            "x_pixels" => set_attr!(self.width_px, parse_u32(value)),
            "line_duration" => set_attr!(self.line_duration_ms, parse_u32(value)),
            "color_gain" => set_attr!(self.color_gain, parse_i32(value)),
            "auto_black" => set_attr!(self.auto_black, parse_bool(value)),
            "black_level" => set_attr!(self.black_level, parse_i32(value)),
            "gradient_index" => set_attr!(self.gradient_index, parse_u32(value)),
            "panadapter" => set_attr!(self.panadapter_stream_id, parse_stream_id(value)),
            "client_handle" => set_attr!(self.client_handle, parse_handle(value)),
            _ => {
                self.raw.insert(key.to_string(), value.to_string());
                AttrOutcome::Unknown
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rendering_knobs() {
        let mut wf = Waterfall::default();
        wf.apply_attr("line_duration", "100");
        wf.apply_attr("color_gain", "35");
        wf.apply_attr("auto_black", "1");
        wf.apply_attr("black_level", "12");
        wf.apply_attr("gradient_index", "3");
        assert_eq!(wf.line_duration_ms, 100);
        assert_eq!(wf.color_gain, 35);
        assert!(wf.auto_black);
        assert_eq!(wf.black_level, 12);
        assert_eq!(wf.gradient_index, 3);
    }

    #[test]
    fn pan_reference() {
        let mut wf = Waterfall::default();
        assert_eq!(
            wf.apply_attr("panadapter", "0x40000000"),
            AttrOutcome::Changed("panadapter_stream_id")
        );
        assert_eq!(wf.panadapter_stream_id, StreamId(0x40000000));
    }
}
