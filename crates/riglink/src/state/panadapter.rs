//! Panadapter snapshots.

use std::collections::BTreeMap;

use rigproto::values::{parse_bool, parse_i32, parse_list, parse_mhz, parse_u32};
use rigproto::{ClientHandle, StreamId};
use serde::Serialize;

use super::{ok_string, parse_handle, parse_stream_id, set_attr, AttrOutcome};

/// A panoramic spectrum window. The companion waterfall is referenced by
/// id, never by pointer; the store keeps the pair coherent.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Panadapter {
    pub center_mhz: f64,
    pub bandwidth_mhz: f64,
    pub min_bandwidth_mhz: f64,
    pub max_bandwidth_mhz: f64,
    pub low_dbm: f64,
    pub high_dbm: f64,
    pub width_px: u32,
    pub height_px: u32,
    pub fps: u32,
    pub average: u32,
    pub weighted_average: bool,
    pub rf_gain: i32,
    pub rx_ant: String,
    pub ant_list: Vec<String>,
    pub wide: bool,
    pub band: String,
    pub daxiq_channel: u32,
    pub waterfall_stream_id: StreamId,
    pub client_handle: ClientHandle,
    pub is_owned_by_local_client: bool,
    /// Attributes this library does not model (`xvtr` included), verbatim.
    pub raw: BTreeMap<String, String>,
}

impl Panadapter {
    pub(crate) fn apply_attr(&mut self, key: &str, value: &str) -> AttrOutcome {
        match key {
            "center" => set_attr!(self.center_mhz, parse_mhz(value)),
            "bandwidth" => set_attr!(self.bandwidth_mhz, parse_mhz(value)),
            "min_bw" => set_attr!(self.min_bandwidth_mhz, parse_mhz(value)),
            "max_bw" => set_attr!(self.max_bandwidth_mhz, parse_mhz(value)),
            "min_dbm" => set_attr!(self.low_dbm, rigproto::values::parse_f64(value)),
            "max_dbm" => set_attr!(self.high_dbm, rigproto::values::parse_f64(value)),
            "x_pixels" => set_attr!(self.width_px, parse_u32(value)),
            "y_pixels" => set_attr!(self.height_px, parse_u32(value)),
            "fps" => set_attr!(self.fps, parse_u32(value)),
            "average" => set_attr!(self.average, parse_u32(value)),
            "weighted_average" => set_attr!(self.weighted_average, parse_bool(value)),
            "rfgain" => set_attr!(self.rf_gain, parse_i32(value)),
            "rxant" => set_attr!(self.rx_ant, ok_string(value)),
            "ant_list" => set_attr!(self.ant_list, Ok(parse_list(value))),
            "wide" => set_attr!(self.wide, parse_bool(value)),
            "band" => set_attr!(self.band, ok_string(value)),
            "daxiq_channel" => set_attr!(self.daxiq_channel, parse_u32(value)),
            "waterfall" => set_attr!(self.waterfall_stream_id, parse_stream_id(value)),
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
    fn geometry_fields() {
        let mut pan = Panadapter::default();
        pan.apply_attr("center", "14.100000");
        pan.apply_attr("bandwidth", "0.200000");
        pan.apply_attr("min_dbm", "-135.5");
        pan.apply_attr("max_dbm", "-40");
        pan.apply_attr("x_pixels", "1024");
        pan.apply_attr("y_pixels", "300");
        assert_eq!(pan.center_mhz, 14.1);
        assert_eq!(pan.bandwidth_mhz, 0.2);
        assert_eq!(pan.low_dbm, -135.5);
        assert_eq!(pan.width_px, 1024);
    }

    #[test]
    fn waterfall_reference_is_by_id() {
        let mut pan = Panadapter::default();
        assert_eq!(
            pan.apply_attr("waterfall", "0x42000000"),
            AttrOutcome::Changed("waterfall_stream_id")
        );
        assert_eq!(pan.waterfall_stream_id, StreamId(0x42000000));
    }

    #[test]
    fn xvtr_stays_raw() {
        let mut pan = Panadapter::default();
        assert_eq!(pan.apply_attr("xvtr", "2m XVTR"), AttrOutcome::Unknown);
        assert_eq!(pan.raw.get("xvtr").map(String::as_str), Some("2m XVTR"));
    }
}
