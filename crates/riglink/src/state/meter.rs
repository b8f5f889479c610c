//! Meter snapshots.
//!
//! Meter descriptions arrive as status frames; values arrive at high rate
//! on the data plane as raw Q15 and are scaled here by unit. Only the
//! latest value is retained.

use std::collections::BTreeMap;

use rigproto::values::{parse_f64, parse_u32};
use serde::Serialize;

use super::{ok_string, set_attr, AttrOutcome};

/// Where a meter's signal comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MeterSource {
    Slice,
    Codec,
    Radio,
    Tx,
    Amplifier,
    #[default]
    Unknown,
    Other(String),
}

impl MeterSource {
    fn from_token(token: &str) -> Self {
        match token {
            "SLC" => MeterSource::Slice,
            "COD" => MeterSource::Codec,
            "RAD" => MeterSource::Radio,
            "TX-" | "TX" => MeterSource::Tx,
            "AMP" => MeterSource::Amplifier,
            other => MeterSource::Other(other.to_string()),
        }
    }
}

/// One scalar sampled source (S-meter, SWR, temperature, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Meter {
    pub source: MeterSource,
    pub source_index: u32,
    pub name: String,
    pub unit: String,
    pub low: f64,
    pub high: f64,
    pub fps: u32,
    /// Latest sample, already scaled into `unit`.
    pub value: f64,
    /// Attributes this library does not model, verbatim.
    pub raw: BTreeMap<String, String>,
}

impl Meter {
    pub(crate) fn apply_attr(&mut self, key: &str, value: &str) -> AttrOutcome {
        match key {
            "src" => set_attr!(self.source, Ok(MeterSource::from_token(value))),
            "num" => set_attr!(self.source_index, parse_u32(value)),
            "nam" | "name" => set_attr!(self.name, ok_string(value)),
            "unit" => set_attr!(self.unit, ok_string(value)),
            "low" => set_attr!(self.low, parse_f64(value)),
            "hi" | "high" => set_attr!(self.high, parse_f64(value)),
            "fps" => set_attr!(self.fps, parse_u32(value)),
            _ => {
                self.raw.insert(key.to_string(), value.to_string());
                AttrOutcome::Unknown
            }
        }
    }

    /// Scale a raw Q15 sample into this meter's unit.
    ///
    /// dB-family meters report 1/128 dB steps, volts and amps 1/256,
    /// temperatures 1/64; anything else is treated as plain Q15.
    pub fn scale_raw_value(&self, raw: i16) -> f64 {
        let v = raw as f64;
        match self.unit.as_str() {
            "dBm" | "dBFS" | "dB" | "SWR" => v / 128.0,
            "volts" | "amps" => v / 256.0,
            "degC" | "degF" => v / 64.0,
            "rpm" | "watts" => v,
            _ => v / 32768.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn description_attrs() {
        let mut meter = Meter::default();
        meter.apply_attr("src", "SLC");
        meter.apply_attr("num", "0");
        meter.apply_attr("nam", "LEVEL");
        meter.apply_attr("unit", "dBm");
        meter.apply_attr("low", "-150.0");
        meter.apply_attr("hi", "20.0");
        meter.apply_attr("fps", "10");
        assert_eq!(meter.source, MeterSource::Slice);
        assert_eq!(meter.name, "LEVEL");
        assert_eq!(meter.low, -150.0);
        assert_eq!(meter.fps, 10);
    }

    #[test]
    fn unknown_source_preserved() {
        let mut meter = Meter::default();
        meter.apply_attr("src", "XYZ");
        assert_eq!(meter.source, MeterSource::Other("XYZ".into()));
    }

    #[test]
    fn q15_scaling_by_unit() {
        let mut meter = Meter::default();
        meter.apply_attr("unit", "dBm");
        // -73 dBm (S9) is -9344 in 1/128 dB steps
        assert_eq!(meter.scale_raw_value(-9344), -73.0);

        meter.apply_attr("unit", "volts");
        assert_eq!(meter.scale_raw_value(3328), 13.0);

        meter.apply_attr("unit", "degC");
        assert_eq!(meter.scale_raw_value(2560), 40.0);

        meter.apply_attr("unit", "pct");
        assert_eq!(meter.scale_raw_value(16384), 0.5);
    }
}
