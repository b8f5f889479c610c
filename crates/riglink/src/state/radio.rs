//! The radio singleton snapshot.
//!
//! `tx`, `atu`, `interlock`, `gps`, and oscillator status scopes all fold
//! into this record; the store prefixes their keys (`gps_lat` etc.)
//! before they get here, so one closed key set covers the lot.

use std::collections::BTreeMap;

use rigproto::values::{parse_bool, parse_i32, parse_list, parse_mhz, parse_u32};
use serde::Serialize;

use super::{ok_lower, ok_string, set_attr, AttrOutcome};

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Radio {
    pub model: String,
    pub serial: String,
    pub nickname: String,
    pub callsign: String,
    pub software_version: String,
    pub protocol_version: String,
    pub ip: String,
    pub netmask: String,
    pub gateway: String,
    pub mac: String,
    pub region: String,
    pub screensaver: String,
    pub max_slices: u32,
    pub max_panadapters: u32,
    pub lineout_gain: i32,
    pub lineout_mute: bool,
    pub headphone_gain: i32,
    pub headphone_mute: bool,
    pub remote_on_enabled: bool,
    pub freq_error_ppb: i32,
    pub cal_freq_mhz: f64,
    pub tnf_enabled: bool,
    pub snap_tune_enabled: bool,
    pub binaural_rx: bool,
    pub full_duplex_enabled: bool,
    pub ant_list: Vec<String>,
    pub mic_list: Vec<String>,
    pub profile_global_list: Vec<String>,
    pub profile_global_current: String,
    pub profile_tx_list: Vec<String>,
    pub profile_tx_current: String,
    pub profile_mic_list: Vec<String>,
    pub profile_mic_current: String,
    pub profile_display_list: Vec<String>,
    pub profile_display_current: String,
    pub log_modules: Vec<String>,
    pub filter_sharpness_voice: u32,
    pub filter_sharpness_voice_auto: bool,
    pub filter_sharpness_cw: u32,
    pub filter_sharpness_cw_auto: bool,
    pub filter_sharpness_digital: u32,
    pub filter_sharpness_digital_auto: bool,
    // tx scope
    pub tx_frequency_mhz: f64,
    pub tx_filter_low_hz: i32,
    pub tx_filter_high_hz: i32,
    pub tx_rf_power: i32,
    pub tx_tune_power: i32,
    pub tx_inhibit: bool,
    // interlock scope
    pub interlock_state: String,
    pub interlock_reason: String,
    pub interlock_source: String,
    pub interlock_timeout_ms: u32,
    pub interlock_tx_allowed: bool,
    // atu scope
    pub atu_present: bool,
    pub atu_status: String,
    pub atu_enabled: bool,
    pub atu_memories_enabled: bool,
    // oscillator
    pub oscillator_state: String,
    pub oscillator_setting: String,
    pub oscillator_locked: bool,
    // gps scope
    pub gps_present: bool,
    pub gps_status: String,
    pub gps_grid: String,
    pub gps_latitude: String,
    pub gps_longitude: String,
    pub gps_altitude: String,
    pub gps_visible_sats: u32,
    pub gps_tracked_sats: u32,
    pub gps_speed: String,
    /// Attributes this library does not model, verbatim.
    pub raw: BTreeMap<String, String>,
}

impl Radio {
    pub(crate) fn apply_attr(&mut self, key: &str, value: &str) -> AttrOutcome {
        match key {
            "model" => set_attr!(self.model, ok_string(value)),
            "serial" | "chassis_serial" => set_attr!(self.serial, ok_string(value)),
            "name" | "nickname" => set_attr!(self.nickname, ok_string(value)),
            "callsign" => set_attr!(self.callsign, ok_string(value)),
            "software_ver" | "version" => set_attr!(self.software_version, ok_string(value)),
            "protocol_ver" => set_attr!(self.protocol_version, ok_string(value)),
            "ip" => set_attr!(self.ip, ok_string(value)),
            "netmask" => set_attr!(self.netmask, ok_string(value)),
            "gateway" => set_attr!(self.gateway, ok_string(value)),
            "mac" => set_attr!(self.mac, ok_string(value)),
            "region" => set_attr!(self.region, ok_string(value)),
            "screensaver" => set_attr!(self.screensaver, ok_lower(value)),
            "slices" => set_attr!(self.max_slices, parse_u32(value)),
            "panadapters" => set_attr!(self.max_panadapters, parse_u32(value)),
            "lineout_gain" => set_attr!(self.lineout_gain, parse_i32(value)),
            "lineout_mute" => set_attr!(self.lineout_mute, parse_bool(value)),
            "headphone_gain" => set_attr!(self.headphone_gain, parse_i32(value)),
            "headphone_mute" => set_attr!(self.headphone_mute, parse_bool(value)),
            "remote_on_enabled" => set_attr!(self.remote_on_enabled, parse_bool(value)),
            "freq_error_ppb" => set_attr!(self.freq_error_ppb, parse_i32(value)),
            "cal_freq" => set_attr!(self.cal_freq_mhz, parse_mhz(value)),
            "tnf_enabled" => set_attr!(self.tnf_enabled, parse_bool(value)),
            "snap_tune_enabled" => set_attr!(self.snap_tune_enabled, parse_bool(value)),
            "binaural_rx" => set_attr!(self.binaural_rx, parse_bool(value)),
            "full_duplex_enabled" => set_attr!(self.full_duplex_enabled, parse_bool(value)),
            "ant_list" => set_attr!(self.ant_list, Ok(parse_list(value))),
            "mic_list" => set_attr!(self.mic_list, Ok(parse_list(value))),
            "global_list" => set_attr!(self.profile_global_list, Ok(parse_list(value))),
            "global_current" => set_attr!(self.profile_global_current, ok_string(value)),
            "tx_list" => set_attr!(self.profile_tx_list, Ok(parse_list(value))),
            "tx_current" => set_attr!(self.profile_tx_current, ok_string(value)),
            "mic_profile_list" => set_attr!(self.profile_mic_list, Ok(parse_list(value))),
            "mic_current" => set_attr!(self.profile_mic_current, ok_string(value)),
            "display_list" => set_attr!(self.profile_display_list, Ok(parse_list(value))),
            "display_current" => set_attr!(self.profile_display_current, ok_string(value)),
            "log_modules" => set_attr!(self.log_modules, Ok(parse_list(value))),
            "filter_sharpness_voice" => set_attr!(self.filter_sharpness_voice, parse_u32(value)),
            "filter_sharpness_voice_auto" => {
                set_attr!(self.filter_sharpness_voice_auto, parse_bool(value))
            }
            "filter_sharpness_cw" => set_attr!(self.filter_sharpness_cw, parse_u32(value)),
            "filter_sharpness_cw_auto" => {
                set_attr!(self.filter_sharpness_cw_auto, parse_bool(value))
            }
            "filter_sharpness_digital" => {
                set_attr!(self.filter_sharpness_digital, parse_u32(value))
            }
            "filter_sharpness_digital_auto" => {
                set_attr!(self.filter_sharpness_digital_auto, parse_bool(value))
            }
            "tx_freq" => set_attr!(self.tx_frequency_mhz, parse_mhz(value)),
            "tx_filter_low" => set_attr!(self.tx_filter_low_hz, parse_i32(value)),
            "tx_filter_high" => set_attr!(self.tx_filter_high_hz, parse_i32(value)),
            "tx_rfpower" => set_attr!(self.tx_rf_power, parse_i32(value)),
            "tx_tunepower" => set_attr!(self.tx_tune_power, parse_i32(value)),
            "tx_inhibit" => set_attr!(self.tx_inhibit, parse_bool(value)),
            "interlock_state" => set_attr!(self.interlock_state, ok_lower(value)),
            "interlock_reason" => set_attr!(self.interlock_reason, ok_string(value)),
            "interlock_source" => set_attr!(self.interlock_source, ok_string(value)),
            "interlock_timeout" => set_attr!(self.interlock_timeout_ms, parse_u32(value)),
            "interlock_tx_allowed" => set_attr!(self.interlock_tx_allowed, parse_bool(value)),
            "atu_present" => set_attr!(self.atu_present, parse_bool(value)),
            "atu_status" => set_attr!(self.atu_status, ok_lower(value)),
            "atu_enabled" => set_attr!(self.atu_enabled, parse_bool(value)),
            "atu_memories_enabled" => set_attr!(self.atu_memories_enabled, parse_bool(value)),
            "oscillator_state" => set_attr!(self.oscillator_state, ok_lower(value)),
            "oscillator_setting" => set_attr!(self.oscillator_setting, ok_lower(value)),
            "oscillator_locked" => set_attr!(self.oscillator_locked, parse_bool(value)),
            "gps_present" => set_attr!(self.gps_present, parse_bool(value)),
            "gps_status" => set_attr!(self.gps_status, ok_string(value)),
            "gps_grid" => set_attr!(self.gps_grid, ok_string(value)),
            "gps_lat" => set_attr!(self.gps_latitude, ok_string(value)),
            "gps_lon" => set_attr!(self.gps_longitude, ok_string(value)),
            "gps_altitude" => set_attr!(self.gps_altitude, ok_string(value)),
            "gps_visible" => set_attr!(self.gps_visible_sats, parse_u32(value)),
            "gps_tracked" => set_attr!(self.gps_tracked_sats, parse_u32(value)),
            "gps_speed" => set_attr!(self.gps_speed, ok_string(value)),
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
    fn identity_fields() {
        let mut radio = Radio::default();
        radio.apply_attr("model", "RX-6600");
        radio.apply_attr("chassis_serial", "1234-5678-9012");
        radio.apply_attr("callsign", "N0CALL");
        assert_eq!(radio.model, "RX-6600");
        assert_eq!(radio.serial, "1234-5678-9012");
        assert_eq!(radio.callsign, "N0CALL");
    }

    #[test]
    fn prefixed_scope_keys() {
        let mut radio = Radio::default();
        assert_eq!(
            radio.apply_attr("interlock_state", "READY"),
            AttrOutcome::Changed("interlock_state")
        );
        assert_eq!(radio.interlock_state, "ready");
        radio.apply_attr("gps_grid", "EN35");
        assert_eq!(radio.gps_grid, "EN35");
        radio.apply_attr("atu_enabled", "1");
        assert!(radio.atu_enabled);
    }

    #[test]
    fn profile_lists() {
        let mut radio = Radio::default();
        radio.apply_attr("global_list", "Default,SO2R Setup");
        assert_eq!(radio.profile_global_list, vec!["Default", "SO2R Setup"]);
        radio.apply_attr("global_current", "Default");
        assert_eq!(radio.profile_global_current, "Default");
    }

    #[test]
    fn unknown_keys_preserved() {
        let mut radio = Radio::default();
        assert_eq!(radio.apply_attr("mystery", "42"), AttrOutcome::Unknown);
        assert_eq!(radio.raw.get("mystery").map(String::as_str), Some("42"));
    }
}
