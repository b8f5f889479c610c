//! Slice (receiver channel) snapshots.

use std::collections::BTreeMap;

use rigproto::values::{parse_bool, parse_i32, parse_list, parse_mhz, parse_u32};
use rigproto::{ClientHandle, StreamId};
use serde::Serialize;

use super::{ok_lower, ok_string, parse_handle, parse_stream_id, set_attr, AttrOutcome};

/// One receiver channel. Frequencies are canonical six-decimal MHz;
/// filter edges are Hz relative to the carrier.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Slice {
    pub frequency_mhz: f64,
    pub mode: String,
    pub mode_list: Vec<String>,
    pub rx_ant: String,
    pub tx_ant: String,
    pub rx_ant_list: Vec<String>,
    pub filter_low_hz: i32,
    pub filter_high_hz: i32,
    pub active: bool,
    pub locked: bool,
    pub tx_enabled: bool,
    pub index_letter: String,
    pub client_handle: ClientHandle,
    pub is_owned_by_local_client: bool,
    pub panadapter_stream_id: StreamId,
    pub dax_channel: u32,
    pub dax_clients: u32,
    pub audio_gain: i32,
    pub audio_pan: i32,
    pub audio_mute: bool,
    pub agc_mode: String,
    pub agc_threshold: i32,
    pub agc_off_level: i32,
    pub squelch_enabled: bool,
    pub squelch_level: i32,
    pub anf_enabled: bool,
    pub anf_level: i32,
    pub anf_tuned: bool,
    pub apf_enabled: bool,
    pub apf_level: i32,
    pub wnb_enabled: bool,
    pub wnb_level: i32,
    pub nb_enabled: bool,
    pub nb_level: i32,
    pub nr_enabled: bool,
    pub nr_level: i32,
    pub rnn_enabled: bool,
    pub rnn_level: i32,
    pub esc_enabled: bool,
    pub esc_level: i32,
    pub rit_enabled: bool,
    pub rit_freq_hz: i32,
    pub xit_enabled: bool,
    pub xit_freq_hz: i32,
    pub tune_step_hz: u32,
    pub record_enabled: bool,
    pub play_enabled: bool,
    pub fm_tone_mode: String,
    /// May be a tone name or a numeric frequency depending on mode;
    /// kept verbatim.
    pub fm_tone_value: String,
    pub fm_deviation_hz: u32,
    pub fm_repeater_offset_mhz: f64,
    pub fm_tone_burst: bool,
    pub diversity_enabled: bool,
    pub diversity_parent: bool,
    pub diversity_child: bool,
    pub diversity_index: u32,
    /// Attributes this library does not model, verbatim.
    pub raw: BTreeMap<String, String>,
}

impl Slice {
    pub(crate) fn apply_attr(&mut self, key: &str, value: &str) -> AttrOutcome {
        match key {
            "RF_frequency" | "rf_frequency" => set_attr!(self.frequency_mhz, parse_mhz(value)),
            "mode" => set_attr!(self.mode, ok_lower(value)),
            "mode_list" => set_attr!(self.mode_list, Ok(parse_list(value))),
            "rxant" => set_attr!(self.rx_ant, ok_string(value)),
            "txant" => set_attr!(self.tx_ant, ok_string(value)),
            "ant_list" => set_attr!(self.rx_ant_list, Ok(parse_list(value))),
            "filter_lo" | "filter_low" => set_attr!(self.filter_low_hz, parse_i32(value)),
            "filter_hi" | "filter_high" => set_attr!(self.filter_high_hz, parse_i32(value)),
            "active" => set_attr!(self.active, parse_bool(value)),
            "lock" => set_attr!(self.locked, parse_bool(value)),
            "tx" => set_attr!(self.tx_enabled, parse_bool(value)),
            "index_letter" => set_attr!(self.index_letter, ok_string(value)),
            "client_handle" => set_attr!(self.client_handle, parse_handle(value)),
            "pan" => set_attr!(self.panadapter_stream_id, parse_stream_id(value)),
            "dax" => set_attr!(self.dax_channel, parse_u32(value)),
            "dax_clients" => set_attr!(self.dax_clients, parse_u32(value)),
            "audio_gain" | "audio_level" => set_attr!(self.audio_gain, parse_i32(value)),
            "audio_pan" => set_attr!(self.audio_pan, parse_i32(value)),
            "audio_mute" => set_attr!(self.audio_mute, parse_bool(value)),
            "agc_mode" => set_attr!(self.agc_mode, ok_lower(value)),
            "agc_threshold" => set_attr!(self.agc_threshold, parse_i32(value)),
            "agc_off_level" => set_attr!(self.agc_off_level, parse_i32(value)),
            "squelch" => set_attr!(self.squelch_enabled, parse_bool(value)),
            "squelch_level" => set_attr!(self.squelch_level, parse_i32(value)),
            "anf" => set_attr!(self.anf_enabled, parse_bool(value)),
            "anf_level" => set_attr!(self.anf_level, parse_i32(value)),
            "anf_tuned" => set_attr!(self.anf_tuned, parse_bool(value)),
            "apf" => set_attr!(self.apf_enabled, parse_bool(value)),
            "apf_level" => set_attr!(self.apf_level, parse_i32(value)),
            "wnb" => set_attr!(self.wnb_enabled, parse_bool(value)),
            "wnb_level" => set_attr!(self.wnb_level, parse_i32(value)),
            "nb" => set_attr!(self.nb_enabled, parse_bool(value)),
            "nb_level" => set_attr!(self.nb_level, parse_i32(value)),
            "nr" => set_attr!(self.nr_enabled, parse_bool(value)),
            "nr_level" => set_attr!(self.nr_level, parse_i32(value)),
            "rnn" => set_attr!(self.rnn_enabled, parse_bool(value)),
            "rnn_level" => set_attr!(self.rnn_level, parse_i32(value)),
            "esc" => set_attr!(self.esc_enabled, parse_bool(value)),
            "esc_level" => set_attr!(self.esc_level, parse_i32(value)),
            "rit_on" => set_attr!(self.rit_enabled, parse_bool(value)),
            "rit_freq" => set_attr!(self.rit_freq_hz, parse_i32(value)),
            "xit_on" => set_attr!(self.xit_enabled, parse_bool(value)),
            "xit_freq" => set_attr!(self.xit_freq_hz, parse_i32(value)),
            "step" => set_attr!(self.tune_step_hz, parse_u32(value)),
            "record" => set_attr!(self.record_enabled, parse_bool(value)),
            "play" => set_attr!(self.play_enabled, parse_bool(value)),
            "fm_tone_mode" => set_attr!(self.fm_tone_mode, ok_lower(value)),
            "fm_tone_value" => set_attr!(self.fm_tone_value, ok_string(value)),
            "fm_deviation" => set_attr!(self.fm_deviation_hz, parse_u32(value)),
            "fm_repeater_offset_freq" => {
                set_attr!(self.fm_repeater_offset_mhz, parse_mhz(value))
            }
            "fm_tone_burst" => set_attr!(self.fm_tone_burst, parse_bool(value)),
            "diversity" => set_attr!(self.diversity_enabled, parse_bool(value)),
            "diversity_parent" => set_attr!(self.diversity_parent, parse_bool(value)),
            "diversity_child" => set_attr!(self.diversity_child, parse_bool(value)),
            "diversity_index" => set_attr!(self.diversity_index, parse_u32(value)),
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
    fn frequency_is_canonicalized() {
        let mut slice = Slice::default();
        assert_eq!(
            slice.apply_attr("RF_frequency", "14.250000"),
            AttrOutcome::Changed("frequency_mhz")
        );
        assert_eq!(slice.frequency_mhz, 14.25);
        // same value again: no typed diff
        assert_eq!(
            slice.apply_attr("RF_frequency", "14.25"),
            AttrOutcome::Unchanged
        );
    }

    #[test]
    fn mode_is_lowercased() {
        let mut slice = Slice::default();
        slice.apply_attr("mode", "USB");
        assert_eq!(slice.mode, "usb");
        assert_eq!(slice.apply_attr("mode", "usb"), AttrOutcome::Unchanged);
    }

    #[test]
    fn dsp_pairs() {
        let mut slice = Slice::default();
        slice.apply_attr("nr", "1");
        slice.apply_attr("nr_level", "45");
        assert!(slice.nr_enabled);
        assert_eq!(slice.nr_level, 45);
        slice.apply_attr("anf_tuned", "1");
        assert!(slice.anf_tuned);
    }

    #[test]
    fn bad_value_does_not_clobber_field() {
        let mut slice = Slice::default();
        slice.apply_attr("filter_lo", "100");
        let outcome = slice.apply_attr("filter_lo", "abc");
        assert!(matches!(outcome, AttrOutcome::ParseError(_)));
        assert_eq!(slice.filter_low_hz, 100);
    }

    #[test]
    fn unknown_attr_lands_in_raw() {
        let mut slice = Slice::default();
        assert_eq!(
            slice.apply_attr("future_knob", "7"),
            AttrOutcome::Unknown
        );
        assert_eq!(slice.raw.get("future_knob").map(String::as_str), Some("7"));
    }

    #[test]
    fn diversity_fields() {
        let mut slice = Slice::default();
        slice.apply_attr("diversity_parent", "1");
        slice.apply_attr("diversity_index", "5");
        assert!(slice.diversity_parent);
        assert_eq!(slice.diversity_index, 5);
    }

    #[test]
    fn ant_lists_split() {
        let mut slice = Slice::default();
        slice.apply_attr("ant_list", "ANT1,ANT2,XVTA");
        assert_eq!(slice.rx_ant_list, vec!["ANT1", "ANT2", "XVTA"]);
        // element-wise equality: same list is no change
        assert_eq!(
            slice.apply_attr("ant_list", "ANT1,ANT2,XVTA"),
            AttrOutcome::Unchanged
        );
    }
}
