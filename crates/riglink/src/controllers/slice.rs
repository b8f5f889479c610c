//! Slice write path.

use std::sync::Arc;

use rigproto::values::{format_bool, format_mhz};
use rigproto::StreamId;

use crate::controllers::{clamp_level, clamp_pan};
use crate::error::RigError;
use crate::session::{PatchRequest, RadioSession};
use crate::state::{EntityKind, Slice};

/// Write facade for one slice.
#[derive(Clone)]
pub struct SliceController {
    session: RadioSession,
    id: StreamId,
}

impl SliceController {
    pub(crate) fn new(session: RadioSession, id: StreamId) -> Self {
        Self { session, id }
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Current snapshot, or `StateUnavailable` once the slice is gone.
    pub fn snapshot(&self) -> Result<Arc<Slice>, RigError> {
        self.session
            .store()
            .slice(self.id)
            .ok_or_else(|| RigError::StateUnavailable {
                entity: "slice",
                id: self.id.to_string(),
            })
    }

    /// One atomic multi-attribute update: optimistic patch, send, and
    /// resync-on-reject.
    async fn set(&self, attrs: Vec<(String, String)>) -> Result<(), RigError> {
        self.snapshot()?;
        let args: Vec<String> = attrs.iter().map(|(k, v)| format!("{k}={v}")).collect();
        let text = format!("slice set {} {}", self.id, args.join(" "));
        let patch = PatchRequest {
            kind: EntityKind::Slice,
            id: self.id.to_string(),
            attrs,
        };
        self.session
            .command_full(
                text,
                self.session.command_timeout(),
                Some(patch),
                Some(format!("sub slice {}", self.id)),
            )
            .await
            .map(|_| ())
    }

    pub async fn set_frequency(&self, mhz: f64) -> Result<(), RigError> {
        self.set(vec![("RF_frequency".into(), format_mhz(mhz))]).await
    }

    pub async fn set_mode(&self, mode: &str) -> Result<(), RigError> {
        self.set(vec![("mode".into(), mode.to_ascii_lowercase())])
            .await
    }

    /// Set both filter edges atomically; the edges are ordered so the
    /// radio never sees `low > high`.
    pub async fn set_filter(&self, low_hz: i32, high_hz: i32) -> Result<(), RigError> {
        let (low, high) = if low_hz <= high_hz {
            (low_hz, high_hz)
        } else {
            (high_hz, low_hz)
        };
        self.set(vec![
            ("filter_lo".into(), low.to_string()),
            ("filter_hi".into(), high.to_string()),
        ])
        .await
    }

    /// Set the low edge; the high edge rides along so no transient
    /// `low > high` state exists on the wire.
    pub async fn set_filter_low(&self, low_hz: i32) -> Result<(), RigError> {
        let high = self.snapshot()?.filter_high_hz.max(low_hz);
        self.set(vec![
            ("filter_lo".into(), low_hz.to_string()),
            ("filter_hi".into(), high.to_string()),
        ])
        .await
    }

    pub async fn set_filter_high(&self, high_hz: i32) -> Result<(), RigError> {
        let low = self.snapshot()?.filter_low_hz.min(high_hz);
        self.set(vec![
            ("filter_lo".into(), low.to_string()),
            ("filter_hi".into(), high_hz.to_string()),
        ])
        .await
    }

    pub async fn set_rx_ant(&self, ant: &str) -> Result<(), RigError> {
        self.set(vec![("rxant".into(), ant.to_string())]).await
    }

    pub async fn set_tx_ant(&self, ant: &str) -> Result<(), RigError> {
        self.set(vec![("txant".into(), ant.to_string())]).await
    }

    pub async fn set_dax_channel(&self, channel: u32) -> Result<(), RigError> {
        self.set(vec![("dax".into(), channel.to_string())]).await
    }

    pub async fn set_agc_mode(&self, mode: &str) -> Result<(), RigError> {
        self.set(vec![("agc_mode".into(), mode.to_ascii_lowercase())])
            .await
    }

    pub async fn set_agc_threshold(&self, threshold: i32) -> Result<(), RigError> {
        self.set(vec![(
            "agc_threshold".into(),
            clamp_level(threshold).to_string(),
        )])
        .await
    }

    pub async fn set_agc_off_level(&self, level: i32) -> Result<(), RigError> {
        self.set(vec![(
            "agc_off_level".into(),
            clamp_level(level).to_string(),
        )])
        .await
    }

    pub async fn set_audio_gain(&self, gain: i32) -> Result<(), RigError> {
        self.set(vec![("audio_gain".into(), clamp_level(gain).to_string())])
            .await
    }

    pub async fn set_audio_pan(&self, pan: i32) -> Result<(), RigError> {
        self.set(vec![("audio_pan".into(), clamp_pan(pan).to_string())])
            .await
    }

    pub async fn set_audio_mute(&self, mute: bool) -> Result<(), RigError> {
        self.set(vec![("audio_mute".into(), format_bool(mute).into())])
            .await
    }

    async fn toggle(&self, key: &str, enabled: bool) -> Result<(), RigError> {
        self.set(vec![(key.to_string(), format_bool(enabled).into())])
            .await
    }

    async fn level(&self, key: &str, level: i32) -> Result<(), RigError> {
        self.set(vec![(key.to_string(), clamp_level(level).to_string())])
            .await
    }

    pub async fn set_anf(&self, enabled: bool) -> Result<(), RigError> {
        self.toggle("anf", enabled).await
    }

    pub async fn set_anf_level(&self, level: i32) -> Result<(), RigError> {
        self.level("anf_level", level).await
    }

    pub async fn set_apf(&self, enabled: bool) -> Result<(), RigError> {
        self.toggle("apf", enabled).await
    }

    pub async fn set_apf_level(&self, level: i32) -> Result<(), RigError> {
        self.level("apf_level", level).await
    }

    pub async fn set_wnb(&self, enabled: bool) -> Result<(), RigError> {
        self.toggle("wnb", enabled).await
    }

    pub async fn set_wnb_level(&self, level: i32) -> Result<(), RigError> {
        self.level("wnb_level", level).await
    }

    pub async fn set_nb(&self, enabled: bool) -> Result<(), RigError> {
        self.toggle("nb", enabled).await
    }

    pub async fn set_nb_level(&self, level: i32) -> Result<(), RigError> {
        self.level("nb_level", level).await
    }

    pub async fn set_nr(&self, enabled: bool) -> Result<(), RigError> {
        self.toggle("nr", enabled).await
    }

    pub async fn set_nr_level(&self, level: i32) -> Result<(), RigError> {
        self.level("nr_level", level).await
    }

    pub async fn set_rnn(&self, enabled: bool) -> Result<(), RigError> {
        self.toggle("rnn", enabled).await
    }

    pub async fn set_rnn_level(&self, level: i32) -> Result<(), RigError> {
        self.level("rnn_level", level).await
    }

    pub async fn set_esc(&self, enabled: bool) -> Result<(), RigError> {
        self.toggle("esc", enabled).await
    }

    pub async fn set_esc_level(&self, level: i32) -> Result<(), RigError> {
        self.level("esc_level", level).await
    }

    pub async fn set_squelch(&self, enabled: bool) -> Result<(), RigError> {
        self.toggle("squelch", enabled).await
    }

    pub async fn set_squelch_level(&self, level: i32) -> Result<(), RigError> {
        self.level("squelch_level", level).await
    }

    /// Enable/offset go out together so the radio never applies an
    /// offset with a stale enable state.
    pub async fn set_rit(&self, enabled: bool, offset_hz: i32) -> Result<(), RigError> {
        self.set(vec![
            ("rit_on".into(), format_bool(enabled).into()),
            ("rit_freq".into(), offset_hz.to_string()),
        ])
        .await
    }

    pub async fn set_xit(&self, enabled: bool, offset_hz: i32) -> Result<(), RigError> {
        self.set(vec![
            ("xit_on".into(), format_bool(enabled).into()),
            ("xit_freq".into(), offset_hz.to_string()),
        ])
        .await
    }

    pub async fn set_tune_step(&self, step_hz: u32) -> Result<(), RigError> {
        self.set(vec![("step".into(), step_hz.to_string())]).await
    }

    pub async fn set_fm_tone_mode(&self, mode: &str) -> Result<(), RigError> {
        self.set(vec![("fm_tone_mode".into(), mode.to_ascii_lowercase())])
            .await
    }

    /// The tone value may be a named tone or a numeric frequency; it is
    /// passed through untouched.
    pub async fn set_fm_tone_value(&self, value: impl Into<String>) -> Result<(), RigError> {
        self.set(vec![("fm_tone_value".into(), value.into())]).await
    }

    pub async fn set_fm_deviation(&self, deviation_hz: u32) -> Result<(), RigError> {
        self.set(vec![("fm_deviation".into(), deviation_hz.to_string())])
            .await
    }

    pub async fn set_fm_repeater_offset(&self, offset_mhz: f64) -> Result<(), RigError> {
        self.set(vec![(
            "fm_repeater_offset_freq".into(),
            format_mhz(offset_mhz),
        )])
        .await
    }

    pub async fn set_fm_tone_burst(&self, enabled: bool) -> Result<(), RigError> {
        self.toggle("fm_tone_burst", enabled).await
    }

    pub async fn set_diversity(&self, enabled: bool) -> Result<(), RigError> {
        self.toggle("diversity", enabled).await
    }

    pub async fn set_locked(&self, locked: bool) -> Result<(), RigError> {
        self.toggle("lock", locked).await
    }

    pub async fn set_active(&self, active: bool) -> Result<(), RigError> {
        self.toggle("active", active).await
    }

    pub async fn set_record(&self, enabled: bool) -> Result<(), RigError> {
        self.toggle("record", enabled).await
    }

    pub async fn set_play(&self, enabled: bool) -> Result<(), RigError> {
        self.toggle("play", enabled).await
    }

    /// Remove this slice. Store removal follows on the radio's status.
    pub async fn remove(&self) -> Result<(), RigError> {
        self.snapshot()?;
        self.session
            .command(format!("slice remove {}", self.id))
            .await
            .map(|_| ())
    }
}
