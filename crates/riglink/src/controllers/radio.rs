//! Radio-wide write path.

use std::sync::Arc;

use rigproto::values::{escape_spaces, format_bool};

use crate::controllers::{clamp_level, clamp_sharpness};
use crate::error::RigError;
use crate::session::{PatchRequest, RadioSession};
use crate::state::{EntityKind, Radio};

/// Filter sharpness mode selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharpnessMode {
    Voice,
    Cw,
    Digital,
}

impl SharpnessMode {
    fn wire(&self) -> &'static str {
        match self {
            SharpnessMode::Voice => "VOICE",
            SharpnessMode::Cw => "CW",
            SharpnessMode::Digital => "DIGITAL",
        }
    }

    fn field(&self) -> &'static str {
        match self {
            SharpnessMode::Voice => "voice",
            SharpnessMode::Cw => "cw",
            SharpnessMode::Digital => "digital",
        }
    }
}

/// Profile families the radio persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKind {
    Global,
    Tx,
    Mic,
    Display,
}

impl ProfileKind {
    fn wire(&self) -> &'static str {
        match self {
            ProfileKind::Global => "global",
            ProfileKind::Tx => "tx",
            ProfileKind::Mic => "mic",
            ProfileKind::Display => "display",
        }
    }
}

/// Write facade for the radio singleton.
#[derive(Clone)]
pub struct RadioController {
    session: RadioSession,
}

impl RadioController {
    pub(crate) fn new(session: RadioSession) -> Self {
        Self { session }
    }

    pub fn snapshot(&self) -> Result<Arc<Radio>, RigError> {
        self.session
            .store()
            .radio()
            .ok_or(RigError::StateUnavailable {
                entity: "radio",
                id: "radio".to_string(),
            })
    }

    async fn send(
        &self,
        text: String,
        patch_attrs: Vec<(String, String)>,
    ) -> Result<(), RigError> {
        let patch = (!patch_attrs.is_empty()).then(|| PatchRequest {
            kind: EntityKind::Radio,
            id: "radio".to_string(),
            attrs: patch_attrs,
        });
        self.session
            .command_full(
                text,
                self.session.command_timeout(),
                patch,
                Some("sub radio all".to_string()),
            )
            .await
            .map(|_| ())
    }

    pub async fn set_nickname(&self, name: &str) -> Result<(), RigError> {
        self.send(
            format!("radio name {}", escape_spaces(name)),
            vec![("name".into(), name.to_string())],
        )
        .await
    }

    pub async fn set_callsign(&self, callsign: &str) -> Result<(), RigError> {
        self.send(
            format!("radio callsign {}", callsign.to_ascii_uppercase()),
            vec![("callsign".into(), callsign.to_ascii_uppercase())],
        )
        .await
    }

    pub async fn set_screensaver(&self, mode: &str) -> Result<(), RigError> {
        self.send(
            format!("radio screensaver {}", mode.to_ascii_lowercase()),
            vec![("screensaver".into(), mode.to_ascii_lowercase())],
        )
        .await
    }

    pub async fn set_lineout_gain(&self, gain: i32) -> Result<(), RigError> {
        let gain = clamp_level(gain);
        self.send(
            format!("mixer lineout gain {gain}"),
            vec![("lineout_gain".into(), gain.to_string())],
        )
        .await
    }

    pub async fn set_lineout_mute(&self, mute: bool) -> Result<(), RigError> {
        self.send(
            format!("mixer lineout mute {}", format_bool(mute)),
            vec![("lineout_mute".into(), format_bool(mute).into())],
        )
        .await
    }

    pub async fn set_headphone_gain(&self, gain: i32) -> Result<(), RigError> {
        let gain = clamp_level(gain);
        self.send(
            format!("mixer headphone gain {gain}"),
            vec![("headphone_gain".into(), gain.to_string())],
        )
        .await
    }

    pub async fn set_headphone_mute(&self, mute: bool) -> Result<(), RigError> {
        self.send(
            format!("mixer headphone mute {}", format_bool(mute)),
            vec![("headphone_mute".into(), format_bool(mute).into())],
        )
        .await
    }

    pub async fn set_interlock_timeout(&self, timeout_ms: u32) -> Result<(), RigError> {
        self.send(
            format!("interlock timeout={timeout_ms}"),
            vec![("interlock_timeout".into(), timeout_ms.to_string())],
        )
        .await
    }

    /// Both transmit filter edges in one command, ordered.
    pub async fn set_tx_filter(&self, low_hz: i32, high_hz: i32) -> Result<(), RigError> {
        let (low, high) = if low_hz <= high_hz {
            (low_hz, high_hz)
        } else {
            (high_hz, low_hz)
        };
        self.send(
            format!("transmit set filter_low={low} filter_high={high}"),
            vec![
                ("tx_filter_low".into(), low.to_string()),
                ("tx_filter_high".into(), high.to_string()),
            ],
        )
        .await
    }

    pub async fn set_oscillator(&self, source: &str) -> Result<(), RigError> {
        let source = source.to_ascii_lowercase();
        self.send(
            format!("radio oscillator {source}"),
            vec![("oscillator_setting".into(), source.clone())],
        )
        .await
    }

    pub async fn set_filter_sharpness(
        &self,
        mode: SharpnessMode,
        level: u32,
        auto: bool,
    ) -> Result<(), RigError> {
        let level = clamp_sharpness(level);
        self.send(
            format!(
                "radio filter_sharpness {} level={} auto_level={}",
                mode.wire(),
                level,
                format_bool(auto)
            ),
            vec![
                (format!("filter_sharpness_{}", mode.field()), level.to_string()),
                (
                    format!("filter_sharpness_{}_auto", mode.field()),
                    format_bool(auto).into(),
                ),
            ],
        )
        .await
    }

    pub async fn gps_install(&self) -> Result<(), RigError> {
        self.session
            .command("radio gps_install")
            .await
            .map(|_| ())
    }

    pub async fn gps_uninstall(&self) -> Result<(), RigError> {
        self.session
            .command("radio gps_uninstall")
            .await
            .map(|_| ())
    }

    /// Profiles are radio-persisted; the store follows the resulting
    /// status frames, so there is no optimistic patch here.
    pub async fn load_profile(&self, kind: ProfileKind, name: &str) -> Result<(), RigError> {
        self.session
            .command(format!(
                "profile {} load {}",
                kind.wire(),
                escape_spaces(name)
            ))
            .await
            .map(|_| ())
    }

    pub async fn save_profile(&self, kind: ProfileKind, name: &str) -> Result<(), RigError> {
        self.session
            .command(format!(
                "profile {} save {}",
                kind.wire(),
                escape_spaces(name)
            ))
            .await
            .map(|_| ())
    }

    pub async fn delete_profile(&self, kind: ProfileKind, name: &str) -> Result<(), RigError> {
        self.session
            .command(format!(
                "profile {} delete {}",
                kind.wire(),
                escape_spaces(name)
            ))
            .await
            .map(|_| ())
    }
}
