//! Panadapter write path.

use std::sync::Arc;

use rigproto::values::{format_bool, format_mhz};
use rigproto::StreamId;

use crate::controllers::clamp_level;
use crate::error::RigError;
use crate::session::{PatchRequest, RadioSession};
use crate::state::{EntityKind, Panadapter};

/// Write facade for one panadapter.
#[derive(Clone)]
pub struct PanadapterController {
    session: RadioSession,
    id: StreamId,
}

impl PanadapterController {
    pub(crate) fn new(session: RadioSession, id: StreamId) -> Self {
        Self { session, id }
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn snapshot(&self) -> Result<Arc<Panadapter>, RigError> {
        self.session
            .store()
            .panadapter(self.id)
            .ok_or_else(|| RigError::StateUnavailable {
                entity: "panadapter",
                id: self.id.to_string(),
            })
    }

    async fn set(&self, attrs: Vec<(String, String)>) -> Result<(), RigError> {
        self.snapshot()?;
        let args: Vec<String> = attrs.iter().map(|(k, v)| format!("{k}={v}")).collect();
        let text = format!("display pan set {} {}", self.id, args.join(" "));
        let patch = PatchRequest {
            kind: EntityKind::Panadapter,
            id: self.id.to_string(),
            attrs,
        };
        self.session
            .command_full(
                text,
                self.session.command_timeout(),
                Some(patch),
                Some(format!("sub pan {}", self.id)),
            )
            .await
            .map(|_| ())
    }

    pub async fn set_center(&self, mhz: f64) -> Result<(), RigError> {
        self.set(vec![("center".into(), format_mhz(mhz))]).await
    }

    pub async fn set_bandwidth(&self, mhz: f64) -> Result<(), RigError> {
        self.set(vec![("bandwidth".into(), format_mhz(mhz))]).await
    }

    /// Both dBm edges in one command, ordered.
    pub async fn set_dbm_range(&self, low_dbm: f64, high_dbm: f64) -> Result<(), RigError> {
        let (low, high) = if low_dbm <= high_dbm {
            (low_dbm, high_dbm)
        } else {
            (high_dbm, low_dbm)
        };
        self.set(vec![
            ("min_dbm".into(), format!("{low:.1}")),
            ("max_dbm".into(), format!("{high:.1}")),
        ])
        .await
    }

    /// Display geometry in one command.
    pub async fn set_size(&self, width_px: u32, height_px: u32) -> Result<(), RigError> {
        self.set(vec![
            ("x_pixels".into(), width_px.to_string()),
            ("y_pixels".into(), height_px.to_string()),
        ])
        .await
    }

    pub async fn set_rf_gain(&self, gain_db: i32) -> Result<(), RigError> {
        self.set(vec![("rfgain".into(), gain_db.to_string())]).await
    }

    pub async fn set_fps(&self, fps: u32) -> Result<(), RigError> {
        self.set(vec![("fps".into(), fps.to_string())]).await
    }

    pub async fn set_average(&self, average: i32) -> Result<(), RigError> {
        self.set(vec![("average".into(), clamp_level(average).to_string())])
            .await
    }

    pub async fn set_weighted_average(&self, enabled: bool) -> Result<(), RigError> {
        self.set(vec![("weighted_average".into(), format_bool(enabled).into())])
            .await
    }

    pub async fn set_rx_ant(&self, ant: &str) -> Result<(), RigError> {
        self.set(vec![("rxant".into(), ant.to_string())]).await
    }

    /// Remove this panadapter (and, radio-side, its waterfall).
    pub async fn remove(&self) -> Result<(), RigError> {
        self.snapshot()?;
        self.session
            .command(format!("display pan remove {}", self.id))
            .await
            .map(|_| ())
    }
}
