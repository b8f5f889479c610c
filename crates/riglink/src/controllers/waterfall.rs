//! Waterfall write path.

use std::sync::Arc;

use rigproto::values::format_bool;
use rigproto::StreamId;

use crate::controllers::clamp_level;
use crate::error::RigError;
use crate::session::{PatchRequest, RadioSession};
use crate::state::{EntityKind, Waterfall};

/// Write facade for one waterfall.
#[derive(Clone)]
pub struct WaterfallController {
    session: RadioSession,
    id: StreamId,
}

impl WaterfallController {
    pub(crate) fn new(session: RadioSession, id: StreamId) -> Self {
        Self { session, id }
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn snapshot(&self) -> Result<Arc<Waterfall>, RigError> {
        self.session
            .store()
            .waterfall(self.id)
            .ok_or_else(|| RigError::StateUnavailable {
                entity: "waterfall",
                id: self.id.to_string(),
            })
    }

    async fn set(&self, attrs: Vec<(String, String)>) -> Result<(), RigError> {
        self.snapshot()?;
        let args: Vec<String> = attrs.iter().map(|(k, v)| format!("{k}={v}")).collect();
        let text = format!("display waterfall set {} {}", self.id, args.join(" "));
        let patch = PatchRequest {
            kind: EntityKind::Waterfall,
            id: self.id.to_string(),
            attrs,
        };
        self.session
            .command_full(
                text,
                self.session.command_timeout(),
                Some(patch),
                Some(format!("sub waterfall {}", self.id)),
            )
            .await
            .map(|_| ())
    }

    pub async fn set_gradient_index(&self, index: u32) -> Result<(), RigError> {
        self.set(vec![("gradient_index".into(), index.to_string())])
            .await
    }

    pub async fn set_line_duration(&self, duration_ms: u32) -> Result<(), RigError> {
        self.set(vec![("line_duration".into(), duration_ms.to_string())])
            .await
    }

    pub async fn set_auto_black(&self, enabled: bool) -> Result<(), RigError> {
        self.set(vec![("auto_black".into(), format_bool(enabled).into())])
            .await
    }

    pub async fn set_black_level(&self, level: i32) -> Result<(), RigError> {
        self.set(vec![("black_level".into(), clamp_level(level).to_string())])
            .await
    }

    pub async fn set_color_gain(&self, gain: i32) -> Result<(), RigError> {
        self.set(vec![("color_gain".into(), clamp_level(gain).to_string())])
            .await
    }
}
