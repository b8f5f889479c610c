//! Audio stream write path. Creation lives on
//! [`RadioSession::create_audio_stream`]; this facade covers the
//! per-stream operations.

use std::sync::Arc;

use rigproto::StreamId;

use crate::error::RigError;
use crate::session::{PatchRequest, RadioSession};
use crate::state::{AudioStream, EntityKind, StreamCompression};

/// Write facade for one audio stream.
#[derive(Clone)]
pub struct AudioStreamController {
    session: RadioSession,
    id: StreamId,
}

impl AudioStreamController {
    pub(crate) fn new(session: RadioSession, id: StreamId) -> Self {
        Self { session, id }
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn snapshot(&self) -> Result<Arc<AudioStream>, RigError> {
        self.session
            .store()
            .audio_stream(self.id)
            .ok_or_else(|| RigError::StateUnavailable {
                entity: "audio_stream",
                id: self.id.to_string(),
            })
    }

    pub async fn set_compression(&self, compression: StreamCompression) -> Result<(), RigError> {
        self.snapshot()?;
        let patch = PatchRequest {
            kind: EntityKind::AudioStream,
            id: self.id.to_string(),
            attrs: vec![("compression".to_string(), compression.as_str().to_string())],
        };
        self.session
            .command_full(
                format!("stream set {} compression={}", self.id, compression.as_str()),
                self.session.command_timeout(),
                Some(patch),
                Some(format!("sub audio_stream {}", self.id)),
            )
            .await
            .map(|_| ())
    }

    pub async fn remove(&self) -> Result<(), RigError> {
        self.snapshot()?;
        self.session
            .command(format!("stream remove {}", self.id))
            .await
            .map(|_| ())
    }
}
