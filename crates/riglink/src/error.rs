//! Error taxonomy for the session engine.
//!
//! Single-command failures (`CommandRejected`, `CommandTimeout`,
//! `StateUnavailable`) surface at the awaiting caller and leave the
//! session running. Transport and keep-alive failures take the whole
//! session down. Attribute parse errors never appear here - they are
//! logged and counted in [`crate::state::StoreStats`].

use rigproto::reply::describe_reply_code;

/// Everything a session operation can fail with.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RigError {
    /// The underlying socket failed; the session is unusable.
    #[error("transport error: {0}")]
    Transport(String),

    /// The outbound command queue exceeded its watermark.
    #[error("outbound command queue overran its watermark")]
    TransportOverrun,

    /// Operation attempted after close, or pending work rejected at close.
    #[error("session closed")]
    SessionClosed,

    /// No `H` line arrived within the handshake limit.
    #[error("timed out waiting for client handle")]
    HandleTimeout,

    /// One command's deadline expired; the session continues.
    #[error("command timed out")]
    CommandTimeout,

    /// The radio rejected one command; the session continues and the
    /// touched entity is resynced.
    #[error("command rejected: {description} (0x{code:08X}): {raw}")]
    CommandRejected {
        code: u32,
        description: &'static str,
        raw: String,
    },

    /// A controller operation referenced an entity the store no longer has.
    #[error("no {entity} with id {id}")]
    StateUnavailable { entity: &'static str, id: String },

    /// The host did not provide a discovery adapter.
    #[error("no discovery adapter provided by the host")]
    DiscoveryUnavailable,

    /// Three consecutive keep-alive pings went unanswered.
    #[error("keep-alive failed after {failures} consecutive ping timeouts")]
    PingTimeout { failures: u32 },
}

impl RigError {
    /// Build a rejection from a reply line's code and raw message.
    pub fn rejected(code: u32, raw: impl Into<String>) -> Self {
        RigError::CommandRejected {
            code,
            description: describe_reply_code(code),
            raw: raw.into(),
        }
    }

    /// True when the error ends the session rather than one call.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RigError::Transport(_)
                | RigError::TransportOverrun
                | RigError::SessionClosed
                | RigError::PingTimeout { .. }
        )
    }
}

impl From<std::io::Error> for RigError {
    fn from(err: std::io::Error) -> Self {
        RigError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_carries_description() {
        let err = RigError::rejected(0x50000004, "filter out of range");
        match &err {
            RigError::CommandRejected {
                code, description, ..
            } => {
                assert_eq!(*code, 0x50000004);
                assert_eq!(*description, "parameter out of range");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!err.is_fatal());
    }

    #[test]
    fn fatality_classes() {
        assert!(RigError::Transport("eof".into()).is_fatal());
        assert!(RigError::PingTimeout { failures: 3 }.is_fatal());
        assert!(RigError::SessionClosed.is_fatal());
        assert!(!RigError::CommandTimeout.is_fatal());
        assert!(!RigError::StateUnavailable {
            entity: "slice",
            id: "0x00000001".into()
        }
        .is_fatal());
    }
}
