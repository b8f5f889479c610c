//! The in-flight command table.
//!
//! Maps sequence numbers to pending requests. Every entry gets exactly
//! one terminal outcome - reply, rejection, timeout, or session close -
//! and is absent from the table afterwards. A caller that dropped its
//! receiver still gets its entry resolved; the send is simply a no-op.

use std::collections::HashMap;

use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::error::RigError;
use crate::session::CommandReply;

/// What kind of command a pending entry is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PendingKind {
    /// A caller is awaiting the outcome.
    User,
    /// A keep-alive ping; timeouts feed the failure counter.
    Ping,
    /// Fire-and-forget (resync after rejection); outcome is dropped.
    Internal,
}

pub(crate) struct PendingCommand {
    pub deadline: Instant,
    pub kind: PendingKind,
    pub reply_tx: Option<oneshot::Sender<Result<CommandReply, RigError>>>,
    /// Command to send if the radio rejects this one (entity resync).
    pub resync: Option<String>,
}

#[derive(Default)]
pub(crate) struct PendingTable {
    map: HashMap<u32, PendingCommand>,
}

impl PendingTable {
    pub fn insert(&mut self, seq: u32, command: PendingCommand) {
        self.map.insert(seq, command);
    }

    pub fn remove(&mut self, seq: u32) -> Option<PendingCommand> {
        self.map.remove(&seq)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Earliest deadline across all entries.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.map.values().map(|p| p.deadline).min()
    }

    /// Remove and return every entry whose deadline has passed.
    pub fn take_expired(&mut self, now: Instant) -> Vec<(u32, PendingCommand)> {
        let expired: Vec<u32> = self
            .map
            .iter()
            .filter(|(_, p)| now >= p.deadline)
            .map(|(seq, _)| *seq)
            .collect();
        expired
            .into_iter()
            .filter_map(|seq| self.map.remove(&seq).map(|p| (seq, p)))
            .collect()
    }

    /// Remove and return everything (session close).
    pub fn drain(&mut self) -> Vec<(u32, PendingCommand)> {
        self.map.drain().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn entry(deadline: Instant) -> PendingCommand {
        PendingCommand {
            deadline,
            kind: PendingKind::User,
            reply_tx: None,
            resync: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_removes_entries() {
        let mut table = PendingTable::default();
        let now = Instant::now();
        table.insert(1, entry(now + Duration::from_millis(100)));
        table.insert(2, entry(now + Duration::from_millis(500)));

        assert!(table.take_expired(now).is_empty());
        let expired = table.take_expired(now + Duration::from_millis(200));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].0, 1);
        assert_eq!(table.len(), 1);
        assert!(table.remove(1).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn next_deadline_is_the_minimum() {
        let mut table = PendingTable::default();
        let now = Instant::now();
        assert!(table.next_deadline().is_none());
        table.insert(1, entry(now + Duration::from_millis(500)));
        table.insert(2, entry(now + Duration::from_millis(100)));
        assert_eq!(table.next_deadline(), Some(now + Duration::from_millis(100)));
    }
}
