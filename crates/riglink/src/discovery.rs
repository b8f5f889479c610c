//! Discovery seam.
//!
//! Beacon parsing is the host's business; the library only defines the
//! adapter interface and the descriptor shape, and reports
//! `DiscoveryUnavailable` when no adapter was provided.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RigError;

/// One radio seen on the local network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadioDescriptor {
    pub model: String,
    pub serial: String,
    pub nickname: String,
    pub ip: String,
    pub port: u16,
    pub version: String,
}

/// Host-provided discovery source (UDP beacons, mDNS, a directory
/// service - the library does not care).
#[async_trait]
pub trait DiscoveryAdapter: Send + Sync {
    /// Collect whatever is discoverable within `window`.
    async fn discover(&self, window: Duration) -> Result<Vec<RadioDescriptor>, RigError>;
}

/// Discover radios through the host's adapter, if it supplied one.
pub async fn discover_radios(
    adapter: Option<&dyn DiscoveryAdapter>,
    window: Duration,
) -> Result<Vec<RadioDescriptor>, RigError> {
    match adapter {
        Some(adapter) => adapter.discover(window).await,
        None => Err(RigError::DiscoveryUnavailable),
    }
}
