//! One-time anonymized install ping.
//!
//! The install identity (GUID) and the "already sent" flag live behind
//! [`InstallStore`]; the core never parses them, it only passes the GUID
//! through as an opaque attribution tag. Transport lives behind
//! [`PingSink`]. A missing GUID degrades to "no ping" rather than an error.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use serpwatch_core_types::SerpError;

pub const INSTALL_PING_TYPE: &str = "serpwatch-install";

/// Persisted install-scoped values, owned by the host's preference storage.
pub trait InstallStore: Send + Sync {
    /// Opaque install GUID, if one has been generated.
    fn guid(&self) -> Option<String>;
    /// Distribution id of the build, if any.
    fn distribution_id(&self) -> Option<String>;
    fn ping_sent(&self) -> bool;
    fn mark_ping_sent(&self);
}

/// Transport seam for submitting the ping.
#[async_trait]
pub trait PingSink: Send + Sync {
    async fn submit(&self, ping: &InstallPing) -> Result<(), SerpError>;
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct InstallPing {
    pub ping_type: String,
    pub guid: String,
    pub distribution_id: Option<String>,
}

/// Whether this install is in the monitored cohort. Distribution builds are
/// excluded.
pub fn cohort_enabled(store: &dyn InstallStore) -> bool {
    match store.distribution_id() {
        Some(id) if !id.is_empty() => {
            info!("distribution build, cohort disabled");
            false
        }
        _ => true,
    }
}

/// Sends the install ping at most once per install lifetime. The sent flag
/// is set before the GUID check, so a GUID-less install never retries.
/// Returns whether a ping was actually submitted.
pub async fn send_install_ping(
    store: &dyn InstallStore,
    sink: &dyn PingSink,
) -> Result<bool, SerpError> {
    if store.ping_sent() {
        return Ok(false);
    }
    store.mark_ping_sent();

    let Some(guid) = store.guid().filter(|g| !g.is_empty()) else {
        info!("no install guid, nothing to report");
        return Ok(false);
    };

    let ping = InstallPing {
        ping_type: INSTALL_PING_TYPE.to_string(),
        guid,
        distribution_id: store.distribution_id(),
    };
    info!(ping_type = %ping.ping_type, "submitting install ping");
    sink.submit(&ping).await?;
    Ok(true)
}

/// In-memory store for tests and the simulator.
#[derive(Debug, Default)]
pub struct MemoryInstallStore {
    inner: RwLock<MemoryInstallState>,
}

#[derive(Debug, Default)]
struct MemoryInstallState {
    guid: Option<String>,
    distribution_id: Option<String>,
    ping_sent: bool,
}

impl MemoryInstallStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_guid(guid: impl Into<String>) -> Self {
        let store = Self::default();
        store.set_guid(guid);
        store
    }

    pub fn set_guid(&self, guid: impl Into<String>) {
        self.inner.write().guid = Some(guid.into());
    }

    pub fn set_distribution_id(&self, id: impl Into<String>) {
        self.inner.write().distribution_id = Some(id.into());
    }

    /// Uninstall clears the sent flag so a reinstall reports again.
    pub fn clear_ping_sent(&self) {
        self.inner.write().ping_sent = false;
    }
}

impl InstallStore for MemoryInstallStore {
    fn guid(&self) -> Option<String> {
        self.inner.read().guid.clone()
    }

    fn distribution_id(&self) -> Option<String> {
        self.inner.read().distribution_id.clone()
    }

    fn ping_sent(&self) -> bool {
        self.inner.read().ping_sent
    }

    fn mark_ping_sent(&self) {
        self.inner.write().ping_sent = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct CollectingSink {
        pings: Mutex<Vec<InstallPing>>,
    }

    #[async_trait]
    impl PingSink for CollectingSink {
        async fn submit(&self, ping: &InstallPing) -> Result<(), SerpError> {
            self.pings.lock().push(ping.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn ping_is_sent_exactly_once() {
        let store = MemoryInstallStore::with_guid("guid-1");
        let sink = CollectingSink::default();

        assert!(send_install_ping(&store, &sink).await.unwrap());
        assert!(!send_install_ping(&store, &sink).await.unwrap());

        let pings = sink.pings.lock();
        assert_eq!(pings.len(), 1);
        assert_eq!(pings[0].ping_type, INSTALL_PING_TYPE);
        assert_eq!(pings[0].guid, "guid-1");
    }

    #[tokio::test]
    async fn missing_guid_skips_and_never_retries() {
        let store = MemoryInstallStore::new();
        let sink = CollectingSink::default();

        assert!(!send_install_ping(&store, &sink).await.unwrap());
        assert!(store.ping_sent());

        // Even a late-arriving guid does not trigger a send.
        store.set_guid("guid-late");
        assert!(!send_install_ping(&store, &sink).await.unwrap());
        assert!(sink.pings.lock().is_empty());
    }

    #[tokio::test]
    async fn reinstall_reports_again_after_flag_clear() {
        let store = MemoryInstallStore::with_guid("guid-1");
        let sink = CollectingSink::default();

        assert!(send_install_ping(&store, &sink).await.unwrap());
        store.clear_ping_sent();
        assert!(send_install_ping(&store, &sink).await.unwrap());
        assert_eq!(sink.pings.lock().len(), 2);
    }

    #[test]
    fn distribution_builds_are_out_of_the_cohort() {
        let store = MemoryInstallStore::new();
        assert!(cohort_enabled(&store));

        store.set_distribution_id("some-distro");
        assert!(!cohort_enabled(&store));

        let empty = MemoryInstallStore::new();
        empty.set_distribution_id("");
        assert!(cohort_enabled(&empty));
    }

    #[test]
    fn ping_serializes_with_stable_fields() {
        let ping = InstallPing {
            ping_type: INSTALL_PING_TYPE.into(),
            guid: "guid-1".into(),
            distribution_id: None,
        };
        let json = serde_json::to_value(&ping).unwrap();
        assert_eq!(json["ping_type"], "serpwatch-install");
        assert_eq!(json["guid"], "guid-1");
    }
}
