//! Process-wide table of active SERP tabs.
//!
//! The registry is the single source of truth for "which tabs are currently
//! showing a tracked SERP", keyed by tab identity with the URL carried as
//! payload. It is mutated only through register/deregister messages and read
//! by the activity-observation collaborators to decide whether a tab's HTTP
//! traffic is worth recording.

pub mod errors;
pub mod ingest;

use dashmap::DashMap;

use serpwatch_core_types::{SerpError, SerpMessage, TabId};

use crate::errors::RegistryError;

/// Active-SERP record for one tab.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SerpInfo {
    pub url: String,
    pub code: String,
    pub sap: String,
}

/// In-memory registry. `put` overwrites, `remove` on an absent key is a
/// silent no-op; both are safe to replay, so duplicate message delivery
/// cannot corrupt the table.
#[derive(Debug, Default)]
pub struct TabRegistry {
    tabs: DashMap<TabId, SerpInfo>,
}

impl TabRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, tab: TabId, info: SerpInfo) {
        self.tabs.insert(tab, info);
    }

    pub fn remove(&self, tab: &TabId) {
        self.tabs.remove(tab);
    }

    pub fn get(&self, tab: &TabId) -> Option<SerpInfo> {
        self.tabs.get(tab).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, tab: &TabId) -> bool {
        self.tabs.contains_key(tab)
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn snapshot(&self) -> Vec<(TabId, SerpInfo)> {
        self.tabs
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Boundary handler for register messages. Any other message kind here
    /// is a wiring bug and surfaces loudly.
    pub fn handle_register(&self, message: SerpMessage) -> Result<(), SerpError> {
        match message {
            SerpMessage::RegisterSerp {
                tab,
                code,
                sap,
                url,
            } => {
                self.put(tab, SerpInfo { url, code, sap });
                Ok(())
            }
            other => Err(RegistryError::UnexpectedMessage {
                handler: "register-serp",
                got: other.name(),
            }
            .into_serp_error()),
        }
    }

    /// Boundary handler for deregister messages; see [`Self::handle_register`].
    pub fn handle_deregister(&self, message: SerpMessage) -> Result<(), SerpError> {
        match message {
            SerpMessage::DeregisterSerp { tab, .. } => {
                self.remove(&tab);
                Ok(())
            }
            other => Err(RegistryError::UnexpectedMessage {
                handler: "deregister-serp",
                got: other.name(),
            }
            .into_serp_error()),
        }
    }
}
