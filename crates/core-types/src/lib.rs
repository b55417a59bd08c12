use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Shared error type for the serpwatch crates.
#[derive(Debug, Error, Clone)]
pub enum SerpError {
    #[error("{message}")]
    Message { message: String },
}

impl SerpError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

/// Identity of a browser tab. Stable across navigations within the tab;
/// a new tab gets a new id.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct TabId(pub String);

impl TabId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for TabId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TabId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Messages crossing the boundary between the per-tab observers and the
/// process that owns the tab registry. Fixed schemas; receivers validate the
/// variant they were wired for and treat anything else as a wiring bug.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SerpMessage {
    RegisterSerp {
        tab: TabId,
        code: String,
        sap: String,
        url: String,
    },
    DeregisterSerp {
        tab: TabId,
        url: String,
    },
    Shutdown,
}

impl SerpMessage {
    /// Wire name of the message kind, used in logs and mismatch errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RegisterSerp { .. } => "register-serp",
            Self::DeregisterSerp { .. } => "deregister-serp",
            Self::Shutdown => "shutdown",
        }
    }
}
