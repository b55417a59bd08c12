//! SERP detection core: URL classification and the per-tab state machine.
//!
//! [`classify`] is a pure function from a navigated-to URL to a
//! [`SerpClassification`] against the provider table. [`SerpTracker`] is the
//! per-tab state machine consuming navigation, page-load and unload signals
//! and deciding register/deregister transitions with strict idempotence:
//! at most one active SERP per tab, never two registrations for the same
//! navigation target in a row.

pub mod classify;
pub mod tracker;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use url::Url;

pub use classify::{classify, SerpClassification};
pub use tracker::{ActiveSerp, SerpTracker};

/// Flags delivered alongside a location change. Struct-of-bools rendition of
/// the host's location-change bitfield.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct LocationFlags {
    pub error_page: bool,
    pub same_document: bool,
}

/// What is known about the request behind a navigation. `Opaque` covers
/// non-HTTP channels and requests whose metadata cannot be inspected; such
/// navigations are ignored outright instead of probed and caught.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RequestInfo {
    Http,
    Opaque,
}

impl RequestInfo {
    pub fn is_inspectable(&self) -> bool {
        matches!(self, Self::Http)
    }
}

/// One top-of-stack navigation signal for a tab.
#[derive(Clone, Debug)]
pub struct Navigation {
    pub top_level: bool,
    pub flags: LocationFlags,
    pub request: RequestInfo,
    pub url: Url,
}

impl Navigation {
    /// A plain top-level HTTP navigation with no flags set.
    pub fn top_level(url: Url) -> Self {
        Self {
            top_level: true,
            flags: LocationFlags::default(),
            request: RequestInfo::Http,
            url,
        }
    }
}

/// A page-content-loaded signal, carrying the document URL and the raw
/// cookie header. Drives the cookie-gated registration path.
#[derive(Clone, Debug)]
pub struct PageLoad {
    pub top_level: bool,
    pub url: Url,
    pub cookies: String,
}

/// Decision produced by the state machine, to be translated into an
/// outbound message by the dispatcher.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum SerpEvent {
    Register {
        code: String,
        sap: String,
        url: String,
    },
    Deregister {
        url: String,
    },
}

/// Splits a raw cookie header into name/value pairs. Values keep any
/// embedded `=` (`SRCHS=PC=MOZI` parses to `SRCHS` -> `PC=MOZI`).
pub fn parse_cookies(header: &str) -> HashMap<String, String> {
    header
        .split(';')
        .filter_map(|part| {
            let (name, value) = part.trim().split_once('=')?;
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}
