//! Trace replay harness for development and debugging.
//!
//! A trace is a JSON array of steps; each step is one inbound signal for a
//! named tab. Replaying a trace drives the full pipeline (dispatcher →
//! bus → registry) exactly as a live host would.

use anyhow::Context;
use serde::Deserialize;
use url::Url;

use serpwatch_core_types::TabId;
use serpwatch_detect::{LocationFlags, Navigation, PageLoad, RequestInfo};
use serpwatch_dispatch::EventDispatcher;

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceStep {
    Navigate {
        tab: String,
        url: String,
        #[serde(default = "default_true")]
        top_level: bool,
        #[serde(default)]
        error_page: bool,
        #[serde(default)]
        same_document: bool,
        #[serde(default)]
        opaque: bool,
    },
    PageLoad {
        tab: String,
        url: String,
        #[serde(default)]
        cookies: String,
        #[serde(default = "default_true")]
        top_level: bool,
    },
    Unload {
        tab: String,
    },
}

pub fn parse_trace(json: &str) -> anyhow::Result<Vec<TraceStep>> {
    serde_json::from_str(json).context("malformed trace file")
}

pub fn replay(dispatcher: &EventDispatcher, steps: &[TraceStep]) -> anyhow::Result<()> {
    for step in steps {
        match step {
            TraceStep::Navigate {
                tab,
                url,
                top_level,
                error_page,
                same_document,
                opaque,
            } => {
                let url = Url::parse(url).with_context(|| format!("bad url: {url}"))?;
                let nav = Navigation {
                    top_level: *top_level,
                    flags: LocationFlags {
                        error_page: *error_page,
                        same_document: *same_document,
                    },
                    request: if *opaque {
                        RequestInfo::Opaque
                    } else {
                        RequestInfo::Http
                    },
                    url,
                };
                dispatcher.on_location_change(&TabId::from(tab.as_str()), &nav);
            }
            TraceStep::PageLoad {
                tab,
                url,
                cookies,
                top_level,
            } => {
                let url = Url::parse(url).with_context(|| format!("bad url: {url}"))?;
                let load = PageLoad {
                    top_level: *top_level,
                    url,
                    cookies: cookies.clone(),
                };
                dispatcher.on_page_load(&TabId::from(tab.as_str()), &load);
            }
            TraceStep::Unload { tab } => {
                dispatcher.on_unload(&TabId::from(tab.as_str()));
            }
        }
    }
    Ok(())
}
