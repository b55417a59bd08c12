//! Per-tab SERP state machine.

use tracing::trace;
use url::Url;

use serpwatch_providers::ProviderRegistry;

use crate::{
    classify, parse_cookies, Navigation, PageLoad, SerpClassification, SerpEvent,
};

/// The currently registered SERP for a tab.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ActiveSerp {
    pub url: String,
    pub code: String,
    pub sap: String,
}

/// One tracker per tab. Holds the last registered SERP and guarantees the
/// at-most-one-active invariant: `active` is `Some` iff a register has been
/// emitted without a matching deregister.
///
/// Events for a tab are delivered serially, so the tracker needs no internal
/// locking.
#[derive(Debug, Default)]
pub struct SerpTracker {
    active: Option<ActiveSerp>,
}

impl SerpTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&ActiveSerp> {
        self.active.as_ref()
    }

    /// Applies a location change. Returns the transitions to emit, in order
    /// (a deregister for a still-open prior SERP always precedes any new
    /// register).
    pub fn on_navigation(
        &mut self,
        nav: &Navigation,
        providers: &ProviderRegistry,
    ) -> Vec<SerpEvent> {
        // Subframe navigations never touch tab state.
        if !nav.top_level {
            return Vec::new();
        }
        if !nav.request.is_inspectable() {
            trace!(url = %nav.url, "uninspectable request, ignoring navigation");
            return Vec::new();
        }
        let spec = nav.url.as_str();
        if self.is_reload(spec) {
            trace!(url = spec, "reload of active SERP, suppressing");
            return Vec::new();
        }

        // An error page is never a SERP, whatever its URL says.
        let classification = if nav.flags.error_page {
            SerpClassification::Irrelevant
        } else {
            classify(&nav.url, providers)
        };

        let mut events = self.close_active();
        if let SerpClassification::Matching { code, sap } = classification {
            events.push(SerpEvent::Register {
                code: code.clone(),
                sap: sap.clone(),
                url: spec.to_string(),
            });
            self.active = Some(ActiveSerp {
                url: spec.to_string(),
                code,
                sap,
            });
        }
        events
    }

    /// Applies a page-content-loaded signal for the cookie-gated path.
    /// Registration requires the provider's follow-on flag parameter in the
    /// query and the expected cookie value, on top of the usual candidate
    /// checks.
    pub fn on_page_load(
        &mut self,
        load: &PageLoad,
        providers: &ProviderRegistry,
    ) -> Vec<SerpEvent> {
        if !load.top_level {
            return Vec::new();
        }
        let url = &load.url;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Vec::new();
        }
        let spec = url.as_str();
        if self.is_reload(spec) {
            trace!(url = spec, "reload of active SERP, suppressing");
            return Vec::new();
        }
        let Some(rule) = url.host_str().and_then(|host| providers.lookup(host)) else {
            return Vec::new();
        };
        let Some(gate) = rule.follow_on.clone() else {
            return Vec::new();
        };
        if !follow_on_flag_set(url, rule.lowercase_query, &gate) {
            return Vec::new();
        }
        if parse_cookies(&load.cookies).get(&gate.cookie_name) != Some(&gate.cookie_value) {
            trace!(url = spec, "follow-on cookie absent or mismatched");
            return Vec::new();
        }
        let sap = rule.sap.clone();

        let mut events = self.close_active();
        events.push(SerpEvent::Register {
            code: gate.code.clone(),
            sap: sap.clone(),
            url: spec.to_string(),
        });
        self.active = Some(ActiveSerp {
            url: spec.to_string(),
            code: gate.code,
            sap,
        });
        events
    }

    /// Tab or frame teardown: closes out a still-open SERP. The tracker is
    /// discarded by the caller afterwards.
    pub fn on_unload(&mut self) -> Option<SerpEvent> {
        self.close_active().pop()
    }

    fn is_reload(&self, spec: &str) -> bool {
        self.active.as_ref().map(|a| a.url == spec).unwrap_or(false)
    }

    fn close_active(&mut self) -> Vec<SerpEvent> {
        match self.active.take() {
            Some(prev) => vec![SerpEvent::Deregister { url: prev.url }],
            None => Vec::new(),
        }
    }
}

fn follow_on_flag_set(
    url: &Url,
    lowercase_query: bool,
    gate: &serpwatch_providers::CookieFollowOn,
) -> bool {
    let Some(query) = url.query().filter(|q| !q.is_empty()) else {
        return false;
    };
    let query = if lowercase_query {
        query.to_ascii_lowercase()
    } else {
        query.to_string()
    };
    url::form_urlencoded::parse(query.as_bytes())
        .any(|(key, value)| key == gate.flag_param.as_str() && value == gate.flag_value.as_str())
}
