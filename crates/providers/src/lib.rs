//! Static per-provider rules for SERP detection.
//!
//! Each tracked search provider contributes one [`ProviderRule`] describing
//! how a results-page URL for that provider carries its attribution code.
//! The built-in table covers the tracked deployment providers; tests build
//! their own tables with custom rules.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Cookie-gated follow-on registration used by providers whose follow-on
/// searches are only attributable through a cookie, not the URL alone.
/// The page-load path registers when the flag query parameter and the cookie
/// both carry the expected values.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CookieFollowOn {
    /// Query parameter that marks a follow-on search (e.g. `form`).
    pub flag_param: String,
    /// Required value of `flag_param`.
    pub flag_value: String,
    /// Cookie to inspect (e.g. `SRCHS`).
    pub cookie_name: String,
    /// Required cookie value (e.g. `PC=MOZI`).
    pub cookie_value: String,
    /// Code to attribute when the gate passes.
    pub code: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderRule {
    /// SAP label identifying the provider/channel.
    pub sap: String,
    /// Hosts matched exactly.
    pub hosts: Vec<String>,
    /// Optional suffix match, covering locale subdomains
    /// (e.g. `search.yahoo.com` also matches `de.search.yahoo.com`).
    pub host_suffix: Option<String>,
    /// Query parameter whose presence marks a real search.
    pub search_param: String,
    /// Query parameter carrying the attribution code.
    pub code_param: String,
    /// Optional query parameter that overrides the reported code when set.
    pub report_param: Option<String>,
    /// Codes this deployment claims.
    pub codes: Vec<String>,
    /// Lower-case the whole query string before parsing. Per-provider
    /// option, not a universal rule.
    pub lowercase_query: bool,
    /// Optional cookie-gated follow-on path.
    pub follow_on: Option<CookieFollowOn>,
}

impl ProviderRule {
    pub fn matches_host(&self, host: &str) -> bool {
        if self.hosts.iter().any(|h| h == host) {
            return true;
        }
        match &self.host_suffix {
            Some(suffix) => {
                host == suffix || host.ends_with(&format!(".{suffix}"))
            }
            None => false,
        }
    }

    pub fn accepts_code(&self, code: &str) -> bool {
        self.codes.iter().any(|c| c == code)
    }
}

/// Immutable lookup table from host to provider rule. Loaded once.
#[derive(Clone, Debug, Default)]
pub struct ProviderRegistry {
    rules: Vec<ProviderRule>,
}

impl ProviderRegistry {
    pub fn new(rules: Vec<ProviderRule>) -> Self {
        Self { rules }
    }

    pub fn lookup(&self, host: &str) -> Option<&ProviderRule> {
        self.rules.iter().find(|rule| rule.matches_host(host))
    }

    pub fn rules(&self) -> &[ProviderRule] {
        &self.rules
    }

    /// The compiled-in table of tracked providers.
    pub fn builtin() -> &'static ProviderRegistry {
        static BUILTIN: Lazy<ProviderRegistry> =
            Lazy::new(|| ProviderRegistry::new(builtin_rules()));
        &BUILTIN
    }
}

fn builtin_rules() -> Vec<ProviderRule> {
    vec![
        ProviderRule {
            sap: "google".into(),
            hosts: [
                "www.google.com",
                "www.google.ac",
                "www.google.ad",
                "www.google.ae",
                "www.google.at",
                "www.google.ca",
                "www.google.ch",
                "www.google.co.uk",
                "www.google.com.au",
                "www.google.com.br",
                "www.google.com.mx",
                "www.google.de",
                "www.google.es",
                "www.google.fr",
                "www.google.it",
                "www.google.nl",
                "www.google.pl",
                "www.google.ru",
            ]
            .iter()
            .map(|h| h.to_string())
            .collect(),
            host_suffix: None,
            search_param: "q".into(),
            code_param: "client".into(),
            report_param: None,
            codes: vec!["firefox-b".into(), "firefox-b-ab".into()],
            lowercase_query: false,
            follow_on: None,
        },
        ProviderRule {
            sap: "yahoo".into(),
            hosts: vec!["search.yahoo.com".into()],
            host_suffix: Some("search.yahoo.com".into()),
            search_param: "p".into(),
            code_param: "hspart".into(),
            report_param: Some("hsimp".into()),
            codes: vec!["mozilla".into()],
            lowercase_query: false,
            follow_on: None,
        },
        ProviderRule {
            sap: "bing".into(),
            hosts: vec!["www.bing.com".into()],
            host_suffix: None,
            search_param: "q".into(),
            code_param: "pc".into(),
            report_param: None,
            codes: vec!["mozi".into()],
            lowercase_query: true,
            follow_on: Some(CookieFollowOn {
                flag_param: "form".into(),
                flag_value: "qbre".into(),
                cookie_name: "SRCHS".into(),
                cookie_value: "PC=MOZI".into(),
                code: "MOZI".into(),
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_resolves_exact_hosts() {
        let registry = ProviderRegistry::builtin();
        assert_eq!(registry.lookup("www.google.com").unwrap().sap, "google");
        assert_eq!(registry.lookup("www.bing.com").unwrap().sap, "bing");
        assert!(registry.lookup("www.example.com").is_none());
    }

    #[test]
    fn yahoo_locale_subdomains_match_by_suffix() {
        let registry = ProviderRegistry::builtin();
        assert_eq!(registry.lookup("search.yahoo.com").unwrap().sap, "yahoo");
        assert_eq!(registry.lookup("de.search.yahoo.com").unwrap().sap, "yahoo");
        // Suffix match requires a dot boundary.
        assert!(registry.lookup("evilsearch.yahoo.com").is_none());
    }

    #[test]
    fn accepted_codes_are_exact_strings() {
        let rule = ProviderRegistry::builtin().lookup("www.google.com").unwrap();
        assert!(rule.accepts_code("firefox-b"));
        assert!(rule.accepts_code("firefox-b-ab"));
        assert!(!rule.accepts_code("fake"));
        assert!(!rule.accepts_code("Firefox-B"));
    }

    #[test]
    fn bing_carries_the_cookie_gate() {
        let rule = ProviderRegistry::builtin().lookup("www.bing.com").unwrap();
        assert!(rule.lowercase_query);
        let gate = rule.follow_on.as_ref().unwrap();
        assert_eq!(gate.flag_param, "form");
        assert_eq!(gate.cookie_value, "PC=MOZI");
    }
}
