//! Pure URL classification against the provider table.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;
use url::Url;

use serpwatch_providers::{ProviderRegistry, ProviderRule};

/// Outcome of classifying a navigated-to URL.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum SerpClassification {
    /// Not a candidate at all: wrong scheme, no query/fragment, or an
    /// untracked host.
    Irrelevant,
    /// A tracked provider's page, but not a search we claim (no search
    /// parameter, or a code outside the accepted set).
    NonMatching,
    /// An attributable SERP.
    Matching { code: String, sap: String },
}

/// Classifies `url` against the provider table. Deterministic, no side
/// effects.
pub fn classify(url: &Url, providers: &ProviderRegistry) -> SerpClassification {
    if url.scheme() != "http" && url.scheme() != "https" {
        return SerpClassification::Irrelevant;
    }
    let query = url.query().unwrap_or("");
    let fragment = url.fragment().unwrap_or("");
    if query.is_empty() && fragment.is_empty() {
        return SerpClassification::Irrelevant;
    }
    let Some(host) = url.host_str() else {
        return SerpClassification::Irrelevant;
    };
    let Some(rule) = providers.lookup(host) else {
        return SerpClassification::Irrelevant;
    };
    classify_query(query, rule)
}

fn classify_query(query: &str, rule: &ProviderRule) -> SerpClassification {
    let query = if rule.lowercase_query {
        query.to_ascii_lowercase()
    } else {
        query.to_string()
    };
    let params: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();

    // Absent is not the same as present-but-empty: an absent search
    // parameter means this is not a search at all.
    if param(&params, &rule.search_param).is_none() {
        return SerpClassification::NonMatching;
    }

    let code = match param(&params, &rule.code_param) {
        Some(code) if rule.accepts_code(&code) => code,
        _ => return SerpClassification::NonMatching,
    };

    // The report override substitutes the attributed code but plays no part
    // in acceptance.
    let code = match &rule.report_param {
        Some(report_param) => match param(&params, report_param) {
            Some(value) if !value.is_empty() => value,
            _ => code,
        },
        None => code,
    };

    SerpClassification::Matching {
        code,
        sap: rule.sap.clone(),
    }
}

fn param(params: &[(String, String)], name: &str) -> Option<String> {
    params
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serpwatch_providers::ProviderRegistry;

    fn url(spec: &str) -> Url {
        Url::parse(spec).unwrap()
    }

    fn builtin() -> &'static ProviderRegistry {
        ProviderRegistry::builtin()
    }

    #[test]
    fn tagged_google_search_matches() {
        let result = classify(
            &url("https://www.google.com/?q=test&ie=utf-8&oe=utf-8&client=firefox-b"),
            builtin(),
        );
        assert_eq!(
            result,
            SerpClassification::Matching {
                code: "firefox-b".into(),
                sap: "google".into(),
            }
        );
    }

    #[test]
    fn untracked_host_is_irrelevant() {
        let result = classify(&url("https://www.yahoo.com/?p=test"), builtin());
        assert_eq!(result, SerpClassification::Irrelevant);
    }

    #[test]
    fn non_http_scheme_is_irrelevant() {
        let result = classify(&url("ftp://www.google.com/?q=test"), builtin());
        assert_eq!(result, SerpClassification::Irrelevant);
    }

    #[test]
    fn no_query_and_no_fragment_is_irrelevant() {
        let result = classify(&url("https://www.google.com/"), builtin());
        assert_eq!(result, SerpClassification::Irrelevant);
    }

    #[test]
    fn missing_search_param_is_non_matching() {
        let result = classify(
            &url("https://www.google.com/?fake=test&client=firefox-b"),
            builtin(),
        );
        assert_eq!(result, SerpClassification::NonMatching);
    }

    #[test]
    fn unaccepted_code_is_non_matching() {
        let result = classify(
            &url("https://www.google.com/?q=test&client=fake"),
            builtin(),
        );
        assert_eq!(result, SerpClassification::NonMatching);
    }

    #[test]
    fn absent_code_param_is_non_matching() {
        let result = classify(&url("https://www.google.com/?q=test"), builtin());
        assert_eq!(result, SerpClassification::NonMatching);
    }

    #[test]
    fn report_override_substitutes_the_attributed_code() {
        let result = classify(
            &url("https://search.yahoo.com/?p=test&hspart=mozilla&hsimp=yhs-001"),
            builtin(),
        );
        assert_eq!(
            result,
            SerpClassification::Matching {
                code: "yhs-001".into(),
                sap: "yahoo".into(),
            }
        );
    }

    #[test]
    fn empty_report_override_keeps_the_primary_code() {
        let result = classify(
            &url("https://search.yahoo.com/?p=test&hspart=mozilla&hsimp="),
            builtin(),
        );
        assert_eq!(
            result,
            SerpClassification::Matching {
                code: "mozilla".into(),
                sap: "yahoo".into(),
            }
        );
    }

    #[test]
    fn report_override_does_not_affect_acceptance() {
        // hsimp alone cannot make an unaccepted hspart match.
        let result = classify(
            &url("https://search.yahoo.com/?p=test&hspart=other&hsimp=yhs-001"),
            builtin(),
        );
        assert_eq!(result, SerpClassification::NonMatching);
    }

    #[test]
    fn bing_query_is_lowercased_before_parsing() {
        let result = classify(&url("https://www.bing.com/?Q=test&PC=MOZI"), builtin());
        assert_eq!(
            result,
            SerpClassification::Matching {
                code: "mozi".into(),
                sap: "bing".into(),
            }
        );
    }

    #[test]
    fn google_query_is_case_sensitive() {
        let result = classify(
            &url("https://www.google.com/?Q=test&client=firefox-b"),
            builtin(),
        );
        assert_eq!(result, SerpClassification::NonMatching);
    }

    #[test]
    fn fragment_only_url_on_tracked_host_reaches_query_rules() {
        // A fragment is enough to get past the candidate gate, but with no
        // query there is no search parameter.
        let result = classify(&url("https://www.google.com/#q=test"), builtin());
        assert_eq!(result, SerpClassification::NonMatching);
    }
}
