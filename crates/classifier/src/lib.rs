//! Request classification for the gateway.
//!
//! [`Classifier::classify`] turns a URL (plus optional request metadata) into
//! a [`ClassificationResult`] through a staged pipeline: protocol scheme,
//! URL signature patterns, weighted heuristics, with a whitelist override
//! that can only ever reduce blocking. The pipeline is pure with respect to
//! statistics and never fails on malformed input — an unparseable URL falls
//! back to coarse prefix checks at reduced confidence.

pub mod result;
pub mod tables;

use arc_swap::ArcSwap;
use std::sync::Arc;
use url::Url;

use offgate_common::{ClassifierConfig, RequestMeta};

pub use result::{ClassificationResult, MatchType};
pub use tables::ClassifierTables;

use tables::{
    HEURISTIC_THRESHOLD, ID_FALLBACK, INJECTOR_HOST_SHAPE, INJECTOR_PATH_SEGMENTS,
    INJECTOR_QUERY_PARAMS, WEIGHT_HOST_SHAPE, WEIGHT_INITIATOR_SCHEME, WEIGHT_PATH_SEGMENT,
    WEIGHT_QUERY_PARAM,
};

pub struct Classifier {
    enabled: bool,
    whitelist_enabled: bool,
    tables: ArcSwap<ClassifierTables>,
}

impl Classifier {
    /// Create a classifier with the built-in tables extended by `config`.
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            enabled: config.enabled,
            whitelist_enabled: config.whitelist_enabled,
            tables: ArcSwap::from_pointee(ClassifierTables::from_config(config)),
        }
    }

    /// Replace the table set. Intended for tests and diagnostics; the
    /// pipeline itself never mutates tables.
    pub fn swap_tables(&self, tables: ClassifierTables) {
        tracing::debug!(
            schemes = tables.schemes.len(),
            patterns = tables.patterns.len(),
            "replacing classifier tables"
        );
        self.tables.store(Arc::new(tables));
    }

    /// Classify `url`. Never panics and never returns an error: malformed
    /// input degrades to prefix checks and a best-effort result.
    pub fn classify(&self, url: &str, meta: Option<&RequestMeta>) -> ClassificationResult {
        if !self.enabled {
            return ClassificationResult::no_match("classifier disabled");
        }
        if url.is_empty() {
            return ClassificationResult::no_match("empty url");
        }

        let tables = self.tables.load();

        // Whitelist override: recognized-legitimate injected resources are
        // reported as matches but never blocked.
        if self.whitelist_enabled {
            if let Some(prefix) = tables.allowed_prefixes.iter().find(|p| url.starts_with(p.as_str())) {
                return ClassificationResult {
                    is_match: true,
                    match_type: MatchType::Whitelist,
                    match_id: extract_id(url),
                    origin_kind: scheme_origin_kind(url, &tables),
                    should_block: false,
                    reason: format!("whitelisted injected resource ({})", prefix),
                    confidence: 100,
                };
            }
        }

        if let Some(result) = self.protocol_stage(url, &tables) {
            return result;
        }
        if let Some(result) = self.pattern_stage(url, &tables) {
            return result;
        }
        if let Some(result) = self.heuristic_stage(url, meta, &tables) {
            return result;
        }

        ClassificationResult::no_match("no injection signature")
    }

    /// Stage 1: known non-network injection schemes, confidence 90-100.
    fn protocol_stage(&self, url: &str, tables: &ClassifierTables) -> Option<ClassificationResult> {
        let entry = tables
            .schemes
            .iter()
            .find(|s| scheme_matches(url, s.scheme))?;

        let parsed_host = Url::parse(url).ok().and_then(|u| u.host_str().map(String::from));
        let parse_failed = parsed_host.is_none();
        let match_id = parsed_host.or_else(|| fallback_id(url));

        let known_bad = match_id
            .as_deref()
            .map(|id| tables.blocked_ids.contains(id))
            .unwrap_or(false);

        let (confidence, reason) = if known_bad {
            (
                100,
                format!(
                    "{} scheme with known-problematic injector id {}",
                    entry.scheme,
                    match_id.as_deref().unwrap_or_default()
                ),
            )
        } else if parse_failed {
            tracing::warn!(url = %url, scheme = entry.scheme, "url parse failed, falling back to scheme prefix match");
            (
                entry.confidence.saturating_sub(5),
                format!("{} scheme detected (unparseable url, prefix match)", entry.scheme),
            )
        } else {
            (entry.confidence, format!("{} scheme detected", entry.scheme))
        };

        Some(ClassificationResult {
            is_match: true,
            match_type: MatchType::Protocol,
            match_id,
            origin_kind: Some(entry.origin_kind.to_string()),
            should_block: true,
            reason,
            confidence,
        })
    }

    /// Stage 2: injected-resource URL signatures, confidence 75-80. First
    /// matching pattern wins; no accumulation across patterns.
    fn pattern_stage(&self, url: &str, tables: &ClassifierTables) -> Option<ClassificationResult> {
        let pattern = tables.patterns.iter().find(|p| p.regex.is_match(url))?;

        Some(ClassificationResult {
            is_match: true,
            match_type: MatchType::Pattern,
            match_id: extract_id(url).filter(|id| INJECTOR_HOST_SHAPE.is_match(id)),
            origin_kind: None,
            should_block: true,
            reason: format!("matched injected-resource signature: {}", pattern.name),
            confidence: pattern.confidence,
        })
    }

    /// Stage 3: weighted indicators; qualifies only when the accumulated
    /// score clears the threshold. The reason lists every indicator that
    /// fired, comma-joined, for auditability.
    fn heuristic_stage(
        &self,
        url: &str,
        meta: Option<&RequestMeta>,
        tables: &ClassifierTables,
    ) -> Option<ClassificationResult> {
        let parsed = Url::parse(url).ok();
        let host = parsed
            .as_ref()
            .and_then(|u| u.host_str().map(String::from))
            .or_else(|| fallback_id(url));
        let path = parsed
            .as_ref()
            .map(|u| u.path().to_string())
            .unwrap_or_else(|| url.to_string());

        let mut score: u32 = 0;
        let mut indicators: Vec<String> = Vec::new();
        let mut match_id: Option<String> = None;

        if let Some(h) = host.as_deref() {
            if INJECTOR_HOST_SHAPE.is_match(h) {
                score += WEIGHT_HOST_SHAPE;
                indicators.push("hostname matches injector id shape".to_string());
                match_id = Some(h.to_string());
            }
        }

        if INJECTOR_PATH_SEGMENTS.iter().any(|seg| path.contains(seg)) {
            score += WEIGHT_PATH_SEGMENT;
            indicators.push("path contains injector directory segment".to_string());
        }

        if let Some(u) = parsed.as_ref() {
            if let Some((key, value)) = u
                .query_pairs()
                .find(|(k, _)| INJECTOR_QUERY_PARAMS.contains(&k.as_ref()))
            {
                score += WEIGHT_QUERY_PARAM;
                indicators.push(format!("query parameter {} names an injector id", key));
                if match_id.is_none() && !value.is_empty() {
                    match_id = Some(value.into_owned());
                }
            }
        }

        if let Some(initiator) = meta.and_then(|m| m.initiator.as_deref()) {
            if tables.schemes.iter().any(|s| scheme_matches(initiator, s.scheme)) {
                score += WEIGHT_INITIATOR_SCHEME;
                indicators.push("initiator carries an injection scheme".to_string());
            }
        }

        if score < HEURISTIC_THRESHOLD {
            return None;
        }

        Some(ClassificationResult {
            is_match: true,
            match_type: MatchType::Heuristic,
            match_id,
            origin_kind: None,
            should_block: true,
            reason: indicators.join(", "),
            confidence: score.min(100) as u8,
        })
    }
}

fn scheme_matches(url: &str, scheme: &str) -> bool {
    url.len() > scheme.len() + 1
        && url[..scheme.len()].eq_ignore_ascii_case(scheme)
        && url[scheme.len()..].starts_with(':')
}

fn fallback_id(url: &str) -> Option<String> {
    ID_FALLBACK
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Structured extraction first, regex fallback when parsing yields no host.
fn extract_id(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(String::from))
        .or_else(|| fallback_id(url))
}

fn scheme_origin_kind(url: &str, tables: &ClassifierTables) -> Option<String> {
    tables
        .schemes
        .iter()
        .find(|s| scheme_matches(url, s.scheme))
        .map(|s| s.origin_kind.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::new(&ClassifierConfig::default())
    }

    #[test]
    fn test_known_bad_extension_blocked_at_full_confidence() {
        let result = classifier().classify(
            "chrome-extension://bhhhlbepdkbapadjdnnojkbgioiodbic/background.js",
            None,
        );
        assert!(result.is_match);
        assert!(result.should_block);
        assert_eq!(result.match_type, MatchType::Protocol);
        assert!(result.confidence >= 95);
        assert_eq!(
            result.match_id.as_deref(),
            Some("bhhhlbepdkbapadjdnnojkbgioiodbic")
        );
        assert_eq!(result.origin_kind.as_deref(), Some("chromium-extension"));
    }

    #[test]
    fn test_ordinary_cdn_script_not_matched() {
        let result = classifier().classify("https://cdn.example.com/app/bundle.js", None);
        assert!(!result.is_match);
        assert!(!result.should_block);
        assert_eq!(result.confidence, 0);
    }

    #[test]
    fn test_protocol_outranks_pattern() {
        // URL matches both the scheme table and the content-script signature.
        let result = classifier().classify(
            "moz-extension://aaaabbbbccccddddeeeeffffgggghhhh/content_script.js",
            None,
        );
        assert_eq!(result.match_type, MatchType::Protocol);
        assert!(result.confidence >= 90);
    }

    #[test]
    fn test_pattern_stage_fires_on_https_signature() {
        let result = classifier().classify("https://things.test/js/injected.js", None);
        assert_eq!(result.match_type, MatchType::Pattern);
        assert!(result.should_block);
        assert!((75..=80).contains(&result.confidence));
        assert!(result.reason.contains("injected-script"));
    }

    #[test]
    fn test_heuristic_single_weak_indicator_below_threshold() {
        // Path segment alone scores 25, below the 50 threshold.
        let result = classifier().classify("https://cdn.example.com/injected/helper.css", None);
        assert!(!result.is_match);
    }

    #[test]
    fn test_heuristic_combined_indicators_match() {
        let result = classifier().classify(
            "https://abcdefghijabcdefghijabcdefghijab.test.invalid/injected/payload.css",
            None,
        );
        // 32-char host shape fires only for bare hostnames; use query + path instead.
        let result2 = classifier().classify(
            "https://cdn.example.com/injected/payload.css?ext_id=bhhhlbepdkbapadjdnnojkbgioiodbic",
            None,
        );
        assert!(!result.is_match);
        assert!(!result2.is_match); // 25 + 20 = 45, still below threshold

        let meta = RequestMeta {
            initiator: Some("chrome-extension://aaaabbbbccccddddeeeeffffgggghhhh".to_string()),
        };
        let result3 = classifier().classify(
            "https://cdn.example.com/injected/payload.css?ext_id=bhhhlbepdkbapadjdnnojkbgioiodbic",
            Some(&meta),
        );
        assert!(result3.is_match);
        assert_eq!(result3.match_type, MatchType::Heuristic);
        assert!(result3.confidence >= 50);
        assert!(result3.reason.contains("injector directory segment"));
        assert!(result3.reason.contains("injection scheme"));
        assert_eq!(
            result3.match_id.as_deref(),
            Some("bhhhlbepdkbapadjdnnojkbgioiodbic")
        );
    }

    #[test]
    fn test_bare_injector_hostname_with_initiator() {
        let meta = RequestMeta {
            initiator: Some("moz-extension://aaaabbbbccccddddeeeeffffgggghhhh".to_string()),
        };
        let result = classifier().classify(
            "https://abcdefghijklmnopqrstuvwxyzabcdef/track.gif",
            Some(&meta),
        );
        assert!(result.is_match);
        assert_eq!(result.match_type, MatchType::Heuristic);
        assert_eq!(
            result.match_id.as_deref(),
            Some("abcdefghijklmnopqrstuvwxyzabcdef")
        );
    }

    #[test]
    fn test_whitelist_reduces_blocking_only() {
        let url = "chrome-extension://nngceckbapebfimnlniiiahkandclblb/overlay.js";

        let with_whitelist = classifier().classify(url, None);
        assert!(with_whitelist.is_match);
        assert!(!with_whitelist.should_block);
        assert_eq!(with_whitelist.match_type, MatchType::Whitelist);
        assert_eq!(with_whitelist.confidence, 100);

        let config = ClassifierConfig {
            whitelist_enabled: false,
            ..ClassifierConfig::default()
        };
        let without = Classifier::new(&config).classify(url, None);
        assert!(without.should_block);
        assert_eq!(without.match_type, MatchType::Protocol);
    }

    #[test]
    fn test_whitelist_never_blocks_unmatched_urls() {
        let url = "https://cdn.example.com/app/bundle.js";
        let enabled = classifier().classify(url, None);
        let config = ClassifierConfig {
            whitelist_enabled: false,
            ..ClassifierConfig::default()
        };
        let disabled = Classifier::new(&config).classify(url, None);
        assert!(!enabled.should_block);
        assert!(!disabled.should_block);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let c = classifier();
        let url = "chrome-extension://bhhhlbepdkbapadjdnnojkbgioiodbic/background.js";
        assert_eq!(c.classify(url, None), c.classify(url, None));
    }

    #[test]
    fn test_empty_and_data_urls_never_match() {
        let c = classifier();
        assert!(!c.classify("", None).is_match);
        assert!(!c.classify("data:text/html,<h1>hi</h1>", None).is_match);
    }

    #[test]
    fn test_unparseable_extension_url_degrades_gracefully() {
        // Spaces make Url::parse fail; the prefix check still fires.
        let result = classifier().classify("chrome-extension://bad id/some file.js", None);
        assert!(result.is_match);
        assert_eq!(result.match_type, MatchType::Protocol);
        assert!(result.confidence >= 90);
        assert!(result.should_block);
    }

    #[test]
    fn test_disabled_classifier_matches_nothing() {
        let config = ClassifierConfig {
            enabled: false,
            ..ClassifierConfig::default()
        };
        let c = Classifier::new(&config);
        let result = c.classify(
            "chrome-extension://bhhhlbepdkbapadjdnnojkbgioiodbic/background.js",
            None,
        );
        assert!(!result.is_match);
        assert!(!result.should_block);
    }

    #[test]
    fn test_swapped_tables_take_effect() {
        let c = classifier();
        let mut tables = ClassifierTables::default();
        tables.schemes.clear();
        tables.patterns.clear();
        c.swap_tables(tables);

        let result = c.classify(
            "chrome-extension://bhhhlbepdkbapadjdnnojkbgioiodbic/background.js",
            None,
        );
        assert!(!result.is_match);
    }

    #[test]
    fn test_invariants_hold_across_samples() {
        let c = classifier();
        let samples = [
            "",
            "data:image/png;base64,AAAA",
            "https://cdn.example.com/app/bundle.js",
            "chrome-extension://bhhhlbepdkbapadjdnnojkbgioiodbic/background.js",
            "https://things.test/js/injected.js",
            "chrome-extension://nngceckbapebfimnlniiiahkandclblb/overlay.js",
        ];
        for url in samples {
            let r = c.classify(url, None);
            assert!(!r.should_block || r.is_match, "should_block implies is_match: {}", url);
            assert!(r.confidence > 0 || r.match_type == MatchType::None, "confidence 0 implies none: {}", url);
            assert!(!r.reason.is_empty(), "reason always populated: {}", url);
        }
    }
}
