use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use offgate_common::ClassifierConfig;

/// A known non-network injection scheme and how to report it.
#[derive(Debug, Clone)]
pub struct SchemeEntry {
    pub scheme: &'static str,
    pub origin_kind: &'static str,
    /// Base confidence when the injector id is not on the deny list.
    pub confidence: u8,
}

/// A compiled injected-resource signature.
#[derive(Debug, Clone)]
pub struct PatternEntry {
    pub name: &'static str,
    pub regex: Regex,
    pub confidence: u8,
}

/// Injection schemes, most specific first. Confidence 90-95 by specificity;
/// a deny-listed id pins it to 100.
pub static INJECTION_SCHEMES: Lazy<Vec<SchemeEntry>> = Lazy::new(|| {
    vec![
        SchemeEntry { scheme: "chrome-extension", origin_kind: "chromium-extension", confidence: 95 },
        SchemeEntry { scheme: "moz-extension", origin_kind: "firefox-extension", confidence: 94 },
        SchemeEntry { scheme: "safari-web-extension", origin_kind: "safari-extension", confidence: 93 },
        SchemeEntry { scheme: "ms-browser-extension", origin_kind: "edge-extension", confidence: 92 },
        SchemeEntry { scheme: "edge-extension", origin_kind: "edge-extension", confidence: 91 },
        SchemeEntry { scheme: "opera-extension", origin_kind: "chromium-extension", confidence: 90 },
    ]
});

/// Injector ids known to spray requests into foreign pages.
pub static KNOWN_BAD_IDS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "bhhhlbepdkbapadjdnnojkbgioiodbic",
        "fheoggkfdfchfphceeifdbepaooicaho",
        "gomekmidlodglbbmalcneegieacbdmki",
        "efaidnbmnnnibpcajpcglclefindmkaj",
        "mhjfbmdgcfjbbpaeojofohoefgiehjai",
    ]
});

/// Resource shapes typical of injected extension assets.
pub static INJECTED_RESOURCE_PATTERNS: Lazy<Vec<PatternEntry>> = Lazy::new(|| {
    vec![
        PatternEntry {
            name: "content-script",
            regex: Regex::new(r"/(content[_-]?scripts?|contentScript)[^/]*\.js($|[?#])")
                .expect("invalid content-script pattern"),
            confidence: 80,
        },
        PatternEntry {
            name: "injected-script",
            regex: Regex::new(r"/inject(ed)?([_-][^/]*)?\.js($|[?#])")
                .expect("invalid injected-script pattern"),
            confidence: 78,
        },
        PatternEntry {
            name: "square-icon-asset",
            regex: Regex::new(r"/icons?/[^/]*\b(16|19|32|38|48|128)(x(16|19|32|38|48|128))?\.(png|svg)($|[?#])")
                .expect("invalid icon-asset pattern"),
            confidence: 76,
        },
        PatternEntry {
            name: "locale-message-bundle",
            regex: Regex::new(r"/_locales/[A-Za-z_\-]+/messages\.json($|[?#])")
                .expect("invalid locale-bundle pattern"),
            confidence: 75,
        },
    ]
});

/// Injected-resource prefixes known to belong to legitimate tooling.
pub static KNOWN_GOOD_PREFIXES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        // Password managers commonly inject into every page.
        "chrome-extension://nngceckbapebfimnlniiiahkandclblb/",
        "chrome-extension://hdokiejnpimakedhajhdlcegeplioahd/",
    ]
});

/// Hostname shaped like a chromium injector id: fixed-length lowercase token.
pub static INJECTOR_HOST_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]{32}$").expect("invalid injector host shape"));

/// Fallback id extraction when structured URL parsing yields no hostname.
pub static ID_FALLBACK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"://([A-Za-z0-9_\-]+)").expect("invalid id fallback pattern"));

/// Heuristic indicator weights; a request qualifies as a match only when the
/// accumulated score clears [`HEURISTIC_THRESHOLD`].
pub const WEIGHT_HOST_SHAPE: u32 = 40;
pub const WEIGHT_PATH_SEGMENT: u32 = 25;
pub const WEIGHT_QUERY_PARAM: u32 = 20;
pub const WEIGHT_INITIATOR_SCHEME: u32 = 40;
pub const HEURISTIC_THRESHOLD: u32 = 50;

/// Path segments typical of injector-served directories.
pub const INJECTOR_PATH_SEGMENTS: &[&str] = &[
    "/content_scripts/",
    "/content-scripts/",
    "/injected/",
    "/web_accessible_resources/",
];

/// Query parameters naming an injector id.
pub const INJECTOR_QUERY_PARAMS: &[&str] = &["ext_id", "extension_id", "injector_id"];

/// The full table set the classifier evaluates against. Loaded once at
/// startup and swappable, so tests can substitute smaller tables without
/// touching the pipeline.
#[derive(Debug, Clone)]
pub struct ClassifierTables {
    pub schemes: Vec<SchemeEntry>,
    pub blocked_ids: HashSet<String>,
    pub patterns: Vec<PatternEntry>,
    pub allowed_prefixes: Vec<String>,
}

impl ClassifierTables {
    /// Built-in tables extended by the configured deny/allow additions.
    pub fn from_config(config: &ClassifierConfig) -> Self {
        let mut blocked_ids: HashSet<String> =
            KNOWN_BAD_IDS.iter().map(|id| id.to_string()).collect();
        blocked_ids.extend(config.extra_blocked_ids.iter().cloned());

        let mut allowed_prefixes: Vec<String> =
            KNOWN_GOOD_PREFIXES.iter().map(|p| p.to_string()).collect();
        allowed_prefixes.extend(config.extra_allowed_prefixes.iter().cloned());

        Self {
            schemes: INJECTION_SCHEMES.clone(),
            blocked_ids,
            patterns: INJECTED_RESOURCE_PATTERNS.clone(),
            allowed_prefixes,
        }
    }
}

impl Default for ClassifierTables {
    fn default() -> Self {
        Self::from_config(&ClassifierConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns_compile_and_match_expected_shapes() {
        let patterns = &*INJECTED_RESOURCE_PATTERNS;
        let hit = |url: &str| patterns.iter().find(|p| p.regex.is_match(url)).map(|p| p.name);

        assert_eq!(hit("https://x.test/js/content_script.js"), Some("content-script"));
        assert_eq!(hit("https://x.test/assets/injected.js"), Some("injected-script"));
        assert_eq!(hit("https://x.test/icons/icon48.png"), Some("square-icon-asset"));
        assert_eq!(hit("https://x.test/icons/19x19.png"), Some("square-icon-asset"));
        assert_eq!(hit("https://x.test/_locales/en_US/messages.json"), Some("locale-message-bundle"));
        assert_eq!(hit("https://cdn.example.com/app/bundle.js"), None);
        assert_eq!(hit("https://x.test/icons/banner-600x200.png"), None);
    }

    #[test]
    fn test_config_extends_tables() {
        let config = ClassifierConfig {
            extra_blocked_ids: vec!["aaaabbbbccccddddeeeeffffgggghhhh".to_string()],
            extra_allowed_prefixes: vec!["chrome-extension://trusted/".to_string()],
            ..ClassifierConfig::default()
        };
        let tables = ClassifierTables::from_config(&config);
        assert!(tables.blocked_ids.contains("aaaabbbbccccddddeeeeffffgggghhhh"));
        assert!(tables.blocked_ids.contains("bhhhlbepdkbapadjdnnojkbgioiodbic"));
        assert!(tables
            .allowed_prefixes
            .iter()
            .any(|p| p == "chrome-extension://trusted/"));
    }

    #[test]
    fn test_host_shape_requires_exact_token() {
        assert!(INJECTOR_HOST_SHAPE.is_match("bhhhlbepdkbapadjdnnojkbgioiodbic"));
        assert!(!INJECTOR_HOST_SHAPE.is_match("cdn.example.com"));
        assert!(!INJECTOR_HOST_SHAPE.is_match("bhhhlbepdkbapadjdnnojkbgioiodbicX"));
    }
}
