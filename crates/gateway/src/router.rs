use offgate_cache::StrategyKind;

/// Which named store a routed strategy runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorePurpose {
    Static,
    Dynamic,
}

/// Outcome of routing a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Strategy {
        kind: StrategyKind,
        purpose: StorePurpose,
    },
    /// API paths never reach a real backend from here.
    SyntheticNotFound,
}

/// Script/style/font families served cache-first from the static store.
const STATIC_ASSET_EXTENSIONS: &[&str] = &["js", "mjs", "css", "woff", "woff2", "ttf", "otf", "eot"];

/// Image families, also cache-first/static.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "webp", "ico", "avif"];

/// Path segment denoting the API namespace.
const API_SEGMENT: &str = "/api/";

fn extension(path: &str) -> Option<&str> {
    let last_segment = path.rsplit('/').next().unwrap_or(path);
    match last_segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}

/// Map a request path to a serving decision. Rules are evaluated in order;
/// anything that is not a recognized asset or an API path is treated as a
/// navigational request and served stale-while-revalidate from the dynamic
/// store.
pub fn route(path: &str) -> RouteDecision {
    let lower = path.to_ascii_lowercase();

    if let Some(ext) = extension(&lower) {
        if STATIC_ASSET_EXTENSIONS.contains(&ext) || IMAGE_EXTENSIONS.contains(&ext) {
            return RouteDecision::Strategy {
                kind: StrategyKind::CacheFirst,
                purpose: StorePurpose::Static,
            };
        }
    }

    if lower.contains(API_SEGMENT) || lower.ends_with("/api") {
        return RouteDecision::SyntheticNotFound;
    }

    RouteDecision::Strategy {
        kind: StrategyKind::StaleWhileRevalidate,
        purpose: StorePurpose::Dynamic,
    }
}
