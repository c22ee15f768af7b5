use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored or fabricated response: status, headers, body, and — for cached
/// entries — the time it was written. Snapshots are immutable once written
/// and replaced wholesale on refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    #[serde(default)]
    pub stored_at: Option<DateTime<Utc>>,
}

impl ResponseSnapshot {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
            stored_at: None,
        }
    }

    /// Exact-match success check: only 200 responses are cacheable.
    pub fn is_success(&self) -> bool {
        self.status == http::StatusCode::OK.as_u16()
    }

    /// First header value matching `name`, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Stamp the snapshot with the current time, marking it as stored.
    pub fn stamped(mut self) -> Self {
        self.stored_at = Some(Utc::now());
        self
    }

    /// Whether this snapshot was fabricated locally rather than fetched.
    pub fn is_synthetic(&self) -> bool {
        self.header(synthetic::SYNTHETIC_HEADER).is_some()
    }
}

/// Locally fabricated responses signalling terminal outcomes without ever
/// raising an error to the caller.
pub mod synthetic {
    use super::ResponseSnapshot;
    use bytes::Bytes;
    use http::StatusCode;

    /// Marker header present on every synthetic response.
    pub const SYNTHETIC_HEADER: &str = "x-offgate-synthetic";
    /// Header carrying the classifier's block reason on deny responses.
    pub const BLOCK_REASON_HEADER: &str = "x-offgate-block-reason";

    fn base(status: StatusCode, kind: &str, body: impl Into<bytes::Bytes>) -> ResponseSnapshot {
        ResponseSnapshot::new(
            status.as_u16(),
            vec![(SYNTHETIC_HEADER.to_string(), kind.to_string())],
            body,
        )
    }

    /// Empty-body deny response for blocked requests.
    pub fn deny(reason: &str) -> ResponseSnapshot {
        let mut resp = base(StatusCode::FORBIDDEN, "deny", Bytes::new());
        resp.headers
            .push((BLOCK_REASON_HEADER.to_string(), reason.to_string()));
        resp
    }

    /// Network-unreachable response used when a fetch fails and no cache can help.
    pub fn timeout() -> ResponseSnapshot {
        base(
            StatusCode::REQUEST_TIMEOUT,
            "timeout",
            Bytes::from_static(b"network error"),
        )
    }

    /// Distinct from `timeout`: the cache subsystem itself failed.
    pub fn store_failure() -> ResponseSnapshot {
        base(
            StatusCode::INTERNAL_SERVER_ERROR,
            "store-failure",
            Bytes::from_static(b"cache store unavailable"),
        )
    }

    /// This gateway never reaches a real backend API.
    pub fn api_not_found() -> ResponseSnapshot {
        let mut resp = base(
            StatusCode::NOT_FOUND,
            "api-not-found",
            Bytes::from_static(br#"{"error":"API not available offline"}"#),
        );
        resp.headers
            .push(("content-type".to_string(), "application/json".to_string()));
        resp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_200_is_success() {
        assert!(ResponseSnapshot::new(200, vec![], "ok").is_success());
        assert!(!ResponseSnapshot::new(204, vec![], "").is_success());
        assert!(!ResponseSnapshot::new(301, vec![], "").is_success());
        assert!(!ResponseSnapshot::new(404, vec![], "").is_success());
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let resp = ResponseSnapshot::new(200, vec![("Content-Type".into(), "text/html".into())], "");
        assert_eq!(resp.header("content-type"), Some("text/html"));
    }

    #[test]
    fn test_deny_response_shape() {
        let resp = synthetic::deny("protocol match");
        assert_eq!(resp.status, 403);
        assert!(resp.body.is_empty());
        assert_eq!(resp.header(synthetic::BLOCK_REASON_HEADER), Some("protocol match"));
        assert!(resp.is_synthetic());
    }

    #[test]
    fn test_synthetic_catalog_statuses() {
        assert_eq!(synthetic::timeout().status, 408);
        assert_eq!(synthetic::store_failure().status, 500);
        assert_eq!(synthetic::api_not_found().status, 404);
        assert_eq!(
            synthetic::api_not_found().header("content-type"),
            Some("application/json")
        );
    }

    #[test]
    fn test_stamped_sets_stored_at() {
        let resp = ResponseSnapshot::new(200, vec![], "body").stamped();
        assert!(resp.stored_at.is_some());
    }
}
