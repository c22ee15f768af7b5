use serde::{Deserialize, Serialize};

/// Coarse destination of an intercepted request, used by routing and fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Document,
    Script,
    Style,
    Image,
    Font,
    Other,
}

impl Default for Destination {
    fn default() -> Self {
        Destination::Other
    }
}

/// Optional metadata accompanying a classification call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestMeta {
    /// Origin of whatever issued the request, when the transport knows it.
    pub initiator: Option<String>,
}

/// An outbound request as seen by the gateway.
///
/// Only read-style fetches pass through here; the gateway does not rewrite
/// bodies or support arbitrary verbs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRequest {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub destination: Destination,
    #[serde(default)]
    pub initiator: Option<String>,
}

impl GatewayRequest {
    /// Build a plain GET request for `url`.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            destination: Destination::Other,
            initiator: None,
        }
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_initiator(mut self, initiator: impl Into<String>) -> Self {
        self.initiator = Some(initiator.into());
        self
    }

    /// Normalized cache identity: method + URL.
    pub fn cache_key(&self) -> String {
        format!("{} {}", self.method.to_ascii_uppercase(), self.url)
    }

    /// Best-effort URL path. Falls back to scanning for the first slash after
    /// the authority when the URL does not parse.
    pub fn path(&self) -> String {
        if let Ok(parsed) = url::Url::parse(&self.url) {
            return parsed.path().to_string();
        }
        let rest = match self.url.find("//") {
            Some(idx) => &self.url[idx + 2..],
            None => self.url.as_str(),
        };
        match rest.find('/') {
            Some(idx) => rest[idx..]
                .split(|c| c == '?' || c == '#')
                .next()
                .unwrap_or("/")
                .to_string(),
            None => "/".to_string(),
        }
    }

    pub fn meta(&self) -> RequestMeta {
        RequestMeta {
            initiator: self.initiator.clone(),
        }
    }
}
