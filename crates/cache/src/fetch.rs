use async_trait::async_trait;

use offgate_common::{GatewayRequest, OffgateError, OffgateResult, ResponseSnapshot};

/// The network seam. Strategies and the lifecycle manager never talk to the
/// transport directly, so tests can substitute counting or failing fetchers.
///
/// Implementations impose no deadline of their own beyond what the
/// underlying transport already provides.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &GatewayRequest) -> OffgateResult<ResponseSnapshot>;
}

/// reqwest-backed fetcher used in production.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> OffgateResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent("offgate/0.1")
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| OffgateError::Fetch(format!("client construction failed: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &GatewayRequest) -> OffgateResult<ResponseSnapshot> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| OffgateError::Fetch(format!("invalid method {:?}: {}", request.method, e)))?;

        let response = self
            .client
            .request(method, &request.url)
            .send()
            .await
            .map_err(|e| OffgateError::Fetch(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| OffgateError::Fetch(e.to_string()))?;

        Ok(ResponseSnapshot::new(status, headers, body))
    }
}
