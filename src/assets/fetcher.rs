use crate::config::ScrapeConfig;
use crate::error::AssetError;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tokio::time::timeout;
use url::Url;

/// One asset's bytes plus what the server said about them
#[derive(Debug, Clone)]
pub struct FetchedAsset {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Single-attempt asset download. Abstracted so the pipeline can be tested
/// with deterministic in-memory fetchers.
pub trait AssetFetch: Send + Sync + 'static {
    /// Fetch the asset within `budget`. One attempt, no retries; any
    /// failure is isolated to the one record that owns this fetch.
    fn fetch(
        &self,
        url: &Url,
        budget: Duration,
    ) -> impl Future<Output = Result<FetchedAsset, AssetError>> + Send;
}

/// Production fetcher backed by a shared reqwest client
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &ScrapeConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .expect("HTTP client construction failed");
        Self { client }
    }
}

impl AssetFetch for HttpFetcher {
    async fn fetch(&self, url: &Url, budget: Duration) -> Result<FetchedAsset, AssetError> {
        if budget.is_zero() {
            return Err(AssetError::DeadlineExhausted);
        }

        let request = async {
            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| AssetError::Request(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(AssetError::HttpStatus(status.as_u16()));
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string());

            let bytes = response
                .bytes()
                .await
                .map_err(|e| AssetError::Request(e.to_string()))?;

            Ok(FetchedAsset {
                bytes: bytes.to_vec(),
                content_type,
            })
        };

        match timeout(budget, request).await {
            Ok(result) => result,
            Err(_) => Err(AssetError::Timeout),
        }
    }
}
