// Re-export modules
pub mod assets;
pub mod browser;
pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod results;
pub mod scrape;

// Re-export commonly used types for convenience
pub use config::ScrapeConfig;
pub use error::ScrapeError;
pub use results::{ScrapeResult, ScrapeStatus, Section, Warning};
pub use scrape::ScrapeRequest;

use crate::assets::fetcher::HttpFetcher;
use crate::scrape::Phase;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;

/// The scraper service: takes a `ScrapeRequest`, renders the page through a
/// WebDriver session, and returns the structured snapshot envelope.
///
/// Holds the shared HTTP client and the process-wide concurrency cap, so
/// construct one and reuse it across requests.
pub struct Scraper {
    config: ScrapeConfig,
    fetcher: Arc<HttpFetcher>,
    limiter: Arc<Semaphore>,
}

impl Scraper {
    /// Create a scraper from an explicit configuration value
    pub fn new(config: ScrapeConfig) -> Self {
        let fetcher = Arc::new(HttpFetcher::new(&config));
        let limiter = Arc::new(Semaphore::new(config.max_concurrent_scrapes.max(1)));
        Self {
            config,
            fetcher,
            limiter,
        }
    }

    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    /// Scrape one page to completion.
    ///
    /// The caller awaits the full envelope; there is no streaming. An `Err`
    /// means the request itself was malformed. Everything that goes wrong
    /// past validation lands in the envelope: `Failure` when the page never
    /// stabilized, `Partial` when any section or asset degraded.
    pub async fn scrape(&self, request: ScrapeRequest) -> Result<ScrapeResult, ScrapeError> {
        scrape::enter(Phase::Idle);
        let url = request.validate()?;

        // Cap concurrent scrapes to bound total browser memory. The budget
        // starts after the permit: queueing time is not the page's fault.
        let _permit = self
            .limiter
            .acquire()
            .await
            .expect("scrape limiter closed");

        let timeout_ms = request
            .timeout_ms
            .unwrap_or(self.config.default_timeout_ms);
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);

        scrape::enter(Phase::Stabilizing);
        let client = match browser::connect(&self.config.webdriver_url).await {
            Ok(client) => client,
            Err(e) => {
                ::log::error!("Scrape of {} failed before navigation: {}", url, e);
                return Ok(ScrapeResult::failed(
                    url.to_string(),
                    vec![Warning::new(Section::Page, e.to_string())],
                ));
            }
        };

        let stabilized = match browser::stabilize(client, &url, deadline, &self.config).await {
            Ok(stabilized) => stabilized,
            Err(e) => {
                let message = match &e {
                    ScrapeError::NavigationTimeout { .. } => {
                        format!("NavigationTimeout: {}", e)
                    }
                    _ => e.to_string(),
                };
                ::log::error!("Scrape of {} failed: {}", url, message);
                return Ok(ScrapeResult::failed(
                    url.to_string(),
                    vec![Warning::new(Section::Page, message)],
                ));
            }
        };

        let mut warnings = Vec::new();
        if stabilized.degraded {
            warnings.push(Warning::new(
                Section::Page,
                "stabilization degraded; proceeding with partial page state",
            ));
        }

        // No outer hard timeout here: every suspension point inside
        // run_sections is already bounded by the deadline, and a hard cut
        // would discard sections that completed before the budget ran out.
        // The worst-case overrun is one fetch sub-timeout.
        let (data, section_warnings) = scrape::run_sections(
            &stabilized.page,
            &request,
            &self.fetcher,
            &self.config,
            deadline,
        )
        .await;
        stabilized.page.close().await;

        warnings.extend(section_warnings);
        let result = ScrapeResult::finish(url.to_string(), data, warnings);
        ::log::info!(
            "Scrape of {} finished: {:?} with {} warnings",
            url,
            result.status,
            result.warnings.len()
        );
        Ok(result)
    }
}
