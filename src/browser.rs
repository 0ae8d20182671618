use crate::config::ScrapeConfig;
use crate::error::{BrowserError, ScrapeError};
use fantoccini::{Client, ClientBuilder};
use serde_json::Value;
use std::time::Duration;
use tokio::time::{Instant, sleep, timeout};
use url::Url;

/// Read-only capability over a rendered page.
///
/// Extractors receive a shared borrow for the duration of one scrape and
/// may query but never mutate. The production implementation is backed by
/// a WebDriver session; tests substitute an in-memory page.
pub trait RenderedPage: Send + Sync {
    /// Base URL relative references resolve against
    fn base_url(&self) -> &Url;

    /// Serialized DOM snapshot of the current document
    fn source(&self) -> impl Future<Output = Result<String, BrowserError>> + Send;

    /// Run a read-only script in the page and return its JSON result
    fn execute(&self, script: &str) -> impl Future<Output = Result<Value, BrowserError>> + Send;
}

/// A stabilized page held open for the duration of one scrape
pub struct WebDriverPage {
    client: Client,
    base_url: Url,
}

impl WebDriverPage {
    /// Close the underlying browser session
    pub async fn close(self) {
        if let Err(e) = self.client.close().await {
            ::log::warn!("Failed to close WebDriver session: {}", e);
        }
    }
}

impl RenderedPage for WebDriverPage {
    fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn source(&self) -> Result<String, BrowserError> {
        Ok(self.client.source().await?)
    }

    async fn execute(&self, script: &str) -> Result<Value, BrowserError> {
        Ok(self.client.execute(script, vec![]).await?)
    }
}

/// Connects to the WebDriver instance, trying common fallback ports if the
/// configured URL is unreachable
pub async fn connect(webdriver_url: &str) -> Result<Client, BrowserError> {
    match ClientBuilder::native().connect(webdriver_url).await {
        Ok(client) => {
            ::log::debug!("Connected to WebDriver at {}", webdriver_url);
            return Ok(client);
        }
        Err(e) => {
            ::log::error!("Failed to connect to WebDriver at {}: {}", webdriver_url, e);
        }
    }

    let fallback_urls = [
        "http://localhost:9515", // ChromeDriver default
        "http://localhost:4444", // Selenium/geckodriver default
        "http://127.0.0.1:4444", // Try with IP instead of localhost
    ];

    for url in fallback_urls.iter() {
        if *url == webdriver_url {
            continue; // Skip if it's the same as the one we already tried
        }

        ::log::info!("Trying fallback WebDriver URL: {}", url);
        if let Ok(client) = ClientBuilder::native().connect(url).await {
            ::log::debug!("Connected to fallback WebDriver at {}", url);
            return Ok(client);
        }
    }

    Err(BrowserError::Connect(format!(
        "no WebDriver server reachable (tried {} and fallbacks); \
         set WEBDRIVER_URL or start one",
        webdriver_url
    )))
}

/// Outcome of stabilization: the page handle plus whether the quiescence or
/// lazy-load phase had to be cut short
pub struct Stabilized {
    pub page: WebDriverPage,
    pub degraded: bool,
}

const RESOURCE_COUNT_JS: &str =
    "return window.performance.getEntriesByType('resource').length;";

const SCROLL_HEIGHT_JS: &str =
    "return document.body ? document.body.scrollHeight : 0;";

/// How often the quiescence loop samples network activity
const POLL_INTERVAL: Duration = Duration::from_millis(150);

/// Navigates and waits for the page to reach a representative rendered state.
///
/// Navigation failure within the budget is fatal. The quiescence and
/// lazy-load phases degrade instead: whatever state exists when their
/// sub-timeout fires is still worth extracting from. The viewport is left
/// scrolled to the bottom.
pub async fn stabilize(
    client: Client,
    url: &Url,
    deadline: Instant,
    config: &ScrapeConfig,
) -> Result<Stabilized, ScrapeError> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    ::log::info!("Navigating to {}", url);

    match timeout(remaining, client.goto(url.as_str())).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            client_cleanup(&client).await;
            return Err(ScrapeError::Browser(e.into()));
        }
        Err(_) => {
            client_cleanup(&client).await;
            return Err(ScrapeError::NavigationTimeout {
                url: url.to_string(),
                timeout_ms: remaining.as_millis() as u64,
            });
        }
    }

    let page = WebDriverPage {
        client,
        base_url: url.clone(),
    };

    // First quiescence wait: most pages finish their initial asset burst here
    let quiet = Duration::from_millis(config.quiet_window_ms);
    let budget = Duration::from_millis(config.stabilize_timeout_ms);
    let mut degraded = !wait_for_network_idle(&page, quiet, budget, deadline).await;

    // Scroll through the full height to trigger lazy-loaded content
    if let Err(e) = scroll_through_page(&page, deadline).await {
        ::log::warn!("Lazy-load scroll failed: {}", e);
        degraded = true;
    }

    // Second, shorter wait for anything the scroll kicked off
    let lazy_budget = budget.min(Duration::from_millis(2_000));
    if !wait_for_network_idle(&page, quiet, lazy_budget, deadline).await {
        degraded = true;
    }

    ::log::info!(
        "Page stabilized ({}){}",
        url,
        if degraded { " [degraded]" } else { "" }
    );
    Ok(Stabilized { page, degraded })
}

async fn client_cleanup(client: &Client) {
    if let Err(e) = client.clone().close().await {
        ::log::warn!("Failed to close WebDriver session: {}", e);
    }
}

/// Polls the resource-timing entry count until it holds steady for the quiet
/// window. Returns false if the budget or overall deadline ran out first.
async fn wait_for_network_idle<P: RenderedPage>(
    page: &P,
    quiet_window: Duration,
    budget: Duration,
    deadline: Instant,
) -> bool {
    let phase_deadline = (Instant::now() + budget).min(deadline);
    let mut last_count: Option<u64> = None;
    let mut steady_since = Instant::now();

    loop {
        if Instant::now() >= phase_deadline {
            ::log::debug!("Network-idle wait exhausted its budget");
            return false;
        }

        let count = match page.execute(RESOURCE_COUNT_JS).await {
            Ok(v) => v.as_u64().unwrap_or(0),
            Err(e) => {
                ::log::warn!("Resource count probe failed: {}", e);
                return false;
            }
        };

        match last_count {
            Some(prev) if prev == count => {
                if steady_since.elapsed() >= quiet_window {
                    return true;
                }
            }
            _ => {
                last_count = Some(count);
                steady_since = Instant::now();
            }
        }

        sleep(POLL_INTERVAL).await;
    }
}

/// Scrolls the page to its full height in steps, pausing between them so
/// lazy observers fire. Leaves the viewport at the bottom.
async fn scroll_through_page<P: RenderedPage>(
    page: &P,
    deadline: Instant,
) -> Result<(), BrowserError> {
    let height = page
        .execute(SCROLL_HEIGHT_JS)
        .await?
        .as_u64()
        .unwrap_or(0);
    if height == 0 {
        return Ok(());
    }

    let steps = 4u64;
    for step in 1..=steps {
        if Instant::now() >= deadline {
            break;
        }
        let y = height * step / steps;
        page.execute(&format!("window.scrollTo(0, {});", y)).await?;
        sleep(Duration::from_millis(150)).await;
    }
    Ok(())
}
