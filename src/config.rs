use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Configuration for the scraper service.
///
/// An explicit value threaded through `Scraper::new`; there is no ambient
/// process-wide state. All fields have serde defaults so a partial JSON
/// config file is enough.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Overall scrape budget applied when a request carries no timeout
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,

    /// Fixed size of the asset fetch worker pool
    #[serde(default = "default_fetch_workers")]
    pub fetch_workers: usize,

    /// Upper bound on any single asset fetch, in milliseconds. The actual
    /// sub-timeout is the smaller of this and the remaining overall budget.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Budget for the network-quiescence phase of stabilization
    #[serde(default = "default_stabilize_timeout_ms")]
    pub stabilize_timeout_ms: u64,

    /// Window with no new network activity that counts as quiescent
    #[serde(default = "default_quiet_window_ms")]
    pub quiet_window_ms: u64,

    /// Maximum scrapes running at once in this process
    #[serde(default = "default_max_concurrent_scrapes")]
    pub max_concurrent_scrapes: usize,

    /// JPEG quality used when image conversion is enabled
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// User agent presented for asset fetches
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Directory fetched asset bytes are written under
    #[serde(default = "default_assets_dir")]
    pub assets_dir: std::path::PathBuf,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            default_timeout_ms: default_timeout_ms(),
            fetch_workers: default_fetch_workers(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            stabilize_timeout_ms: default_stabilize_timeout_ms(),
            quiet_window_ms: default_quiet_window_ms(),
            max_concurrent_scrapes: default_max_concurrent_scrapes(),
            jpeg_quality: default_jpeg_quality(),
            user_agent: default_user_agent(),
            assets_dir: default_assets_dir(),
        }
    }
}

impl ScrapeConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Apply the WEBDRIVER_URL environment override, if set and non-empty
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                self.webdriver_url = webdriver_url;
            }
        }
        self
    }
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

/// Default overall budget: 60 seconds
fn default_timeout_ms() -> u64 {
    60_000
}

/// Default fetch pool size
fn default_fetch_workers() -> usize {
    4
}

/// Default per-fetch cap: 30 seconds
fn default_fetch_timeout_ms() -> u64 {
    30_000
}

/// Default quiescence budget: 10 seconds
fn default_stabilize_timeout_ms() -> u64 {
    10_000
}

/// Default quiet window: half a second of no new network entries
fn default_quiet_window_ms() -> u64 {
    500
}

/// Default process-wide scrape cap
fn default_max_concurrent_scrapes() -> usize {
    4
}

fn default_jpeg_quality() -> u8 {
    85
}

fn default_assets_dir() -> std::path::PathBuf {
    std::path::PathBuf::from("assets")
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
        .to_string()
}
