use thiserror::Error;

/// Failures that can end a scrape before any section is produced.
///
/// Everything below the stabilization boundary degrades to a warning
/// instead of surfacing here; see the per-section extractors.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Initial navigation did not complete within the budget. Fatal: the
    /// whole scrape fails and no sections are produced.
    #[error("navigation to {url} timed out after {timeout_ms}ms")]
    NavigationTimeout { url: String, timeout_ms: u64 },

    /// The WebDriver session could not be established or died mid-navigation
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),

    /// The request itself was malformed
    #[error("invalid scrape request: {0}")]
    InvalidRequest(String),
}

/// Errors surfaced by the rendered-page capability
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("webdriver connection failed: {0}")]
    Connect(String),

    #[error("webdriver command failed: {0}")]
    Command(#[from] fantoccini::error::CmdError),
}

/// Per-record failures inside the asset pipeline. Never propagated past the
/// record boundary; converted into `AssetStatus::Failed` plus a reason.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("fetch timed out")]
    Timeout,

    #[error("deadline exhausted before fetch started")]
    DeadlineExhausted,

    #[error("image decode failed: {0}")]
    Decode(String),

    #[error("image encode failed: {0}")]
    Encode(String),
}
