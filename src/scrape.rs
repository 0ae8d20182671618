use crate::assets::{self, PipelineOptions, fetcher::AssetFetch};
use crate::browser::RenderedPage;
use crate::config::ScrapeConfig;
use crate::error::ScrapeError;
use crate::extract;
use crate::extract::tokens::TokenProbe;
use crate::results::{ContentSection, MetaSection, Section, SectionData, TokenSection, Warning};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::{Instant, timeout};
use url::Url;

/// One scrape request, as accepted from the HTTP layer or the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeRequest {
    /// Absolute http(s) URL of the page to snapshot
    pub url: String,

    /// Download assets locally
    #[serde(default = "default_true")]
    pub save_assets: bool,

    /// Re-encode raster images to the canonical lossy format
    #[serde(default = "default_true")]
    pub convert_images: bool,

    /// Overall budget; the configured default applies when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

fn default_true() -> bool {
    true
}

impl ScrapeRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            save_assets: true,
            convert_images: true,
            timeout_ms: None,
        }
    }

    pub fn save_assets(mut self, save: bool) -> Self {
        self.save_assets = save;
        self
    }

    pub fn convert_images(mut self, convert: bool) -> Self {
        self.convert_images = convert;
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Checks the request invariants and returns the parsed target URL
    pub fn validate(&self) -> Result<Url, ScrapeError> {
        let url = Url::parse(&self.url)
            .map_err(|e| ScrapeError::InvalidRequest(format!("{}: {}", self.url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ScrapeError::InvalidRequest(format!(
                "{}: not an http(s) URL",
                self.url
            )));
        }
        if self.timeout_ms == Some(0) {
            return Err(ScrapeError::InvalidRequest(
                "timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(url)
    }
}

/// Phases of one scrape, in order. Terminal status is carried on the
/// result envelope, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Stabilizing,
    Extracting,
    AssetPipeline,
    Assembling,
}

pub(crate) fn enter(phase: Phase) {
    ::log::debug!("Scrape phase: {:?}", phase);
}

/// Runs the four section extractors concurrently against a stabilized page,
/// then the asset sub-pipeline, and merges warnings.
///
/// Every extractor failure is scoped to its own section: the section comes
/// back empty with a warning and the siblings are untouched. Nothing here
/// can fail the scrape as a whole.
pub async fn run_sections<P: RenderedPage, F: AssetFetch>(
    page: &P,
    request: &ScrapeRequest,
    fetcher: &Arc<F>,
    config: &ScrapeConfig,
    deadline: Instant,
) -> (SectionData, Vec<Warning>) {
    enter(Phase::Extracting);

    // One DOM snapshot shared by the source-based extractors, so all
    // sections describe the same instant of the page
    let source = match page.source().await {
        Ok(source) => Some(source),
        Err(e) => {
            ::log::warn!("Page source unavailable: {}", e);
            None
        }
    };
    let base = page.base_url().clone();

    let content_task = async {
        match &source {
            Some(html) => {
                let (section, messages) = extract::content::extract(html, &base);
                let warnings = messages
                    .into_iter()
                    .map(|m| Warning::new(Section::Content, m))
                    .collect();
                (section, warnings)
            }
            None => (
                ContentSection::default(),
                vec![Warning::new(Section::Content, "page source unavailable")],
            ),
        }
    };

    let meta_task = async {
        match &source {
            Some(html) => (extract::meta::extract(html), Vec::new()),
            None => (
                MetaSection::default(),
                vec![Warning::new(Section::Meta, "page source unavailable")],
            ),
        }
    };

    let tokens_task = async {
        match page.execute(extract::tokens::TOKEN_PROBE_JS).await {
            Ok(value) => match serde_json::from_value::<TokenProbe>(value) {
                Ok(probe) => (extract::tokens::build_token_section(&probe), Vec::new()),
                Err(e) => (
                    TokenSection::default(),
                    vec![Warning::new(
                        Section::Tokens,
                        format!("style probe returned malformed data: {}", e),
                    )],
                ),
            },
            Err(e) => (
                TokenSection::default(),
                vec![Warning::new(
                    Section::Tokens,
                    format!("style probe failed: {}", e),
                )],
            ),
        }
    };

    let asset_scan_task = async {
        let mut warnings = Vec::new();
        let mut refs = match &source {
            Some(html) => extract::assets::scan_refs(html),
            None => {
                warnings.push(Warning::new(Section::Assets, "page source unavailable"));
                Vec::new()
            }
        };
        match page.execute(extract::assets::BACKGROUND_PROBE_JS).await {
            Ok(value) => {
                let values: Vec<String> = serde_json::from_value(value).unwrap_or_default();
                refs.extend(extract::assets::background_refs(&values));
            }
            Err(e) => {
                warnings.push(Warning::new(
                    Section::Assets,
                    format!("background probe failed: {}", e),
                ));
            }
        }
        (refs, warnings)
    };

    let extract_budget = deadline.saturating_duration_since(Instant::now());
    let joined = timeout(extract_budget, async {
        tokio::join!(content_task, meta_task, tokens_task, asset_scan_task)
    })
    .await;

    let ((content, content_warns), (meta, meta_warns), (tokens, token_warns), (refs, scan_warns)) =
        match joined {
            Ok(results) => results,
            Err(_) => {
                ::log::warn!("Overall budget exhausted during extraction");
                enter(Phase::Assembling);
                return (
                    SectionData::default(),
                    vec![Warning::new(
                        Section::Page,
                        "overall budget exhausted during extraction",
                    )],
                );
            }
        };

    enter(Phase::AssetPipeline);
    let opts = PipelineOptions {
        save_assets: request.save_assets,
        convert_images: request.convert_images,
        assets_dir: config.assets_dir.clone(),
    };
    let (records, asset_warns) =
        assets::run_pipeline(&refs, &base, fetcher, config, &opts, deadline).await;

    enter(Phase::Assembling);
    let mut warnings = Vec::new();
    warnings.extend(content_warns);
    warnings.extend(scan_warns);
    warnings.extend(token_warns);
    warnings.extend(meta_warns);
    warnings.extend(asset_warns);

    let data = SectionData {
        content,
        assets: records,
        tokens,
        meta,
    };
    (data, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AssetError, BrowserError};
    use crate::assets::fetcher::FetchedAsset;
    use crate::results::{AssetStatus, ScrapeResult, ScrapeStatus};
    use serde_json::{Value, json};
    use std::time::Duration;

    struct MockPage {
        base: Url,
        html: String,
        token_json: Value,
        background_json: Value,
    }

    impl RenderedPage for MockPage {
        fn base_url(&self) -> &Url {
            &self.base
        }

        async fn source(&self) -> Result<String, BrowserError> {
            Ok(self.html.clone())
        }

        async fn execute(&self, script: &str) -> Result<Value, BrowserError> {
            if script == extract::tokens::TOKEN_PROBE_JS {
                Ok(self.token_json.clone())
            } else {
                Ok(self.background_json.clone())
            }
        }
    }

    struct NoFetch;

    impl AssetFetch for NoFetch {
        async fn fetch(&self, _url: &Url, _budget: Duration) -> Result<FetchedAsset, AssetError> {
            Err(AssetError::Request("offline".to_string()))
        }
    }

    /// Stalls for its whole budget, like a server that never answers
    struct StallFetch;

    impl AssetFetch for StallFetch {
        async fn fetch(&self, _url: &Url, budget: Duration) -> Result<FetchedAsset, AssetError> {
            tokio::time::sleep(budget).await;
            Err(AssetError::Timeout)
        }
    }

    fn mock_page() -> MockPage {
        MockPage {
            base: Url::parse("https://site.example/").unwrap(),
            html: r#"<html lang="en"><head>
                <title>Acme</title>
                <meta name="description" content="Widgets">
                <meta property="og:title" content="Acme Widgets">
              </head><body>
                <nav><a href="/about">About</a></nav>
                <h1>Hello</h1>
                <p>Widgets for everyone.</p>
                <img src="/logo.png" alt="logo">
              </body></html>"#
                .to_string(),
            token_json: json!({
                "css_variables": [["--brand-color", "#ff0000"], ["--brand-color", "#00ff00"]],
                "samples": [{
                    "tag": "h1", "classes": "",
                    "color": "rgb(17, 17, 17)",
                    "background_color": "rgba(0, 0, 0, 0)",
                    "border_color": "rgb(0, 0, 0)",
                    "font_family": "\"Inter\", sans-serif",
                    "font_size": "32px", "font_weight": "700"
                }],
                "spacing": []
            }),
            background_json: json!(["url(\"/hero.jpg\")"]),
        }
    }

    #[tokio::test]
    async fn test_sections_assemble_without_fetching() {
        let page = mock_page();
        let fetcher = Arc::new(NoFetch);
        let request = ScrapeRequest::new("https://site.example/").save_assets(false);
        let deadline = Instant::now() + Duration::from_secs(5);

        let (data, warnings) =
            run_sections(&page, &request, &fetcher, &ScrapeConfig::default(), deadline).await;

        assert!(warnings.is_empty());
        assert_eq!(data.content.headings.len(), 1);
        assert_eq!(data.content.navigation.len(), 1);
        assert_eq!(data.meta.title.as_deref(), Some("Acme"));
        assert_eq!(data.meta.opengraph.get("title").unwrap(), "Acme Widgets");

        // img plus probed background, deduplicated and in scan order
        let keys: Vec<&str> = data.assets.iter().map(|r| r.dedup_key.as_str()).collect();
        assert_eq!(keys, vec!["site.example/logo.png", "site.example/hero.jpg"]);
        assert!(data.assets.iter().all(|r| r.status == AssetStatus::Skipped));

        // Scoped override loses: first-defined value wins
        assert_eq!(data.tokens.css_variables["--brand-color"], "#ff0000");
    }

    #[tokio::test]
    async fn test_fetch_failures_degrade_to_partial() {
        let page = mock_page();
        let fetcher = Arc::new(NoFetch);
        let request = ScrapeRequest::new("https://site.example/");
        let deadline = Instant::now() + Duration::from_secs(5);

        let mut config = ScrapeConfig::default();
        let tmp = tempfile::tempdir().unwrap();
        config.assets_dir = tmp.path().to_path_buf();

        let (data, warnings) = run_sections(&page, &request, &fetcher, &config, deadline).await;

        assert_eq!(data.assets.len(), 2);
        assert!(data.assets.iter().all(|r| r.status == AssetStatus::Failed));
        assert_eq!(warnings.len(), 2);

        let result = ScrapeResult::finish("https://site.example/".to_string(), data, warnings);
        assert_eq!(result.status, ScrapeStatus::Partial);
    }

    #[tokio::test]
    async fn test_deadline_overrun_keeps_completed_sections() {
        let page = mock_page();
        let fetcher = Arc::new(StallFetch);
        let request = ScrapeRequest::new("https://site.example/");
        // Tight enough that the asset fetches run into it; the sections
        // extracted before the pipeline must survive
        let deadline = Instant::now() + Duration::from_millis(300);

        let mut config = ScrapeConfig::default();
        let tmp = tempfile::tempdir().unwrap();
        config.assets_dir = tmp.path().to_path_buf();

        let (data, warnings) = run_sections(&page, &request, &fetcher, &config, deadline).await;

        assert_eq!(data.content.headings.len(), 1);
        assert_eq!(data.meta.title.as_deref(), Some("Acme"));
        assert_eq!(data.tokens.css_variables["--brand-color"], "#ff0000");
        assert_eq!(data.assets.len(), 2);
        assert!(data.assets.iter().all(|r| r.status == AssetStatus::Failed));
        assert!(warnings.iter().any(|w| w.message.contains("timed out")));
    }

    #[test]
    fn test_request_validation() {
        assert!(ScrapeRequest::new("https://site.example/").validate().is_ok());
        assert!(ScrapeRequest::new("ftp://site.example/").validate().is_err());
        assert!(ScrapeRequest::new("not a url").validate().is_err());
        assert!(
            ScrapeRequest::new("https://site.example/")
                .timeout_ms(0)
                .validate()
                .is_err()
        );
    }
}
