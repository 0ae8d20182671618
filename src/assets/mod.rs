pub mod convert;
pub mod fetcher;
pub mod resolver;

use crate::config::ScrapeConfig;
use crate::results::{AssetRecord, AssetRef, AssetStatus, Section, Warning};
use fetcher::AssetFetch;
use resolver::AssetSource;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::time::Instant;
use url::Url;

/// Per-scrape knobs for the asset pipeline
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub save_assets: bool,
    pub convert_images: bool,
    pub assets_dir: PathBuf,
}

/// One unit of work for the fetch pool. The index pins the record's
/// resolution-order slot; results are written back by index so completion
/// order never shows in the output.
#[derive(Debug)]
struct FetchJob {
    index: usize,
    url: Url,
    stem: String,
}

#[derive(Debug)]
enum FetchOutcome {
    Fetched {
        local_path: String,
        format: String,
        size_bytes: u64,
    },
    Failed {
        reason: String,
    },
}

/// Runs the full asset sub-pipeline: resolve + dedup, then (when saving)
/// inline-SVG persistence and a fixed pool of fetch workers. Every record
/// reaches a terminal status; a single bad asset never sinks its siblings.
pub async fn run_pipeline<F: AssetFetch>(
    refs: &[AssetRef],
    base: &Url,
    fetcher: &Arc<F>,
    config: &ScrapeConfig,
    opts: &PipelineOptions,
    deadline: Instant,
) -> (Vec<AssetRecord>, Vec<Warning>) {
    let pending = resolver::resolve_refs(refs, base);

    let mut records = Vec::with_capacity(pending.len());
    let mut jobs = Vec::new();
    let mut inline = Vec::new();

    for (index, p) in pending.into_iter().enumerate() {
        match p.source {
            AssetSource::Remote(url) if opts.save_assets => {
                jobs.push(FetchJob {
                    index,
                    stem: resolver::file_stem_for_key(&p.record.dedup_key),
                    url,
                });
            }
            AssetSource::Inline(markup) if opts.save_assets => {
                inline.push((index, markup));
            }
            _ => {}
        }
        records.push(p.record);
    }

    if !opts.save_assets {
        let warnings = failure_warnings(&records);
        return (records, warnings);
    }

    let images_dir = opts.assets_dir.join("images");
    let svg_dir = opts.assets_dir.join("svg");
    for dir in [&images_dir, &svg_dir] {
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            ::log::warn!("Could not create asset dir {}: {}", dir.display(), e);
        }
    }

    save_inline_svgs(&mut records, inline, &svg_dir).await;

    if !jobs.is_empty() {
        run_fetch_pool(&mut records, jobs, fetcher, config, opts, &images_dir, deadline).await;
    }

    let warnings = failure_warnings(&records);
    (records, warnings)
}

async fn save_inline_svgs(
    records: &mut [AssetRecord],
    inline: Vec<(usize, String)>,
    svg_dir: &Path,
) {
    for (index, markup) in inline {
        let filename = format!("{}.svg", resolver::file_stem_for_key(&records[index].dedup_key));
        let path = svg_dir.join(&filename);
        match tokio::fs::write(&path, markup.as_bytes()).await {
            Ok(()) => {
                let record = &mut records[index];
                record.status = AssetStatus::Fetched;
                record.local_path = Some(path.display().to_string());
                record.format = Some("svg".to_string());
                record.size_bytes = Some(markup.len() as u64);
            }
            Err(e) => {
                let record = &mut records[index];
                record.status = AssetStatus::Failed;
                record.failure_reason = Some(format!("write failed: {}", e));
            }
        }
    }
}

/// Shared context each fetch worker carries
#[derive(Debug, Clone)]
struct WorkerContext {
    convert_images: bool,
    jpeg_quality: u8,
    fetch_cap: Duration,
    deadline: Instant,
    images_dir: PathBuf,
}

async fn run_fetch_pool<F: AssetFetch>(
    records: &mut [AssetRecord],
    jobs: Vec<FetchJob>,
    fetcher: &Arc<F>,
    config: &ScrapeConfig,
    opts: &PipelineOptions,
    images_dir: &Path,
    deadline: Instant,
) {
    let total = jobs.len();
    let (job_tx, job_rx) = mpsc::channel(total);
    let job_rx = Arc::new(Mutex::new(job_rx));
    let (done_tx, mut done_rx) = mpsc::channel(total);

    for job in jobs {
        // Channel is sized for all jobs, so this never blocks
        let _ = job_tx.send(job).await;
    }
    drop(job_tx);

    let ctx = WorkerContext {
        convert_images: opts.convert_images,
        jpeg_quality: config.jpeg_quality,
        fetch_cap: Duration::from_millis(config.fetch_timeout_ms),
        deadline,
        images_dir: images_dir.to_path_buf(),
    };

    let worker_count = config.fetch_workers.clamp(1, total);
    ::log::debug!("Starting {} fetch workers for {} assets", worker_count, total);
    for worker_id in 0..worker_count {
        spawn_fetch_worker(
            worker_id,
            Arc::clone(&job_rx),
            done_tx.clone(),
            Arc::clone(fetcher),
            ctx.clone(),
        );
    }
    drop(done_tx);

    // Fan-in: the channel closes once every worker has drained its queue
    while let Some((index, outcome)) = done_rx.recv().await {
        apply_outcome(&mut records[index], outcome);
    }
}

fn spawn_fetch_worker<F: AssetFetch>(
    worker_id: usize,
    job_rx: Arc<Mutex<mpsc::Receiver<FetchJob>>>,
    done_tx: mpsc::Sender<(usize, FetchOutcome)>,
    fetcher: Arc<F>,
    ctx: WorkerContext,
) {
    tokio::spawn(async move {
        loop {
            let job = {
                let mut rx = job_rx.lock().await;
                rx.recv().await
            };
            let Some(job) = job else { break };

            ::log::trace!("Worker {} fetching {}", worker_id, job.url);
            let outcome = process_job(&*fetcher, &ctx, &job).await;
            if done_tx.send((job.index, outcome)).await.is_err() {
                break;
            }
        }
        ::log::trace!("Fetch worker {} done", worker_id);
    });
}

async fn process_job<F: AssetFetch>(
    fetcher: &F,
    ctx: &WorkerContext,
    job: &FetchJob,
) -> FetchOutcome {
    let remaining = ctx.deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        return FetchOutcome::Failed {
            reason: "timeout: overall budget exhausted".to_string(),
        };
    }
    let budget = remaining.min(ctx.fetch_cap);

    let fetched = match fetcher.fetch(&job.url, budget).await {
        Ok(fetched) => fetched,
        Err(e) => {
            return FetchOutcome::Failed {
                reason: e.to_string(),
            };
        }
    };

    let ext = resolver::extension_for(&job.url, fetched.content_type.as_deref());
    let convert = ctx.convert_images && resolver::is_raster(&ext, fetched.content_type.as_deref());

    // A failed conversion fails the record outright; serving the original
    // bytes under a claimed-converted format would make `format` a lie.
    let (bytes, ext, format) = if convert {
        match convert::to_canonical_jpeg(fetched.bytes, ctx.jpeg_quality).await {
            Ok(bytes) => (bytes, "jpg".to_string(), "jpeg".to_string()),
            Err(e) => {
                return FetchOutcome::Failed {
                    reason: format!("conversion failed: {}", e),
                };
            }
        }
    } else {
        let format = if ext == "jpg" {
            "jpeg".to_string()
        } else {
            ext.clone()
        };
        (fetched.bytes, ext.clone(), format)
    };

    let path = ctx.images_dir.join(format!("{}.{}", job.stem, ext));
    let size_bytes = bytes.len() as u64;
    if let Err(e) = tokio::fs::write(&path, &bytes).await {
        return FetchOutcome::Failed {
            reason: format!("write failed: {}", e),
        };
    }

    FetchOutcome::Fetched {
        local_path: path.display().to_string(),
        format,
        size_bytes,
    }
}

fn apply_outcome(record: &mut AssetRecord, outcome: FetchOutcome) {
    match outcome {
        FetchOutcome::Fetched {
            local_path,
            format,
            size_bytes,
        } => {
            record.status = AssetStatus::Fetched;
            record.local_path = Some(local_path);
            record.format = Some(format);
            record.size_bytes = Some(size_bytes);
        }
        FetchOutcome::Failed { reason } => {
            ::log::warn!("Asset {} failed: {}", record.resolved_url, reason);
            record.status = AssetStatus::Failed;
            record.failure_reason = Some(reason);
        }
    }
}

/// Warnings for failed records, in record (resolution) order for
/// deterministic output
fn failure_warnings(records: &[AssetRecord]) -> Vec<Warning> {
    records
        .iter()
        .filter(|r| r.status == AssetStatus::Failed)
        .map(|r| {
            let reason = r.failure_reason.as_deref().unwrap_or("unknown failure");
            Warning::new(Section::Assets, format!("{}: {}", r.resolved_url, reason))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssetError;
    use crate::results::{AssetKind, AssetRef};
    use fetcher::FetchedAsset;
    use std::collections::HashMap;

    enum MockResponse {
        Bytes(Vec<u8>),
        Status(u16),
    }

    struct MockFetcher {
        responses: HashMap<String, MockResponse>,
        delays_ms: HashMap<String, u64>,
    }

    impl MockFetcher {
        fn new() -> Self {
            Self {
                responses: HashMap::new(),
                delays_ms: HashMap::new(),
            }
        }

        fn ok(mut self, url: &str, bytes: &[u8]) -> Self {
            self.responses
                .insert(url.to_string(), MockResponse::Bytes(bytes.to_vec()));
            self
        }

        fn status(mut self, url: &str, status: u16) -> Self {
            self.responses
                .insert(url.to_string(), MockResponse::Status(status));
            self
        }

        fn delay(mut self, url: &str, ms: u64) -> Self {
            self.delays_ms.insert(url.to_string(), ms);
            self
        }
    }

    impl AssetFetch for MockFetcher {
        async fn fetch(&self, url: &Url, _budget: Duration) -> Result<FetchedAsset, AssetError> {
            if let Some(ms) = self.delays_ms.get(url.as_str()) {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
            match self.responses.get(url.as_str()) {
                Some(MockResponse::Bytes(bytes)) => Ok(FetchedAsset {
                    bytes: bytes.clone(),
                    content_type: Some("image/png".to_string()),
                }),
                Some(MockResponse::Status(status)) => Err(AssetError::HttpStatus(*status)),
                None => Err(AssetError::Request("no such asset".to_string())),
            }
        }
    }

    fn base() -> Url {
        Url::parse("https://site.example/").unwrap()
    }

    fn config() -> ScrapeConfig {
        ScrapeConfig::default()
    }

    fn opts(save_assets: bool, dir: &Path) -> PipelineOptions {
        PipelineOptions {
            save_assets,
            convert_images: false,
            assets_dir: dir.to_path_buf(),
        }
    }

    fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(10)
    }

    #[tokio::test]
    async fn test_single_failure_does_not_sink_siblings() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(
            MockFetcher::new()
                .ok("https://site.example/a.png", b"aaa")
                .status("https://site.example/b.png", 404)
                .ok("https://site.example/c.png", b"ccc"),
        );
        let refs = vec![
            AssetRef::new("/a.png", AssetKind::Background),
            AssetRef::new("/b.png", AssetKind::Background),
            AssetRef::new("/c.png", AssetKind::Background),
        ];

        let (records, warnings) = run_pipeline(
            &refs,
            &base(),
            &fetcher,
            &config(),
            &opts(true, tmp.path()),
            deadline(),
        )
        .await;

        assert_eq!(records.len(), 3);
        let statuses: Vec<AssetStatus> = records.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                AssetStatus::Fetched,
                AssetStatus::Failed,
                AssetStatus::Fetched
            ]
        );
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("b.png"));
    }

    #[tokio::test]
    async fn test_output_order_invariant_under_completion_order() {
        let urls = ["/a.png", "/b.png", "/c.png", "/d.png"];
        let expected: Vec<String> = urls
            .iter()
            .map(|u| format!("site.example{}", u))
            .collect();

        // Two runs with opposite delay profiles must produce the same order
        for reversed in [false, true] {
            let tmp = tempfile::tempdir().unwrap();
            let mut fetcher = MockFetcher::new();
            for (i, u) in urls.iter().enumerate() {
                let full = format!("https://site.example{}", u);
                let delay = if reversed { (urls.len() - i) * 30 } else { i * 30 };
                fetcher = fetcher.ok(&full, b"img").delay(&full, delay as u64);
            }
            let fetcher = Arc::new(fetcher);
            let refs: Vec<AssetRef> = urls
                .iter()
                .map(|u| AssetRef::new(*u, AssetKind::Image))
                .collect();

            let (records, warnings) = run_pipeline(
                &refs,
                &base(),
                &fetcher,
                &config(),
                &opts(true, tmp.path()),
                deadline(),
            )
            .await;

            let keys: Vec<String> = records.iter().map(|r| r.dedup_key.clone()).collect();
            assert_eq!(keys, expected);
            assert!(warnings.is_empty());
            assert!(records.iter().all(|r| r.status == AssetStatus::Fetched));
        }
    }

    #[tokio::test]
    async fn test_duplicate_refs_collapse_to_one_record() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(MockFetcher::new().ok("https://site.example/logo.png", b"logo"));
        let refs = vec![
            AssetRef::new("/logo.png", AssetKind::Image).with_alt("the logo"),
            AssetRef::new("https://site.example/logo.png", AssetKind::Image),
            AssetRef::new("/logo.png#header", AssetKind::Background),
        ];

        let (records, _) = run_pipeline(
            &refs,
            &base(),
            &fetcher,
            &config(),
            &opts(true, tmp.path()),
            deadline(),
        )
        .await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].dedup_key, "site.example/logo.png");
        assert_eq!(records[0].alt_text.as_deref(), Some("the logo"));
        assert_eq!(records[0].status, AssetStatus::Fetched);
    }

    #[tokio::test]
    async fn test_save_assets_off_means_no_fetches_and_no_warnings() {
        let tmp = tempfile::tempdir().unwrap();
        // Fetcher that would fail everything, to prove it is never consulted
        let fetcher = Arc::new(MockFetcher::new());
        let refs = vec![
            AssetRef::new("/a.png", AssetKind::Image),
            AssetRef::new("/b.png", AssetKind::Background),
        ];

        let (records, warnings) = run_pipeline(
            &refs,
            &base(),
            &fetcher,
            &config(),
            &opts(false, tmp.path()),
            deadline(),
        )
        .await;

        assert!(warnings.is_empty());
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.status == AssetStatus::Skipped));
    }

    #[tokio::test]
    async fn test_inline_svg_is_persisted_not_downloaded() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(MockFetcher::new());
        let mut svg = AssetRef::new("inline:svg:0", AssetKind::Svg);
        svg.inline_markup = Some("<svg viewBox=\"0 0 1 1\"></svg>".to_string());

        let (records, warnings) = run_pipeline(
            &[svg],
            &base(),
            &fetcher,
            &config(),
            &opts(true, tmp.path()),
            deadline(),
        )
        .await;

        assert!(warnings.is_empty());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, AssetStatus::Fetched);
        assert_eq!(records[0].format.as_deref(), Some("svg"));
        let written = std::fs::read_to_string(records[0].local_path.as_ref().unwrap()).unwrap();
        assert!(written.contains("viewBox"));
    }

    #[tokio::test]
    async fn test_exhausted_deadline_fails_remaining_records() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(MockFetcher::new().ok("https://site.example/a.png", b"a"));
        let refs = vec![AssetRef::new("/a.png", AssetKind::Image)];

        let past = Instant::now() - Duration::from_millis(1);
        let (records, warnings) = run_pipeline(
            &refs,
            &base(),
            &fetcher,
            &config(),
            &opts(true, tmp.path()),
            past,
        )
        .await;

        assert_eq!(records[0].status, AssetStatus::Failed);
        assert!(
            records[0]
                .failure_reason
                .as_deref()
                .unwrap()
                .contains("timeout")
        );
        assert_eq!(warnings.len(), 1);
    }
}
