use clap::Parser;
use snapsite::{ScrapeConfig, ScrapeRequest, ScrapeStatus, Scraper, output};

mod args;
use args::Args;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match ScrapeConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                ::log::error!("Failed to load config {}: {}", path.display(), e);
                std::process::exit(2);
            }
        },
        None => ScrapeConfig::default(),
    };
    config = config.with_env_overrides();
    if let Some(webdriver_url) = args.webdriver_url {
        config.webdriver_url = webdriver_url;
    }
    if let Some(assets_dir) = args.assets_dir {
        config.assets_dir = assets_dir;
    }

    println!("Note: scraping requires a WebDriver server (e.g. ChromeDriver).");
    println!(
        "Set WEBDRIVER_URL or --webdriver-url if not using the default {}",
        config.webdriver_url
    );

    let mut request = ScrapeRequest::new(&args.url)
        .save_assets(!args.no_assets)
        .convert_images(!args.no_convert);
    if let Some(timeout_ms) = args.timeout_ms {
        request = request.timeout_ms(timeout_ms);
    }

    ::log::info!("Starting scrape of {}", args.url);
    let start_time = std::time::Instant::now();

    let scraper = Scraper::new(config);
    let result = match scraper.scrape(request).await {
        Ok(result) => result,
        Err(e) => {
            ::log::error!("Invalid request: {}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = output::write_sections(&args.out_dir, &result.data) {
        ::log::error!("Failed to write section documents: {}", e);
    }

    let duration = start_time.elapsed();
    println!(
        "Scrape finished in {:.2}s: {:?}",
        duration.as_secs_f64(),
        result.status
    );
    println!(
        "  {} headings, {} paragraphs, {} nav entries",
        result.data.content.headings.len(),
        result.data.content.paragraphs.len(),
        result.data.content.navigation.len()
    );
    println!(
        "  {} asset records, {} font families, {} css variables",
        result.data.assets.len(),
        result.data.tokens.font_families.len(),
        result.data.tokens.css_variables.len()
    );
    for warning in &result.warnings {
        println!("  warning [{:?}]: {}", warning.section, warning.message);
    }

    if result.status == ScrapeStatus::Failure {
        std::process::exit(1);
    }
}
