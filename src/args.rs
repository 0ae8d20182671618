use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "snapsite")]
#[command(about = "Renders a web page headlessly and snapshots its content, assets, design tokens and metadata")]
#[command(version)]
pub struct Args {
    /// URL of the page to snapshot (absolute http/https)
    pub url: String,

    /// Skip downloading assets
    #[arg(long)]
    pub no_assets: bool,

    /// Skip re-encoding raster images to the canonical format
    #[arg(long)]
    pub no_convert: bool,

    /// Overall budget in milliseconds (config default when omitted)
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Directory for the four section JSON documents
    #[arg(long, default_value = "output")]
    pub out_dir: PathBuf,

    /// Directory downloaded asset bytes are written under
    #[arg(long)]
    pub assets_dir: Option<PathBuf>,

    /// WebDriver server URL (WEBDRIVER_URL env var also works)
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// Path to a JSON config file
    #[arg(long)]
    pub config: Option<PathBuf>,
}
