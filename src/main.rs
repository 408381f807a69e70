use clap::{ArgAction, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use p2p_offers::browser::WebDriverBrowser;
use p2p_offers::config::ConfigLoader;
use p2p_offers::config::loader::ENV_PREFIX;
use p2p_offers::diagnostics::{Diagnostics, LogDiagnostics};
use p2p_offers::extractor::OfferExtractor;
use p2p_offers::fetcher::{FetchParams, OfferFetcher};
use p2p_offers::metadata::ConnectionData;
use p2p_offers::metrics::{ProgressCallback, ProgressSnapshot};
use p2p_offers::output::FileOutput;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "p2p-offers")]
#[command(version = "0.1.0")]
#[command(about = "Snapshot Binance P2P offers into one file per offer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the current offers for a trading pair
    Run {
        /// Path to the configuration file (JSON/YAML/TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Trading pair, overrides the config file (e.g. BTC_USDT)
        #[arg(long)]
        pair: Option<String>,

        /// Output directory, overrides the config file
        #[arg(short, long)]
        target_directory: Option<PathBuf>,

        /// Show progress bars on stderr (`--progress false` for plain logs)
        #[arg(short, long, default_value_t = true, action = ArgAction::Set)]
        progress: bool,
    },
    /// Validate a configuration file
    Check {
        /// Path to the configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print the connection metadata as JSON
    Describe,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        unsafe { std::env::set_var("RUST_LOG", "info"); }
    }
    let cli = Cli::parse();
    let logger = env_logger::Builder::from_default_env().build();
    let multi = indicatif::MultiProgress::new();

    match cli.command {
        Commands::Run { config, pair, target_directory, progress } => {
            if progress {
                indicatif_log_bridge::LogWrapper::new(multi.clone(), logger).try_init()?;
            } else {
                log::set_boxed_logger(Box::new(logger))?;
                log::set_max_level(log::LevelFilter::Info);
            }

            log::info!("Loading config from {:?}", config);
            let mut overrides = HashMap::new();
            if let Some(pair) = pair {
                overrides.insert(format!("{}_TRADING_PAIR", ENV_PREFIX), pair);
            }
            if let Some(dir) = target_directory {
                overrides.insert(
                    format!("{}_TARGET_DIRECTORY", ENV_PREFIX),
                    dir.to_string_lossy().into_owned(),
                );
            }
            let config_data = ConfigLoader::load_with_overrides(&config, overrides)?;
            let params: FetchParams = config_data.params()?;

            let diagnostics: Arc<dyn Diagnostics> = Arc::new(LogDiagnostics);
            let browser = WebDriverBrowser::new(
                config_data.marketplace.webdriver_url.clone(),
                config_data.marketplace.headless,
            );
            let extractor = OfferExtractor::new(
                browser,
                config_data.marketplace.clone(),
                config_data.selectors.clone(),
                diagnostics.clone(),
            );
            let writer = FileOutput::new(config_data.name.clone(), config_data.record_format);
            let mut fetcher = OfferFetcher::new(config_data.name.clone(), extractor, writer, diagnostics);

            let mut progress_bar: Option<ProgressBar> = None;
            if progress {
                let pb = multi.add(ProgressBar::new(0));
                pb.set_style(ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                    .progress_chars("#>-"));
                pb.set_message("Fetching offers...");

                let pb_clone = pb.clone();
                let callback: ProgressCallback = Arc::new(move |snapshot: &ProgressSnapshot| {
                    pb_clone.set_length(snapshot.total_items);
                    pb_clone.set_position(snapshot.processed_items);
                    pb_clone.set_message(format!(
                        "ETA: {:.1}s",
                        snapshot.estimated_remaining.as_secs_f64()
                    ));
                });
                fetcher = fetcher.with_progress(callback);
                progress_bar = Some(pb);
            }

            log::info!("Starting fetch for {}...", params.trading_pair);
            let state = fetcher.run(&params).await?;

            if let Some(pb) = progress_bar {
                pb.set_style(ProgressStyle::default_bar()
                    .template("✅ [{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} {msg}")?
                    .progress_chars("#>-"));
                pb.finish_with_message("Completed");
            }

            println!("\n✅ Fetch Completed:");
            println!("   Trading Pair: {}", params.trading_pair);
            println!("   Offers Found: {}", state.total_items());
            println!("   Offers Saved: {}", state.persisted_items());
            println!("   Failed Writes: {}", state.failed_writes());
            println!("   Unreadable Fields: {}", state.field_failures());
            println!("   Average Duration: {}ms", state.average_item_time().as_millis());
            println!("   Output: {}", params.target_directory.display());
        }
        Commands::Check { config } => {
            match ConfigLoader::load(&config) {
                Ok(cfg) => {
                    println!("✅ Config is valid:");
                    println!("   Name: {}", cfg.name);
                    println!("   Trading Pair: {}", cfg.trading_pair);
                    println!("   Target Directory: {}", cfg.target_directory);
                    println!("   Offer URL: {}", cfg.marketplace.url_for(&cfg.trading_pair)?);
                    println!("   WebDriver: {}", cfg.marketplace.webdriver_url);
                }
                Err(e) => {
                    eprintln!("❌ Config error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Describe => {
            println!("{}", serde_json::to_string_pretty(&ConnectionData::default())?);
        }
    }

    Ok(())
}
