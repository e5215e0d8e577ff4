mod display;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::time::MissedTickBehavior;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use vigil_core::colors::CatppuccinExt;
use vigil_core::output::{get_formatter, OutputFormat, OutputFormatter};
use vigil_core::scanner::ProgressCallback;
use vigil_core::{
    FleetScanner, JsonFileStore, MemoryStore, MonitoredSite, ScanOptions, ScanSummary, SiteStore,
    VigilConfig,
};

use display::{
    clear_scan_progress_bar, new_scan_progress_bar, set_scan_progress_bar,
    ProgressWriterFactory, Spinner,
};

#[derive(Parser)]
#[command(name = "vigil")]
#[command(about = "Fleet health monitor - HTTP reachability and TLS certificate expiry")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ./vigil.toml when present)
    #[arg(short, long, global = true, env = "VIGIL_CONFIG")]
    config: Option<PathBuf>,

    /// Output format (human or json)
    #[arg(short, long, global = true, default_value = "human", env = "VIGIL_FORMAT")]
    format: OutputFormat,

    /// Site store JSON document
    #[arg(long, global = true, env = "VIGIL_SITES")]
    sites: Option<PathBuf>,

    /// Network timeout per check, in seconds
    #[arg(long, global = true, env = "VIGIL_TIMEOUT")]
    timeout: Option<u64>,

    /// Sites checked at once
    #[arg(long, global = true, env = "VIGIL_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Days of certificate validity below which a site is PROBLEMATIC
    #[arg(long, global = true, env = "VIGIL_EXPIRY_WINDOW")]
    expiry_window: Option<i64>,

    /// Probe attempts per site, including the first
    #[arg(long, global = true, env = "VIGIL_RETRIES")]
    retries: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan every stored site once and record the results
    Scan,
    /// Check a single URL without touching the store
    Check {
        /// URL or bare domain to check
        url: String,
    },
    /// Scan the fleet on a fixed interval until Ctrl-C
    Watch {
        /// Seconds between scans
        #[arg(short, long, env = "VIGIL_INTERVAL")]
        interval: Option<u64>,
    },
    /// List stored sites with their last known status
    Sites,
}

impl Cli {
    /// Config file values with command line overrides applied
    fn resolve_config(&self) -> anyhow::Result<VigilConfig> {
        let mut config = VigilConfig::discover(self.config.as_deref())?;

        if let Some(path) = &self.sites {
            config.store.path = path.clone();
        }
        if let Some(timeout) = self.timeout {
            config.scan.timeout_secs = timeout;
        }
        if let Some(concurrency) = self.concurrency {
            config.scan.concurrency = concurrency;
        }
        if let Some(days) = self.expiry_window {
            config.scan.expiry_window_days = days;
        }
        if let Some(retries) = self.retries {
            config.scan.retry_attempts = retries;
        }
        if let Commands::Watch {
            interval: Some(secs),
        } = self.command
        {
            config.schedule.interval_secs = secs;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(ProgressWriterFactory)
        .init();

    let cli = Cli::parse();
    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "Error:".ctp_red(), e);
            std::process::exit(2);
        }
    };
    let formatter = get_formatter(cli.format, config.scan.expiry_window_days);

    match cli.command {
        Commands::Scan => {
            let store: Arc<dyn SiteStore> = Arc::new(JsonFileStore::new(&config.store.path));
            let show_progress = cli.format == OutputFormat::Human;
            match scan_once(store, config.scan_options(), show_progress).await {
                Ok(summary) => println!("{}", formatter.format_summary(&summary)),
                Err(e) => {
                    eprintln!("{} {}", "Error:".ctp_red(), e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Check { url } => {
            check_one(&url, config.scan_options(), cli.format, formatter.as_ref()).await?;
        }
        Commands::Watch { .. } => {
            watch(&config, formatter.as_ref()).await;
        }
        Commands::Sites => {
            let store = JsonFileStore::new(&config.store.path);
            match store.load().await {
                Ok(document) => println!("{}", formatter.format_sites(&document.sites)),
                Err(e) => {
                    eprintln!(
                        "{} cannot read {}: {}",
                        "Error:".ctp_red(),
                        store.path().display(),
                        e
                    );
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

async fn scan_once(
    store: Arc<dyn SiteStore>,
    options: ScanOptions,
    show_progress: bool,
) -> vigil_core::Result<ScanSummary> {
    let scanner = FleetScanner::new(store, options)?;

    if !show_progress {
        return scanner.run(None).await;
    }

    let progress = new_scan_progress_bar(0);
    set_scan_progress_bar(progress.clone());

    let bar = progress.clone();
    let callback: ProgressCallback = Box::new(move |current, total, url| {
        bar.set_length(total as u64);
        bar.set_position(current as u64);
        bar.set_message(url.to_string());
    });

    let result = scanner.run(Some(callback)).await;

    clear_scan_progress_bar();
    progress.finish_and_clear();
    result
}

async fn check_one(
    url: &str,
    options: ScanOptions,
    format: OutputFormat,
    formatter: &dyn OutputFormatter,
) -> anyhow::Result<()> {
    // Nothing is persisted for a one-off check
    let store: Arc<dyn SiteStore> = Arc::new(MemoryStore::new(Vec::new()));
    let scanner = FleetScanner::new(store, options)?;
    let site = MonitoredSite::new("check", url);

    let spinner =
        (format == OutputFormat::Human).then(|| Spinner::new(&format!("Checking {}...", url)));
    let report = scanner.check_site(&site).await;
    if let Some(spinner) = spinner {
        spinner.finish();
    }

    println!("{}", formatter.format_report(&report));
    if !report.is_running() {
        std::process::exit(3);
    }
    Ok(())
}

async fn watch(config: &VigilConfig, formatter: &dyn OutputFormatter) {
    let store: Arc<dyn SiteStore> = Arc::new(JsonFileStore::new(&config.store.path));
    let options = config.scan_options();
    let period = config.interval();

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        interval_secs = period.as_secs(),
        sites = %config.store.path.display(),
        "Watching fleet"
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut shutdown => break,
        }

        tokio::select! {
            result = scan_once(store.clone(), options.clone(), false) => match result {
                Ok(summary) => println!("{}", formatter.format_summary(&summary)),
                Err(e) => error!(error = %e, "Fleet scan failed; retrying next interval"),
            },
            _ = &mut shutdown => break,
        }
    }

    info!("Interrupted, stopping");
}
