use anyhow::Context;
use clap::Parser;
use rightmove_scout::config::{load_config, validate, Config};
use rightmove_scout::operator::{AbortingOperator, ConsoleOperator, OperatorIntervention};
use rightmove_scout::pipeline::Pipeline;
use rightmove_scout::scrapers::RightmoveBrowser;
use rightmove_scout::timing::timestamp_id;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Rightmove Scout: samples postcodes per region and scrapes their listings
#[derive(Parser, Debug)]
#[command(name = "rightmove-scout")]
#[command(version)]
#[command(about = "Checkpointed Rightmove listing scraper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file; defaults are used without one
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Export the rows of this checkpoint instead of scraping
    #[arg(long, value_name = "ID")]
    import_cache: Option<String>,

    /// Seed for the postcode draw
    #[arg(long)]
    seed: Option<u64>,

    /// Postcodes drawn per region
    #[arg(long)]
    n_per_region: Option<usize>,

    /// Show the browser window
    #[arg(long)]
    headful: bool,

    /// Never wait for manual intervention; give up instead
    #[arg(long)]
    non_interactive: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    let run_id = timestamp_id();
    let log_path = setup_logging(&config.paths.logs_dir(), &run_id, cli.verbose, cli.quiet)?;

    info!("Rightmove Scout run {}", run_id);
    info!("Logging to {}", log_path.display());

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if interrupt_again(&cancel) {
                    error!("Second Ctrl-C received, exiting without saving");
                    std::process::exit(130);
                }
                warn!("Ctrl-C received, stopping after the current postcode (again to exit now)");
            }
        });
    }

    let operator: Arc<dyn OperatorIntervention> = if cli.non_interactive {
        Arc::new(AbortingOperator)
    } else {
        Arc::new(ConsoleOperator)
    };

    let pipeline = Pipeline::new(config, operator)
        .with_run_id(run_id)
        .with_cancel_flag(cancel);

    // The browser and the crawl block, so the whole run stays off the runtime
    let result = tokio::task::spawn_blocking(move || {
        pipeline.run(|site| RightmoveBrowser::new(site.clone()))
    })
    .await
    .context("Scout run panicked")?;

    match result {
        Ok(outcome) => {
            match &outcome.export {
                Some(path) => info!(
                    "Run {} complete: {} rows scraped, {} exported to {}",
                    outcome.run_id,
                    outcome.raw_rows,
                    outcome.clean_rows,
                    path.display()
                ),
                None => info!("Run {} complete: nothing to export", outcome.run_id),
            }
            Ok(())
        }
        Err(e) => {
            error!("Run failed: {}", e);
            Err(e.into())
        }
    }
}

/// Records an interrupt; true when one was already pending
fn interrupt_again(cancel: &AtomicBool) -> bool {
    cancel.swap(true, Ordering::SeqCst)
}

/// Config file (or defaults) with command-line overrides applied
fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(id) = &cli.import_cache {
        config.import_cache = Some(id.clone());
    }
    if let Some(seed) = cli.seed {
        config.set_seed = Some(seed);
    }
    if let Some(n) = cli.n_per_region {
        config.n_per_region = n;
    }
    if cli.headful {
        config.site.headless = false;
    }

    validate(&config).context("Invalid command-line overrides")?;
    Ok(config)
}

/// Logs to the console and to `<logs_dir>/logger_<run_id>.txt`
fn setup_logging(
    logs_dir: &Path,
    run_id: &str,
    verbose: u8,
    quiet: bool,
) -> anyhow::Result<PathBuf> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("rightmove_scout=info,warn"),
            1 => EnvFilter::new("rightmove_scout=debug,info"),
            _ => EnvFilter::new("trace"),
        }
    };

    fs::create_dir_all(logs_dir)
        .with_context(|| format!("Failed to create log directory {}", logs_dir.display()))?;
    let log_path = logs_dir.join(format!("logger_{}.txt", run_id));
    let log_file = File::create(&log_path)
        .with_context(|| format!("Failed to create log file {}", log_path.display()))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(log_file)),
        )
        .init();

    Ok(log_path)
}
