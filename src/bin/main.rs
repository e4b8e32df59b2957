use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use moviecat::config::Config;
use moviecat::seed::ReseedMode;

const DEFAULT_CONFIG: &str = "moviecat.yaml";

#[derive(Parser, Debug)]
#[command(name = "moviecat")]
#[command(about = "Movie catalog read API and maintenance tools", long_about = None)]
struct Args {
    /// Config file; defaults to ./moviecat.yaml when present
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the catalog read API
    Serve,
    /// Clear the catalog and load it from a CSV file
    Seed {
        #[arg(long, conflicts_with = "data_dir")]
        file: Option<PathBuf>,
        /// Directory searched for the first *.csv file
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(long, value_enum)]
        mode: Option<ReseedMode>,
    },
    /// Fetch poster images for movies without a cover
    Covers {
        /// Only enrich movies from this release year
        #[arg(long)]
        year: Option<i32>,
    },
}

fn init_logging(debug: bool) {
    let default_filter = if debug {
        "moviecat=debug,tower_http=debug"
    } else {
        "moviecat=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn run(args: Args) -> Result<(), moviecat::AppError> {
    let config_path = args
        .config
        .or_else(|| Path::new(DEFAULT_CONFIG).exists().then(|| DEFAULT_CONFIG.to_string()));
    if let Some(ref path) = config_path {
        info!("Using config file: {}", path);
    }

    let mut config = Config::load(config_path.as_deref())?;
    config.debug_logs = args.debug;

    match args.command {
        Command::Serve => moviecat::run(config).await,
        Command::Seed { file, data_dir, mode } => {
            let report = moviecat::run_seed(&config, file, data_dir, mode).await?;
            if !report.failed_years.is_empty() {
                eprintln!("Years not written: {:?}", report.failed_years);
            }
            Ok(())
        }
        Command::Covers { year } => {
            moviecat::run_enrich(&config, year).await?;
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
