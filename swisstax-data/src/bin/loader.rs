use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use swisstax_data::{AppConfig, IncomeBracketLoader, MunicipalityLoader, init_logging};
use swisstax_db_sqlite::SqliteRepository;
use tracing::info;

/// Load reference tables from CSV files into the rate database.
///
/// Bracket CSV columns:
/// jurisdiction,tax_year,tariff,lower_bound,upper_bound,rate
///
/// Municipality CSV columns:
/// canton,tax_year,name,bfs_number,multiplier,canton_share
#[derive(Parser, Debug)]
#[command(name = "swisstax-data-loader")]
#[command(version, about, long_about = None)]
struct Args {
    /// Income bracket CSV file
    #[arg(short, long)]
    brackets: Option<PathBuf>,

    /// Municipality CSV file
    #[arg(short = 'u', long)]
    municipalities: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite database path or URL; overrides the config file
    #[arg(short, long)]
    database: Option<String>,

    /// Run database migrations before loading data
    #[arg(short, long, default_value_t = false)]
    migrate: bool,

    /// Run seed files from this directory after migrations; overrides the
    /// config file
    #[arg(short, long)]
    seeds: Option<PathBuf>,

    /// Log level or filter directive
    #[arg(long)]
    log_level: Option<String>,
}

fn open_csv(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("Failed to open: {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = AppConfig::load(args.config.as_deref())
        .context("Failed to load configuration")?;

    init_logging(
        args.log_level.as_deref().or(config.log_level.as_deref()),
        config.log_file.as_deref(),
    )?;

    if config.database.backend != "sqlite" && args.database.is_none() {
        bail!(
            "the loader writes to SQLite only; configured backend is '{}'",
            config.database.backend
        );
    }
    let database = args
        .database
        .unwrap_or(config.database.connection_string);

    let repo = SqliteRepository::new(&database)
        .await
        .with_context(|| format!("Failed to connect to database: {database}"))?;

    if args.migrate {
        repo.run_migrations()
            .await
            .context("Failed to run migrations")?;
        info!("migrations complete");
    }

    if let Some(seeds_dir) = args.seeds.as_ref().or(config.seeds_dir.as_ref()) {
        repo.run_seeds(seeds_dir)
            .await
            .with_context(|| format!("Failed to run seeds from: {}", seeds_dir.display()))?;
    }

    if let Some(path) = &args.brackets {
        let records = IncomeBracketLoader::parse(open_csv(path)?)
            .with_context(|| format!("Failed to parse CSV: {}", path.display()))?;
        info!(records = records.len(), file = %path.display(), "parsed bracket CSV");

        let inserted = IncomeBracketLoader::load(&repo, &records)
            .await
            .context("Failed to load income brackets into database")?;
        println!("Loaded {inserted} income brackets.");
    }

    if let Some(path) = &args.municipalities {
        let records = MunicipalityLoader::parse(open_csv(path)?)
            .with_context(|| format!("Failed to parse CSV: {}", path.display()))?;
        info!(records = records.len(), file = %path.display(), "parsed municipality CSV");

        let inserted = MunicipalityLoader::load(&repo, &records)
            .await
            .context("Failed to load municipalities into database")?;
        println!("Loaded {inserted} municipalities.");
    }

    Ok(())
}
