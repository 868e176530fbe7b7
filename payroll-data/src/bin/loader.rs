use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use payroll_data::TaxBracketLoader;
use payroll_db_sqlite::SqliteRepository;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Load PNG income-tax bracket tables from a CSV file into the database.
///
/// The CSV file should have the following columns:
/// - tax_year: The tax year (e.g., 2025)
/// - bracket_number: Position within the year, starting at 1
/// - min_income: Lower bound of the bracket
/// - max_income: Upper bound (empty for the top bracket)
/// - tax_rate: Percentage rate (e.g., 22)
/// - base_tax: Tax owed on all income below min_income
/// - is_active: Optional, defaults to true
#[derive(Parser, Debug)]
#[command(name = "payroll-data-loader")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the CSV file containing tax bracket data
    #[arg(short, long)]
    file: PathBuf,

    /// SQLite database URL or path (created if missing)
    #[arg(short, long, default_value = "sqlite:payroll.db")]
    database: String,

    /// Run database migrations before loading data
    #[arg(short, long, default_value_t = false)]
    migrate: bool,

    /// Run seed files from the specified directory after migrations
    #[arg(short, long)]
    seeds: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::from("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .with_target(false)
        .init();

    let args = Args::parse();

    let repo = SqliteRepository::new(&args.database)
        .await
        .with_context(|| format!("Failed to connect to database: {}", args.database))?;

    if args.migrate {
        info!("running migrations");
        repo.run_migrations()
            .await
            .context("Failed to run migrations")?;
    }

    if let Some(seeds_dir) = &args.seeds {
        info!(seeds = %seeds_dir.display(), "running seeds");
        repo.run_seeds(seeds_dir)
            .await
            .with_context(|| format!("Failed to run seeds from: {}", seeds_dir.display()))?;
    }

    let file = File::open(&args.file)
        .with_context(|| format!("Failed to open: {}", args.file.display()))?;

    let records = TaxBracketLoader::parse(file)
        .with_context(|| format!("Failed to parse CSV: {}", args.file.display()))?;

    info!(count = records.len(), file = %args.file.display(), "parsed records");

    let inserted = TaxBracketLoader::load(&repo, &records)
        .await
        .context("Failed to load tax brackets into database")?;

    info!(inserted, "tax brackets loaded");

    Ok(())
}
