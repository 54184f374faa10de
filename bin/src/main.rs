//! Osaka CLI binary.
//!
//! Computes, persists and inspects factor values against a SQLite store,
//! fed from a local CSV quote file.

mod feed;

use clap::{Parser, Subcommand};
use feed::CsvFeed;
use osaka_data::{DataFeed, FactorTableSchema, Frequency, SqliteStore, StoreBackend};
use osaka_factors::{
    available_factors, volume_direction_factor, DirectionMeasure, EarningsYieldFactor,
    PersistedFactor, UpdateOptions, WindowVolatilityFactor,
};
use osaka_traits::{Date, FactorCompute, FactorError};
use std::path::{Path, PathBuf};
use std::process;
use std::rc::Rc;

#[derive(Parser)]
#[command(name = "osaka")]
#[command(about = "Osaka: factor computation and persistence pipeline", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available factors
    Factors,

    /// Compute a factor for a date and persist it
    Update {
        /// Factor symbol (see `osaka factors`)
        #[arg(long)]
        factor: String,

        /// Trading date (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// CSV quote file
        #[arg(long)]
        quotes: PathBuf,

        /// SQLite database path
        #[arg(long, default_value = "osaka.db")]
        db: PathBuf,

        /// Factor table name
        #[arg(long, default_value = "factor_values")]
        table: String,

        /// Exact row count the computed frame must have
        #[arg(long)]
        expected_count: Option<usize>,

        /// Reject when the null fraction reaches this ratio
        #[arg(long, default_value = "1.0")]
        max_null_ratio: f64,

        /// Delete and recompute even when rows already exist
        #[arg(long)]
        force: bool,
    },

    /// Show standardized factor values for a date
    Show {
        /// Factor symbol (see `osaka factors`)
        #[arg(long)]
        factor: String,

        /// Trading date (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// CSV quote file
        #[arg(long)]
        quotes: PathBuf,

        /// SQLite database path, read when present
        #[arg(long)]
        db: Option<PathBuf>,

        /// Factor table name
        #[arg(long, default_value = "factor_values")]
        table: String,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Factors => {
            println!("{:<14} {:<10} {:<6} description", "name", "category", "dir");
            for info in available_factors() {
                println!(
                    "{:<14} {:<10} {:<6} {}",
                    info.name,
                    format!("{:?}", info.category).to_lowercase(),
                    format!("{:?}", info.direction).to_lowercase(),
                    info.description
                );
            }
        }

        Commands::Update {
            factor,
            date,
            quotes,
            db,
            table,
            expected_count,
            max_null_ratio,
            force,
        } => {
            let date = parse_date(&date)?;
            let feed = load_feed(&quotes)?;
            let store = StoreBackend::Relational(Box::new(SqliteStore::new(&db)?));
            let mut persisted = PersistedFactor::new(build_factor(&factor, &feed)?)
                .with_store(store)
                .with_schema(FactorTableSchema::for_table(table));

            let mut options = UpdateOptions::default().with_max_null_ratio(max_null_ratio);
            if let Some(count) = expected_count {
                options = options.with_expected_count(count);
            }
            if force {
                options = options.force();
            }

            let report = persisted.update_to_store(date, &options)?;
            print!("{}", report);
            if !report.is_updated() {
                process::exit(1);
            }
        }

        Commands::Show {
            factor,
            date,
            quotes,
            db,
            table,
        } => {
            let date = parse_date(&date)?;
            let feed = load_feed(&quotes)?;
            let mut persisted = PersistedFactor::new(build_factor(&factor, &feed)?)
                .with_schema(FactorTableSchema::for_table(table));
            if let Some(db) = db {
                let store = StoreBackend::Relational(Box::new(SqliteStore::new(&db)?));
                persisted = persisted.with_store(store);
            }

            let frame = persisted.get_standardized(date)?;
            println!("{}", frame);
        }
    }
    Ok(())
}

fn load_feed(path: &Path) -> Result<Rc<dyn DataFeed>, Box<dyn std::error::Error>> {
    let feed = CsvFeed::from_path(path)?;
    if feed.is_empty() {
        return Err(Box::new(FactorError::Validation(format!(
            "quote file {} holds no rows",
            path.display()
        ))));
    }
    println!("Loaded {} quote rows from {}", feed.len(), path.display());
    Ok(Rc::new(feed))
}

fn parse_date(raw: &str) -> Result<Date, FactorError> {
    raw.parse::<Date>()
        .map_err(|e| FactorError::Validation(format!("bad date '{}': {}", raw, e)))
}

/// Instantiate a registered factor over the given feed.
///
/// The CSV feed carries daily bars, so the volume-direction variants run
/// at daily frequency here.
fn build_factor(
    name: &str,
    feed: &Rc<dyn DataFeed>,
) -> Result<Box<dyn FactorCompute>, FactorError> {
    let feed = Rc::clone(feed);
    let factor: Box<dyn FactorCompute> = match name {
        "EP" => Box::new(EarningsYieldFactor::new(feed)?),
        "window_vol" => Box::new(WindowVolatilityFactor::new(feed)?),
        "vdir_buy" => Box::new(daily_vdir(feed, DirectionMeasure::BuyShare)?),
        "vdir_pin" => Box::new(daily_vdir(feed, DirectionMeasure::InformedTrading)?),
        "vdir_buy_std" => Box::new(daily_vdir(feed, DirectionMeasure::BuyVolStdShare)?),
        "vdir_std_imb" => Box::new(daily_vdir(feed, DirectionMeasure::VolStdImbalance)?),
        other => {
            return Err(FactorError::Validation(format!(
                "unknown factor '{}', see `osaka factors`",
                other
            )))
        }
    };
    Ok(factor)
}

fn daily_vdir(
    feed: Rc<dyn DataFeed>,
    measure: DirectionMeasure,
) -> Result<impl FactorCompute, FactorError> {
    Ok(volume_direction_factor(feed, measure)?.with_frequency(Frequency::Daily))
}
