mod convert;
mod db;
mod error;
mod export;
mod extract;
mod fetch;
mod model;
mod pipeline;
mod progress;
mod query;
mod rates;
mod settings;

use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use fetch::HttpFetcher;
use pipeline::Pipeline;
use query::{MarketCapFilter, QueryResult};
use settings::Settings;

#[derive(Parser)]
#[command(name = "bank_etl", about = "Largest banks ETL: HTML table → CSV + SQLite")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, extract, convert, and load the ranking, then run the filter query
    Run {
        /// Show a stage progress bar
        #[arg(long)]
        progress: bool,
        /// Print query results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Re-run the market cap filter against the loaded table
    Query {
        /// Minimum market cap in USD billions (default from settings)
        #[arg(long)]
        min_usd: Option<f64>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the top rows of the CSV output
    Preview {
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load().context("Failed to load settings")?;

    match cli.command {
        Commands::Run { progress, json } => {
            let mut pipeline = Pipeline::new(settings, HttpFetcher::new()?);
            if progress {
                let pb = ProgressBar::new(0);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {msg}")?
                        .progress_chars("#>-"),
                );
                pb.enable_steady_tick(Duration::from_millis(120));
                pipeline = pipeline.with_progress(pb);
            }

            let summary = pipeline.run()?;
            print_query(&summary.query, json)?;
            println!(
                "\nLoaded {} banks → {:?}, {:?} (log: {:?})",
                summary.records, summary.csv_path, summary.db_path, summary.log_path
            );
        }
        Commands::Query { min_usd, json } => {
            let filter = MarketCapFilter {
                min_usd: min_usd.unwrap_or(settings.query_min_usd),
            };
            let conn = db::open_read_only(&settings.db_path)?;
            let result = query::run_query(&filter, &conn, &settings.table_name)?;
            print_query(&result, json)?;
        }
        Commands::Preview { limit } => {
            let rows = export::read_csv(&settings.csv_path)
                .with_context(|| format!("Run `bank_etl run` first to create {:?}", settings.csv_path))?;
            if rows.is_empty() {
                println!("No banks in {:?}.", settings.csv_path);
            }
            for (i, r) in rows.iter().take(limit).enumerate() {
                println!(
                    "{:>3}. {:<44} {:>10.2} USD  {:>10.2} GBP  {:>10.2} EUR  {:>12.2} INR",
                    i + 1,
                    r.name,
                    r.market_cap_usd,
                    r.market_cap_gbp,
                    r.market_cap_eur,
                    r.market_cap_inr
                );
            }
        }
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }
    Ok(())
}

fn print_query(result: &QueryResult, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", result.to_json()?);
    } else {
        println!("{}", result.render());
    }
    Ok(())
}
