//! Demo data seeder
//!
//! Fills the database with a synthetic company: reference tables, users and
//! daily usage logs, written in one transaction.
//!
//! Usage:
//!   cargo run --release --bin seed -- [OPTIONS]
//!
//! Options:
//!   --users <N>        Users to create (default: 50)
//!   --logs <N>         Usage logs to create (default: 15000)
//!   --span-days <N>    Days of history ending today (default: 540)
//!   --seed <N>         Random seed for reproducibility (optional)
//!   --clear            Delete existing demo data first
//!   --export <PATH>    Also write the generated logs to CSV

use anyhow::{Context, Result};
use clap::Parser;
use sim_usage_dashboard::config::DbSettings;
use sim_usage_dashboard::{db, seed};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "seed")]
#[command(about = "Populate the dashboard database with synthetic SIM usage data")]
struct Args {
    #[command(flatten)]
    db: DbSettings,

    /// Users to create
    #[arg(long, default_value = "50")]
    users: usize,

    /// Usage logs to create
    #[arg(long, default_value = "15000")]
    logs: usize,

    /// Days of history ending today
    #[arg(long, default_value = "540", value_parser = clap::value_parser!(i64).range(0..))]
    span_days: i64,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Delete existing demo data before seeding
    #[arg(long)]
    clear: bool,

    /// Write the generated logs to this CSV file
    #[arg(long)]
    export: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let start = Instant::now();

    println!("=== SIM Usage Seeder ===");
    println!("Endpoint: {}", args.db.db_endpoint);
    println!("Users: {}  Logs: {}  Span: {} days", args.users, args.logs, args.span_days);
    if let Some(seed) = args.seed {
        println!("Seed: {}", seed);
    }
    println!();

    let conn = db::connect(&args.db)
        .await
        .context("could not open the database")?;

    if args.clear {
        seed::clear(&conn).await?;
    }

    let options = seed::SeedOptions {
        users: args.users,
        logs: args.logs,
        span_days: args.span_days,
        seed: args.seed,
    };
    let dataset = seed::generate_with_options(&options);
    info!("Generated {} users and {} logs", dataset.users.len(), dataset.logs.len());

    let summary = seed::seed_database(&conn, &dataset, args.export.as_deref())
        .await
        .context("seeding failed")?;

    println!();
    println!("=== Seeding Complete ===");
    println!("Departments: {}", summary.departments);
    println!("Roles:       {}", summary.roles);
    println!("Users:       {}", summary.users);
    println!("Usage logs:  {}", summary.logs);
    println!("Time:        {:.1}s", start.elapsed().as_secs_f64());

    Ok(())
}
