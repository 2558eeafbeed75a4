//! Usage dashboard server
//!
//! Serves the HTML dashboard and the JSON API on one port.
//!
//! Usage:
//!   ./target/release/sim_usage_dashboard [options]
//!
//! Options:
//!   --port PORT           Port to listen on (default: 8080)
//!   --bind ADDR           Address to bind (default: 0.0.0.0)
//!   --db-endpoint URL     SurrealDB endpoint (default: rocksdb://data/sim_usage.db)
//!   --model-path PATH     LightGBM text model (default: models/consumption_model.txt)
//!
//! Pages:
//!   GET /  /about  /tech  /team  /dashboard
//!
//! JSON endpoints:
//!   GET  /api/v1/health     Health check
//!   GET  /api/v1/filters    Department and role options
//!   GET  /api/v1/kpis       Consumption KPIs for a selection
//!   POST /api/v1/forecast   Forecast and chart for one role
//!   POST /api/v1/refresh    Drop cached query results

use anyhow::Result;
use clap::Parser;
use sim_usage_dashboard::api::{create_router, DashboardService};
use sim_usage_dashboard::config::DashboardSettings;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "sim_usage_dashboard")]
#[command(about = "SIM card usage dashboard with consumption forecasting")]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "SIM_PORT", default_value = "8080")]
    port: u16,

    /// Address to bind
    #[arg(long, env = "SIM_BIND", default_value = "0.0.0.0")]
    bind: String,

    #[command(flatten)]
    settings: DashboardSettings,
}

fn print_banner(addr: &SocketAddr, settings: &DashboardSettings) {
    println!("============================================================");
    println!("              SIM USAGE DASHBOARD SERVER");
    println!("============================================================");
    println!();
    println!("  Dashboard: http://{}/dashboard", addr);
    println!("  API:       http://{}/api/v1/", addr);
    println!("  Database:  {}", settings.db.db_endpoint);
    println!("  Model:     {}", settings.model_path.display());
    println!();
    println!("============================================================");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .init();

    let cli = Cli::parse();
    let addr: SocketAddr = format!("{}:{}", cli.bind, cli.port).parse()?;
    print_banner(&addr, &cli.settings);

    let service = Arc::new(DashboardService::new(cli.settings));
    let app = create_router(service);

    tracing::info!("Starting dashboard server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
