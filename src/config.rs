//! Runtime configuration
//!
//! Every setting can come from a flag or from the matching `SIM_*`
//! environment variable.

use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

/// Database connection settings, shared by the server and the seeder
#[derive(Args, Debug, Clone)]
pub struct DbSettings {
    /// SurrealDB endpoint (rocksdb://PATH, mem://, ws://HOST:PORT)
    #[arg(long, env = "SIM_DB_ENDPOINT", default_value = "rocksdb://data/sim_usage.db")]
    pub db_endpoint: String,

    /// Namespace to select after connecting
    #[arg(long, env = "SIM_DB_NAMESPACE", default_value = "fulltime")]
    pub db_namespace: String,

    /// Database to select after connecting
    #[arg(long, env = "SIM_DB_DATABASE", default_value = "analise")]
    pub db_database: String,

    /// Root user for remote endpoints
    #[arg(long, env = "SIM_DB_USER")]
    pub db_user: Option<String>,

    /// Root password for remote endpoints
    #[arg(long, env = "SIM_DB_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,
}

impl DbSettings {
    pub fn in_memory() -> Self {
        Self {
            db_endpoint: "mem://".to_string(),
            db_namespace: "fulltime".to_string(),
            db_database: "analise".to_string(),
            db_user: None,
            db_password: None,
        }
    }

    /// True for stores opened inside this process (`rocksdb://`, `mem://`,
    /// `surrealkv://`, `file://`). Those hold their data or a directory lock
    /// for as long as the handle lives, so they must be opened only once.
    pub fn is_embedded(&self) -> bool {
        let scheme = self
            .db_endpoint
            .split_once("://")
            .map(|(scheme, _)| scheme)
            .unwrap_or(self.db_endpoint.as_str());
        !matches!(scheme, "ws" | "wss" | "http" | "https")
    }
}

/// Dashboard service settings
#[derive(Args, Debug, Clone)]
pub struct DashboardSettings {
    #[command(flatten)]
    pub db: DbSettings,

    /// LightGBM text model used for forecasting
    #[arg(long, env = "SIM_MODEL_PATH", default_value = "models/consumption_model.txt")]
    pub model_path: PathBuf,

    /// Seconds before the cached database handle is rebuilt
    #[arg(long, env = "SIM_CONNECTION_TTL", default_value = "900")]
    pub connection_ttl_secs: u64,

    /// Seconds before cached query results are reloaded
    #[arg(long, env = "SIM_DATA_TTL", default_value = "600")]
    pub data_ttl_secs: u64,

    /// Random seed for forecast noise (entropy when unset)
    #[arg(long, env = "SIM_FORECAST_SEED")]
    pub seed: Option<u64>,
}

impl DashboardSettings {
    pub fn connection_ttl(&self) -> Duration {
        Duration::from_secs(self.connection_ttl_secs)
    }

    pub fn data_ttl(&self) -> Duration {
        Duration::from_secs(self.data_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct Cli {
        #[command(flatten)]
        settings: DashboardSettings,
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["dashboard"]);
        assert_eq!(cli.settings.db.db_namespace, "fulltime");
        assert_eq!(cli.settings.connection_ttl(), Duration::from_secs(900));
        assert_eq!(cli.settings.data_ttl(), Duration::from_secs(600));
        assert_eq!(
            cli.settings.model_path,
            PathBuf::from("models/consumption_model.txt")
        );
    }

    #[test]
    fn test_flag_overrides() {
        let cli = Cli::parse_from([
            "dashboard",
            "--db-endpoint",
            "ws://localhost:8000",
            "--db-user",
            "root",
            "--seed",
            "7",
        ]);
        assert_eq!(cli.settings.db.db_endpoint, "ws://localhost:8000");
        assert_eq!(cli.settings.db.db_user.as_deref(), Some("root"));
        assert_eq!(cli.settings.seed, Some(7));
    }

    #[test]
    fn test_embedded_endpoints() {
        let mut db = DbSettings::in_memory();
        assert!(db.is_embedded());
        db.db_endpoint = "rocksdb://data/sim_usage.db".into();
        assert!(db.is_embedded());
        db.db_endpoint = "ws://localhost:8000".into();
        assert!(!db.is_embedded());
        db.db_endpoint = "https://db.example.com".into();
        assert!(!db.is_embedded());
    }
}
