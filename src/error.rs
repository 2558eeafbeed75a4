//! Error types for the dashboard
//!
//! Every failure a dashboard request can hit maps to one variant here, and
//! each variant carries the message shown to the user.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Database connection failed: {source}")]
    Connection {
        #[source]
        source: surrealdb::Error,
    },

    #[error("Query failed: {0}")]
    Query(#[from] surrealdb::Error),

    #[error("Unexpected row shape: {0}")]
    RowShape(String),

    #[error("Database is empty or unreachable.")]
    EmptyDataset,

    #[error("Model '{path}' could not be loaded: {reason}")]
    ModelLoad { path: PathBuf, reason: String },

    #[error("Could not export to '{path}': {reason}")]
    Export { path: PathBuf, reason: String },

    #[error("Select at least one department and one role to view the data.")]
    MissingSelection,

    #[error("Select exactly 1 role to generate the forecast.")]
    RoleSelection,

    #[error("Forecast horizon must be between 1 and 12 months, got {0}.")]
    Horizon(u32),

    #[error("No historical data for this scenario.")]
    NoHistory,

    #[error("Insufficient data: no user has at least {min_history} observations.")]
    InsufficientData { min_history: usize },
}

impl DashboardError {
    /// True for outcomes caused by the user's filter choices rather than by
    /// infrastructure. These are rendered as notices, not failures.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            DashboardError::EmptyDataset
                | DashboardError::MissingSelection
                | DashboardError::RoleSelection
                | DashboardError::Horizon(_)
                | DashboardError::NoHistory
                | DashboardError::InsufficientData { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_messages() {
        assert_eq!(
            DashboardError::RoleSelection.to_string(),
            "Select exactly 1 role to generate the forecast."
        );
        assert_eq!(
            DashboardError::NoHistory.to_string(),
            "No historical data for this scenario."
        );
    }

    #[test]
    fn test_user_facing_classification() {
        assert!(DashboardError::NoHistory.is_user_facing());
        assert!(DashboardError::InsufficientData { min_history: 15 }.is_user_facing());
        let load = DashboardError::ModelLoad {
            path: PathBuf::from("models/missing.txt"),
            reason: "not found".into(),
        };
        assert!(!load.is_user_facing());
        assert!(load.to_string().contains("models/missing.txt"));

        let export = DashboardError::Export {
            path: PathBuf::from("out/logs.csv"),
            reason: "permission denied".into(),
        };
        assert!(!export.is_user_facing());
    }
}
