//! Shared business logic for the dashboard
//!
//! This service layer is used by both the HTML pages and the JSON handlers.

use crate::aggregate::{self, Kpis};
use crate::cache::TtlCell;
use crate::chart;
use crate::config::DashboardSettings;
use crate::db::{self, DbConn};
use crate::error::{DashboardError, Result};
use crate::features::prepare_observations;
use crate::forecast::{self, ForecastSettings};
use crate::model::{self, Regressor};
use crate::models::{ModelFact, MonthlyPoint, UsageRecord};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::info;

/// Horizon preselected in the dashboard form
pub const DEFAULT_HORIZON_MONTHS: u32 = 6;

// ============================================================================
// Data Structures
// ============================================================================

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FilterOptions {
    pub departments: Vec<String>,
    /// Roles present in the selected departments
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastRequest {
    pub departments: Vec<String>,
    pub roles: Vec<String>,
    #[serde(default = "default_horizon")]
    pub horizon_months: u32,
}

fn default_horizon() -> u32 {
    DEFAULT_HORIZON_MONTHS
}

#[derive(Debug, Clone, Serialize)]
pub struct ForecastReport {
    pub role: String,
    pub departments: Vec<String>,
    pub horizon_months: u32,
    pub last_history_date: NaiveDate,
    pub users_forecast: usize,
    pub users_skipped: usize,
    pub points: Vec<MonthlyPoint>,
    pub chart_svg: String,
}

// ============================================================================
// Dashboard Service
// ============================================================================

pub struct DashboardService {
    settings: DashboardSettings,
    forecast_settings: ForecastSettings,
    connection: TtlCell<DbConn>,
    usage: TtlCell<Arc<Vec<UsageRecord>>>,
    facts: TtlCell<Arc<Vec<ModelFact>>>,
    model: TtlCell<Arc<dyn Regressor>>,
    rng: Mutex<StdRng>,
}

impl DashboardService {
    /// Remote endpoints reconnect after the connection TTL. Embedded stores
    /// keep their first handle: reopening a RocksDB directory in the same
    /// process fails on its lock, and reopening `mem://` yields an empty store.
    pub fn new(settings: DashboardSettings) -> Self {
        let connection = if settings.db.is_embedded() {
            TtlCell::for_lifetime()
        } else {
            TtlCell::new(settings.connection_ttl())
        };
        Self {
            forecast_settings: ForecastSettings::default(),
            connection,
            usage: TtlCell::new(settings.data_ttl()),
            facts: TtlCell::new(settings.data_ttl()),
            model: TtlCell::for_lifetime(),
            rng: Mutex::new(seeded_rng(settings.seed)),
            settings,
        }
    }

    /// Build around an open connection, optionally with a model already in
    /// hand. In-memory stores live only as long as their handle, so the
    /// connection is never rebuilt.
    pub fn with_connection(
        settings: DashboardSettings,
        db: DbConn,
        model: Option<Arc<dyn Regressor>>,
    ) -> Self {
        let mut service = Self::new(settings);
        service.connection = TtlCell::preloaded(db);
        if let Some(model) = model {
            service.model = TtlCell::preloaded(model);
        }
        service
    }

    pub fn with_forecast_settings(mut self, forecast_settings: ForecastSettings) -> Self {
        self.forecast_settings = forecast_settings;
        self
    }

    pub fn settings(&self) -> &DashboardSettings {
        &self.settings
    }

    async fn connection(&self) -> Result<DbConn> {
        self.connection
            .get_or_try_init(|| db::connect(&self.settings.db))
            .await
    }

    pub async fn usage_records(&self) -> Result<Arc<Vec<UsageRecord>>> {
        self.usage
            .get_or_try_init(|| async {
                let db = self.connection().await?;
                Ok(Arc::new(db::load_usage_records(&db).await?))
            })
            .await
    }

    pub async fn model_facts(&self) -> Result<Arc<Vec<ModelFact>>> {
        self.facts
            .get_or_try_init(|| async {
                let db = self.connection().await?;
                Ok(Arc::new(db::load_model_facts(&db).await?))
            })
            .await
    }

    pub async fn model(&self) -> Result<Arc<dyn Regressor>> {
        self.model
            .get_or_try_init(|| async { model::load_model(&self.settings.model_path) })
            .await
    }

    /// Drop cached query results so the next request reloads them
    pub async fn refresh(&self) {
        self.usage.invalidate().await;
        self.facts.invalidate().await;
        info!("Cleared cached query results");
    }

    /// Department options, and role options within `departments`
    pub async fn filters(&self, departments: &[String]) -> Result<FilterOptions> {
        let records = self.usage_records().await?;
        if records.is_empty() {
            return Err(DashboardError::EmptyDataset);
        }

        Ok(FilterOptions {
            departments: aggregate::department_options(&records),
            roles: aggregate::role_options(&records, departments),
        })
    }

    pub async fn kpis(&self, departments: &[String], roles: &[String]) -> Result<Kpis> {
        if departments.is_empty() || roles.is_empty() {
            return Err(DashboardError::MissingSelection);
        }
        let records = self.usage_records().await?;
        if records.is_empty() {
            return Err(DashboardError::EmptyDataset);
        }

        let filtered = aggregate::filter_records(&records, departments, roles);
        Ok(aggregate::compute_kpis(&filtered))
    }

    /// Validate the selection, forecast the scoped users and build the chart
    pub async fn forecast(&self, request: &ForecastRequest) -> Result<ForecastReport> {
        let role = forecast::single_role(&request.roles)?;
        if request.departments.is_empty() {
            return Err(DashboardError::MissingSelection);
        }
        let horizon_months = forecast::check_horizon(request.horizon_months)?;

        let model = self.model().await?;
        let facts = self.model_facts().await?;
        let observations = prepare_observations(&facts)?;
        let scoped = forecast::select_scope(&observations, role, &request.departments);
        if scoped.is_empty() {
            return Err(DashboardError::NoHistory);
        }

        let run = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            forecast::run_forecast(
                &scoped,
                horizon_months,
                model.as_ref(),
                &self.forecast_settings,
                &mut *rng,
            )?
        };

        let points = aggregate::chart_points(&scoped, &run);
        let chart_svg = chart::render_projection(role, &points);

        Ok(ForecastReport {
            role: role.to_string(),
            departments: request.departments.clone(),
            horizon_months,
            last_history_date: run.last_history_date,
            users_forecast: run.users.len(),
            users_skipped: run.skipped_users,
            points,
            chart_svg,
        })
    }
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}
