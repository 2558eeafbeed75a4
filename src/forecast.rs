//! Per-user consumption forecast
//!
//! Each eligible user gets a rolling buffer seeded with their latest history.
//! Every future day builds features from that buffer, asks the model for a
//! base value, adds noise scaled to the user's own volatility, applies the
//! compounding daily trend, clamps at zero, and pushes the result back into
//! the buffer so the next day's lags see it. Users are independent; days
//! within a user are strictly sequential.

use crate::error::{DashboardError, Result};
use crate::features::build_feature_vector;
use crate::model::Regressor;
use crate::models::{Observation, UserContext};
use crate::stats::{population_std, sample_normal};
use chrono::{Duration, NaiveDate};
use rand::Rng;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

pub const MIN_HORIZON_MONTHS: u32 = 1;
pub const MAX_HORIZON_MONTHS: u32 = 12;

#[derive(Debug, Clone)]
pub struct ForecastSettings {
    /// Users with fewer observations are skipped
    pub min_history: usize,
    /// Observations kept in the initial rolling buffer
    pub buffer_len: usize,
    /// Noise std as a fraction of the user's historical std. 0 disables noise.
    pub noise_scale: f64,
    /// Multiplicative growth per forecast day, compounded. Each trended
    /// value is pushed back into the buffer and feeds the next day's lag
    /// features, so growth compounds a second time through the model input
    /// and the effective rate runs above this factor.
    pub daily_trend: f64,
    pub days_per_month: u32,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            min_history: 15,
            buffer_len: 60,
            noise_scale: 0.6,
            daily_trend: 1.001,
            days_per_month: 30,
        }
    }
}

/// Forecast of one user, aligned with `ForecastRun::dates`
#[derive(Debug, Clone, Serialize)]
pub struct UserForecast {
    pub user_id: i64,
    pub user_name: String,
    /// Std of the initial buffer, the basis of the injected noise
    pub volatility: f64,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForecastRun {
    pub last_history_date: NaiveDate,
    pub dates: Vec<NaiveDate>,
    pub users: Vec<UserForecast>,
    /// Users skipped for short history
    pub skipped_users: usize,
}

/// The single role a forecast runs for
pub fn single_role(roles: &[String]) -> Result<&str> {
    match roles {
        [role] => Ok(role.as_str()),
        _ => Err(DashboardError::RoleSelection),
    }
}

pub fn check_horizon(months: u32) -> Result<u32> {
    if (MIN_HORIZON_MONTHS..=MAX_HORIZON_MONTHS).contains(&months) {
        Ok(months)
    } else {
        Err(DashboardError::Horizon(months))
    }
}

/// Observations of `role` within `departments`
pub fn select_scope(observations: &[Observation], role: &str, departments: &[String]) -> Vec<Observation> {
    observations
        .iter()
        .filter(|o| o.role == role && departments.iter().any(|d| *d == o.department))
        .cloned()
        .collect()
}

/// `horizon_months * days_per_month` contiguous days after `last`
pub fn forecast_dates(last: NaiveDate, horizon_months: u32, days_per_month: u32) -> Vec<NaiveDate> {
    let days = (horizon_months * days_per_month) as i64;
    (1..=days).map(|offset| last + Duration::days(offset)).collect()
}

/// Group by user in order of first appearance, each group sorted by date
fn group_by_user(scoped: &[Observation]) -> Vec<(i64, Vec<&Observation>)> {
    let mut order: Vec<i64> = Vec::new();
    let mut groups: HashMap<i64, Vec<&Observation>> = HashMap::new();

    for obs in scoped {
        groups
            .entry(obs.user_id)
            .or_insert_with(|| {
                order.push(obs.user_id);
                Vec::new()
            })
            .push(obs);
    }

    order
        .into_iter()
        .filter_map(|uid| {
            groups.remove(&uid).map(|mut history| {
                history.sort_by_key(|o| o.date);
                (uid, history)
            })
        })
        .collect()
}

/// Forecast one user over `dates`. `history` must be sorted by date and
/// non-empty.
pub fn forecast_user(
    history: &[&Observation],
    dates: &[NaiveDate],
    model: &dyn Regressor,
    settings: &ForecastSettings,
    rng: &mut impl Rng,
) -> UserForecast {
    let start = history.len().saturating_sub(settings.buffer_len);
    let mut buffer: Vec<f64> = history[start..].iter().map(|o| o.consumption_gb).collect();

    let volatility = if buffer.len() > 1 { population_std(&buffer) } else { 1.0 };
    let noise_std = volatility * settings.noise_scale;

    let latest = history[history.len() - 1];
    let context = UserContext::from(latest);

    let mut values = Vec::with_capacity(dates.len());
    let mut trend = 1.0;
    for &date in dates {
        let features = build_feature_vector(&buffer, date, &context);
        let base = model.predict(&features);
        let noise = sample_normal(rng, 0.0, noise_std);
        trend *= settings.daily_trend;

        let value = ((base + noise) * trend).max(0.0);
        buffer.push(value);
        values.push(value);
    }

    UserForecast {
        user_id: latest.user_id,
        user_name: latest.user_name.clone(),
        volatility,
        values,
    }
}

/// Forecast every eligible user of an already scoped population
pub fn run_forecast(
    scoped: &[Observation],
    horizon_months: u32,
    model: &dyn Regressor,
    settings: &ForecastSettings,
    rng: &mut impl Rng,
) -> Result<ForecastRun> {
    let horizon_months = check_horizon(horizon_months)?;
    let last_history_date = scoped
        .iter()
        .map(|o| o.date)
        .max()
        .ok_or(DashboardError::NoHistory)?;

    let dates = forecast_dates(last_history_date, horizon_months, settings.days_per_month);

    let mut users = Vec::new();
    let mut skipped_users = 0;
    for (user_id, history) in group_by_user(scoped) {
        if history.len() < settings.min_history {
            debug!(user_id, observations = history.len(), "Skipping user with short history");
            skipped_users += 1;
            continue;
        }
        users.push(forecast_user(&history, &dates, model, settings, rng));
    }

    if users.is_empty() {
        return Err(DashboardError::InsufficientData {
            min_history: settings.min_history,
        });
    }

    info!(
        users = users.len(),
        skipped = skipped_users,
        days = dates.len(),
        "Forecast complete"
    );

    Ok(ForecastRun {
        last_history_date,
        dates,
        users,
        skipped_users,
    })
}
