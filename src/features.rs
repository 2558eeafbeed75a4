//! Feature preparation for the consumption model
//!
//! Raw modeling rows become dated observations, and each forecast step
//! turns a user's rolling buffer plus a calendar date into the fixed
//! 16-column feature vector the model was trained on.

use crate::error::{DashboardError, Result};
use crate::models::{ModelFact, Observation, UserContext};
use crate::stats::mean;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// Column order of the trained model
pub const FEATURE_COLUMNS: [&str; 16] = [
    "year",
    "month",
    "day",
    "dayofweek",
    "weekofyear",
    "is_weekend",
    "lag_1",
    "lag_7",
    "lag_30",
    "rolling_7",
    "rolling_30",
    "cargo",
    "departamento",
    "evento",
    "dispositivo",
    "situacao",
];

/// Columns holding categorical values, in model order
pub const CATEGORICAL_COLUMNS: [&str; 5] = ["cargo", "departamento", "evento", "dispositivo", "situacao"];

/// Index of the first categorical column in `FEATURE_COLUMNS`
pub const FIRST_CATEGORICAL: usize = 11;

/// Parse dates and rename consumption. No filtering of values.
pub fn prepare_observations(facts: &[ModelFact]) -> Result<Vec<Observation>> {
    facts
        .iter()
        .map(|f| {
            let date = parse_usage_date(&f.usage_date)?;
            Ok(Observation {
                date,
                consumption_gb: f.consumption,
                user_id: f.user_id,
                user_name: f.user_name.clone(),
                department: f.department.clone(),
                role: f.role.clone(),
                event: f.event.clone(),
                device: f.device.clone(),
                status: f.status.clone(),
            })
        })
        .collect()
}

/// Accepts `YYYY-MM-DD` and ISO datetimes, keeping the calendar date
pub fn parse_usage_date(raw: &str) -> Result<NaiveDate> {
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|e| DashboardError::RowShape(format!("bad usage_date '{}': {}", raw, e)))
}

/// One model input row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    /// Monday = 0
    pub dayofweek: u32,
    /// ISO week number
    pub weekofyear: u32,
    pub is_weekend: u8,
    pub lag_1: f64,
    pub lag_7: f64,
    pub lag_30: f64,
    pub rolling_7: f64,
    pub rolling_30: f64,
    pub context: UserContext,
}

impl FeatureVector {
    /// Numeric columns in model order (first 11 columns)
    pub fn numeric_values(&self) -> [f64; 11] {
        [
            self.year as f64,
            self.month as f64,
            self.day as f64,
            self.dayofweek as f64,
            self.weekofyear as f64,
            self.is_weekend as f64,
            self.lag_1,
            self.lag_7,
            self.lag_30,
            self.rolling_7,
            self.rolling_30,
        ]
    }

    /// Categorical columns in model order (last 5 columns)
    pub fn categorical_values(&self) -> [&str; 5] {
        [
            self.context.role.as_str(),
            self.context.department.as_str(),
            self.context.event.as_str(),
            self.context.device.as_str(),
            self.context.status.as_str(),
        ]
    }
}

/// Value `steps` positions from the end, or the last value when the buffer
/// is shorter
fn lag(buffer: &[f64], steps: usize) -> f64 {
    let last = buffer[buffer.len() - 1];
    if buffer.len() >= steps {
        buffer[buffer.len() - steps]
    } else {
        last
    }
}

/// Mean of the last `window` values (or all of them when fewer)
fn rolling_mean(buffer: &[f64], window: usize) -> f64 {
    let start = buffer.len().saturating_sub(window);
    mean(&buffer[start..])
}

/// Build the feature vector for `date` from a non-empty rolling buffer
pub fn build_feature_vector(buffer: &[f64], date: NaiveDate, context: &UserContext) -> FeatureVector {
    debug_assert!(!buffer.is_empty(), "rolling buffer must hold history");
    let dayofweek = date.weekday().num_days_from_monday();

    FeatureVector {
        year: date.year(),
        month: date.month(),
        day: date.day(),
        dayofweek,
        weekofyear: date.iso_week().week(),
        is_weekend: u8::from(dayofweek >= 5),
        lag_1: lag(buffer, 1),
        lag_7: lag(buffer, 7),
        lag_30: lag(buffer, 30),
        rolling_7: rolling_mean(buffer, 7),
        rolling_30: rolling_mean(buffer, 30),
        context: context.clone(),
    }
}
