use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Row of the display query: one usage log joined with its user, department,
/// role and company
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub usage_date: String,
    pub consumption_gb: f64,
    pub user_name: String,
    pub department: String,
    pub role: String,
    /// Data cap of the user's role
    pub plan_gb: f64,
    pub company: String,
    /// `YYYY-MM`, derived after loading
    #[serde(default)]
    pub month: String,
}

/// Row of the modeling query: one usage log with every categorical the
/// forecast model consumes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFact {
    pub usage_date: String,
    pub consumption: f64,
    pub user_id: i64,
    pub user_name: String,
    pub department: String,
    pub role: String,
    pub event: String,
    pub device: String,
    pub status: String,
}

/// Prepared modeling row with a parsed date and the canonical consumption
/// field name
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub consumption_gb: f64,
    pub user_id: i64,
    pub user_name: String,
    pub department: String,
    pub role: String,
    pub event: String,
    pub device: String,
    pub status: String,
}

/// Categorical context of a user, copied from their latest record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserContext {
    pub role: String,
    pub department: String,
    pub event: String,
    pub device: String,
    pub status: String,
}

impl From<&Observation> for UserContext {
    fn from(o: &Observation) -> Self {
        Self {
            role: o.role.clone(),
            department: o.department.clone(),
            event: o.event.clone(),
            device: o.device.clone(),
            status: o.status.clone(),
        }
    }
}

/// Whether a monthly bucket is observed or predicted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SeriesKind {
    Historical,
    Forecast,
}

impl SeriesKind {
    pub fn label(&self) -> &'static str {
        match self {
            SeriesKind::Historical => "Historical",
            SeriesKind::Forecast => "Forecast",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            SeriesKind::Historical => "#1F77B4",
            SeriesKind::Forecast => "#FF7F0E",
        }
    }
}

/// One bar of the projection chart
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MonthlyPoint {
    pub month_start: NaiveDate,
    /// Display label, e.g. `Mar/2025`
    pub label: String,
    pub consumption_gb: f64,
    pub kind: SeriesKind,
}
