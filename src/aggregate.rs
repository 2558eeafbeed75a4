//! Portfolio totals and monthly buckets for the projection chart

use crate::forecast::ForecastRun;
use crate::models::{MonthlyPoint, Observation, SeriesKind, UsageRecord};
use crate::stats::round_to;
use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Months of history shown before the forecast
pub const HISTORY_WINDOW_MONTHS: u32 = 6;

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// `Mar/2025`
pub fn month_label(month: NaiveDate) -> String {
    month.format("%b/%Y").to_string()
}

/// Sum every user's forecast per date. Users lacking a date contribute 0.
pub fn portfolio_daily(run: &ForecastRun) -> BTreeMap<NaiveDate, f64> {
    let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for user in &run.users {
        for (date, value) in run.dates.iter().zip(&user.values) {
            *daily.entry(*date).or_insert(0.0) += value;
        }
    }
    daily
}

/// Resample a daily series to month-start buckets by summation
pub fn resample_monthly(daily: &BTreeMap<NaiveDate, f64>) -> BTreeMap<NaiveDate, f64> {
    let mut monthly: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for (date, value) in daily {
        *monthly.entry(month_start(*date)).or_insert(0.0) += value;
    }
    monthly
}

/// Daily totals of the scoped history
pub fn historical_daily(scoped: &[Observation]) -> BTreeMap<NaiveDate, f64> {
    let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for obs in scoped {
        *daily.entry(obs.date).or_insert(0.0) += obs.consumption_gb;
    }
    daily
}

/// Keep months on or after the latest month minus the window
pub fn recent_months(monthly: BTreeMap<NaiveDate, f64>, window: u32) -> BTreeMap<NaiveDate, f64> {
    let Some(latest) = monthly.keys().next_back().copied() else {
        return monthly;
    };
    let start = latest.checked_sub_months(Months::new(window)).unwrap_or(latest);
    monthly.into_iter().filter(|(month, _)| *month >= start).collect()
}

/// Historical months followed by forecast months, tagged by kind
pub fn chart_points(scoped: &[Observation], run: &ForecastRun) -> Vec<MonthlyPoint> {
    let historical = recent_months(resample_monthly(&historical_daily(scoped)), HISTORY_WINDOW_MONTHS);
    let forecast = resample_monthly(&portfolio_daily(run));

    let tag = |series: BTreeMap<NaiveDate, f64>, kind: SeriesKind| {
        series.into_iter().map(move |(month, value)| MonthlyPoint {
            month_start: month,
            label: month_label(month),
            consumption_gb: value,
            kind,
        })
    };

    tag(historical, SeriesKind::Historical)
        .chain(tag(forecast, SeriesKind::Forecast))
        .collect()
}

/// Headline figures for the filtered population
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Kpis {
    pub total_consumption_gb: f64,
    /// Sum of plan allowances, one per distinct user
    pub contracted_gb: f64,
    pub users: usize,
    pub records: usize,
    /// `(YYYY-MM, GB)` in month order
    pub monthly: Vec<(String, f64)>,
}

pub fn filter_records<'a>(
    records: &'a [UsageRecord],
    departments: &[String],
    roles: &[String],
) -> Vec<&'a UsageRecord> {
    records
        .iter()
        .filter(|r| departments.contains(&r.department) && roles.contains(&r.role))
        .collect()
}

pub fn compute_kpis(filtered: &[&UsageRecord]) -> Kpis {
    let total_consumption_gb: f64 = filtered.iter().map(|r| r.consumption_gb).sum();

    let mut seen: HashSet<&str> = HashSet::new();
    let mut contracted_gb = 0.0;
    for record in filtered {
        if seen.insert(record.user_name.as_str()) {
            contracted_gb += record.plan_gb;
        }
    }

    let mut monthly: BTreeMap<&str, f64> = BTreeMap::new();
    for record in filtered {
        *monthly.entry(record.month.as_str()).or_insert(0.0) += record.consumption_gb;
    }

    Kpis {
        total_consumption_gb: round_to(total_consumption_gb, 2),
        contracted_gb: round_to(contracted_gb, 2),
        users: seen.len(),
        records: filtered.len(),
        monthly: monthly
            .into_iter()
            .map(|(m, v)| (m.to_string(), round_to(v, 2)))
            .collect(),
    }
}

/// Sorted distinct departments
pub fn department_options(records: &[UsageRecord]) -> Vec<String> {
    let mut departments: Vec<String> = records.iter().map(|r| r.department.clone()).collect();
    departments.sort();
    departments.dedup();
    departments
}

/// Sorted distinct roles present in the selected departments
pub fn role_options(records: &[UsageRecord], departments: &[String]) -> Vec<String> {
    let mut roles: Vec<String> = records
        .iter()
        .filter(|r| departments.contains(&r.department))
        .map(|r| r.role.clone())
        .collect();
    roles.sort();
    roles.dedup();
    roles
}
