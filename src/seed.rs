//! Synthetic usage data for demos
//!
//! Builds the reference tables, a set of users that respect the department
//! hierarchy, and usage logs whose consumption follows department and role
//! weights, a weekday/weekend pattern, a slow upward trend and a day-to-day
//! carry-over. Everything is written in one transaction.

use crate::catalog::{self, CITIES, COMPANY_NAME, DEVICES, EVENTS, FIRST_NAMES, HIERARCHY, LAST_NAMES, ROLES, STATUSES, ALERTS};
use crate::db::{self, DbConn};
use crate::error::{DashboardError, Result};
use crate::stats::{round_to, sample_lognormal};
use chrono::{Datelike, Duration, Local, NaiveDate};
use csv::WriterBuilder;
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Carry-over from the previous day's consumption
const AUTOCORRELATION: f64 = 0.3;
/// Daily growth of the usage trend
const DAILY_TREND: f64 = 0.002;
const WEEKDAY_SEASONALITY: f64 = 1.25;
const WEEKEND_SEASONALITY: f64 = 0.75;
const MIN_CONSUMPTION_GB: f64 = 0.01;

#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub users: usize,
    pub logs: usize,
    /// Logs fall on random days within this many days before today
    pub span_days: i64,
    pub seed: Option<u64>,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            users: 50,
            logs: 15_000,
            span_days: 540,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeedSummary {
    pub departments: usize,
    pub roles: usize,
    pub users: usize,
    pub logs: usize,
}

#[derive(Debug, Clone, Serialize)]
struct NamedRow {
    id: i64,
    name: String,
}

#[derive(Debug, Clone, Serialize)]
struct RoleRow {
    id: i64,
    name: String,
    data_cap_gb: f64,
}

#[derive(Debug, Clone, Serialize)]
struct AlertRow {
    id: i64,
    flag: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedUser {
    pub user_id: i64,
    pub name: String,
    pub department_id: i64,
    pub role_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedLog {
    pub user_id: i64,
    pub status_id: i64,
    pub alert_id: i64,
    pub event_id: i64,
    pub device_id: i64,
    pub usage_date: String,
    pub consumption_gb: f64,
    pub total_cost: f64,
    pub location: String,
    pub reference_date: String,
}

/// Denormalized log line written by `export_csv`
#[derive(Debug, Serialize)]
struct ExportRecord<'a> {
    usage_date: &'a str,
    user_id: i64,
    user_name: &'a str,
    department: &'a str,
    role: &'a str,
    device: &'a str,
    status: &'a str,
    event: &'a str,
    excess_alert: bool,
    consumption_gb: f64,
    total_cost: f64,
    location: &'a str,
}

/// Generated users and logs, with ids that match the reference tables
#[derive(Debug, Clone)]
pub struct Dataset {
    pub users: Vec<GeneratedUser>,
    pub logs: Vec<GeneratedLog>,
}

/// 1-based id of `name` within a reference list
fn id_of(list: &[&str], name: &str) -> i64 {
    list.iter().position(|n| *n == name).map(|i| i as i64 + 1).unwrap_or(1)
}

fn department_name(id: i64) -> &'static str {
    HIERARCHY[(id - 1) as usize].0
}

fn role_name(id: i64) -> &'static str {
    ROLES[(id - 1) as usize]
}

fn generate_users(count: usize, rng: &mut impl Rng) -> Vec<GeneratedUser> {
    let department_names: Vec<&str> = HIERARCHY.iter().map(|(name, _)| *name).collect();

    (1..=count as i64)
        .map(|user_id| {
            let first = FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())];
            let last = LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())];

            let (department, roles) = HIERARCHY[rng.gen_range(0..HIERARCHY.len())];
            let role = roles[rng.gen_range(0..roles.len())];

            GeneratedUser {
                user_id,
                name: format!("{} {}", first, last),
                department_id: id_of(&department_names, department),
                role_id: id_of(ROLES, role),
            }
        })
        .collect()
}

/// Generate users and usage logs ending at `today`
pub fn generate(options: &SeedOptions, today: NaiveDate, rng: &mut impl Rng) -> Dataset {
    let users = generate_users(options.users, rng);
    if users.is_empty() {
        warn!("No users generated, skipping usage logs");
        return Dataset { users, logs: Vec::new() };
    }

    let span_days = options.span_days.max(0);
    let start = today - Duration::days(span_days);
    let mut history: HashMap<(i64, NaiveDate), f64> = HashMap::new();
    let mut logs = Vec::with_capacity(options.logs);

    for _ in 0..options.logs {
        let user = &users[rng.gen_range(0..users.len())];
        let days_elapsed = rng.gen_range(0..=span_days);
        let date = start + Duration::days(days_elapsed);

        let base = sample_lognormal(rng, 0.4, 0.55);
        let department_weight = catalog::department_weight(department_name(user.department_id));
        let role_weight = catalog::role_weight(role_name(user.role_id));
        let seasonality = if date.weekday().num_days_from_monday() < 5 {
            WEEKDAY_SEASONALITY
        } else {
            WEEKEND_SEASONALITY
        };
        let trend = 1.0 + days_elapsed as f64 * DAILY_TREND;

        let yesterday = history
            .get(&(user.user_id, date - Duration::days(1)))
            .copied()
            .unwrap_or(base);

        let raw = (base + AUTOCORRELATION * yesterday) * department_weight * role_weight * seasonality * trend;
        let consumption = round_to(raw, 2).max(MIN_CONSUMPTION_GB);
        let total_cost = round_to(consumption * rng.gen_range(1.5..3.5), 2);

        history.insert((user.user_id, date), consumption);

        let iso = date.format("%Y-%m-%d").to_string();
        logs.push(GeneratedLog {
            user_id: user.user_id,
            status_id: rng.gen_range(1..=STATUSES.len() as i64),
            alert_id: rng.gen_range(1..=ALERTS.len() as i64),
            event_id: rng.gen_range(1..=EVENTS.len() as i64),
            device_id: rng.gen_range(1..=DEVICES.len() as i64),
            usage_date: iso.clone(),
            consumption_gb: consumption,
            total_cost,
            location: CITIES[rng.gen_range(0..CITIES.len())].to_string(),
            reference_date: iso,
        });
    }

    Dataset { users, logs }
}

fn named_rows(names: &[&str]) -> Vec<NamedRow> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| NamedRow {
            id: i as i64 + 1,
            name: name.to_string(),
        })
        .collect()
}

/// Write reference tables, users and logs in a single transaction. If any
/// statement fails the whole batch is rolled back.
pub async fn write_dataset(db: &DbConn, dataset: &Dataset) -> Result<()> {
    let departments = named_rows(&HIERARCHY.iter().map(|(name, _)| *name).collect::<Vec<_>>());
    let roles: Vec<RoleRow> = ROLES
        .iter()
        .enumerate()
        .map(|(i, name)| RoleRow {
            id: i as i64 + 1,
            name: name.to_string(),
            data_cap_gb: catalog::data_cap_gb(name),
        })
        .collect();
    let alerts: Vec<AlertRow> = ALERTS
        .iter()
        .enumerate()
        .map(|(i, flag)| AlertRow { id: i as i64 + 1, flag: *flag })
        .collect();

    let response = db
        .query(
            r#"
            BEGIN TRANSACTION;

            CREATE company:1 SET name = $company;

            FOR $row IN $departments {
                CREATE type::thing("department", $row.id) SET name = $row.name;
            };
            FOR $row IN $roles {
                CREATE type::thing("role", $row.id) SET name = $row.name, data_cap_gb = $row.data_cap_gb;
            };
            FOR $row IN $devices {
                CREATE type::thing("device", $row.id) SET name = $row.name;
            };
            FOR $row IN $statuses {
                CREATE type::thing("line_status", $row.id) SET name = $row.name;
            };
            FOR $row IN $events {
                CREATE type::thing("special_event", $row.id) SET name = $row.name;
            };
            FOR $row IN $alerts {
                CREATE type::thing("excess_alert", $row.id) SET flag = $row.flag;
            };

            FOR $row IN $users {
                CREATE type::thing("user", $row.user_id) SET
                    user_id = $row.user_id,
                    name = $row.name,
                    department = type::thing("department", $row.department_id),
                    role = type::thing("role", $row.role_id),
                    company = company:1;
            };

            FOR $row IN $logs {
                CREATE usage_log CONTENT {
                    user: type::thing("user", $row.user_id),
                    status: type::thing("line_status", $row.status_id),
                    alert: type::thing("excess_alert", $row.alert_id),
                    event: type::thing("special_event", $row.event_id),
                    device: type::thing("device", $row.device_id),
                    usage_date: $row.usage_date,
                    consumption_gb: $row.consumption_gb,
                    total_cost: $row.total_cost,
                    location: $row.location,
                    reference_date: $row.reference_date
                };
            };

            COMMIT TRANSACTION;
            "#,
        )
        .bind(("company", COMPANY_NAME.to_string()))
        .bind(("departments", departments))
        .bind(("roles", roles))
        .bind(("devices", named_rows(DEVICES)))
        .bind(("statuses", named_rows(STATUSES)))
        .bind(("events", named_rows(EVENTS)))
        .bind(("alerts", alerts))
        .bind(("users", dataset.users.clone()))
        .bind(("logs", dataset.logs.clone()))
        .await?;

    if let Err(e) = response.check() {
        warn!("Seeding transaction rolled back: {}", e);
        return Err(DashboardError::Query(e));
    }

    Ok(())
}

/// Delete all seeded rows, keeping table definitions
pub async fn clear(db: &DbConn) -> Result<()> {
    db.query(
        r#"
        DELETE usage_log;
        DELETE user;
        DELETE excess_alert;
        DELETE special_event;
        DELETE line_status;
        DELETE device;
        DELETE role;
        DELETE department;
        DELETE company;
        "#,
    )
    .await?
    .check()?;
    info!("Cleared existing demo data");
    Ok(())
}

/// Initialize the schema, generate a dataset and write it
pub async fn populate(db: &DbConn, options: &SeedOptions) -> Result<SeedSummary> {
    let dataset = generate_with_options(options);
    populate_with(db, &dataset).await
}

pub fn generate_with_options(options: &SeedOptions) -> Dataset {
    let mut rng: StdRng = match options.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    generate(options, Local::now().date_naive(), &mut rng)
}

pub async fn populate_with(db: &DbConn, dataset: &Dataset) -> Result<SeedSummary> {
    db::init_schema(db).await?;
    write_dataset(db, dataset).await?;

    let summary = SeedSummary {
        departments: HIERARCHY.len(),
        roles: ROLES.len(),
        users: dataset.users.len(),
        logs: dataset.logs.len(),
    };
    info!(
        "Seeded {} departments, {} roles, {} users, {} usage logs",
        summary.departments, summary.roles, summary.users, summary.logs
    );
    Ok(summary)
}

/// Write the dataset, then export it. The CSV is only written once the
/// transaction has committed.
pub async fn seed_database(db: &DbConn, dataset: &Dataset, export: Option<&Path>) -> Result<SeedSummary> {
    let summary = populate_with(db, dataset).await?;
    if let Some(path) = export {
        export_csv(path, dataset)?;
        info!("Exported {} logs to {}", dataset.logs.len(), path.display());
    }
    Ok(summary)
}

/// Write the generated logs to CSV with names resolved
pub fn export_csv(path: &Path, dataset: &Dataset) -> Result<()> {
    let export_error = |reason: String| DashboardError::Export {
        path: path.to_path_buf(),
        reason,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| export_error(e.to_string()))?;
    }

    let users: HashMap<i64, &GeneratedUser> = dataset.users.iter().map(|u| (u.user_id, u)).collect();
    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| export_error(e.to_string()))?;

    for log in &dataset.logs {
        let Some(user) = users.get(&log.user_id) else {
            continue;
        };
        writer.serialize(ExportRecord {
            usage_date: &log.usage_date,
            user_id: log.user_id,
            user_name: &user.name,
            department: department_name(user.department_id),
            role: role_name(user.role_id),
            device: DEVICES[(log.device_id - 1) as usize],
            status: STATUSES[(log.status_id - 1) as usize],
            event: EVENTS[(log.event_id - 1) as usize],
            excess_alert: ALERTS[(log.alert_id - 1) as usize],
            consumption_gb: log.consumption_gb,
            total_cost: log.total_cost,
            location: &log.location,
        })
        .map_err(|e| export_error(e.to_string()))?;
    }

    writer.flush().map_err(|e| export_error(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
    }

    fn small_options() -> SeedOptions {
        SeedOptions {
            users: 10,
            logs: 500,
            span_days: 90,
            seed: Some(42),
        }
    }

    #[test]
    fn test_users_respect_hierarchy() {
        let mut rng = StdRng::seed_from_u64(7);
        let dataset = generate(&small_options(), today(), &mut rng);

        assert_eq!(dataset.users.len(), 10);
        for user in &dataset.users {
            let department = department_name(user.department_id);
            let role = role_name(user.role_id);
            let allowed = catalog::allowed_roles(department).unwrap();
            assert!(allowed.contains(&role), "{} not allowed in {}", role, department);
        }
    }

    #[test]
    fn test_logs_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let options = small_options();
        let dataset = generate(&options, today(), &mut rng);
        let start = today() - Duration::days(options.span_days);

        assert_eq!(dataset.logs.len(), 500);
        for log in &dataset.logs {
            let date = NaiveDate::parse_from_str(&log.usage_date, "%Y-%m-%d").unwrap();
            assert!(date >= start && date <= today());
            assert!(log.consumption_gb >= MIN_CONSUMPTION_GB);
            assert!(log.total_cost >= round_to(log.consumption_gb * 1.5, 2) - 0.01);
            assert!((1..=DEVICES.len() as i64).contains(&log.device_id));
            assert!((1..=STATUSES.len() as i64).contains(&log.status_id));
            assert_eq!(log.usage_date, log.reference_date);
        }
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let a = generate(&small_options(), today(), &mut StdRng::seed_from_u64(99));
        let b = generate(&small_options(), today(), &mut StdRng::seed_from_u64(99));
        let a_values: Vec<f64> = a.logs.iter().map(|l| l.consumption_gb).collect();
        let b_values: Vec<f64> = b.logs.iter().map(|l| l.consumption_gb).collect();
        assert_eq!(a_values, b_values);
    }

    #[test]
    fn test_negative_span_puts_every_log_on_today() {
        let options = SeedOptions { span_days: -5, ..small_options() };
        let dataset = generate(&options, today(), &mut StdRng::seed_from_u64(2));
        assert_eq!(dataset.logs.len(), 500);
        let today = today().format("%Y-%m-%d").to_string();
        assert!(dataset.logs.iter().all(|l| l.usage_date == today));
    }

    #[test]
    fn test_no_users_means_no_logs() {
        let options = SeedOptions { users: 0, ..small_options() };
        let dataset = generate(&options, today(), &mut StdRng::seed_from_u64(1));
        assert!(dataset.logs.is_empty());
    }

    #[test]
    fn test_export_csv_resolves_names() {
        let dataset = generate(&small_options(), today(), &mut StdRng::seed_from_u64(5));
        let path = std::env::temp_dir().join(format!("sim_seed_export_{}.csv", std::process::id()));
        export_csv(&path, &dataset).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert!(headers.iter().any(|h| h == "department"));
        assert_eq!(reader.records().count(), dataset.logs.len());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_export_into_a_file_is_export_error() {
        let dataset = generate(&small_options(), today(), &mut StdRng::seed_from_u64(5));
        let blocker = std::env::temp_dir().join(format!("sim_seed_blocker_{}", std::process::id()));
        std::fs::write(&blocker, "not a directory").unwrap();

        let err = export_csv(&blocker.join("logs.csv"), &dataset).err().unwrap();
        assert!(matches!(err, DashboardError::Export { .. }));
        std::fs::remove_file(&blocker).ok();
    }

    #[tokio::test]
    async fn test_rolled_back_seed_writes_no_csv() {
        let db = db::connect(&crate::config::DbSettings::in_memory()).await.unwrap();
        let dataset = generate(&small_options(), today(), &mut StdRng::seed_from_u64(4));
        let path = std::env::temp_dir().join(format!("sim_seed_rollback_{}.csv", std::process::id()));

        seed_database(&db, &dataset, None).await.unwrap();
        let err = seed_database(&db, &dataset, Some(&path)).await.err().unwrap();
        assert!(matches!(err, DashboardError::Query(_)));
        assert!(!path.exists());

        clear(&db).await.unwrap();
        let summary = seed_database(&db, &dataset, Some(&path)).await.unwrap();
        assert_eq!(summary.logs, 500);
        assert!(path.exists());
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_reseeding_without_clear_rolls_back() {
        let db = db::connect(&crate::config::DbSettings::in_memory()).await.unwrap();
        let dataset = generate(&small_options(), today(), &mut StdRng::seed_from_u64(3));
        populate_with(&db, &dataset).await.unwrap();

        // Same ids again: the transaction must fail and leave the first batch intact
        assert!(populate_with(&db, &dataset).await.is_err());
        assert_eq!(db::load_model_facts(&db).await.unwrap().len(), 500);

        clear(&db).await.unwrap();
        assert!(db::load_model_facts(&db).await.unwrap().is_empty());
    }
}
