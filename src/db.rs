//! SurrealDB access for the usage dashboard
//!
//! The relational layout (company, department, role, device, line status,
//! special event, excess alert, user, usage log) is kept as one table each,
//! with record links in place of foreign keys. The two dashboard queries walk
//! those links the way the SQL joins did.

use crate::config::DbSettings;
use crate::error::{DashboardError, Result};
use crate::models::{ModelFact, UsageRecord};
use surrealdb::engine::any::{self, Any};
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;
use tracing::{debug, info};

pub type DbConn = Surreal<Any>;

/// Open the configured endpoint and select namespace and database
pub async fn connect(settings: &DbSettings) -> Result<DbConn> {
    let db = any::connect(settings.db_endpoint.as_str())
        .await
        .map_err(|source| DashboardError::Connection { source })?;

    if let (Some(username), Some(password)) = (&settings.db_user, &settings.db_password) {
        db.signin(Root {
            username: username.as_str(),
            password: password.as_str(),
        })
        .await
        .map_err(|source| DashboardError::Connection { source })?;
    }

    db.use_ns(settings.db_namespace.as_str())
        .use_db(settings.db_database.as_str())
        .await
        .map_err(|source| DashboardError::Connection { source })?;

    info!(endpoint = %settings.db_endpoint, "Connected to SurrealDB");
    Ok(db)
}

/// Initialize database schema
pub async fn init_schema(db: &DbConn) -> Result<()> {
    db.query(
        r#"
        -- Dimension tables
        DEFINE TABLE IF NOT EXISTS company SCHEMAFULL;
        DEFINE FIELD IF NOT EXISTS name ON company TYPE string;

        DEFINE TABLE IF NOT EXISTS department SCHEMAFULL;
        DEFINE FIELD IF NOT EXISTS name ON department TYPE string;
        DEFINE INDEX IF NOT EXISTS idx_department_name ON department FIELDS name UNIQUE;

        DEFINE TABLE IF NOT EXISTS role SCHEMAFULL;
        DEFINE FIELD IF NOT EXISTS name ON role TYPE string;
        DEFINE FIELD IF NOT EXISTS data_cap_gb ON role TYPE float;
        DEFINE INDEX IF NOT EXISTS idx_role_name ON role FIELDS name UNIQUE;

        DEFINE TABLE IF NOT EXISTS device SCHEMAFULL;
        DEFINE FIELD IF NOT EXISTS name ON device TYPE string;

        DEFINE TABLE IF NOT EXISTS line_status SCHEMAFULL;
        DEFINE FIELD IF NOT EXISTS name ON line_status TYPE string;

        DEFINE TABLE IF NOT EXISTS special_event SCHEMAFULL;
        DEFINE FIELD IF NOT EXISTS name ON special_event TYPE string;

        DEFINE TABLE IF NOT EXISTS excess_alert SCHEMAFULL;
        DEFINE FIELD IF NOT EXISTS flag ON excess_alert TYPE bool;

        -- Users link to their department, role and company
        DEFINE TABLE IF NOT EXISTS user SCHEMAFULL;
        DEFINE FIELD IF NOT EXISTS user_id ON user TYPE int;
        DEFINE FIELD IF NOT EXISTS name ON user TYPE string;
        DEFINE FIELD IF NOT EXISTS department ON user TYPE record<department>;
        DEFINE FIELD IF NOT EXISTS role ON user TYPE record<role>;
        DEFINE FIELD IF NOT EXISTS company ON user TYPE record<company>;
        DEFINE INDEX IF NOT EXISTS idx_user_id ON user FIELDS user_id UNIQUE;

        -- Usage log (schemaless for flexibility)
        DEFINE TABLE IF NOT EXISTS usage_log SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_usage_date ON usage_log FIELDS usage_date;
        DEFINE INDEX IF NOT EXISTS idx_usage_user ON usage_log FIELDS user;
        "#,
    )
    .await?
    .check()?;

    Ok(())
}

/// Display query: usage joined with user, department, role and company,
/// ordered by date. An empty vector means the query ran and found nothing.
pub async fn load_usage_records(db: &DbConn) -> Result<Vec<UsageRecord>> {
    let mut records: Vec<UsageRecord> = db
        .query(
            r#"
            SELECT
                usage_date,
                consumption_gb,
                user.name AS user_name,
                user.department.name AS department,
                user.role.name AS role,
                user.role.data_cap_gb AS plan_gb,
                user.company.name AS company
            FROM usage_log
            ORDER BY usage_date
            "#,
        )
        .await?
        .take(0)?;

    for record in &mut records {
        record.month = month_of(&record.usage_date);
    }

    debug!(rows = records.len(), "Loaded usage records");
    Ok(records)
}

/// Modeling query: raw per-event facts with every categorical the model
/// needs, ordered by date
pub async fn load_model_facts(db: &DbConn) -> Result<Vec<ModelFact>> {
    let facts: Vec<ModelFact> = db
        .query(
            r#"
            SELECT
                usage_date,
                consumption_gb AS consumption,
                user.user_id AS user_id,
                user.name AS user_name,
                user.department.name AS department,
                user.role.name AS role,
                event.name AS event,
                device.name AS device,
                status.name AS status
            FROM usage_log
            ORDER BY usage_date
            "#,
        )
        .await?
        .take(0)?;

    debug!(rows = facts.len(), "Loaded model facts");
    Ok(facts)
}

/// `YYYY-MM` prefix of an ISO date
fn month_of(date: &str) -> String {
    date.get(..7).unwrap_or(date).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::seed::{self, SeedOptions};

    #[test]
    fn test_month_of() {
        assert_eq!(month_of("2025-03-14"), "2025-03");
        assert_eq!(month_of("2025"), "2025");
    }

    #[tokio::test]
    async fn test_empty_database_yields_empty_results() {
        let db = connect(&DbSettings::in_memory()).await.unwrap();
        init_schema(&db).await.unwrap();

        assert!(load_usage_records(&db).await.unwrap().is_empty());
        assert!(load_model_facts(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_queries_follow_record_links() {
        let db = connect(&DbSettings::in_memory()).await.unwrap();
        let options = SeedOptions {
            users: 6,
            logs: 120,
            span_days: 60,
            seed: Some(11),
        };
        let summary = seed::populate(&db, &options).await.unwrap();
        assert_eq!(summary.logs, 120);

        let records = load_usage_records(&db).await.unwrap();
        assert_eq!(records.len(), 120);
        assert!(records.windows(2).all(|w| w[0].usage_date <= w[1].usage_date));
        for record in &records {
            assert_eq!(record.company, catalog::COMPANY_NAME);
            assert_eq!(record.month, record.usage_date[..7]);
            assert!(record.plan_gb > 0.0);
        }

        let facts = load_model_facts(&db).await.unwrap();
        assert_eq!(facts.len(), 120);
        for fact in &facts {
            assert!(catalog::DEVICES.contains(&fact.device.as_str()));
            assert!(catalog::STATUSES.contains(&fact.status.as_str()));
            assert!(catalog::EVENTS.contains(&fact.event.as_str()));
            assert!(catalog::allowed_roles(&fact.department)
                .unwrap()
                .contains(&fact.role.as_str()));
        }
    }
}
