//! Server-rendered HTML pages
//!
//! A sidebar layout with four static pages and the dashboard. The dashboard
//! is a plain GET form, so every filter change is a new request and the
//! page state lives entirely in the query string.

use axum::{
    extract::{Query, State},
    response::Html,
};
use std::fmt::Write;
use tracing::warn;

use super::handlers::{values_of, AppState};
use super::service::{ForecastRequest, DEFAULT_HORIZON_MONTHS};
use crate::chart::escape;
use crate::error::DashboardError;
use crate::forecast::{MAX_HORIZON_MONTHS, MIN_HORIZON_MONTHS};

const NAV: &[(&str, &str)] = &[
    ("/", "Home"),
    ("/about", "About the project"),
    ("/tech", "Technologies"),
    ("/team", "About us"),
    ("/dashboard", "Dashboard"),
];

const STYLE: &str = r#"
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body { font-family: system-ui, -apple-system, sans-serif; background: #f5f5f5; display: flex; min-height: 100vh; color: #1a1a1a; }
        nav { width: 220px; background: #1f2a37; color: #fff; padding: 1.5rem 1rem; }
        nav h2 { font-size: 1.1rem; margin-bottom: 1rem; }
        nav a { display: block; color: #cbd5e1; text-decoration: none; padding: 0.4rem 0.5rem; border-radius: 4px; }
        nav a.active, nav a:hover { background: #334155; color: #fff; }
        main { flex: 1; padding: 2rem; max-width: 1100px; }
        h1 { font-size: 1.8rem; margin-bottom: 1rem; }
        h3 { margin: 1.5rem 0 0.75rem; }
        p, li { line-height: 1.6; }
        ul { margin-left: 1.5rem; }
        fieldset { border: 1px solid #ddd; border-radius: 6px; padding: 0.75rem 1rem; margin-bottom: 0.75rem; background: #fff; }
        legend { font-weight: 600; padding: 0 0.25rem; }
        label { margin-right: 1rem; white-space: nowrap; }
        button { padding: 0.4rem 1rem; border: none; border-radius: 4px; background: #1F77B4; color: #fff; cursor: pointer; }
        .notice { padding: 0.75rem 1rem; border-radius: 6px; margin: 0.75rem 0; }
        .notice.info { background: #e0f2fe; }
        .notice.warning { background: #fef3c7; }
        .notice.error { background: #fee2e2; }
        .kpis { display: flex; gap: 1rem; margin: 0.75rem 0; }
        .kpi { background: #fff; border-radius: 8px; padding: 1rem 1.5rem; box-shadow: 0 2px 8px rgba(0,0,0,0.08); }
        .kpi .label { font-size: 0.85rem; color: #555; }
        .kpi .value { font-size: 1.6rem; font-weight: 600; }
        table { border-collapse: collapse; background: #fff; }
        td, th { padding: 0.3rem 0.8rem; border-bottom: 1px solid #eee; text-align: right; }
        th:first-child, td:first-child { text-align: left; }
        .projection-chart { width: 100%; height: auto; background: #fff; border-radius: 8px; }
"#;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Notice {
    Info,
    Warning,
    Error,
}

impl Notice {
    fn class(self) -> &'static str {
        match self {
            Notice::Info => "info",
            Notice::Warning => "warning",
            Notice::Error => "error",
        }
    }

    fn for_error(err: &DashboardError) -> Self {
        match err {
            DashboardError::MissingSelection => Notice::Info,
            e if e.is_user_facing() => Notice::Warning,
            _ => Notice::Error,
        }
    }
}

fn notice(kind: Notice, message: &str) -> String {
    format!(r#"<div class="notice {}">{}</div>"#, kind.class(), escape(message))
}

fn error_notice(err: &DashboardError) -> String {
    warn!(error = %err, "Dashboard request failed");
    notice(Notice::for_error(err), &err.to_string())
}

fn layout(title: &str, active: &str, body: &str) -> Html<String> {
    let mut nav = String::new();
    for (href, label) in NAV {
        let class = if *href == active { r#" class="active""# } else { "" };
        let _ = write!(nav, r#"<a href="{}"{}>{}</a>"#, href, class, label);
    }

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} - SIM Usage Dashboard</title>
    <style>{STYLE}</style>
</head>
<body>
    <nav>
        <h2>Navigation</h2>
        {nav}
    </nav>
    <main>
        <h1>{title}</h1>
        {body}
    </main>
</body>
</html>"#,
        title = escape(title),
    ))
}

/// GET /
pub async fn home() -> Html<String> {
    layout(
        "Welcome to the control panel",
        "/",
        r#"<h3>SIM card management</h3>
        <p>Use the side menu to navigate.</p>
        <ul>
            <li><strong>Dashboard:</strong> consumption metrics from the database and the model forecast.</li>
            <li><strong>About:</strong> how the project came about.</li>
        </ul>"#,
    )
}

/// GET /about
pub async fn about() -> Html<String> {
    layout(
        "About the project",
        "/about",
        "<p>A tool for keeping corporate mobile data under control: who consumes what, \
         against which allowance, and where consumption is heading.</p>",
    )
}

/// GET /tech
pub async fn tech() -> Html<String> {
    layout(
        "Technologies",
        "/tech",
        r#"<ul>
            <li><strong>Web:</strong> axum with server-rendered HTML</li>
            <li><strong>Storage:</strong> SurrealDB</li>
            <li><strong>Forecasting:</strong> a LightGBM model evaluated natively</li>
            <li><strong>Charts:</strong> inline SVG</li>
        </ul>"#,
    )
}

/// GET /team
pub async fn team() -> Html<String> {
    layout("About us", "/team", "<p>Fulltime development team.</p>")
}

/// Parsed dashboard query string
#[derive(Debug, Default, PartialEq)]
struct DashboardQuery {
    departments: Vec<String>,
    roles: Vec<String>,
    horizon: u32,
    run: bool,
}

impl DashboardQuery {
    fn from_params(params: &[(String, String)]) -> Self {
        let horizon = values_of(params, "horizon")
            .first()
            .and_then(|h| h.parse().ok())
            .unwrap_or(DEFAULT_HORIZON_MONTHS);
        Self {
            departments: values_of(params, "department"),
            roles: values_of(params, "role"),
            horizon,
            run: values_of(params, "run").iter().any(|v| v == "1"),
        }
    }
}

fn checkboxes(name: &str, options: &[String], selected: &[String]) -> String {
    let mut out = String::new();
    for option in options {
        let checked = if selected.contains(option) { " checked" } else { "" };
        let _ = write!(
            out,
            r#"<label><input type="checkbox" name="{}" value="{v}"{}> {v}</label>"#,
            name,
            checked,
            v = escape(option)
        );
    }
    out
}

/// Horizon slider with its current value shown beside it
fn horizon_control(horizon: u32) -> String {
    let value = horizon.clamp(MIN_HORIZON_MONTHS, MAX_HORIZON_MONTHS);
    format!(
        r#"<label for="horizon">Months ahead:</label>
            <input type="range" id="horizon" name="horizon" min="{min}" max="{max}" step="1" value="{value}" oninput="this.nextElementSibling.value = this.value">
            <output for="horizon">{value}</output>"#,
        min = MIN_HORIZON_MONTHS,
        max = MAX_HORIZON_MONTHS,
    )
}

fn hidden_inputs(name: &str, values: &[String]) -> String {
    values
        .iter()
        .map(|v| format!(r#"<input type="hidden" name="{}" value="{}">"#, name, escape(v)))
        .collect()
}

/// GET /dashboard
pub async fn dashboard(
    State(service): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Html<String> {
    let query = DashboardQuery::from_params(&params);
    let title = "Smart Consumption Dashboard";
    let mut body = String::new();

    let options = match service.filters(&query.departments).await {
        Ok(options) => options,
        Err(err) => {
            body.push_str(&error_notice(&err));
            return layout(title, "/dashboard", &body);
        }
    };

    let roles: Vec<String> = query
        .roles
        .iter()
        .filter(|r| options.roles.contains(r))
        .cloned()
        .collect();

    let _ = write!(
        body,
        r#"<h3>Analysis filters</h3>
        <form method="get" action="/dashboard">
            <fieldset><legend>1. Department(s)</legend>{}</fieldset>
            <fieldset><legend>2. Role(s)</legend>{}</fieldset>
            <button type="submit">Apply filters</button>
        </form>"#,
        checkboxes("department", &options.departments, &query.departments),
        checkboxes("role", &options.roles, &roles),
    );

    let kpis = match service.kpis(&query.departments, &roles).await {
        Ok(kpis) => kpis,
        Err(err) => {
            body.push_str(&error_notice(&err));
            return layout(title, "/dashboard", &body);
        }
    };

    let _ = write!(
        body,
        r#"<div class="kpis">
            <div class="kpi"><div class="label">Total consumption (filtered)</div><div class="value">{:.2} GB</div></div>
            <div class="kpi"><div class="label">Contracted allowance</div><div class="value">{:.2} GB</div></div>
        </div>"#,
        kpis.total_consumption_gb, kpis.contracted_gb
    );

    if !kpis.monthly.is_empty() {
        body.push_str("<table><tr><th>Month</th><th>Consumption (GB)</th></tr>");
        for (month, gb) in &kpis.monthly {
            let _ = write!(body, "<tr><td>{}</td><td>{:.2}</td></tr>", escape(month), gb);
        }
        body.push_str("</table>");
    }

    body.push_str("<h3>Consumption forecast</h3>");
    if roles.len() != 1 {
        body.push_str(&notice(Notice::Warning, &DashboardError::RoleSelection.to_string()));
        return layout(title, "/dashboard", &body);
    }

    let _ = write!(
        body,
        r#"<form method="get" action="/dashboard">
            {}{}
            {}
            <input type="hidden" name="run" value="1">
            <button type="submit">Generate forecast</button>
        </form>"#,
        hidden_inputs("department", &query.departments),
        hidden_inputs("role", &roles),
        horizon_control(query.horizon),
    );

    if query.run {
        let request = ForecastRequest {
            departments: query.departments.clone(),
            roles,
            horizon_months: query.horizon,
        };
        match service.forecast(&request).await {
            Ok(report) => {
                let _ = write!(
                    body,
                    r#"<p>{} users forecast from {}, {} skipped for short history.</p>{}"#,
                    report.users_forecast,
                    report.last_history_date,
                    report.users_skipped,
                    report.chart_svg
                );
            }
            Err(err) => body.push_str(&error_notice(&err)),
        }
    }

    layout(title, "/dashboard", &body)
}
