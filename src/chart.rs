//! Grouped bar chart rendered as inline SVG

use crate::models::{MonthlyPoint, SeriesKind};
use std::fmt::Write;

const CHART_WIDTH: f64 = 860.0;
const CHART_HEIGHT: f64 = 360.0;
const MARGIN_TOP: f64 = 56.0;
const MARGIN_BOTTOM: f64 = 64.0;
const MARGIN_LEFT: f64 = 64.0;
const MARGIN_RIGHT: f64 = 24.0;

const SERIES: [SeriesKind; 2] = [SeriesKind::Historical, SeriesKind::Forecast];

/// Escape text for HTML and SVG bodies and attribute values
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Categories in order of first appearance, each with one optional value
/// per series
fn group_by_label(points: &[MonthlyPoint]) -> Vec<(&str, [Option<f64>; 2])> {
    let mut groups: Vec<(&str, [Option<f64>; 2])> = Vec::new();
    for point in points {
        let slot = SERIES.iter().position(|k| *k == point.kind).unwrap_or(0);
        match groups.iter_mut().find(|(label, _)| *label == point.label) {
            Some((_, values)) => {
                *values[slot].get_or_insert(0.0) += point.consumption_gb;
            }
            None => {
                let mut values = [None, None];
                values[slot] = Some(point.consumption_gb);
                groups.push((point.label.as_str(), values));
            }
        }
    }
    groups
}

/// Render the projection chart for `role`
pub fn render_projection(role: &str, points: &[MonthlyPoint]) -> String {
    let inner_width = CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let inner_height = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let baseline = MARGIN_TOP + inner_height;

    let groups = group_by_label(points);
    let max_value = points
        .iter()
        .map(|p| p.consumption_gb)
        .fold(0.0_f64, f64::max);
    let max_value = if max_value > 0.0 { max_value * 1.1 } else { 1.0 };

    let y_scale = |value: f64| baseline - (value / max_value) * inner_height;
    let slot_width = inner_width / groups.len().max(1) as f64;
    let bar_width = slot_width * 0.8 / SERIES.len() as f64;

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {} {}" class="projection-chart" role="img">"#,
        CHART_WIDTH, CHART_HEIGHT
    );
    let _ = writeln!(
        svg,
        r#"  <text x="{}" y="28" text-anchor="middle" font-size="18" font-weight="bold">Projection ({})</text>"#,
        CHART_WIDTH / 2.0,
        escape(role)
    );

    // Legend
    for (i, kind) in SERIES.iter().enumerate() {
        let x = CHART_WIDTH - MARGIN_RIGHT - 220.0 + i as f64 * 110.0;
        let _ = writeln!(
            svg,
            r#"  <rect x="{:.1}" y="36" width="12" height="12" fill="{}"/><text x="{:.1}" y="46" font-size="12">{}</text>"#,
            x,
            kind.color(),
            x + 16.0,
            kind.label()
        );
    }

    // Axes
    let _ = writeln!(
        svg,
        r##"  <line x1="{l}" y1="{t}" x2="{l}" y2="{b}" stroke="#999"/><line x1="{l}" y1="{b}" x2="{r}" y2="{b}" stroke="#999"/>"##,
        l = MARGIN_LEFT,
        t = MARGIN_TOP,
        b = baseline,
        r = CHART_WIDTH - MARGIN_RIGHT
    );

    for tick in 0..=4 {
        let value = max_value * tick as f64 / 4.0;
        let _ = writeln!(
            svg,
            r##"  <text x="{:.1}" y="{:.1}" text-anchor="end" font-size="11" fill="#555">{:.0}</text>"##,
            MARGIN_LEFT - 6.0,
            y_scale(value) + 4.0,
            value
        );
    }
    let _ = writeln!(
        svg,
        r#"  <text x="16" y="{:.1}" font-size="12" transform="rotate(-90 16 {:.1})" text-anchor="middle">Consumption (GB)</text>"#,
        MARGIN_TOP + inner_height / 2.0,
        MARGIN_TOP + inner_height / 2.0
    );

    for (index, (label, values)) in groups.iter().enumerate() {
        let slot_x = MARGIN_LEFT + index as f64 * slot_width;
        let group_x = slot_x + slot_width * 0.1;

        for (series, value) in values.iter().enumerate() {
            let Some(value) = value else { continue };
            let kind = SERIES[series];
            let x = group_x + series as f64 * bar_width;
            let y = y_scale(*value);
            let _ = writeln!(
                svg,
                r#"  <rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"><title>{} {}: {:.0} GB</title></rect>"#,
                x,
                y,
                bar_width,
                baseline - y,
                kind.color(),
                kind.label(),
                escape(label),
                value
            );
            let _ = writeln!(
                svg,
                r#"  <text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="11" class="bar-value">{:.0}</text>"#,
                x + bar_width / 2.0,
                y - 4.0,
                value
            );
        }

        let _ = writeln!(
            svg,
            r#"  <text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="11" class="x-label">{}</text>"#,
            slot_x + slot_width / 2.0,
            baseline + 18.0,
            escape(label)
        );
    }

    svg.push_str("</svg>\n");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn point(month: u32, gb: f64, kind: SeriesKind) -> MonthlyPoint {
        let month_start = NaiveDate::from_ymd_opt(2025, month, 1).unwrap();
        MonthlyPoint {
            month_start,
            label: month_start.format("%b/%Y").to_string(),
            consumption_gb: gb,
            kind,
        }
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("<a & \"b\">"), "&lt;a &amp; &quot;b&quot;&gt;");
    }

    #[test]
    fn test_title_colors_and_rounded_labels() {
        let points = vec![
            point(1, 120.4, SeriesKind::Historical),
            point(2, 98.6, SeriesKind::Historical),
            point(3, 130.2, SeriesKind::Forecast),
        ];
        let svg = render_projection("Vendedor", &points);

        assert!(svg.contains("Projection (Vendedor)"));
        assert!(svg.contains("#1F77B4"));
        assert!(svg.contains("#FF7F0E"));
        assert!(svg.contains(">120</text>"));
        assert!(svg.contains(">99</text>"));
        assert!(svg.contains(">130</text>"));
        assert_eq!(svg.matches("class=\"x-label\"").count(), 3);
    }

    #[test]
    fn test_shared_month_is_one_category() {
        let points = vec![
            point(3, 40.0, SeriesKind::Historical),
            point(3, 60.0, SeriesKind::Forecast),
            point(4, 90.0, SeriesKind::Forecast),
        ];
        let groups = group_by_label(&points);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].1, [Some(40.0), Some(60.0)]);
        assert_eq!(groups[1].1, [None, Some(90.0)]);

        let svg = render_projection("Gerente", &points);
        assert_eq!(svg.matches("class=\"x-label\"").count(), 2);
        assert_eq!(svg.matches("class=\"bar-value\"").count(), 3);
    }

    #[test]
    fn test_empty_chart_renders() {
        let svg = render_projection("Tecnico", &[]);
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }
}
