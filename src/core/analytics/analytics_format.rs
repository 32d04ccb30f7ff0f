// Model-facing text for analytics results.

use super::analytics_models::{AccountSummary, FunnelStep, ReportQuery, ReportRow, ReportTable};

/// Integers without decimals, everything else with two.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

pub fn format_percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

fn format_row(row: &ReportRow) -> String {
    row.dimensions
        .iter()
        .cloned()
        .chain(row.metrics.iter().map(|m| format_number(*m)))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn format_rows(dimension_headers: &[String], metric_headers: &[String], rows: &[ReportRow]) -> Vec<String> {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        dimension_headers
            .iter()
            .chain(metric_headers)
            .cloned()
            .collect::<Vec<_>>()
            .join(" | "),
    );
    lines.extend(rows.iter().map(format_row));
    lines
}

pub fn format_report(title: &str, query: &ReportQuery, table: &ReportTable) -> String {
    if table.rows.is_empty() {
        return format!(
            "📊 {}\nProperty {} ({})\n\nNo data for this period.",
            title,
            query.property_id,
            query.date_range.label()
        );
    }

    let mut out = vec![
        format!("📊 {}", title),
        format!("Property {} ({})", query.property_id, query.date_range.label()),
    ];
    if table.row_count > table.rows.len() as u64 {
        out.push(format!(
            "Showing {} of {} rows",
            table.rows.len(),
            table.row_count
        ));
    }
    out.push(String::new());
    out.extend(format_rows(
        &table.dimension_headers,
        &table.metric_headers,
        &table.rows,
    ));

    let totals = table.totals();
    if !totals.is_empty() {
        out.push(String::new());
        let parts: Vec<String> = table
            .metric_headers
            .iter()
            .filter_map(|m| totals.get(m).map(|v| format!("{}={}", m, format_number(*v))))
            .collect();
        out.push(format!("Totals: {}", parts.join(", ")));
    }
    out.join("\n")
}

pub fn format_journey(start: &str, end: &str, table: &ReportTable, rows: &[ReportRow]) -> String {
    let end_label = if end.is_empty() { "(last page)" } else { end };
    let mut out = vec![
        "🔍 User Journey Analysis".to_string(),
        String::new(),
        format!("Pages visited between '{}' and '{}':", start, end_label),
        String::new(),
    ];
    if rows.is_empty() {
        out.push("No pages found between these two pages.".to_string());
    } else {
        out.extend(format_rows(&table.dimension_headers, &table.metric_headers, rows));
    }
    out.join("\n")
}

pub fn format_funnel(steps: &[FunnelStep]) -> String {
    let mut out = vec!["📊 Funnel Analysis:".to_string()];
    for (i, step) in steps.iter().enumerate() {
        out.push(String::new());
        out.push(format!("{}. {} ({})", i + 1, step.name, step.page));
        out.push(format!(
            "   Views: {}, Sessions: {}",
            format_number(step.views),
            format_number(step.sessions)
        ));
        if i > 0 {
            out.push(format!(
                "   Conversion from previous step: {} (drop-off: {})",
                format_percent(step.rate_from_previous),
                format_number(step.drop_off)
            ));
            out.push(format!(
                "   Conversion from first step: {}",
                format_percent(step.rate_from_first)
            ));
        }
    }
    if let (Some(first), Some(last)) = (steps.first(), steps.last()) {
        if steps.len() > 1 {
            out.push(String::new());
            out.push(format!(
                "Overall conversion {} → {}: {}",
                first.name,
                last.name,
                format_percent(last.rate_from_first)
            ));
        }
    }
    out.join("\n")
}

pub fn format_properties(accounts: &[AccountSummary]) -> String {
    if accounts.is_empty() {
        return "📈 No Google Analytics accounts found.".to_string();
    }
    let mut out = vec!["📈 Google Analytics Properties:".to_string()];
    for account in accounts {
        out.push(String::new());
        out.push(format!("Account: {} (ID: {})", account.display_name, account.account_id));
        if account.properties.is_empty() {
            out.push("  (no properties)".to_string());
        }
        for property in &account.properties {
            out.push(format!(
                "  • {} (Property ID: {})",
                property.display_name, property.property_id
            ));
        }
    }
    out.join("\n")
}
