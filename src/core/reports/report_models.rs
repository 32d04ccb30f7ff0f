use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::core::analytics::{
    format_number, format_percent, DateRange, DateRangeName, ReportQuery, ReportRow, ReportTable,
};
use crate::core::tools::{split_csv, ToolError};

/// Serialized lowercase; parsed case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    /// Window a scheduled run of this frequency reports on.
    pub fn date_range(&self) -> DateRangeName {
        match self {
            Frequency::Daily => DateRangeName::Yesterday,
            Frequency::Weekly => DateRangeName::Last7Days,
            Frequency::Monthly => DateRangeName::Last30Days,
        }
    }
}

impl FromStr for Frequency {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            other => Err(ToolError::invalid(
                "frequency",
                format!("'{}' is not one of: daily, weekly, monthly", other),
            )),
        }
    }
}

impl TryFrom<String> for Frequency {
    type Error = ToolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        };
        f.write_str(s)
    }
}

pub const DEFAULT_SCHEDULED_METRICS: &str = "totalUsers,sessions,screenPageViews";
pub const DEFAULT_SCHEDULED_DIMENSIONS: &str = "date";

/// One entry of the `SCHEDULED_REPORTS` setup list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledReportConfig {
    pub report_name: String,
    pub frequency: Frequency,
    pub property_id: String,
    #[serde(default = "default_metrics")]
    pub metrics: String,
    #[serde(default = "default_dimensions")]
    pub dimensions: String,
    /// Two-letter day for weekly reports (`MO` .. `SU`).
    #[serde(default = "default_weekday")]
    pub weekday: String,
}

fn default_metrics() -> String {
    DEFAULT_SCHEDULED_METRICS.to_string()
}

fn default_dimensions() -> String {
    DEFAULT_SCHEDULED_DIMENSIONS.to_string()
}

fn default_weekday() -> String {
    "MO".to_string()
}

/// Parse `MO`, `Mon` or `Monday` style day names.
pub fn parse_weekday(raw: &str) -> Option<Weekday> {
    let lower = raw.trim().to_lowercase();
    let prefix = lower.get(..2)?;
    match prefix {
        "mo" => Some(Weekday::Mon),
        "tu" => Some(Weekday::Tue),
        "we" => Some(Weekday::Wed),
        "th" => Some(Weekday::Thu),
        "fr" => Some(Weekday::Fri),
        "sa" => Some(Weekday::Sat),
        "su" => Some(Weekday::Sun),
        _ => None,
    }
}

fn is_business_day(day: Weekday) -> bool {
    !matches!(day, Weekday::Sat | Weekday::Sun)
}

/// Whether `date` is the first Monday-to-Friday day of its month.
pub fn is_first_business_day(date: NaiveDate) -> bool {
    if !is_business_day(date.weekday()) {
        return false;
    }
    (1..date.day()).all(|d| {
        date.with_day(d)
            .map(|earlier| !is_business_day(earlier.weekday()))
            .unwrap_or(true)
    })
}

impl ScheduledReportConfig {
    pub fn metric_list(&self) -> Vec<String> {
        split_csv(&self.metrics)
    }

    pub fn dimension_list(&self) -> Vec<String> {
        split_csv(&self.dimensions)
    }

    pub fn run_weekday(&self) -> Weekday {
        parse_weekday(&self.weekday).unwrap_or(Weekday::Mon)
    }

    /// Whether a report-generation firing on `date` should produce this report.
    pub fn is_due_on(&self, date: NaiveDate) -> bool {
        match self.frequency {
            Frequency::Daily => true,
            Frequency::Weekly => date.weekday() == self.run_weekday(),
            Frequency::Monthly => is_first_business_day(date),
        }
    }

    pub fn slug(&self) -> String {
        slugify(&self.report_name)
    }

    pub fn to_query(&self) -> Result<ReportQuery, ToolError> {
        if self.property_id.trim().is_empty() {
            return Err(ToolError::MissingParams(vec!["property_id".to_string()]));
        }
        let metrics = self.metric_list();
        if metrics.is_empty() {
            return Err(ToolError::MissingParams(vec!["metrics".to_string()]));
        }
        let mut query = ReportQuery::new(
            self.property_id.trim(),
            DateRange::resolve(self.frequency.date_range(), None, None)?,
        );
        query.metrics = metrics;
        query.dimensions = self.dimension_list();
        Ok(query)
    }
}

/// Slugs for a report list, numbered when two names collapse to the same
/// slug so each report keeps its own document folder.
pub fn unique_slugs(reports: &[ScheduledReportConfig]) -> Vec<String> {
    let mut taken: Vec<String> = Vec::with_capacity(reports.len());
    for report in reports {
        let base = report.slug();
        let mut slug = base.clone();
        let mut n = 2;
        while taken.contains(&slug) {
            slug = format!("{}-{}", base, n);
            n += 1;
        }
        taken.push(slug);
    }
    taken
}

pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let trimmed = slug.trim_end_matches('-');
    if trimmed.is_empty() {
        "report".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Ratios derived from report totals when both inputs are present.
const RATE_RULES: &[(&str, &str, &str)] = &[
    ("conversionRate", "conversions", "sessions"),
    ("engagementRate", "engagedSessions", "sessions"),
    ("pagesPerSession", "screenPageViews", "sessions"),
    ("sessionsPerUser", "sessions", "totalUsers"),
    ("revenuePerUser", "totalRevenue", "totalUsers"),
];

pub fn derived_rates(totals: &BTreeMap<String, f64>) -> BTreeMap<String, f64> {
    RATE_RULES
        .iter()
        .filter_map(|(name, numerator, denominator)| {
            let n = totals.get(*numerator)?;
            let d = totals.get(*denominator)?;
            Some((name.to_string(), crate::core::analytics::rate(*n, *d)))
        })
        .collect()
}

/// A generated report as persisted in the report store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportOutput {
    pub report_name: String,
    pub property_id: String,
    pub date_range: DateRange,
    pub dimension_headers: Vec<String>,
    pub metric_headers: Vec<String>,
    pub rows: Vec<ReportRow>,
    pub totals: BTreeMap<String, f64>,
    pub rates: BTreeMap<String, f64>,
    pub generated_at: DateTime<Utc>,
}

impl ReportOutput {
    pub fn from_table(
        report_name: &str,
        query: &ReportQuery,
        table: ReportTable,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let totals = table.totals();
        let rates = derived_rates(&totals);
        Self {
            report_name: report_name.to_string(),
            property_id: query.property_id.clone(),
            date_range: query.date_range.clone(),
            dimension_headers: table.dimension_headers,
            metric_headers: table.metric_headers,
            rows: table.rows,
            totals,
            rates,
            generated_at,
        }
    }

    pub fn to_text(&self) -> String {
        let mut out = vec![
            format!("📊 {}", self.report_name),
            format!(
                "Property {} ({}), generated {}",
                self.property_id,
                self.date_range.label(),
                self.generated_at.format("%Y-%m-%d %H:%M UTC")
            ),
            String::new(),
            self.dimension_headers
                .iter()
                .chain(&self.metric_headers)
                .cloned()
                .collect::<Vec<_>>()
                .join(" | "),
        ];
        for row in &self.rows {
            out.push(
                row.dimensions
                    .iter()
                    .cloned()
                    .chain(row.metrics.iter().map(|m| format_number(*m)))
                    .collect::<Vec<_>>()
                    .join(" | "),
            );
        }
        if !self.totals.is_empty() {
            out.push(String::new());
            let totals: Vec<String> = self
                .totals
                .iter()
                .map(|(k, v)| format!("{}={}", k, format_number(*v)))
                .collect();
            out.push(format!("Totals: {}", totals.join(", ")));
        }
        if !self.rates.is_empty() {
            let rates: Vec<String> = self
                .rates
                .iter()
                .map(|(k, v)| {
                    if k.ends_with("Rate") {
                        format!("{}={}", k, format_percent(*v))
                    } else {
                        format!("{}={:.2}", k, v)
                    }
                })
                .collect();
            out.push(format!("Rates: {}", rates.join(", ")));
        }
        out.join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReport {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub output: ReportOutput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReportSummary {
    pub id: i64,
    pub report_name: String,
    pub property_id: String,
    pub created_at: DateTime<Utc>,
}
