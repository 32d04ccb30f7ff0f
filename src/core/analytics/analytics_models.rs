use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::tools::ToolError;

/// Named date ranges accepted by every report operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateRangeName {
    #[serde(rename = "today")]
    Today,
    #[serde(rename = "yesterday")]
    Yesterday,
    #[serde(rename = "last7days")]
    Last7Days,
    #[serde(rename = "last28days")]
    Last28Days,
    #[serde(rename = "last30days")]
    Last30Days,
    #[serde(rename = "last90days")]
    Last90Days,
    #[serde(rename = "custom")]
    Custom,
}

impl FromStr for DateRangeName {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "today" => Ok(Self::Today),
            "yesterday" => Ok(Self::Yesterday),
            "last7days" => Ok(Self::Last7Days),
            "last28days" => Ok(Self::Last28Days),
            "last30days" => Ok(Self::Last30Days),
            "last90days" => Ok(Self::Last90Days),
            "custom" => Ok(Self::Custom),
            other => Err(ToolError::invalid(
                "dateRange",
                format!("unknown date range '{}'", other),
            )),
        }
    }
}

/// A resolved GA4 date range. Dates are either `YYYY-MM-DD` or the relative
/// forms the Data API understands (`today`, `yesterday`, `NdaysAgo`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start_date: String,
    pub end_date: String,
}

impl DateRange {
    fn relative(start: &str, end: &str) -> Self {
        Self {
            start_date: start.to_string(),
            end_date: end.to_string(),
        }
    }

    /// Resolve a named range. Trailing windows end yesterday so the last
    /// (incomplete) day never skews a comparison.
    pub fn resolve(
        name: DateRangeName,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Self, ToolError> {
        Ok(match name {
            DateRangeName::Today => Self::relative("today", "today"),
            DateRangeName::Yesterday => Self::relative("yesterday", "yesterday"),
            DateRangeName::Last7Days => Self::relative("7daysAgo", "yesterday"),
            DateRangeName::Last28Days => Self::relative("28daysAgo", "yesterday"),
            DateRangeName::Last30Days => Self::relative("30daysAgo", "yesterday"),
            DateRangeName::Last90Days => Self::relative("90daysAgo", "yesterday"),
            DateRangeName::Custom => {
                let (Some(start), Some(end)) = (start, end) else {
                    return Err(ToolError::invalid(
                        "dateRange",
                        "custom range needs both 'startDate' and 'endDate'",
                    ));
                };
                let from = parse_day("startDate", start)?;
                let to = parse_day("endDate", end)?;
                if from > to {
                    return Err(ToolError::invalid(
                        "startDate",
                        format!("{} is after endDate {}", start, end),
                    ));
                }
                Self::relative(start, end)
            }
        })
    }

    pub fn label(&self) -> String {
        format!("{} to {}", self.start_date, self.end_date)
    }
}

fn parse_day(field: &str, value: &str) -> Result<NaiveDate, ToolError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ToolError::invalid(field, format!("'{}' is not a YYYY-MM-DD date", value)))
}

/// Ordering for a report. Exactly one of `metric`/`dimension` is used,
/// `metric` wins when both are set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    #[serde(default)]
    pub metric: Option<String>,
    #[serde(default)]
    pub dimension: Option<String>,
    #[serde(default)]
    pub desc: bool,
}

impl OrderBy {
    pub fn metric_desc(metric: &str) -> Self {
        Self {
            metric: Some(metric.to_string()),
            dimension: None,
            desc: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterOperator {
    Equals,
    Contains,
    BeginsWith,
    EndsWith,
    Regexp,
}

impl FilterOperator {
    /// `matchType` of a Data API string filter.
    pub fn match_type(&self) -> &'static str {
        match self {
            FilterOperator::Equals => "EXACT",
            FilterOperator::Contains => "CONTAINS",
            FilterOperator::BeginsWith => "BEGINS_WITH",
            FilterOperator::EndsWith => "ENDS_WITH",
            FilterOperator::Regexp => "FULL_REGEXP",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionFilter {
    pub field: String,
    #[serde(default = "default_operator")]
    pub operator: FilterOperator,
    pub value: String,
}

fn default_operator() -> FilterOperator {
    FilterOperator::Equals
}

/// Everything needed for one `runReport` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportQuery {
    pub property_id: String,
    pub date_range: DateRange,
    pub metrics: Vec<String>,
    pub dimensions: Vec<String>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<u32>,
    pub filters: Vec<DimensionFilter>,
}

impl ReportQuery {
    pub fn new(property_id: impl Into<String>, date_range: DateRange) -> Self {
        Self {
            property_id: property_id.into(),
            date_range,
            metrics: Vec::new(),
            dimensions: Vec::new(),
            order_by: None,
            limit: None,
            filters: Vec::new(),
        }
    }

    pub fn metrics(mut self, metrics: &[&str]) -> Self {
        self.metrics = metrics.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn dimensions(mut self, dimensions: &[&str]) -> Self {
        self.dimensions = dimensions.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = Some(order_by);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub dimensions: Vec<String>,
    pub metrics: Vec<f64>,
}

/// A `runReport` response flattened into header/row form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportTable {
    pub dimension_headers: Vec<String>,
    pub metric_headers: Vec<String>,
    pub rows: Vec<ReportRow>,
    /// Total rows matching the query, which can exceed `rows.len()` when a limit applies.
    pub row_count: u64,
}

impl ReportTable {
    pub fn metric_index(&self, name: &str) -> Option<usize> {
        self.metric_headers.iter().position(|m| m == name)
    }

    pub fn dimension_index(&self, name: &str) -> Option<usize> {
        self.dimension_headers.iter().position(|d| d == name)
    }

    /// Sum of every metric over the returned rows.
    pub fn totals(&self) -> BTreeMap<String, f64> {
        let mut totals: BTreeMap<String, f64> = self
            .metric_headers
            .iter()
            .map(|m| (m.clone(), 0.0))
            .collect();
        for row in &self.rows {
            for (name, value) in self.metric_headers.iter().zip(&row.metrics) {
                if let Some(total) = totals.get_mut(name) {
                    *total += value;
                }
            }
        }
        totals
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySummary {
    pub property_id: String,
    pub display_name: String,
    pub parent_account: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub account_id: String,
    pub display_name: String,
    pub properties: Vec<PropertySummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProperty {
    pub account_id: String,
    pub display_name: String,
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    #[serde(default = "default_currency")]
    pub currency_code: String,
}

fn default_time_zone() -> String {
    "UTC".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelStepInput {
    #[serde(default)]
    pub name: Option<String>,
    pub page: String,
}

/// One funnel step with its computed rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelStep {
    pub name: String,
    pub page: String,
    pub views: f64,
    pub sessions: f64,
    /// Sessions relative to the previous step, 1.0 for the first step.
    pub rate_from_previous: f64,
    /// Sessions relative to the first step.
    pub rate_from_first: f64,
    /// Sessions lost since the previous step.
    pub drop_off: f64,
}

// ---------------------------------------------------------------------------
// Typed tool requests
// ---------------------------------------------------------------------------

/// Arguments shared by every report-style operation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportArgs {
    pub property_id: String,
    #[serde(default)]
    pub date_range: Option<DateRangeName>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub order_by: Option<OrderBy>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub filters: Vec<DimensionFilter>,
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub start_page: Option<String>,
    #[serde(default)]
    pub end_page: Option<String>,
}

impl ReportArgs {
    /// Explicit start/end dates imply a custom range.
    pub fn resolve_range(&self, default: DateRangeName) -> Result<DateRange, ToolError> {
        let name = match (self.date_range, &self.start_date, &self.end_date) {
            (Some(name), _, _) => name,
            (None, Some(_), Some(_)) => DateRangeName::Custom,
            (None, _, _) => default,
        };
        DateRange::resolve(name, self.start_date.as_deref(), self.end_date.as_deref())
    }

    pub fn metrics_or(&self, default: &[&str]) -> Vec<String> {
        if self.metrics.is_empty() {
            default.iter().map(|m| m.to_string()).collect()
        } else {
            self.metrics.clone()
        }
    }

    pub fn dimensions_or(&self, default: &[&str]) -> Vec<String> {
        if self.dimensions.is_empty() {
            default.iter().map(|d| d.to_string()).collect()
        } else {
            self.dimensions.clone()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelArgs {
    pub property_id: String,
    pub funnel_steps: Vec<FunnelStepInput>,
    #[serde(default)]
    pub date_range: Option<DateRangeName>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}
