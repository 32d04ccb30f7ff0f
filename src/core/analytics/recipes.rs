// Fixed report shapes behind the enhanced analytics operations.

use super::analytics_models::{
    DateRange, DateRangeName, DimensionFilter, FilterOperator, FunnelArgs, OrderBy, ReportArgs,
    ReportQuery,
};
use crate::core::tools::ToolError;

pub const DEFAULT_REPORT_METRICS: &[&str] = &["totalUsers", "sessions", "screenPageViews"];
pub const DEFAULT_REPORT_DIMENSIONS: &[&str] = &["date"];
const DEFAULT_REPORT_LIMIT: u32 = 100;

/// `getReport`: caller-chosen fields, last 7 days by default.
pub fn report_query(args: &ReportArgs) -> Result<ReportQuery, ToolError> {
    custom_query_with(args, DateRangeName::Last7Days, DEFAULT_REPORT_METRICS, DEFAULT_REPORT_DIMENSIONS)
}

/// `customQuery`: like `getReport` but last 30 days and no default dimension.
pub fn custom_query(args: &ReportArgs) -> Result<ReportQuery, ToolError> {
    custom_query_with(args, DateRangeName::Last30Days, &["sessions"], &[])
}

fn custom_query_with(
    args: &ReportArgs,
    default_range: DateRangeName,
    default_metrics: &[&str],
    default_dimensions: &[&str],
) -> Result<ReportQuery, ToolError> {
    let mut query = ReportQuery::new(&args.property_id, args.resolve_range(default_range)?);
    query.metrics = args.metrics_or(default_metrics);
    query.dimensions = args.dimensions_or(default_dimensions);
    query.order_by = args.order_by.clone();
    query.limit = Some(args.limit.unwrap_or(DEFAULT_REPORT_LIMIT));
    query.filters = args.filters.clone();
    check_order_by(&query)?;
    Ok(query)
}

fn check_order_by(query: &ReportQuery) -> Result<(), ToolError> {
    let Some(order) = &query.order_by else {
        return Ok(());
    };
    match (&order.metric, &order.dimension) {
        (Some(metric), _) if !query.metrics.contains(metric) => Err(ToolError::invalid(
            "orderBy",
            format!("metric '{}' is not part of the report", metric),
        )),
        (None, Some(dimension)) if !query.dimensions.contains(dimension) => Err(ToolError::invalid(
            "orderBy",
            format!("dimension '{}' is not part of the report", dimension),
        )),
        (None, None) => Err(ToolError::invalid(
            "orderBy",
            "needs either 'metric' or 'dimension'",
        )),
        _ => Ok(()),
    }
}

pub fn event_config_query(property_id: &str) -> Result<ReportQuery, ToolError> {
    Ok(ReportQuery::new(
        property_id,
        DateRange::resolve(DateRangeName::Last7Days, None, None)?,
    )
    .metrics(&["eventCount"])
    .dimensions(&["eventName"]))
}

pub fn events_query(args: &ReportArgs) -> Result<ReportQuery, ToolError> {
    Ok(
        ReportQuery::new(&args.property_id, args.resolve_range(DateRangeName::Last7Days)?)
            .metrics(&["eventCount", "eventValue"])
            .dimensions(&["eventName"])
            .order_by(OrderBy::metric_desc("eventCount"))
            .limit(50),
    )
}

/// Event analytics, optionally restricted to one event.
pub fn event_report_query(args: &ReportArgs) -> Result<ReportQuery, ToolError> {
    let mut query = ReportQuery::new(&args.property_id, args.resolve_range(DateRangeName::Last30Days)?);
    query.metrics = args.metrics_or(&["eventCount", "eventValue"]);
    query.dimensions = args.dimensions_or(&["date", "eventName"]);
    if query.metrics.iter().any(|m| m == "eventCount") {
        query.order_by = Some(OrderBy::metric_desc("eventCount"));
    }
    if let Some(event) = args.event_name.as_deref().filter(|e| !e.trim().is_empty()) {
        query.filters.push(DimensionFilter {
            field: "eventName".to_string(),
            operator: FilterOperator::Equals,
            value: event.to_string(),
        });
    }
    Ok(query)
}

pub fn conversions_query(args: &ReportArgs) -> Result<ReportQuery, ToolError> {
    let mut query = ReportQuery::new(&args.property_id, args.resolve_range(DateRangeName::Last30Days)?)
        .metrics(&["conversions", "totalRevenue", "sessions"])
        .order_by(OrderBy::metric_desc("conversions"))
        .limit(20);
    query.dimensions = args.dimensions_or(&["sessionSource", "sessionMedium"]);
    Ok(query)
}

pub fn ecommerce_query(args: &ReportArgs) -> Result<ReportQuery, ToolError> {
    let mut query = ReportQuery::new(&args.property_id, args.resolve_range(DateRangeName::Last30Days)?)
        .metrics(&["itemRevenue", "itemsPurchased", "itemsViewed"])
        .order_by(OrderBy::metric_desc("itemRevenue"))
        .limit(30);
    query.dimensions = args.dimensions_or(&["itemName", "itemCategory"]);
    Ok(query)
}

pub fn journey_query(args: &ReportArgs) -> Result<ReportQuery, ToolError> {
    Ok(
        ReportQuery::new(&args.property_id, args.resolve_range(DateRangeName::Last7Days)?)
            .metrics(&["screenPageViews", "sessions"])
            .dimensions(&["pagePath", "pageTitle"])
            .order_by(OrderBy::metric_desc("screenPageViews"))
            .limit(100),
    )
}

pub fn funnel_query(args: &FunnelArgs) -> Result<ReportQuery, ToolError> {
    let range = match (args.date_range, &args.start_date, &args.end_date) {
        (Some(name), _, _) => name,
        (None, Some(_), Some(_)) => DateRangeName::Custom,
        (None, _, _) => DateRangeName::Last30Days,
    };
    let mut query = ReportQuery::new(
        &args.property_id,
        DateRange::resolve(range, args.start_date.as_deref(), args.end_date.as_deref())?,
    )
    .metrics(&["screenPageViews", "sessions"])
    .dimensions(&["pagePath"]);
    let pages: Vec<&str> = args.funnel_steps.iter().map(|s| s.page.as_str()).collect();
    if !pages.is_empty() {
        // Restrict the report to the funnel pages so a row limit never hides a step.
        query.filters.push(DimensionFilter {
            field: "pagePath".to_string(),
            operator: FilterOperator::Regexp,
            value: pages_regex(&pages),
        });
    }
    Ok(query)
}

fn pages_regex(pages: &[&str]) -> String {
    let escaped: Vec<String> = pages.iter().map(|p| escape_regex(p)).collect();
    format!("^({})$", escaped.join("|"))
}

fn escape_regex(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if "\\.+*?()|[]{}^$".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analytics::analytics_models::FunnelStepInput;

    fn args(property: &str) -> ReportArgs {
        ReportArgs {
            property_id: property.into(),
            ..Default::default()
        }
    }

    #[test]
    fn list_events_recipe() {
        let query = events_query(&args("1")).unwrap();
        assert_eq!(query.metrics, vec!["eventCount", "eventValue"]);
        assert_eq!(query.dimensions, vec!["eventName"]);
        assert_eq!(query.limit, Some(50));
        assert_eq!(query.order_by, Some(OrderBy::metric_desc("eventCount")));
    }

    #[test]
    fn conversion_and_ecommerce_recipes() {
        let conv = conversions_query(&args("1")).unwrap();
        assert_eq!(conv.metrics, vec!["conversions", "totalRevenue", "sessions"]);
        assert_eq!(conv.dimensions, vec!["sessionSource", "sessionMedium"]);
        assert_eq!(conv.limit, Some(20));

        let ecom = ecommerce_query(&args("1")).unwrap();
        assert_eq!(ecom.metrics, vec!["itemRevenue", "itemsPurchased", "itemsViewed"]);
        assert_eq!(ecom.limit, Some(30));
        assert_eq!(ecom.date_range.start_date, "30daysAgo");
    }

    #[test]
    fn event_report_adds_event_filter() {
        let mut a = args("1");
        a.event_name = Some("purchase".into());
        let query = event_report_query(&a).unwrap();
        assert_eq!(query.filters.len(), 1);
        assert_eq!(query.filters[0].field, "eventName");
    }

    #[test]
    fn order_by_must_reference_a_requested_field() {
        let mut a = args("1");
        a.metrics = vec!["sessions".into()];
        a.order_by = Some(OrderBy::metric_desc("totalUsers"));
        assert!(custom_query(&a).is_err());

        a.order_by = Some(OrderBy::metric_desc("sessions"));
        let query = custom_query(&a).unwrap();
        assert_eq!(query.limit, Some(100));
        assert!(query.dimensions.is_empty());
    }

    #[test]
    fn funnel_pages_are_escaped_in_the_filter() {
        let funnel = FunnelArgs {
            property_id: "1".into(),
            funnel_steps: vec![
                FunnelStepInput {
                    name: None,
                    page: "/".into(),
                },
                FunnelStepInput {
                    name: None,
                    page: "/cart?step=1".into(),
                },
            ],
            date_range: Some(DateRangeName::Last7Days),
            start_date: None,
            end_date: None,
        };
        let query = funnel_query(&funnel).unwrap();
        assert_eq!(query.filters[0].operator, FilterOperator::Regexp);
        assert_eq!(query.filters[0].value, r"^(/|/cart\?step=1)$");
    }
}
