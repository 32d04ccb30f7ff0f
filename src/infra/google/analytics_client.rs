use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::google_http::GoogleHttp;
use crate::core::analytics::{
    AccountSummary, AnalyticsApi, NewProperty, PropertySummary, ReportQuery, ReportTable,
};
use crate::core::analytics::analytics_models::ReportRow;
use crate::core::auth::AuthSession;
use crate::core::tools::GoogleApiError;

pub const DATA_API_BASE: &str = "https://analyticsdata.googleapis.com";
pub const ADMIN_API_BASE: &str = "https://analyticsadmin.googleapis.com";

/// Admin API pages fetched before account listing gives up.
const MAX_SUMMARY_PAGES: usize = 10;

/// GA4 Data API (reports) and Admin API (accounts, properties) client.
pub struct GoogleAnalyticsClient {
    http: GoogleHttp,
    data_base: String,
    admin_base: String,
}

impl GoogleAnalyticsClient {
    pub fn new(client: Client) -> Self {
        Self::with_base_urls(client, DATA_API_BASE, ADMIN_API_BASE)
    }

    pub fn with_base_urls(client: Client, data_base: &str, admin_base: &str) -> Self {
        Self {
            http: GoogleHttp::new(client, "Google Analytics"),
            data_base: data_base.trim_end_matches('/').to_string(),
            admin_base: admin_base.trim_end_matches('/').to_string(),
        }
    }

    fn report_body(query: &ReportQuery) -> Value {
        let mut body = json!({
            "dateRanges": [{
                "startDate": query.date_range.start_date,
                "endDate": query.date_range.end_date,
            }],
            "metrics": query.metrics.iter().map(|m| json!({"name": m})).collect::<Vec<_>>(),
        });
        if !query.dimensions.is_empty() {
            body["dimensions"] = query
                .dimensions
                .iter()
                .map(|d| json!({"name": d}))
                .collect();
        }
        if let Some(order) = &query.order_by {
            let order_json = match (&order.metric, &order.dimension) {
                (Some(metric), _) => Some(json!({"metric": {"metricName": metric}, "desc": order.desc})),
                (None, Some(dimension)) => {
                    Some(json!({"dimension": {"dimensionName": dimension}, "desc": order.desc}))
                }
                (None, None) => None,
            };
            if let Some(order_json) = order_json {
                body["orderBys"] = json!([order_json]);
            }
        }
        if let Some(limit) = query.limit {
            body["limit"] = json!(limit);
        }

        let mut expressions: Vec<Value> = query
            .filters
            .iter()
            .map(|f| {
                json!({"filter": {
                    "fieldName": f.field,
                    "stringFilter": {"matchType": f.operator.match_type(), "value": f.value},
                }})
            })
            .collect();
        match expressions.len() {
            0 => {}
            1 => body["dimensionFilter"] = expressions.remove(0),
            _ => body["dimensionFilter"] = json!({"andGroup": {"expressions": expressions}}),
        }
        body
    }

    fn map_report(api: ApiReport) -> ReportTable {
        let rows: Vec<ReportRow> = api
            .rows
            .into_iter()
            .map(|row| ReportRow {
                dimensions: row.dimension_values.into_iter().map(|v| v.value).collect(),
                metrics: row
                    .metric_values
                    .into_iter()
                    .map(|v| v.value.parse::<f64>().unwrap_or(0.0))
                    .collect(),
            })
            .collect();
        ReportTable {
            dimension_headers: api.dimension_headers.into_iter().map(|h| h.name).collect(),
            metric_headers: api.metric_headers.into_iter().map(|h| h.name).collect(),
            row_count: api.row_count.unwrap_or(rows.len() as u64),
            rows,
        }
    }
}

/// `properties/123` -> `123`; ids without a prefix pass through.
fn trailing_id(name: &str) -> String {
    name.rsplit('/').next().unwrap_or(name).to_string()
}

#[async_trait]
impl AnalyticsApi for GoogleAnalyticsClient {
    async fn run_report(
        &self,
        session: &AuthSession,
        query: &ReportQuery,
    ) -> Result<ReportTable, GoogleApiError> {
        let url = format!(
            "{}/v1beta/properties/{}:runReport",
            self.data_base,
            trailing_id(&query.property_id)
        );
        let report: ApiReport = self.http.post(session, &url, &Self::report_body(query)).await?;
        Ok(Self::map_report(report))
    }

    async fn list_account_summaries(
        &self,
        session: &AuthSession,
    ) -> Result<Vec<AccountSummary>, GoogleApiError> {
        let mut accounts = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_SUMMARY_PAGES {
            let mut url = format!("{}/v1beta/accountSummaries?pageSize=200", self.admin_base);
            if let Some(token) = &page_token {
                url.push_str(&format!("&pageToken={}", token));
            }
            let page: ApiAccountSummaries = self.http.get(session, &url).await?;
            for summary in page.account_summaries {
                accounts.push(AccountSummary {
                    account_id: trailing_id(&summary.account),
                    display_name: summary.display_name.unwrap_or_default(),
                    properties: summary
                        .property_summaries
                        .into_iter()
                        .map(|p| PropertySummary {
                            property_id: trailing_id(&p.property),
                            display_name: p.display_name.unwrap_or_default(),
                            parent_account: p.parent.unwrap_or_else(|| summary.account.clone()),
                        })
                        .collect(),
                });
            }
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(accounts)
    }

    async fn create_property(
        &self,
        session: &AuthSession,
        property: &NewProperty,
    ) -> Result<PropertySummary, GoogleApiError> {
        let url = format!("{}/v1beta/properties", self.admin_base);
        let parent = format!("accounts/{}", trailing_id(&property.account_id));
        let body = json!({
            "parent": parent,
            "displayName": property.display_name,
            "timeZone": property.time_zone,
            "currencyCode": property.currency_code,
        });
        let created: ApiProperty = self.http.post(session, &url, &body).await?;
        Ok(PropertySummary {
            property_id: trailing_id(&created.name),
            display_name: created.display_name.unwrap_or_else(|| property.display_name.clone()),
            parent_account: created.parent.unwrap_or(parent),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ApiHeader {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiValue {
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiRow {
    #[serde(default)]
    dimension_values: Vec<ApiValue>,
    #[serde(default)]
    metric_values: Vec<ApiValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiReport {
    #[serde(default)]
    dimension_headers: Vec<ApiHeader>,
    #[serde(default)]
    metric_headers: Vec<ApiHeader>,
    #[serde(default)]
    rows: Vec<ApiRow>,
    row_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPropertySummary {
    property: String,
    display_name: Option<String>,
    parent: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiAccountSummary {
    account: String,
    display_name: Option<String>,
    #[serde(default)]
    property_summaries: Vec<ApiPropertySummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiAccountSummaries {
    #[serde(default)]
    account_summaries: Vec<ApiAccountSummary>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiProperty {
    name: String,
    display_name: Option<String>,
    parent: Option<String>,
}
