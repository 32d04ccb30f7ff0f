// Bot setup as declared to the marketplace, and the values the host
// persisted for this persona mixed over those declarations.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::core::reports::ScheduledReportConfig;
use crate::core::tools::{Args, OpSpec};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupField {
    pub bs_name: String,
    pub bs_type: String,
    pub bs_default: Value,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bs_group: String,
    pub bs_description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bs_elements: Vec<SetupField>,
}

impl SetupField {
    fn new(name: &str, kind: &str, default: Value, group: &str, description: &str) -> Self {
        Self {
            bs_name: name.to_string(),
            bs_type: kind.to_string(),
            bs_default: default,
            bs_group: group.to_string(),
            bs_description: description.to_string(),
            bs_elements: Vec::new(),
        }
    }

    fn element(name: &str, kind: &str, default: &str, description: &str) -> Self {
        Self::new(name, kind, json!(default), "", description)
    }
}

pub fn setup_schema() -> Vec<SetupField> {
    let mut reports = SetupField::new(
        "SCHEDULED_REPORTS",
        "list_dict",
        json!([]),
        "Scheduled Reports",
        "Configure automated analytics reports",
    );
    reports.bs_elements = vec![
        SetupField::element("report_name", "string_short", "", "Report name (e.g., 'Weekly Traffic Report')"),
        SetupField::element("frequency", "string_short", "weekly", "Frequency: daily, weekly, monthly"),
        SetupField::element("property_id", "string_short", "", "GA4 property ID"),
        SetupField::element(
            "metrics",
            "string_multiline",
            "totalUsers,sessions,screenPageViews",
            "Comma-separated metrics",
        ),
        SetupField::element("dimensions", "string_multiline", "date", "Comma-separated dimensions"),
        SetupField::element("weekday", "string_short", "MO", "Day for weekly reports: MO, TU, WE, TH, FR, SA, SU"),
    ];

    vec![
        SetupField::new(
            "GA_DEFAULT_PROPERTY",
            "string_short",
            json!(""),
            "Google Analytics",
            "Default GA4 property ID used when a request does not name one",
        ),
        SetupField::new(
            "GTM_DEFAULT_ACCOUNT",
            "string_short",
            json!(""),
            "Google Tag Manager",
            "Default GTM account ID",
        ),
        SetupField::new(
            "GTM_DEFAULT_CONTAINER",
            "string_short",
            json!(""),
            "Google Tag Manager",
            "Default GTM container ID",
        ),
        SetupField::new(
            "GITHUB_REPO_URL",
            "string_long",
            json!(""),
            "GitHub Integration",
            "GitHub repository URL for automated PR creation (optional, e.g., 'https://github.com/user/repo')",
        ),
        reports,
    ]
}

/// Persona setup after mixing host values over schema defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetupConfig {
    pub ga_default_property: Option<String>,
    pub gtm_default_account: Option<String>,
    pub gtm_default_container: Option<String>,
    pub github_repo_url: Option<String>,
    pub scheduled_reports: Vec<ScheduledReportConfig>,
    /// `SCHEDULED_REPORTS` entries that were dropped, with the reason.
    pub rejected_reports: Vec<String>,
}

fn non_empty(value: Option<&Value>) -> Option<String> {
    let s = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

/// Fill every element key a list entry leaves out with the element default.
fn mix_elements(elements: &[SetupField], entry: &Value) -> Value {
    let mut out = Map::new();
    for element in elements {
        let value = entry
            .get(&element.bs_name)
            .filter(|v| !v.is_null())
            .cloned()
            .unwrap_or_else(|| element.bs_default.clone());
        out.insert(element.bs_name.clone(), value);
    }
    Value::Object(out)
}

impl SetupConfig {
    /// Mix the host-persisted values over the schema defaults.
    ///
    /// Unknown keys are ignored. Malformed report entries are skipped and
    /// listed in `rejected_reports` so the next scheduled run can say so.
    pub fn mix(schema: &[SetupField], persisted: &Value) -> Self {
        let mut mixed = Map::new();
        for field in schema {
            let value = persisted
                .get(&field.bs_name)
                .filter(|v| !v.is_null())
                .cloned()
                .unwrap_or_else(|| field.bs_default.clone());
            mixed.insert(field.bs_name.clone(), value);
        }

        let mut scheduled_reports = Vec::new();
        let mut rejected_reports = Vec::new();
        let report_field = schema.iter().find(|f| f.bs_name == "SCHEDULED_REPORTS");
        if let (Some(field), Some(Value::Array(entries))) =
            (report_field, mixed.get("SCHEDULED_REPORTS"))
        {
            for (i, entry) in entries.iter().enumerate() {
                let entry = mix_elements(&field.bs_elements, entry);
                let label = match entry.get("report_name").and_then(Value::as_str) {
                    Some(name) if !name.trim().is_empty() => format!("#{} \"{}\"", i + 1, name),
                    _ => format!("#{}", i + 1),
                };
                let reason = match serde_json::from_value::<ScheduledReportConfig>(entry) {
                    Ok(report) if !report.report_name.trim().is_empty() => {
                        scheduled_reports.push(report);
                        continue;
                    }
                    Ok(_) => "report_name is empty".to_string(),
                    Err(e) => e.to_string(),
                };
                tracing::warn!(index = i, reason = %reason, "Skipping scheduled report");
                rejected_reports.push(format!("{}: {}", label, reason));
            }
        }

        Self {
            ga_default_property: non_empty(mixed.get("GA_DEFAULT_PROPERTY")),
            gtm_default_account: non_empty(mixed.get("GTM_DEFAULT_ACCOUNT")),
            gtm_default_container: non_empty(mixed.get("GTM_DEFAULT_CONTAINER")),
            github_repo_url: non_empty(mixed.get("GITHUB_REPO_URL")),
            scheduled_reports,
            rejected_reports,
        }
    }

    /// Insert configured ids the call left out.
    ///
    /// Property defaults only apply to analytics tools and account/container
    /// defaults only to Tag Manager, since a GA account id is not a GTM one.
    pub fn apply_defaults(&self, tool: &str, op: &OpSpec, args: &mut Args) {
        let defaults: Vec<(&str, &Option<String>)> = match tool {
            "google_analytics" | "google_analytics_enhanced" | "report_store" => {
                vec![("propertyId", &self.ga_default_property)]
            }
            "google_tag_manager" => vec![
                ("accountId", &self.gtm_default_account),
                ("containerId", &self.gtm_default_container),
            ],
            _ => Vec::new(),
        };

        for (param, value) in defaults {
            let Some(value) = value else { continue };
            if op.param(param).is_none() {
                continue;
            }
            let missing = match args.get(param) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.trim().is_empty(),
                _ => false,
            };
            if missing {
                args.insert(param.to_string(), Value::String(value.clone()));
            }
        }
    }
}
