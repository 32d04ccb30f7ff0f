// The tools MetricMaster exposes to the model.
//
// Each constant below is pure metadata. Handlers look operations up by name,
// the installer exports them to the marketplace and the help texts are
// returned verbatim for `op="help"`.

use super::tool_catalog::{ConfirmKey, OpSpec, ParamKind, ParamSpec, ToolSpec};
use crate::core::auth::{
    SCOPE_ANALYTICS_EDIT, SCOPE_ANALYTICS_READONLY, SCOPE_TAGMANAGER_EDIT,
    SCOPE_TAGMANAGER_READONLY,
};

pub const DATE_RANGES: &[&str] = &[
    "today",
    "yesterday",
    "last7days",
    "last28days",
    "last30days",
    "last90days",
    "custom",
];

const USAGE_CONTEXTS: &[&str] = &["web", "android", "ios", "amp"];

// ---------------------------------------------------------------------------
// google_analytics
// ---------------------------------------------------------------------------

pub const GOOGLE_ANALYTICS_HELP: &str = r#"
Help:

google_analytics(op="status")
    Show connection status.

google_analytics(op="listProperties")
    List GA4 accounts and the properties inside them.

google_analytics(op="getReport", args={
    "propertyId": "123456",
    "dateRange": "last7days",        # today, yesterday, last7days, last28days, last30days, last90days, custom
    "startDate": "2024-01-01",       # only with dateRange="custom"
    "endDate": "2024-01-31",
    "metrics": ["totalUsers", "sessions"],
    "dimensions": ["date"],
    "orderBy": {"metric": "sessions", "desc": true},
    "limit": 100
})
    Run a GA4 report.

google_analytics(op="createProperty", args={
    "accountId": "123",
    "displayName": "My Website",
    "timeZone": "Europe/London",
    "currencyCode": "GBP"
})
    Create a GA4 property (asks for confirmation).
"#;

const GA_REPORT_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("propertyId", ParamKind::String, "GA4 property ID"),
    ParamSpec::optional("dateRange", ParamKind::OneOf(DATE_RANGES), "Named date range"),
    ParamSpec::optional("startDate", ParamKind::String, "YYYY-MM-DD, with dateRange=custom"),
    ParamSpec::optional("endDate", ParamKind::String, "YYYY-MM-DD, with dateRange=custom"),
    ParamSpec::optional("metrics", ParamKind::StringList, "GA4 metric names"),
    ParamSpec::optional("dimensions", ParamKind::StringList, "GA4 dimension names"),
    ParamSpec::optional("orderBy", ParamKind::Object, "{metric|dimension, desc}"),
    ParamSpec::optional("limit", ParamKind::Integer, "Maximum rows"),
    ParamSpec::optional("filters", ParamKind::ObjectList, "{field, operator, value}"),
];

const GA_CREATE_PROPERTY_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("accountId", ParamKind::String, "GA account ID"),
    ParamSpec::required("displayName", ParamKind::String, "Property name"),
    ParamSpec::optional("timeZone", ParamKind::String, "IANA time zone, default UTC"),
    ParamSpec::optional("currencyCode", ParamKind::String, "ISO currency, default USD"),
];

pub const GOOGLE_ANALYTICS_TOOL: ToolSpec = ToolSpec {
    name: "google_analytics",
    description: "Access Google Analytics 4 properties and reports. Call with op='help' for usage",
    help: GOOGLE_ANALYTICS_HELP,
    scopes: &[SCOPE_ANALYTICS_READONLY],
    ops: &[
        OpSpec::read("listProperties", "List GA4 properties", &[]),
        OpSpec::read("getReport", "Run a GA4 report", GA_REPORT_PARAMS),
        OpSpec::write(
            "createProperty",
            "Create a GA4 property",
            GA_CREATE_PROPERTY_PARAMS,
            ConfirmKey::GaWrite,
            "This will create a new GA4 property in your Google Analytics account",
        )
        .with_scopes(&[SCOPE_ANALYTICS_EDIT]),
    ],
};

// ---------------------------------------------------------------------------
// google_analytics_enhanced
// ---------------------------------------------------------------------------

pub const GOOGLE_ANALYTICS_ENHANCED_HELP: &str = r#"
Enhanced Google Analytics Help:

google_analytics_enhanced(op="status")
    Show connection status.

# Event Tracking
google_analytics_enhanced(op="getEventConfig", args={"propertyId": "123456", "eventName": "purchase"})
    Check whether an event was tracked in the last 7 days.

google_analytics_enhanced(op="listEvents", args={"propertyId": "123456", "dateRange": "last7days"})
    List all events tracked in the property.

google_analytics_enhanced(op="getEventReport", args={
    "propertyId": "123456",
    "eventName": "purchase",
    "dateRange": "last30days",
    "dimensions": ["date", "eventName"],
    "metrics": ["eventCount", "eventValue"]
})
    Detailed event analytics.

# Conversions and E-commerce
google_analytics_enhanced(op="getConversions", args={"propertyId": "123456", "dimensions": ["sessionSource", "sessionMedium"]})
google_analytics_enhanced(op="getEcommerceReport", args={"propertyId": "123456", "dimensions": ["itemName", "itemCategory"]})

# User Journey & Funnels
google_analytics_enhanced(op="getUserJourney", args={
    "propertyId": "123456", "dateRange": "last7days", "startPage": "/", "endPage": "/checkout/complete"
})
    Pages visited between the start and end page.

google_analytics_enhanced(op="getFunnelReport", args={
    "propertyId": "123456",
    "funnelSteps": [
        {"name": "Home", "page": "/"},
        {"name": "Product", "page": "/product"},
        {"name": "Cart", "page": "/cart"},
        {"name": "Checkout", "page": "/checkout"}
    ],
    "dateRange": "last30days"
})
    Funnel with step-to-step conversion and drop-off.

# Custom Reports
google_analytics_enhanced(op="customQuery", args={
    "propertyId": "123456",
    "dateRange": "last30days",
    "metrics": ["sessions", "conversions"],
    "dimensions": ["deviceCategory", "browser"],
    "filters": [{"field": "country", "operator": "EQUALS", "value": "United States"}],
    "orderBy": {"metric": "sessions", "desc": true},
    "limit": 50
})
    Operators: EQUALS, CONTAINS, BEGINS_WITH, ENDS_WITH, REGEXP.

# Recommended events
E-commerce: page_view, view_item, add_to_cart, begin_checkout, purchase, refund
Lead Generation: page_view, generate_lead, form_submit, sign_up, contact_submit
Content/Media: page_view, video_start, video_complete, file_download, search, share
SaaS: page_view, sign_up, login, trial_start, upgrade, feature_usage
"#;

const ENH_PROPERTY_ONLY: &[ParamSpec] = &[
    ParamSpec::required("propertyId", ParamKind::String, "GA4 property ID"),
    ParamSpec::optional("dateRange", ParamKind::OneOf(DATE_RANGES), "Named date range"),
    ParamSpec::optional("startDate", ParamKind::String, "YYYY-MM-DD"),
    ParamSpec::optional("endDate", ParamKind::String, "YYYY-MM-DD"),
    ParamSpec::optional("dimensions", ParamKind::StringList, "Breakdown dimensions"),
];

const ENH_EVENT_CONFIG: &[ParamSpec] = &[
    ParamSpec::required("propertyId", ParamKind::String, "GA4 property ID"),
    ParamSpec::required("eventName", ParamKind::String, "Event to look for"),
];

const ENH_EVENT_REPORT: &[ParamSpec] = &[
    ParamSpec::required("propertyId", ParamKind::String, "GA4 property ID"),
    ParamSpec::optional("eventName", ParamKind::String, "Restrict to one event"),
    ParamSpec::optional("dateRange", ParamKind::OneOf(DATE_RANGES), "Named date range"),
    ParamSpec::optional("startDate", ParamKind::String, "YYYY-MM-DD"),
    ParamSpec::optional("endDate", ParamKind::String, "YYYY-MM-DD"),
    ParamSpec::optional("metrics", ParamKind::StringList, "Metrics"),
    ParamSpec::optional("dimensions", ParamKind::StringList, "Dimensions"),
];

const ENH_USER_JOURNEY: &[ParamSpec] = &[
    ParamSpec::required("propertyId", ParamKind::String, "GA4 property ID"),
    ParamSpec::optional("dateRange", ParamKind::OneOf(DATE_RANGES), "Named date range"),
    ParamSpec::optional("startDate", ParamKind::String, "YYYY-MM-DD"),
    ParamSpec::optional("endDate", ParamKind::String, "YYYY-MM-DD"),
    ParamSpec::optional("startPage", ParamKind::String, "Journey start path, default /"),
    ParamSpec::optional("endPage", ParamKind::String, "Journey end path"),
];

const ENH_FUNNEL: &[ParamSpec] = &[
    ParamSpec::required("propertyId", ParamKind::String, "GA4 property ID"),
    ParamSpec::required("funnelSteps", ParamKind::ObjectList, "[{name, page}]"),
    ParamSpec::optional("dateRange", ParamKind::OneOf(DATE_RANGES), "Named date range"),
    ParamSpec::optional("startDate", ParamKind::String, "YYYY-MM-DD"),
    ParamSpec::optional("endDate", ParamKind::String, "YYYY-MM-DD"),
];

pub const GOOGLE_ANALYTICS_ENHANCED_TOOL: ToolSpec = ToolSpec {
    name: "google_analytics_enhanced",
    description: "Enhanced Google Analytics operations for event setup and tracking. Call with op='help' for usage",
    help: GOOGLE_ANALYTICS_ENHANCED_HELP,
    scopes: &[SCOPE_ANALYTICS_READONLY],
    ops: &[
        OpSpec::read("getEventConfig", "Check an event is tracked", ENH_EVENT_CONFIG),
        OpSpec::read("listEvents", "List tracked events", ENH_PROPERTY_ONLY),
        OpSpec::read("getEventReport", "Event analytics", ENH_EVENT_REPORT),
        OpSpec::read("getConversions", "Conversion metrics", ENH_PROPERTY_ONLY),
        OpSpec::read("getEcommerceReport", "E-commerce metrics", ENH_PROPERTY_ONLY),
        OpSpec::read("getUserJourney", "Pages between two pages", ENH_USER_JOURNEY),
        OpSpec::read("getFunnelReport", "Funnel conversion", ENH_FUNNEL),
        OpSpec::read("customQuery", "Custom report with filters", GA_REPORT_PARAMS),
    ],
};

// ---------------------------------------------------------------------------
// google_tag_manager
// ---------------------------------------------------------------------------

pub const GOOGLE_TAG_MANAGER_HELP: &str = r#"
Help:

google_tag_manager(op="status")
    Show connection status and available operations.

# Accounts & Containers
google_tag_manager(op="listAccounts")
google_tag_manager(op="listContainers", args={"accountId": "123456"})
google_tag_manager(op="getContainer", args={"accountId": "123456", "containerId": "789"})
    Container details including the install snippet.
google_tag_manager(op="createContainer", args={"accountId": "123456", "containerName": "My Website", "usageContext": ["web"]})
    usageContext options: web, android, ios, amp.
google_tag_manager(op="listWorkspaces", args={"accountId": "123456", "containerId": "789"})

# Tags, Triggers, Variables (workspaceId defaults to the first workspace)
google_tag_manager(op="listTags", args={"accountId": "123456", "containerId": "789", "workspaceId": "10"})
google_tag_manager(op="createTag", args={
    "accountId": "123456", "containerId": "789", "workspaceId": "10",
    "tagName": "GA4 Event", "tagType": "gaawe",
    "parameters": [{"key": "eventName", "type": "template", "value": "button_click"}],
    "firingTriggerId": ["2147479553"]
})
google_tag_manager(op="listTriggers", args={"accountId": "123456", "containerId": "789"})
google_tag_manager(op="createTrigger", args={
    "accountId": "123456", "containerId": "789",
    "triggerName": "Form Submit", "triggerType": "formSubmission", "filters": []
})
google_tag_manager(op="listVariables", args={"accountId": "123456", "containerId": "789"})
google_tag_manager(op="createVariable", args={
    "accountId": "123456", "containerId": "789",
    "variableName": "GA4 Measurement ID", "variableType": "c", "value": "G-XXXXXXXXXX"
})

# Versions & Publishing
google_tag_manager(op="createVersion", args={"accountId": "123456", "containerId": "789", "versionName": "Initial Setup", "versionNotes": "Setup GA4 tracking"})
google_tag_manager(op="publishVersion", args={"accountId": "123456", "containerId": "789", "versionId": "5"})
    Publishes to PRODUCTION.

# GA4 Integration
google_tag_manager(op="linkGA4", args={"accountId": "123456", "containerId": "789", "measurementId": "G-XXXXXXXXXX"})
    Create the GA4 configuration tag firing on the All Pages trigger.

# Deployment
google_tag_manager(op="deploySnippet", args={"accountId": "123456", "containerId": "789", "filePath": "snippets/gtm.html"})
    Open a GitHub pull request adding the container snippet to GITHUB_REPO_URL.

Every create/publish/link/deploy operation asks the user for confirmation first.
"#;

const GTM_ACCOUNT: &[ParamSpec] = &[ParamSpec::required(
    "accountId",
    ParamKind::String,
    "GTM account ID",
)];

const GTM_CONTAINER: &[ParamSpec] = &[
    ParamSpec::required("accountId", ParamKind::String, "GTM account ID"),
    ParamSpec::required("containerId", ParamKind::String, "GTM container ID"),
];

const GTM_WORKSPACE: &[ParamSpec] = &[
    ParamSpec::required("accountId", ParamKind::String, "GTM account ID"),
    ParamSpec::required("containerId", ParamKind::String, "GTM container ID"),
    ParamSpec::optional("workspaceId", ParamKind::String, "Defaults to the first workspace"),
];

const GTM_CREATE_CONTAINER: &[ParamSpec] = &[
    ParamSpec::required("accountId", ParamKind::String, "GTM account ID"),
    ParamSpec::required("containerName", ParamKind::String, "Container name"),
    ParamSpec::optional("usageContext", ParamKind::StringList, "web, android, ios, amp"),
];

const GTM_CREATE_TAG: &[ParamSpec] = &[
    ParamSpec::required("accountId", ParamKind::String, "GTM account ID"),
    ParamSpec::required("containerId", ParamKind::String, "GTM container ID"),
    ParamSpec::optional("workspaceId", ParamKind::String, "Defaults to the first workspace"),
    ParamSpec::required("tagName", ParamKind::String, "Tag name"),
    ParamSpec::required("tagType", ParamKind::String, "Tag type, e.g. gaawe"),
    ParamSpec::optional("parameters", ParamKind::ObjectList, "[{key, type, value}]"),
    ParamSpec::optional("firingTriggerId", ParamKind::StringList, "Trigger IDs"),
];

const GTM_CREATE_TRIGGER: &[ParamSpec] = &[
    ParamSpec::required("accountId", ParamKind::String, "GTM account ID"),
    ParamSpec::required("containerId", ParamKind::String, "GTM container ID"),
    ParamSpec::optional("workspaceId", ParamKind::String, "Defaults to the first workspace"),
    ParamSpec::required("triggerName", ParamKind::String, "Trigger name"),
    ParamSpec::required("triggerType", ParamKind::String, "Trigger type, e.g. formSubmission"),
    ParamSpec::optional("filters", ParamKind::ObjectList, "GTM condition objects"),
];

const GTM_CREATE_VARIABLE: &[ParamSpec] = &[
    ParamSpec::required("accountId", ParamKind::String, "GTM account ID"),
    ParamSpec::required("containerId", ParamKind::String, "GTM container ID"),
    ParamSpec::optional("workspaceId", ParamKind::String, "Defaults to the first workspace"),
    ParamSpec::required("variableName", ParamKind::String, "Variable name"),
    ParamSpec::required("variableType", ParamKind::String, "Variable type, e.g. c"),
    ParamSpec::optional("value", ParamKind::String, "Constant value"),
];

const GTM_CREATE_VERSION: &[ParamSpec] = &[
    ParamSpec::required("accountId", ParamKind::String, "GTM account ID"),
    ParamSpec::required("containerId", ParamKind::String, "GTM container ID"),
    ParamSpec::optional("workspaceId", ParamKind::String, "Defaults to the first workspace"),
    ParamSpec::optional("versionName", ParamKind::String, "Version name"),
    ParamSpec::optional("versionNotes", ParamKind::String, "Version notes"),
];

const GTM_PUBLISH_VERSION: &[ParamSpec] = &[
    ParamSpec::required("accountId", ParamKind::String, "GTM account ID"),
    ParamSpec::required("containerId", ParamKind::String, "GTM container ID"),
    ParamSpec::required("versionId", ParamKind::String, "Container version ID"),
];

const GTM_LINK_GA4: &[ParamSpec] = &[
    ParamSpec::required("accountId", ParamKind::String, "GTM account ID"),
    ParamSpec::required("containerId", ParamKind::String, "GTM container ID"),
    ParamSpec::optional("workspaceId", ParamKind::String, "Defaults to the first workspace"),
    ParamSpec::required("measurementId", ParamKind::String, "GA4 measurement ID, G-XXXX"),
];

const GTM_DEPLOY_SNIPPET: &[ParamSpec] = &[
    ParamSpec::required("accountId", ParamKind::String, "GTM account ID"),
    ParamSpec::required("containerId", ParamKind::String, "GTM container ID"),
    ParamSpec::optional("filePath", ParamKind::String, "Path in the repository"),
    ParamSpec::optional("branch", ParamKind::String, "Branch to create"),
];

pub const GOOGLE_TAG_MANAGER_TOOL: ToolSpec = ToolSpec {
    name: "google_tag_manager",
    description: "Manage Google Tag Manager containers, tags, triggers, and variables. Call with op='help' for usage",
    help: GOOGLE_TAG_MANAGER_HELP,
    scopes: &[SCOPE_TAGMANAGER_EDIT, SCOPE_TAGMANAGER_READONLY],
    ops: &[
        OpSpec::read("listAccounts", "List GTM accounts", &[]),
        OpSpec::read("listContainers", "List containers", GTM_ACCOUNT),
        OpSpec::read("getContainer", "Container details and snippet", GTM_CONTAINER),
        OpSpec::write(
            "createContainer",
            "Create a container",
            GTM_CREATE_CONTAINER,
            ConfirmKey::GtmWrite,
            "This will create a new GTM container in your account",
        ),
        OpSpec::read("listWorkspaces", "List workspaces", GTM_CONTAINER),
        OpSpec::read("listTags", "List tags", GTM_WORKSPACE),
        OpSpec::write(
            "createTag",
            "Create a tag",
            GTM_CREATE_TAG,
            ConfirmKey::GtmWrite,
            "This will create a new tag in GTM",
        ),
        OpSpec::read("listTriggers", "List triggers", GTM_WORKSPACE),
        OpSpec::write(
            "createTrigger",
            "Create a trigger",
            GTM_CREATE_TRIGGER,
            ConfirmKey::GtmWrite,
            "This will create a new trigger in GTM",
        ),
        OpSpec::read("listVariables", "List variables", GTM_WORKSPACE),
        OpSpec::write(
            "createVariable",
            "Create a variable",
            GTM_CREATE_VARIABLE,
            ConfirmKey::GtmWrite,
            "This will create a new variable in GTM",
        ),
        OpSpec::write(
            "createVersion",
            "Create a container version",
            GTM_CREATE_VERSION,
            ConfirmKey::GtmWrite,
            "This will create a new container version",
        ),
        OpSpec::write(
            "publishVersion",
            "Publish a version",
            GTM_PUBLISH_VERSION,
            ConfirmKey::GtmPublish,
            "This will publish the container version to PRODUCTION",
        ),
        OpSpec::write(
            "linkGA4",
            "Create the GA4 configuration tag",
            GTM_LINK_GA4,
            ConfirmKey::GtmWrite,
            "This will create GA4 configuration tag in GTM",
        ),
        OpSpec::write(
            "deploySnippet",
            "Open a pull request with the container snippet",
            GTM_DEPLOY_SNIPPET,
            ConfirmKey::GithubWrite,
            "This will open a pull request in your GitHub repository",
        ),
    ],
};

// ---------------------------------------------------------------------------
// report_store
// ---------------------------------------------------------------------------

pub const REPORT_STORE_HELP: &str = r#"
report_store(op="list", args={"reportName": "Weekly Traffic", "limit": 20})
    List stored reports, newest first. reportName is optional.

report_store(op="get", args={"id": 12})
    Show a stored report with its rows, totals and computed rates.

report_store(op="save", args={
    "reportName": "Weekly Traffic",
    "propertyId": "123456",
    "dateRange": "last7days",
    "metrics": ["totalUsers", "sessions"],
    "dimensions": ["date"]
})
    Run a GA4 report and store the output.

report_store(op="delete", args={"id": 12})
"#;

const STORE_LIST: &[ParamSpec] = &[
    ParamSpec::optional("reportName", ParamKind::String, "Filter by report name"),
    ParamSpec::optional("limit", ParamKind::Integer, "Maximum entries, default 20"),
];

const STORE_ID: &[ParamSpec] = &[ParamSpec::required(
    "id",
    ParamKind::Integer,
    "Stored report id",
)];

const STORE_SAVE: &[ParamSpec] = &[
    ParamSpec::required("reportName", ParamKind::String, "Report name"),
    ParamSpec::required("propertyId", ParamKind::String, "GA4 property ID"),
    ParamSpec::optional("dateRange", ParamKind::OneOf(DATE_RANGES), "Named date range"),
    ParamSpec::optional("startDate", ParamKind::String, "YYYY-MM-DD"),
    ParamSpec::optional("endDate", ParamKind::String, "YYYY-MM-DD"),
    ParamSpec::required("metrics", ParamKind::StringList, "Metrics"),
    ParamSpec::optional("dimensions", ParamKind::StringList, "Dimensions"),
];

pub const REPORT_STORE_TOOL: ToolSpec = ToolSpec {
    name: "report_store",
    description: "Store and retrieve generated analytics reports. Call with op='help' for usage",
    help: REPORT_STORE_HELP,
    scopes: &[SCOPE_ANALYTICS_READONLY],
    ops: &[
        OpSpec::read("list", "List stored reports", STORE_LIST),
        OpSpec::read("get", "Read a stored report", STORE_ID),
        OpSpec::read("save", "Run and store a report", STORE_SAVE),
        OpSpec::read("delete", "Delete a stored report", STORE_ID),
    ],
};

// ---------------------------------------------------------------------------
// flexus_policy_document
// ---------------------------------------------------------------------------

pub const POLICY_DOCUMENT_HELP: &str = r#"
flexus_policy_document(op="list", args={"p": "/analytics/"})
    List documents under a folder.

flexus_policy_document(op="cat", args={"p": "/analytics/setup"})
    Print a document.

flexus_policy_document(op="write", args={"p": "/analytics/setup", "text": "{...json...}"})
    Create or overwrite a document. The text must be JSON.
"#;

const PDOC_PATH: &[ParamSpec] = &[ParamSpec::required(
    "p",
    ParamKind::String,
    "Document path",
)];

const PDOC_LIST: &[ParamSpec] = &[ParamSpec::optional(
    "p",
    ParamKind::String,
    "Folder, default /",
)];

const PDOC_WRITE: &[ParamSpec] = &[
    ParamSpec::required("p", ParamKind::String, "Document path"),
    ParamSpec::required("text", ParamKind::String, "JSON document"),
];

pub const POLICY_DOCUMENT_TOOL: ToolSpec = ToolSpec {
    name: "flexus_policy_document",
    description: "Read and write policy documents in the workspace. Call with op='help' for usage",
    help: POLICY_DOCUMENT_HELP,
    scopes: &[],
    ops: &[
        OpSpec::read("list", "List documents", PDOC_LIST),
        OpSpec::read("cat", "Read a document", PDOC_PATH),
        OpSpec::read("write", "Write a document", PDOC_WRITE),
    ],
};

// ---------------------------------------------------------------------------
// ask_questions
// ---------------------------------------------------------------------------

pub const ASK_QUESTIONS_HELP: &str = r#"
ask_questions(op="ask", args={"questions": [
    {"q": "Which website should we track?", "type": "text"},
    {"q": "Do you sell online?", "type": "yes_no"},
    {"q": "Report frequency?", "type": "single", "options": ["daily", "weekly", "monthly"]}
]})
    Ask the user structured questions. Types: text, yes_no, single, multiple.
"#;

const ASK_PARAMS: &[ParamSpec] = &[ParamSpec::required(
    "questions",
    ParamKind::ObjectList,
    "[{q, type, options}]",
)];

pub const ASK_QUESTIONS_TOOL: ToolSpec = ToolSpec {
    name: "ask_questions",
    description: "Ask the user one or more structured questions. Call with op='help' for usage",
    help: ASK_QUESTIONS_HELP,
    scopes: &[],
    ops: &[OpSpec::read("ask", "Ask questions", ASK_PARAMS)],
};

/// Every tool, in the order they are registered with the host.
pub const ALL_TOOLS: &[&ToolSpec] = &[
    &GOOGLE_ANALYTICS_TOOL,
    &GOOGLE_ANALYTICS_ENHANCED_TOOL,
    &GOOGLE_TAG_MANAGER_TOOL,
    &REPORT_STORE_TOOL,
    &POLICY_DOCUMENT_TOOL,
    &ASK_QUESTIONS_TOOL,
];

pub fn usage_context_allowed(value: &str) -> bool {
    USAGE_CONTEXTS.contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_names_match_the_registered_set() {
        let names: Vec<_> = ALL_TOOLS.iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "google_analytics",
                "google_analytics_enhanced",
                "google_tag_manager",
                "report_store",
                "flexus_policy_document",
                "ask_questions",
            ]
        );
    }

    #[test]
    fn every_gtm_write_is_gated() {
        for name in [
            "createContainer",
            "createTag",
            "createTrigger",
            "createVariable",
            "createVersion",
            "publishVersion",
            "linkGA4",
            "deploySnippet",
        ] {
            let op = GOOGLE_TAG_MANAGER_TOOL.op(name).unwrap();
            assert!(op.mutation.is_some(), "{name} must be confirmed");
        }
        assert_eq!(
            GOOGLE_TAG_MANAGER_TOOL
                .op("publishVersion")
                .and_then(|op| op.mutation)
                .map(|m| m.key),
            Some(ConfirmKey::GtmPublish)
        );
    }

    #[test]
    fn read_ops_are_not_gated() {
        for tool in ALL_TOOLS {
            for op in tool.ops {
                if op.name.starts_with("list") || op.name.starts_with("get") {
                    assert!(!op.mutation.is_some(), "{}.{} should not be gated", tool.name, op.name);
                }
            }
        }
    }

    #[test]
    fn help_texts_mention_their_operations() {
        for tool in [
            &GOOGLE_ANALYTICS_TOOL,
            &GOOGLE_ANALYTICS_ENHANCED_TOOL,
            &GOOGLE_TAG_MANAGER_TOOL,
        ] {
            assert!(tool.description.to_lowercase().contains("help"));
            for op in tool.ops {
                assert!(tool.help.contains(op.name), "{} help misses {}", tool.name, op.name);
            }
        }
    }

    #[test]
    fn gtm_scopes_are_tag_manager_scopes() {
        assert!(GOOGLE_TAG_MANAGER_TOOL
            .scopes
            .iter()
            .all(|s| s.contains("tagmanager")));
        assert!(GOOGLE_ANALYTICS_TOOL.scopes.iter().all(|s| s.contains("analytics")));
    }
}
