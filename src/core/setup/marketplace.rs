// What the bot registers with the host marketplace.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::setup_schema::{setup_schema, SetupField};
use crate::core::prompts::{main_prompt, scheduled_prompt};
use crate::core::scheduler::HOOKS;
use crate::core::tools::ALL_TOOLS;

pub const BOT_NAME: &str = "metricmaster";
pub const BOT_VERSION: &str = "0.1.0";

pub const BOT_DESCRIPTION: &str = r#"
## MetricMaster - Google Analytics 4 & Tag Manager Specialist

Sets up and runs website analytics on Google Analytics 4 and Google Tag Manager.

**What it does:**

- Connects to GA4 and GTM through Google authorization
- Creates GA4 properties and GTM containers when you have none
- Produces the container install snippet and can open a GitHub pull request with it
- Links a GA4 measurement ID to GTM with a configuration tag
- Builds event tracking: form submissions, clicks, scroll depth, e-commerce, custom events
- Reports on traffic, conversions, funnels, user journeys and e-commerce
- Runs daily, weekly or monthly reports on a schedule and files them as documents

Every change to your Google accounts is shown to you for approval first.
"#;

const INTRO_MESSAGE: &str = "Hello! I'm MetricMaster, your Google Analytics 4 and Tag Manager specialist. I can help you set up analytics, configure event tracking, and generate insights from your data. Let's get started!";

#[derive(Debug, Error)]
pub enum MarketplaceError {
    #[error("marketplace upsert failed: {0}")]
    Upsert(String),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FeaturedAction {
    pub feat_question: String,
    pub feat_expert: String,
    pub feat_depends_on_setup: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MarketplaceExpert {
    pub fexp_name: String,
    pub fexp_system_prompt: String,
    pub fexp_description: String,
    /// Tool JSON the expert may call, already serialized.
    pub fexp_app_capture_tools: String,
}

/// Base64 pictures; empty when the image file was not found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pictures {
    pub big_b64: String,
    pub small_b64: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketplaceRegistration {
    pub ws_id: String,
    pub marketable_name: String,
    pub marketable_version: String,
    pub marketable_accent_color: String,
    pub marketable_title1: String,
    pub marketable_title2: String,
    pub marketable_author: String,
    pub marketable_occupation: String,
    pub marketable_description: String,
    pub marketable_typical_group: String,
    pub marketable_setup_default: Vec<SetupField>,
    pub marketable_featured_actions: Vec<FeaturedAction>,
    pub marketable_intro_message: String,
    pub marketable_preferred_model_default: String,
    pub marketable_daily_budget_default: u64,
    pub marketable_default_inbox_default: u64,
    pub marketable_experts: Vec<MarketplaceExpert>,
    pub marketable_tags: Vec<String>,
    pub marketable_picture_big_b64: String,
    pub marketable_picture_small_b64: String,
    pub marketable_schedule: Vec<Value>,
}

#[async_trait]
pub trait MarketplaceApi: Send + Sync {
    async fn upsert_bot(&self, registration: &MarketplaceRegistration) -> Result<(), MarketplaceError>;
}

fn featured(question: &str, depends_on: &[&str]) -> FeaturedAction {
    FeaturedAction {
        feat_question: question.to_string(),
        feat_expert: "default".to_string(),
        feat_depends_on_setup: depends_on.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn tools_json() -> String {
    let tools: Vec<Value> = ALL_TOOLS.iter().map(|t| t.openai_style_tool()).collect();
    Value::Array(tools).to_string()
}

pub fn build_registration(ws_id: &str, pictures: Pictures) -> MarketplaceRegistration {
    let tools = tools_json();
    MarketplaceRegistration {
        ws_id: ws_id.to_string(),
        marketable_name: BOT_NAME.to_string(),
        marketable_version: BOT_VERSION.to_string(),
        marketable_accent_color: "#4285F4".to_string(),
        marketable_title1: "MetricMaster".to_string(),
        marketable_title2:
            "Google Analytics 4 & Tag Manager specialist for website analytics setup and reporting"
                .to_string(),
        marketable_author: "Flexus".to_string(),
        marketable_occupation: "Analytics Specialist".to_string(),
        marketable_description: BOT_DESCRIPTION.to_string(),
        marketable_typical_group: "Analytics / Marketing".to_string(),
        marketable_setup_default: setup_schema(),
        marketable_featured_actions: vec![
            featured("Help me set up Google Analytics 4 and Tag Manager", &[]),
            featured(
                "Show me my website traffic for the last 30 days",
                &["GA_DEFAULT_PROPERTY"],
            ),
            featured(
                "Set up event tracking for form submissions",
                &["GTM_DEFAULT_CONTAINER"],
            ),
        ],
        marketable_intro_message: INTRO_MESSAGE.to_string(),
        marketable_preferred_model_default: "grok-4-1-fast-reasoning".to_string(),
        marketable_daily_budget_default: 200_000,
        marketable_default_inbox_default: 10_000,
        marketable_experts: vec![
            MarketplaceExpert {
                fexp_name: "default".to_string(),
                fexp_system_prompt: main_prompt(),
                fexp_description:
                    "Main expert for interactive analytics setup, configuration, and reporting"
                        .to_string(),
                fexp_app_capture_tools: tools.clone(),
            },
            MarketplaceExpert {
                fexp_name: "scheduled".to_string(),
                fexp_system_prompt: scheduled_prompt(),
                fexp_description: "Scheduled expert for automated report generation".to_string(),
                fexp_app_capture_tools: tools,
            },
        ],
        marketable_tags: ["Analytics", "Google Analytics", "Tag Manager", "Reports"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        marketable_picture_big_b64: pictures.big_b64,
        marketable_picture_small_b64: pictures.small_b64,
        marketable_schedule: HOOKS.iter().map(|h| h.to_json()).collect(),
    }
}
