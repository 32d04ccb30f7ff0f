// Wire format between the host and the bot process.
//
// One JSON object per line in each direction, discriminated by `type`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::confirmation::PendingChange;
use crate::core::dispatch::ToolCall;
use crate::core::scheduler::HookKind;
use crate::core::tools::ConfirmKey;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    ToolCall(ToolCall),
    Confirmation {
        pending_id: String,
        approved: bool,
    },
    MessageUpdated {
        thread_id: String,
        #[serde(default)]
        message_id: Option<String>,
    },
    ThreadUpdated {
        thread_id: String,
        #[serde(default)]
        title: Option<String>,
    },
    TaskUpdated {
        task_id: String,
        #[serde(default)]
        status: Option<String>,
    },
    /// The persona's setup values changed on the host.
    SetupUpdated { setup: Value },
    Scheduled {
        hook: HookKind,
        #[serde(default)]
        fired_at: Option<DateTime<Utc>>,
    },
    Shutdown,
}

impl InboundEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::ToolCall(_) => "tool_call",
            InboundEvent::Confirmation { .. } => "confirmation",
            InboundEvent::MessageUpdated { .. } => "message_updated",
            InboundEvent::ThreadUpdated { .. } => "thread_updated",
            InboundEvent::TaskUpdated { .. } => "task_updated",
            InboundEvent::SetupUpdated { .. } => "setup_updated",
            InboundEvent::Scheduled { .. } => "scheduled",
            InboundEvent::Shutdown => "shutdown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundReply {
    ToolResult {
        call_id: String,
        content: String,
    },
    NeedsConfirmation {
        call_id: String,
        pending_id: String,
        confirm_setup_key: ConfirmKey,
        confirm_command: String,
        confirm_explanation: String,
    },
    StartExpert {
        hook: HookKind,
        expert: String,
        question: String,
    },
    ScheduledReports {
        content: String,
    },
    /// An inbound line could not be understood.
    Error {
        message: String,
    },
}

impl OutboundReply {
    pub fn confirmation_request(call_id: &str, pending: &PendingChange) -> Self {
        OutboundReply::NeedsConfirmation {
            call_id: call_id.to_string(),
            pending_id: pending.id.clone(),
            confirm_setup_key: pending.setup_key,
            confirm_command: pending.command.clone(),
            confirm_explanation: pending.explanation.clone(),
        }
    }
}

pub fn parse_event(line: &str) -> Result<InboundEvent, serde_json::Error> {
    serde_json::from_str(line)
}

pub fn encode_reply(reply: &OutboundReply) -> Result<String, serde_json::Error> {
    serde_json::to_string(reply)
}
