// Human-in-the-loop gate for mutating operations.
//
// `propose` never talks to Google. It stores a pending change and returns
// the descriptor the host shows to the operator. `commit` consumes the
// pending change exactly once: an approved change comes back as
// `Resolution::Execute`, anything else is a cancellation.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::tools::{Args, ConfirmKey};

/// Pending changes older than this are dropped.
pub const PENDING_TTL_MINUTES: i64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingChange {
    pub id: String,
    pub tool: String,
    pub op: String,
    pub args: Args,
    pub setup_key: ConfirmKey,
    pub command: String,
    pub explanation: String,
    pub proposed_at: DateTime<Utc>,
}

impl PendingChange {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.proposed_at > Duration::minutes(PENDING_TTL_MINUTES)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Declined,
}

impl Decision {
    pub fn from_approved(approved: bool) -> Self {
        if approved {
            Decision::Approved
        } else {
            Decision::Declined
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Run the operation now, once.
    Execute(PendingChange),
    /// Nothing runs; the message goes back to the model.
    Cancelled(String),
}

/// What the gate needs to describe a change.
#[derive(Debug, Clone)]
pub struct Proposal<'a> {
    pub tool: &'a str,
    pub op: &'a str,
    pub args: &'a Args,
    pub setup_key: ConfirmKey,
    pub command: String,
    pub explanation: &'a str,
}

#[derive(Default)]
pub struct ConfirmationGate {
    pending: DashMap<String, PendingChange>,
}

impl ConfirmationGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn propose(&self, proposal: Proposal<'_>) -> PendingChange {
        self.propose_at(proposal, Utc::now())
    }

    pub fn propose_at(&self, proposal: Proposal<'_>, now: DateTime<Utc>) -> PendingChange {
        self.prune(now);
        let change = PendingChange {
            id: new_pending_id(),
            tool: proposal.tool.to_string(),
            op: proposal.op.to_string(),
            args: proposal.args.clone(),
            setup_key: proposal.setup_key,
            command: proposal.command,
            explanation: proposal.explanation.to_string(),
            proposed_at: now,
        };
        tracing::info!(
            pending_id = %change.id,
            tool = %change.tool,
            op = %change.op,
            setup_key = change.setup_key.as_str(),
            "Change awaiting confirmation"
        );
        self.pending.insert(change.id.clone(), change.clone());
        change
    }

    pub fn commit(&self, pending_id: &str, decision: Decision) -> Resolution {
        self.commit_at(pending_id, decision, Utc::now())
    }

    pub fn commit_at(&self, pending_id: &str, decision: Decision, now: DateTime<Utc>) -> Resolution {
        let removed = self.pending.remove(pending_id);
        self.prune(now);
        let Some((_, change)) = removed else {
            tracing::warn!(pending_id, "Confirmation for unknown pending change");
            return Resolution::Cancelled(format!(
                "❌ No pending change with id {}. Nothing was changed.",
                pending_id
            ));
        };
        if change.is_expired(now) {
            tracing::warn!(pending_id, "Confirmation arrived after expiry");
            return Resolution::Cancelled(format!(
                "❌ The confirmation for '{}' expired. Nothing was changed; ask again if it is still wanted.",
                change.command
            ));
        }
        match decision {
            Decision::Approved => Resolution::Execute(change),
            Decision::Declined => {
                tracing::info!(pending_id, command = %change.command, "Change declined");
                Resolution::Cancelled(format!(
                    "🚫 Cancelled: {}. The user declined, nothing was changed.",
                    change.command
                ))
            }
        }
    }

    #[cfg(test)]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn prune(&self, now: DateTime<Utc>) {
        self.pending.retain(|_, change| !change.is_expired(now));
    }
}

fn new_pending_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    format!("pc-{}", suffix)
}
