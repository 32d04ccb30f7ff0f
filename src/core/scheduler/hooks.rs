use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use super::schedule::{ScheduleParseError, ScheduleWhen};
use crate::core::auth::AuthSession;
use crate::core::reports::report_service::{ReportService, ScheduledRunSummary};
use crate::core::setup::SetupConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookKind {
    TaskSort,
    TaskProcess,
    ReportGeneration,
}

/// One entry of the bot's cron table as registered with the host.
#[derive(Debug, Clone, Copy)]
pub struct HookSpec {
    pub kind: HookKind,
    pub sched_type: &'static str,
    pub when: &'static str,
    pub first_question: &'static str,
    pub expert: &'static str,
}

pub const HOOKS: &[HookSpec] = &[
    HookSpec {
        kind: HookKind::TaskSort,
        sched_type: "SCHED_TASK_SORT",
        when: "EVERY:10m",
        first_question: "Look at the inbox and sort new tasks: assign analytics work to yourself, reject what is out of scope.",
        expert: "default",
    },
    HookSpec {
        kind: HookKind::TaskProcess,
        sched_type: "SCHED_TODO",
        when: "EVERY:5m",
        first_question: "Work on the assigned analytics task",
        expert: "scheduled",
    },
    HookSpec {
        kind: HookKind::ReportGeneration,
        sched_type: "SCHED_ANY",
        when: "WEEKDAYS:MO:FR/09:00",
        first_question: "Check if there are any scheduled reports configured. If yes, generate them and save to policy documents.",
        expert: "scheduled",
    },
];

impl HookSpec {
    pub fn find(kind: HookKind) -> Option<&'static HookSpec> {
        HOOKS.iter().find(|h| h.kind == kind)
    }

    pub fn schedule(&self) -> Result<ScheduleWhen, ScheduleParseError> {
        self.when.parse()
    }

    /// Marketplace `marketable_schedule` entry.
    pub fn to_json(&self) -> Value {
        json!({
            "sched_type": self.sched_type,
            "sched_when": self.when,
            "sched_first_question": self.first_question,
            "sched_fexp_name": self.expert,
        })
    }
}

/// Host firings may lag their slot by this much and still count as on time.
pub const FIRING_GRACE_MINUTES: i64 = 5;

/// A firing that does not line up with the hook's registered schedule.
#[derive(Debug, Error, PartialEq)]
#[error("{kind:?} fired at {fired_at} ({tz}), outside '{when}'")]
pub struct OffSchedule {
    pub kind: HookKind,
    pub when: &'static str,
    pub fired_at: DateTime<Utc>,
    pub tz: Tz,
    pub next: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
pub enum FiringCheckError {
    #[error("no hook registered for {0:?}")]
    UnknownHook(HookKind),
    #[error("hook schedule is invalid: {0}")]
    Schedule(#[from] ScheduleParseError),
    #[error(transparent)]
    OffSchedule(#[from] OffSchedule),
}

/// What the host should do in response to a firing.
#[derive(Debug, Clone, PartialEq)]
pub enum HookAction {
    StartExpert {
        expert: &'static str,
        question: &'static str,
    },
    Reports(ScheduledRunSummary),
}

pub struct ScheduledRunner {
    reports: Arc<ReportService>,
    tz: Tz,
}

impl ScheduledRunner {
    pub fn new(reports: Arc<ReportService>, tz: Tz) -> Self {
        Self { reports, tz }
    }

    /// Check a host-stamped firing against the hook's schedule in the bot's
    /// zone. A firing up to [`FIRING_GRACE_MINUTES`] late is on time.
    pub fn check_firing(
        &self,
        kind: HookKind,
        fired_at: DateTime<Utc>,
    ) -> Result<(), FiringCheckError> {
        let spec = HookSpec::find(kind).ok_or(FiringCheckError::UnknownHook(kind))?;
        let schedule = spec.schedule()?;
        let window_start = fired_at - Duration::minutes(FIRING_GRACE_MINUTES);
        let on_time = schedule.matches(fired_at, self.tz)
            || schedule
                .next_after(window_start, self.tz)
                .is_some_and(|slot| slot <= fired_at);
        if on_time {
            return Ok(());
        }
        Err(OffSchedule {
            kind,
            when: spec.when,
            fired_at,
            tz: self.tz,
            next: schedule.next_after(fired_at, self.tz),
        }
        .into())
    }

    /// Handle one firing. Report generation uses the firing date in the bot's
    /// zone and only runs the reports due that day; there is no catch-up for
    /// missed firings.
    pub async fn fire(
        &self,
        kind: HookKind,
        fired_at: DateTime<Utc>,
        session: &AuthSession,
        setup: &SetupConfig,
    ) -> HookAction {
        let Some(spec) = HookSpec::find(kind) else {
            return HookAction::Reports(ScheduledRunSummary::default());
        };
        match kind {
            HookKind::TaskSort | HookKind::TaskProcess => HookAction::StartExpert {
                expert: spec.expert,
                question: spec.first_question,
            },
            HookKind::ReportGeneration => {
                let date = fired_at.with_timezone(&self.tz).date_naive();
                tracing::info!(
                    date = %date,
                    configured = setup.scheduled_reports.len(),
                    "Running scheduled reports"
                );
                let mut summary = self
                    .reports
                    .run_due(session, &setup.scheduled_reports, date)
                    .await;
                summary.invalid = setup.rejected_reports.clone();
                tracing::info!(
                    generated = summary.generated.len(),
                    skipped = summary.skipped.len(),
                    failed = summary.failed.len(),
                    invalid = summary.invalid.len(),
                    "Scheduled reports finished"
                );
                HookAction::Reports(summary)
            }
        }
    }
}
