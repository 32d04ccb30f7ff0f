// The bot's main loop.
//
// Idle → Dispatching → Responding → Idle for every inbound event, Stopped on
// `shutdown` or when the host closes the stream. Events are handled one at a
// time and a failing handler only ever produces a reply or a log line.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use super::protocol::{InboundEvent, OutboundReply};
use crate::core::confirmation::{Decision, PENDING_TTL_MINUTES};
use crate::core::dispatch::{DispatchOutcome, Dispatcher, ToolCall};
use crate::core::scheduler::{FiringCheckError, HookAction, HookKind, ScheduledRunner};
use crate::core::setup::{setup_schema, SetupConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Dispatching,
    Responding,
    Stopped,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A line that is not a valid event. The loop answers it and carries on.
    #[error("malformed event: {0}")]
    Malformed(String),
}

/// Where inbound events come from.
#[async_trait]
pub trait EventSource: Send {
    /// `None` once the host has closed the stream.
    async fn next_event(&mut self) -> Option<Result<InboundEvent, TransportError>>;
}

/// Where replies go.
#[async_trait]
pub trait ReplySink: Send {
    async fn send(&mut self, reply: &OutboundReply) -> Result<(), TransportError>;
}

pub struct BotEventLoop {
    dispatcher: Dispatcher,
    runner: ScheduledRunner,
    state: LoopState,
    /// pending id → (originating call id, proposed at)
    pending_calls: HashMap<String, (String, DateTime<Utc>)>,
}

impl BotEventLoop {
    pub fn new(dispatcher: Dispatcher, runner: ScheduledRunner) -> Self {
        Self {
            dispatcher,
            runner,
            state: LoopState::Idle,
            pending_calls: HashMap::new(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Serve events until shutdown or end of stream.
    pub async fn run<S, R>(&mut self, source: &mut S, sink: &mut R) -> Result<(), TransportError>
    where
        S: EventSource + ?Sized,
        R: ReplySink + ?Sized,
    {
        tracing::info!(persona_id = %self.dispatcher.persona().persona_id, "Event loop started");
        loop {
            self.state = LoopState::Idle;
            let event = match source.next_event().await {
                None => {
                    tracing::info!("Host closed the event stream");
                    break;
                }
                Some(Err(TransportError::Malformed(message))) => {
                    tracing::warn!("Ignoring malformed event: {}", message);
                    sink.send(&OutboundReply::Error { message }).await?;
                    continue;
                }
                Some(Err(e)) => {
                    self.state = LoopState::Stopped;
                    return Err(e);
                }
                Some(Ok(event)) => event,
            };

            if event == InboundEvent::Shutdown {
                tracing::info!("Shutdown requested");
                break;
            }

            self.state = LoopState::Dispatching;
            tracing::debug!(kind = event.kind(), "Handling event");
            let replies = self.handle(event).await;

            self.state = LoopState::Responding;
            for reply in &replies {
                sink.send(reply).await?;
            }
        }
        self.state = LoopState::Stopped;
        Ok(())
    }

    /// Replies produced by one event. Shutdown is handled by [`run`](Self::run).
    pub async fn handle(&mut self, event: InboundEvent) -> Vec<OutboundReply> {
        match event {
            InboundEvent::ToolCall(call) => vec![self.on_tool_call(call).await],
            InboundEvent::Confirmation {
                pending_id,
                approved,
            } => vec![self.on_confirmation(&pending_id, approved).await],
            InboundEvent::MessageUpdated {
                thread_id,
                message_id,
            } => {
                tracing::debug!(thread_id = %thread_id, message_id = ?message_id, "Message updated");
                Vec::new()
            }
            InboundEvent::ThreadUpdated { thread_id, title } => {
                tracing::debug!(thread_id = %thread_id, title = ?title, "Thread updated");
                Vec::new()
            }
            InboundEvent::TaskUpdated { task_id, status } => {
                tracing::info!(task_id = %task_id, status = ?status, "Task updated");
                Vec::new()
            }
            InboundEvent::SetupUpdated { setup } => {
                let mixed = SetupConfig::mix(&setup_schema(), &setup);
                tracing::info!(
                    scheduled_reports = mixed.scheduled_reports.len(),
                    "Setup updated"
                );
                self.dispatcher.set_setup(mixed);
                Vec::new()
            }
            InboundEvent::Scheduled { hook, fired_at } => {
                // Only host-stamped firings are checked; a missing stamp means "now".
                if let Some(at) = fired_at {
                    if let Err(e) = self.runner.check_firing(hook, at) {
                        match &e {
                            FiringCheckError::OffSchedule(off) => tracing::warn!(
                                next = ?off.next,
                                "Handling firing off its schedule: {}",
                                e
                            ),
                            _ => tracing::warn!("Could not check firing time: {}", e),
                        }
                    }
                }
                vec![self.on_scheduled(hook, fired_at.unwrap_or_else(Utc::now)).await]
            }
            InboundEvent::Shutdown => Vec::new(),
        }
    }

    fn prune_pending(&mut self, now: DateTime<Utc>) {
        let ttl = Duration::minutes(PENDING_TTL_MINUTES);
        self.pending_calls
            .retain(|_, (_, proposed_at)| now - *proposed_at <= ttl);
    }

    async fn on_tool_call(&mut self, call: ToolCall) -> OutboundReply {
        let call_id = call.call_id.clone();
        tracing::info!(call_id = %call_id, tool = %call.tool, op = %call.op, "Tool call");
        match self.dispatcher.dispatch(call).await {
            DispatchOutcome::Reply(content) => OutboundReply::ToolResult { call_id, content },
            DispatchOutcome::NeedsConfirmation(pending) => {
                self.prune_pending(Utc::now());
                self.pending_calls
                    .insert(pending.id.clone(), (call_id.clone(), pending.proposed_at));
                OutboundReply::confirmation_request(&call_id, &pending)
            }
        }
    }

    async fn on_confirmation(&mut self, pending_id: &str, approved: bool) -> OutboundReply {
        let call_id = self
            .pending_calls
            .remove(pending_id)
            .map(|(call_id, _)| call_id)
            .unwrap_or_else(|| pending_id.to_string());
        tracing::info!(pending_id, approved, "Confirmation received");
        match self
            .dispatcher
            .resolve(pending_id, Decision::from_approved(approved))
            .await
        {
            DispatchOutcome::Reply(content) => OutboundReply::ToolResult { call_id, content },
            DispatchOutcome::NeedsConfirmation(pending) => {
                OutboundReply::confirmation_request(&call_id, &pending)
            }
        }
    }

    async fn on_scheduled(&mut self, hook: HookKind, fired_at: DateTime<Utc>) -> OutboundReply {
        let session = self.dispatcher.session();
        let action = self
            .runner
            .fire(hook, fired_at, &session, self.dispatcher.setup())
            .await;
        match action {
            HookAction::StartExpert { expert, question } => OutboundReply::StartExpert {
                hook,
                expert: expert.to_string(),
                question: question.to_string(),
            },
            HookAction::Reports(summary) => OutboundReply::ScheduledReports {
                content: summary.to_text(),
            },
        }
    }
}
