//! The sequential pipeline orchestrator driving the five discussion stages.
//!
//! A [`RoundTable`] owns the dialog context and the pipeline state; its own
//! handlers are the only mutators. Session callbacks receive the orchestrator
//! through an `Arc`, so completion handlers always observe the freshly stored
//! context rather than a stale snapshot — the next stage is scheduled only
//! after the previous stage's contribution is recorded, never on a timer.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{info, warn};

use crate::config::{provider_for, DiscussionConfig};
use crate::context::DialogContext;
use crate::error::GuardError;
use crate::prompts::synthesize_user_prompt;
use crate::session::{SessionHandle, StreamSession};
use crate::transport::{RequestSpec, StreamTransport};
use crate::types::message::Message;
use crate::types::stage::Stage;
use crate::{Error, Result};

/// Where the pipeline currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    Idle,
    Stage(Stage),
    Complete,
}

/// Read-only projection of the pipeline position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineState {
    pub phase: PipelinePhase,
    pub is_processing: bool,
}

/// Describes the last stage failure, for user-triggered retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestStatus {
    pub stage: Stage,
    pub can_retry: bool,
}

/// Receives orchestrator output. Chunk events are keyed by
/// `(stage, stream_id)` so repeated chunks for one stream update a single
/// display entry instead of duplicating it.
pub trait DiscussionSink: Send + Sync {
    fn on_chunk(&self, stage: Stage, delta: &str, stream_id: &str);
    fn on_stage_complete(&self, stage: Stage, full_text: &str);
    fn on_stage_error(&self, stage: Stage, message: &str, can_retry: bool);
    fn on_discussion_complete(&self) {}
}

/// Orchestrator for one round-table discussion. Cloning yields another
/// handle to the same discussion.
#[derive(Clone)]
pub struct RoundTable {
    inner: Arc<Inner>,
}

struct Inner {
    config: DiscussionConfig,
    session: StreamSession,
    sink: Arc<dyn DiscussionSink>,
    flow: Mutex<FlowState>,
}

struct FlowState {
    phase: PipelinePhase,
    is_processing: bool,
    context: Option<DialogContext>,
    status: Option<RequestStatus>,
    active: Option<SessionHandle>,
    /// Monotonic attempt counter; stale session callbacks (from a cancelled
    /// or superseded attempt) compare against it and drop out.
    attempt: u64,
}

impl RoundTable {
    pub fn new(
        config: DiscussionConfig,
        transport: Arc<dyn StreamTransport>,
        sink: Arc<dyn DiscussionSink>,
    ) -> Self {
        let session = StreamSession::new(transport, config.session.clone());
        Self {
            inner: Arc::new(Inner {
                config,
                session,
                sink,
                flow: Mutex::new(FlowState {
                    phase: PipelinePhase::Idle,
                    is_processing: false,
                    context: None,
                    status: None,
                    active: None,
                    attempt: 0,
                }),
            }),
        }
    }

    /// Begin a discussion on `topic`, entering the guide stage.
    pub fn start(&self, topic: &str) -> Result<()> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(GuardError::EmptyTopic.into());
        }
        {
            let mut flow = self.inner.lock_flow();
            if flow.context.is_some() && flow.phase != PipelinePhase::Idle {
                return Err(GuardError::AlreadyStarted.into());
            }
            if flow.is_processing {
                return Err(GuardError::AlreadyProcessing.into());
            }
            flow.context = Some(DialogContext::new(topic));
        }
        Inner::start_stage(&self.inner, Stage::Guide)
    }

    /// Re-invoke exactly the failed stage, keeping earlier contributions.
    pub fn retry(&self) -> Result<()> {
        let stage = {
            let flow = self.inner.lock_flow();
            if flow.is_processing {
                return Err(GuardError::AlreadyProcessing.into());
            }
            flow.status.ok_or(GuardError::NothingToRetry)?.stage
        };
        Inner::start_stage(&self.inner, stage)
    }

    /// Cancel any in-flight session, reset the pipeline to idle and the
    /// context to the topic alone, then re-enter the guide stage.
    pub fn restart(&self) -> Result<()> {
        let handle = {
            let mut flow = self.inner.lock_flow();
            if flow.context.is_none() {
                return Err(GuardError::NotStarted.into());
            }
            flow.attempt += 1;
            flow.phase = PipelinePhase::Idle;
            flow.is_processing = false;
            flow.status = None;
            if let Some(ctx) = flow.context.as_mut() {
                ctx.reset();
            }
            flow.active.take()
        };
        // Cancel outside the lock: the session's delivery gate may be waiting
        // on a completion handler that needs the flow lock.
        if let Some(handle) = handle {
            handle.cancel();
        }
        Inner::start_stage(&self.inner, Stage::Guide)
    }

    /// Cancel the current stream. Not an error: no stage callback fires, and
    /// the pipeline stays at its current position with processing cleared.
    pub fn cancel(&self) {
        let handle = {
            let mut flow = self.inner.lock_flow();
            flow.attempt += 1;
            flow.is_processing = false;
            flow.active.take()
        };
        if let Some(handle) = handle {
            handle.cancel();
        }
    }

    pub fn state(&self) -> PipelineState {
        let flow = self.inner.lock_flow();
        PipelineState {
            phase: flow.phase,
            is_processing: flow.is_processing,
        }
    }

    pub fn status(&self) -> Option<RequestStatus> {
        self.inner.lock_flow().status
    }

    pub fn topic(&self) -> Option<String> {
        let flow = self.inner.lock_flow();
        flow.context.as_ref().map(|c| c.user_q().to_string())
    }

    /// The recorded contribution of a completed stage.
    pub fn contribution(&self, stage: Stage) -> Option<String> {
        let flow = self.inner.lock_flow();
        flow.context
            .as_ref()
            .and_then(|c| c.content(stage))
            .map(str::to_string)
    }
}

impl Inner {
    fn lock_flow(&self) -> MutexGuard<'_, FlowState> {
        self.flow.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Validate the stage guards, build the request, and open the session.
    /// Guard failures are synchronous and never touch the network.
    fn start_stage(inner: &Arc<Inner>, stage: Stage) -> Result<()> {
        let (spec, attempt) = {
            let mut flow = inner.lock_flow();
            if flow.is_processing {
                return Err(GuardError::AlreadyProcessing.into());
            }
            let ctx = flow.context.as_ref().ok_or(GuardError::NotStarted)?;
            if ctx.user_q().trim().is_empty() {
                return Err(GuardError::EmptyTopic.into());
            }
            if let Some(missing) = ctx.first_missing_before(stage) {
                return Err(GuardError::MissingContext { stage, missing }.into());
            }
            if ctx.content(stage).is_some() {
                return Err(GuardError::AlreadyRecorded { stage }.into());
            }

            let provider = provider_for(stage);
            let endpoint = inner.config.endpoint(provider);
            let messages = vec![
                Message::system(inner.config.prompts.system_prompt(stage)),
                Message::user(synthesize_user_prompt(stage, ctx)),
            ];
            let body = endpoint.chat_body(&messages)?;
            let spec = RequestSpec {
                provider,
                base_url: endpoint.base_url,
                api_key: endpoint.api_key,
                body,
            };

            flow.is_processing = true;
            flow.phase = PipelinePhase::Stage(stage);
            flow.status = None;
            flow.attempt += 1;
            (spec, flow.attempt)
        };

        info!(stage = ?stage, provider = spec.provider.id(), "starting stage");

        let on_chunk = {
            let sink = inner.sink.clone();
            move |delta: &str, stream_id: &str| sink.on_chunk(stage, delta, stream_id)
        };
        let on_complete = {
            let inner = inner.clone();
            move |full_text: String| Inner::finish_stage(inner, stage, attempt, full_text)
        };
        let on_error = {
            let inner = inner.clone();
            move |err: Error| Inner::fail_stage(inner, stage, attempt, err)
        };

        let handle = inner.session.open(spec, on_chunk, on_complete, on_error);

        let mut flow = inner.lock_flow();
        if flow.attempt == attempt {
            flow.active = Some(handle);
        }
        Ok(())
    }

    /// Stage success: record the contribution, then — with the write
    /// confirmed under the same lock — schedule the next stage.
    fn finish_stage(inner: Arc<Inner>, stage: Stage, attempt: u64, full_text: String) {
        let next = {
            let mut flow = inner.lock_flow();
            if flow.attempt != attempt {
                return;
            }
            flow.is_processing = false;
            flow.active = None;

            let Some(ctx) = flow.context.as_mut() else {
                return;
            };
            if let Err(err) = ctx.record(stage, &full_text) {
                warn!(stage = ?stage, error = %err, "dropping duplicate completion");
                return;
            }
            match stage.next() {
                Some(next) => Some(next),
                None => {
                    flow.phase = PipelinePhase::Complete;
                    None
                }
            }
        };

        info!(stage = ?stage, chars = full_text.len(), "stage complete");
        inner.sink.on_stage_complete(stage, &full_text);

        match next {
            Some(next) => match inner.config.settle_delay {
                Some(delay) => {
                    let inner = inner.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        Inner::advance(&inner, next);
                    });
                }
                None => Inner::advance(&inner, next),
            },
            None => inner.sink.on_discussion_complete(),
        }
    }

    /// Start the next stage from a completion handler. A guard failure here
    /// means the pipeline is inconsistent; it surfaces through the sink and
    /// stops forward progress.
    fn advance(inner: &Arc<Inner>, stage: Stage) {
        if let Err(err) = Inner::start_stage(inner, stage) {
            let can_retry = err.can_retry();
            {
                let mut flow = inner.lock_flow();
                flow.status = Some(RequestStatus { stage, can_retry });
            }
            warn!(stage = ?stage, error = %err, "failed to advance pipeline");
            inner.sink.on_stage_error(stage, &err.to_string(), can_retry);
        }
    }

    /// Stage failure: the pipeline stays at the failed index; the status is
    /// populated and no automatic cross-stage action is taken.
    fn fail_stage(inner: Arc<Inner>, stage: Stage, attempt: u64, err: Error) {
        let can_retry = err.can_retry();
        {
            let mut flow = inner.lock_flow();
            if flow.attempt != attempt {
                return;
            }
            flow.is_processing = false;
            flow.active = None;
            flow.status = Some(RequestStatus { stage, can_retry });
        }
        warn!(stage = ?stage, error = %err, can_retry, "stage failed");
        inner.sink.on_stage_error(stage, &err.to_string(), can_retry);
    }
}
