//! The per-call state machine.
//!
//! ```text
//! Active --(user goodbye | agent turn after booking)--> Completing --(one write)--> Closed
//! ```
//!
//! A session is constructed for exactly one call and never shared. Events are
//! handled one at a time through `&mut self`, so a transition always observes
//! the transcript including the turn that triggered it. The write to the
//! record store is guarded by the state itself: only the `Active` state can
//! enter `Completing`, so two triggers in the same turn window still produce a
//! single write.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::adapters::RecordStore;
use crate::domain::{
    CallRecord, Directive, EndReason, PatientRecord, SessionState, Speaker, ToolCall,
    TranscriptLog, TurnEvent, UNSET,
};

use super::prompts;
use super::tools::{IntakeToolset, ToolError, ToolOutput};

/// Errors surfaced to the conversation driver
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Call session is closed")]
    Closed,

    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// What handling one event produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Instructions for the driver, in order
    pub directives: Vec<Directive>,

    /// Result to hand back to the model, for tool events
    pub tool_output: Option<ToolOutput>,
}

impl TurnOutcome {
    fn directives(directives: Vec<Directive>) -> Self {
        Self {
            directives,
            tool_output: None,
        }
    }

    fn tool(output: ToolOutput) -> Self {
        Self {
            directives: Vec::new(),
            tool_output: Some(output),
        }
    }

    /// True when the driver was told to disconnect
    pub fn ends_call(&self) -> bool {
        self.directives.contains(&Directive::EndCall)
    }
}

/// One call: transcript, intake tools and lifecycle
pub struct CallSession {
    call_id: String,
    state: SessionState,
    last_speaker: Option<Speaker>,
    transcript: TranscriptLog,
    tools: IntakeToolset,
    store: Arc<dyn RecordStore>,
    end_reason: Option<EndReason>,
}

impl CallSession {
    /// Create a session in the `Active` state
    pub fn new(tools: IntakeToolset, store: Arc<dyn RecordStore>) -> Self {
        Self {
            call_id: UNSET.to_string(),
            state: SessionState::Active,
            last_speaker: None,
            transcript: TranscriptLog::new(),
            tools,
            store,
            end_reason: None,
        }
    }

    /// Set the identifier from the transport session once it is known
    pub fn assign_call_id(&mut self, call_id: impl Into<String>) {
        self.call_id = call_id.into();
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    pub fn transcript(&self) -> &TranscriptLog {
        &self.transcript
    }

    /// Current intake data, always the toolset's latest full record
    pub fn patient(&self) -> &PatientRecord {
        self.tools.patient()
    }

    pub fn last_speaker(&self) -> Option<Speaker> {
        self.last_speaker
    }

    pub fn is_call_complete(&self) -> bool {
        self.tools.is_call_complete()
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    /// Directives to open the call with
    pub fn start(&self) -> Vec<Directive> {
        vec![Directive::speak(prompts::greeting(self.tools.office()))]
    }

    /// Route one event to its handler
    pub async fn handle(&mut self, event: TurnEvent) -> Result<TurnOutcome, SessionError> {
        match event {
            TurnEvent::User { text } => Ok(TurnOutcome::directives(self.on_user_turn(&text).await)),
            TurnEvent::Agent { text } => Ok(TurnOutcome::directives(self.on_agent_turn(&text).await)),
            TurnEvent::Tool { call } => self.on_tool_call(call).await.map(TurnOutcome::tool),
        }
    }

    /// The caller finished an utterance
    #[instrument(skip(self, text), fields(call_id = %self.call_id))]
    pub async fn on_user_turn(&mut self, text: &str) -> Vec<Directive> {
        if self.is_closed() {
            debug!("Ignoring user turn after close");
            return Vec::new();
        }

        self.transcript.append(Speaker::User, text);
        self.last_speaker = Some(Speaker::User);
        info!(speaker = %Speaker::User, text, "User said");

        if self.tools.is_goodbye(text) {
            self.tools.mark_complete();
            return self.complete(EndReason::Goodbye).await;
        }

        Vec::new()
    }

    /// The assistant finished speaking
    #[instrument(skip(self, text), fields(call_id = %self.call_id))]
    pub async fn on_agent_turn(&mut self, text: &str) -> Vec<Directive> {
        if self.is_closed() {
            debug!("Ignoring agent turn after close");
            return Vec::new();
        }

        self.transcript.append(Speaker::Agent, text);
        self.last_speaker = Some(Speaker::Agent);
        info!(speaker = %Speaker::Agent, text, "Agent said");

        if self.tools.is_call_complete() {
            return self.complete(EndReason::Booked).await;
        }

        Vec::new()
    }

    /// The model invoked a tool. Completes before the next event is handled.
    #[instrument(skip(self, call), fields(call_id = %self.call_id, tool = call.name()))]
    pub async fn on_tool_call(&mut self, call: ToolCall) -> Result<ToolOutput, SessionError> {
        if self.is_closed() {
            warn!("Tool call after close");
            return Err(SessionError::Closed);
        }

        info!("Invoking tool");
        Ok(self.tools.invoke(call).await)
    }

    /// The event stream ended.
    ///
    /// A call that was already booked still gets its single write; any
    /// other unfinished call leaves nothing behind.
    #[instrument(skip(self), fields(call_id = %self.call_id))]
    pub async fn finish(&mut self) -> Vec<Directive> {
        if self.is_closed() || !self.tools.is_call_complete() {
            return Vec::new();
        }

        info!("Event stream ended after booking");
        self.complete(EndReason::Booked).await
    }

    /// Active -> Completing -> Closed, at most once per session
    async fn complete(&mut self, reason: EndReason) -> Vec<Directive> {
        if self.state != SessionState::Active {
            return Vec::new();
        }
        self.state = SessionState::Completing;
        self.end_reason = Some(reason);

        self.persist().await;
        self.state = SessionState::Closed;

        match reason {
            EndReason::Goodbye => {
                info!("Call ended: user initiated goodbye");
                vec![
                    Directive::speak(prompts::closing(self.tools.office())),
                    Directive::EndCall,
                ]
            }
            EndReason::Booked => {
                info!("Disconnecting call after completion");
                vec![Directive::EndCall]
            }
        }
    }

    /// Single write of the finished call. Failures are logged, never retried.
    async fn persist(&self) {
        let record = CallRecord::snapshot(
            &self.call_id,
            self.last_speaker,
            &self.transcript,
            self.tools.patient(),
        );

        match self.store.insert_call_record(&record).await {
            Ok(()) => info!(store = self.store.name(), turns = self.transcript.len(), "Call record saved"),
            Err(e) => error!(store = self.store.name(), error = %e, "Failed to save call record"),
        }
    }
}
