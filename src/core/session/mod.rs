//! Conversation coordination.
//!
//! A [`ChatSession`] owns one conversation: the ordered history, the backend
//! session id and the active agent. It runs at most one exchange at a time,
//! pulling events from the transport and folding them through the reducer.
//!
//! Every reset (agent switch or new conversation) bumps a generation
//! counter; an exchange that observes a different generation stops touching
//! state and reports [`ExchangeOutcome::Superseded`].

mod message;

use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::Notify;

pub use message::{ChatMessage, UserMessage};

use super::agentos::{RunRequest, RunTransport};
use super::new_message_id;
use super::stream::{AssistantMessage, Reducer};
use super::{Error, Result};

/// How an exchange ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeOutcome {
    /// The run finished; this is the final message.
    Completed(AssistantMessage),
    /// The exchange was cancelled and its partial reply removed.
    Cancelled,
    /// The conversation was reset while the exchange was running.
    Superseded,
}

struct InFlight {
    message_id: String,
    cancel: Arc<Notify>,
}

struct SessionState {
    agent_id: String,
    session_id: Option<String>,
    history: Vec<ChatMessage>,
    in_flight: Option<InFlight>,
    generation: u64,
}

impl SessionState {
    fn reset(&mut self) {
        self.generation += 1;
        self.history.clear();
        self.session_id = None;
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.cancel.notify_one();
        }
    }

    fn replace_assistant(&mut self, message: &AssistantMessage) {
        if let Some(slot) = self.history.iter_mut().rev().find(|m| m.id() == message.id) {
            *slot = ChatMessage::Assistant(message.clone());
        }
    }

    fn remove(&mut self, message_id: &str) {
        self.history.retain(|m| m.id() != message_id);
    }
}

struct Inner {
    transport: Arc<dyn RunTransport>,
    reducer: Reducer,
    user_id: Option<String>,
    state: Mutex<SessionState>,
}

/// One conversation with an agent. Clones share the same conversation.
#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<Inner>,
}

impl ChatSession {
    /// Start an empty conversation with `agent_id`.
    pub fn new(
        transport: Arc<dyn RunTransport>,
        agent_id: impl Into<String>,
        reducer: Reducer,
        user_id: Option<String>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                reducer,
                user_id,
                state: Mutex::new(SessionState {
                    agent_id: agent_id.into(),
                    session_id: None,
                    history: Vec::new(),
                    in_flight: None,
                    generation: 0,
                }),
            }),
        }
    }

    /// Active agent.
    #[must_use]
    pub fn agent_id(&self) -> String {
        self.inner.state.lock().agent_id.clone()
    }

    /// Backend session id, once the backend has assigned one.
    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        self.inner.state.lock().session_id.clone()
    }

    /// Snapshot of the conversation.
    #[must_use]
    pub fn history(&self) -> Vec<ChatMessage> {
        self.inner.state.lock().history.clone()
    }

    /// Whether an exchange is running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.inner.state.lock().in_flight.is_some()
    }

    /// Switch agents. History and session id are dropped, even mid-exchange.
    pub fn switch_agent(&self, agent_id: impl Into<String>) {
        let agent_id = agent_id.into();
        let mut state = self.inner.state.lock();
        tracing::info!(from = %state.agent_id, to = %agent_id, "switching agent");
        state.reset();
        state.agent_id = agent_id;
    }

    /// Forget the conversation and start a fresh backend session.
    pub fn new_conversation(&self) {
        self.inner.state.lock().reset();
        tracing::info!("started new conversation");
    }

    /// Abort the running exchange. Returns `false` if none is running.
    pub fn cancel(&self) -> bool {
        let state = self.inner.state.lock();
        match &state.in_flight {
            Some(in_flight) => {
                tracing::info!(message_id = %in_flight.message_id, "cancelling exchange");
                in_flight.cancel.notify_one();
                true
            }
            None => false,
        }
    }

    /// Send `text` and stream the reply.
    ///
    /// `on_update` sees the assistant message after every applied event.
    ///
    /// # Errors
    ///
    /// [`Error::ExchangeInFlight`] while another exchange runs; transport and
    /// API errors otherwise. On error the partial reply is removed from the
    /// history; the user message stays.
    pub async fn submit<F>(&self, text: &str, mut on_update: F) -> Result<ExchangeOutcome>
    where
        F: FnMut(&AssistantMessage) + Send,
    {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Validation("message is empty".to_string()));
        }

        let message_id = new_message_id();
        let cancel = Arc::new(Notify::new());
        let (request, generation) = {
            let mut state = self.inner.state.lock();
            if state.in_flight.is_some() {
                return Err(Error::ExchangeInFlight);
            }

            state.history.push(ChatMessage::user(text));
            state
                .history
                .push(ChatMessage::Assistant(AssistantMessage::new(&message_id)));
            state.in_flight = Some(InFlight {
                message_id: message_id.clone(),
                cancel: Arc::clone(&cancel),
            });

            let request = RunRequest {
                agent_id: state.agent_id.clone(),
                message: text.to_string(),
                session_id: state.session_id.clone(),
                user_id: self.inner.user_id.clone(),
            };
            (request, state.generation)
        };

        tracing::info!(
            agent_id = %request.agent_id,
            message_id = %message_id,
            resumed = request.session_id.is_some(),
            "submitting message"
        );

        let opened = tokio::select! {
            biased;
            () = cancel.notified() => return Ok(self.abandon(generation, &message_id)),
            opened = self.inner.transport.open_run(&request) => opened,
        };

        let mut events = match opened {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(error = %e, "failed to open run");
                self.discard(generation, &message_id);
                return Err(e);
            }
        };

        let mut message = AssistantMessage::new(message_id.clone());
        loop {
            let next = tokio::select! {
                biased;
                () = cancel.notified() => None,
                next = events.next() => Some(next),
            };

            // Dropping the stream closes the transport
            let Some(next) = next else {
                drop(events);
                return Ok(self.abandon(generation, &message_id));
            };

            match next {
                Some(Ok(envelope)) => {
                    message = self.inner.reducer.apply(Some(message), &envelope);
                    {
                        let mut state = self.inner.state.lock();
                        if state.generation != generation {
                            return Ok(ExchangeOutcome::Superseded);
                        }
                        if let (None, Some(session_id)) = (&state.session_id, &envelope.session_id) {
                            tracing::debug!(session_id = %session_id, "backend assigned session");
                            state.session_id = Some(session_id.clone());
                        }
                        state.replace_assistant(&message);
                    }
                    on_update(&message);
                    if message.complete {
                        break;
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "run stream failed");
                    self.discard(generation, &message_id);
                    return Err(e);
                }
                None => {
                    tracing::debug!("run stream closed without a terminal event");
                    message.complete = true;
                    on_update(&message);
                    break;
                }
            }
        }

        let mut state = self.inner.state.lock();
        if state.generation != generation {
            return Ok(ExchangeOutcome::Superseded);
        }
        state.replace_assistant(&message);
        state.in_flight = None;
        drop(state);

        tracing::info!(
            message_id = %message.id,
            tool_calls = message.tool_calls.len(),
            citations = message.citations.as_ref().map_or(0, Vec::len),
            "exchange completed"
        );
        Ok(ExchangeOutcome::Completed(message))
    }

    /// Stop an exchange after cancellation or reset.
    fn abandon(&self, generation: u64, message_id: &str) -> ExchangeOutcome {
        let mut state = self.inner.state.lock();
        if state.generation != generation {
            return ExchangeOutcome::Superseded;
        }
        state.remove(message_id);
        state.in_flight = None;
        ExchangeOutcome::Cancelled
    }

    /// Drop the partial reply of a failed exchange.
    fn discard(&self, generation: u64, message_id: &str) {
        let mut state = self.inner.state.lock();
        if state.generation == generation {
            state.remove(message_id);
            state.in_flight = None;
        }
    }
}
