//! Per-conversation state.
//!
//! A session is owned by whoever drives it and handed to the runner by
//! `&mut` for each turn, so one conversation is never processed twice at
//! once. Sessions share nothing with each other.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::AgentId;
use crate::context::TelcoContext;
use crate::items::Message;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSession {
    id: Uuid,
    pub(crate) active_agent: AgentId,
    pub(crate) context: TelcoContext,
    pub(crate) transcript: Vec<Message>,
    created_at: DateTime<Utc>,
}

impl ConversationSession {
    /// Fresh session owned by the dispatcher with an empty context.
    pub fn new() -> Self {
        Self::with_context(TelcoContext::new())
    }

    /// Fresh session with a synthetic phone number.
    pub fn demo() -> Self {
        Self::with_context(TelcoContext::demo())
    }

    pub fn with_context(context: TelcoContext) -> Self {
        Self {
            id: Uuid::new_v4(),
            active_agent: AgentId::Dispatcher,
            context,
            transcript: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn active_agent(&self) -> AgentId {
        self.active_agent
    }

    pub fn context(&self) -> &TelcoContext {
        &self.context
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new()
    }
}
