//! # Agent handoffs
//!
//! A handoff moves "active agent" status from one agent to a peer. Each edge
//! of the agent graph is offered to the model as a tool named after the
//! target (`transfer_to_roaming_agent`); calling that tool is how the model
//! hands off. [`HandoffData`] is what the runner records when it happens.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::AgentId;
use crate::tool::{schema_of, ToolSpec};

/// Shared preamble for every agent that takes part in handoffs.
pub const HANDOFF_PROMPT_PREFIX: &str = "# System context\n\
You are part of a multi-agent system designed to make agent coordination and execution easy. \
Agents use two primary abstractions: **Agents** and **Handoffs**. An agent encompasses \
instructions and tools and can hand off a conversation to another agent when appropriate. \
Handoffs are achieved by calling a handoff function, generally named `transfer_to_<agent_name>`. \
Transfers between agents are handled seamlessly in the background; do not mention or draw \
attention to these transfers in your conversation with the user.\n";

/// A directed edge of the agent graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handoff {
    pub target: AgentId,
    pub description: String,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
struct HandoffArgs {
    /// Why the conversation is being transferred.
    #[serde(default)]
    reason: Option<String>,
}

impl Handoff {
    pub fn new(target: AgentId, description: impl Into<String>) -> Self {
        Self {
            target,
            description: description.into(),
        }
    }

    pub fn tool_name(&self) -> String {
        self.target.handoff_tool_name()
    }

    /// Declaration offered to the model alongside regular tools.
    pub fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.tool_name(),
            description: format!(
                "Handoff to the {} to handle the request. {}",
                self.target.display_name(),
                self.description
            ),
            parameters: schema_of::<HandoffArgs>(),
        }
    }

    /// Record of this edge being taken with the model's arguments.
    pub fn accept(&self, from: AgentId, arguments: &Value) -> HandoffData {
        let reason = serde_json::from_value::<HandoffArgs>(arguments.clone())
            .unwrap_or_default()
            .reason
            .filter(|r| !r.trim().is_empty());
        HandoffData {
            from_agent: from,
            to_agent: self.target,
            reason,
        }
    }
}

/// A handoff that took place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffData {
    pub from_agent: AgentId,
    pub to_agent: AgentId,
    pub reason: Option<String>,
}

impl HandoffData {
    /// Tool output acknowledging the transfer.
    pub fn ack(&self) -> Value {
        serde_json::json!({ "assistant": self.to_agent.display_name() })
    }
}
