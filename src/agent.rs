//! Agent definitions and the handoff graph.
//!
//! An agent is plain configuration: an instruction renderer, the tools it
//! may call, the guardrails that gate it, and the peers it may hand off to.
//! The [`AgentGraph`] owns every definition. Nodes are inserted first and
//! edges are added afterwards, so agents that point at each other never need
//! to exist before one another.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::TelcoContext;
use crate::error::{AgentsError, Result};
use crate::guardrail::InputGuardrail;
use crate::handoff::Handoff;
use crate::items::Message;
use crate::tool::{ToolRegistry, ToolSpec};

/// Which agent owns the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgentId {
    Dispatcher,
    Roaming,
    Purchase,
    Cancellation,
}

impl AgentId {
    pub const ALL: [AgentId; 4] = [
        AgentId::Dispatcher,
        AgentId::Roaming,
        AgentId::Purchase,
        AgentId::Cancellation,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            AgentId::Dispatcher => "Customer Service Agent",
            AgentId::Roaming => "Roaming Agent",
            AgentId::Purchase => "Purchase Agent",
            AgentId::Cancellation => "Cancellation Agent",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            AgentId::Dispatcher => "customer_service_agent",
            AgentId::Roaming => "roaming_agent",
            AgentId::Purchase => "purchase_agent",
            AgentId::Cancellation => "cancellation_agent",
        }
    }

    pub fn handoff_tool_name(&self) -> String {
        format!("transfer_to_{}", self.slug())
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Renders an agent's instructions from the current context. Must be pure.
pub type InstructionFn = Arc<dyn Fn(&TelcoContext) -> String + Send + Sync>;

/// A configured agent.
#[derive(Clone)]
pub struct AgentDefinition {
    pub id: AgentId,
    pub handoff_description: String,
    instructions: InstructionFn,
    pub tools: Vec<String>,
    pub guardrails: Vec<Arc<dyn InputGuardrail>>,
    pub handoffs: Vec<Handoff>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl AgentDefinition {
    pub fn new<F>(id: AgentId, instructions: F) -> Self
    where
        F: Fn(&TelcoContext) -> String + Send + Sync + 'static,
    {
        Self {
            id,
            handoff_description: String::new(),
            instructions: Arc::new(instructions),
            tools: Vec::new(),
            guardrails: Vec::new(),
            handoffs: Vec::new(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.id.display_name()
    }

    pub fn with_handoff_description(mut self, description: impl Into<String>) -> Self {
        self.handoff_description = description.into();
        self
    }

    pub fn with_tool(mut self, name: impl Into<String>) -> Self {
        self.tools.push(name.into());
        self
    }

    pub fn with_guardrails(mut self, guardrails: Vec<Arc<dyn InputGuardrail>>) -> Self {
        self.guardrails = guardrails;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn render_instructions(&self, ctx: &TelcoContext) -> String {
        (self.instructions)(ctx)
    }

    /// Full system prompt: rendered instructions plus tool and handoff lists.
    pub fn build_system_message(&self, ctx: &TelcoContext, registry: &ToolRegistry) -> Message {
        let mut content = self.render_instructions(ctx);

        let tools = registry.specs(&self.tools);
        if !tools.is_empty() {
            content.push_str("\n\nYou have access to the following tools:\n");
            for tool in &tools {
                content.push_str(&format!("- {}: {}\n", tool.name, tool.description));
            }
        }

        if !self.handoffs.is_empty() {
            content.push_str("\n\nYou can hand off to the following agents:\n");
            for handoff in &self.handoffs {
                content.push_str(&format!(
                    "- {}: {}\n",
                    handoff.target.display_name(),
                    handoff.description
                ));
            }
        }

        Message::system(content)
    }

    /// Tool and handoff declarations offered to the model.
    pub fn tool_specs(&self, registry: &ToolRegistry) -> Vec<ToolSpec> {
        let mut specs = registry.specs(&self.tools);
        specs.extend(self.handoffs.iter().map(Handoff::spec));
        specs
    }

    pub fn find_handoff(&self, tool_name: &str) -> Option<&Handoff> {
        self.handoffs.iter().find(|h| h.tool_name() == tool_name)
    }

    pub fn can_hand_off_to(&self, target: AgentId) -> bool {
        self.handoffs.iter().any(|h| h.target == target)
    }
}

impl fmt::Debug for AgentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentDefinition")
            .field("id", &self.id)
            .field("tools", &self.tools)
            .field(
                "guardrails",
                &self.guardrails.iter().map(|g| g.name()).collect::<Vec<_>>(),
            )
            .field(
                "handoffs",
                &self.handoffs.iter().map(|h| h.target).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// All agents plus the handoff edges between them.
#[derive(Debug, Clone)]
pub struct AgentGraph {
    hub: AgentId,
    nodes: BTreeMap<AgentId, AgentDefinition>,
}

impl AgentGraph {
    /// `hub` is the general routing agent every specialist returns to.
    pub fn new(hub: AgentId) -> Self {
        Self {
            hub,
            nodes: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, agent: AgentDefinition) -> &mut Self {
        self.nodes.insert(agent.id, agent);
        self
    }

    pub fn get(&self, id: AgentId) -> Result<&AgentDefinition> {
        self.nodes.get(&id).ok_or_else(|| AgentsError::HandoffError {
            message: format!("no agent registered for {id}"),
        })
    }

    /// Apply shared sampling settings to every agent.
    pub fn set_sampling(&mut self, temperature: Option<f32>, max_tokens: Option<u32>) {
        for agent in self.nodes.values_mut() {
            agent.temperature = temperature;
            agent.max_tokens = max_tokens;
        }
    }

    /// Add an edge `from -> to`, described by the target's handoff description.
    pub fn connect(&mut self, from: AgentId, to: AgentId) -> Result<&mut Self> {
        let description = self.get(to)?.handoff_description.clone();
        let node = self
            .nodes
            .get_mut(&from)
            .ok_or_else(|| AgentsError::HandoffError {
                message: format!("no agent registered for {from}"),
            })?;
        if !node.can_hand_off_to(to) {
            node.handoffs.push(Handoff::new(to, description));
        }
        Ok(self)
    }

    /// Give every agent the hub can reach an edge back to the hub.
    pub fn wire_back_edges(&mut self) -> Result<&mut Self> {
        let hub = self.hub;
        let targets: Vec<AgentId> = self.get(hub)?.handoffs.iter().map(|h| h.target).collect();
        for target in targets {
            self.connect(target, hub)?;
        }
        Ok(self)
    }

    /// Targets reachable in one hop.
    pub fn neighbours(&self, id: AgentId) -> Vec<AgentId> {
        self.nodes
            .get(&id)
            .map(|a| a.handoffs.iter().map(|h| h.target).collect())
            .unwrap_or_default()
    }

    /// Check graph shape and tool wiring before serving any turn.
    pub fn validate(&self, registry: &ToolRegistry) -> Result<()> {
        let hub = self.get(self.hub)?;
        let config_err = |msg: String| -> Result<()> { Err(AgentsError::Configuration(msg)) };

        for agent in self.nodes.values() {
            for handoff in &agent.handoffs {
                if !self.nodes.contains_key(&handoff.target) {
                    return config_err(format!(
                        "{} hands off to unregistered {}",
                        agent.id, handoff.target
                    ));
                }
                if agent.id != self.hub && handoff.target != self.hub {
                    return config_err(format!(
                        "{} may only hand off to {}, not {}",
                        agent.id, self.hub, handoff.target
                    ));
                }
            }
            if agent.id != self.hub {
                if !hub.can_hand_off_to(agent.id) {
                    return config_err(format!("{} is unreachable from {}", agent.id, self.hub));
                }
                if !agent.can_hand_off_to(self.hub) {
                    return config_err(format!("{} has no way back to {}", agent.id, self.hub));
                }
            }
            for tool in &agent.tools {
                if !registry.contains(tool) {
                    return config_err(format!("{} lists unregistered tool '{tool}'", agent.id));
                }
                if !registry.is_permitted(tool, agent.id) {
                    return config_err(format!("{} is not permitted to call '{tool}'", agent.id));
                }
            }
        }
        Ok(())
    }
}
