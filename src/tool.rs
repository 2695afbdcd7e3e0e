//! Tool declaration and dispatch.
//!
//! A [`Tool`] is a side-effecting operation an agent may invoke. The
//! [`ToolRegistry`] records which agents may call which tool, and turns the
//! registered tools into a [`ToolRouter`]: a tower [`Service`] that takes an
//! owned copy of the conversation context, runs the selected tool against it,
//! and hands the (possibly mutated) copy back. Callers commit the returned
//! context only when the call succeeds.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tower::util::BoxCloneService;
use tower::{BoxError, Service};

use crate::agent::AgentId;
use crate::context::TelcoContext;
use crate::error::{AgentsError, Collaborator, Result};
use crate::items::ToolCall;

/// State a tool touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    CustomerName,
    PhoneNumber,
    RoamingPlan,
    RecordStore,
    CoverageMap,
    FaqIndex,
}

/// Declared read/write footprint of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolEffects {
    pub reads: &'static [Field],
    pub writes: &'static [Field],
}

impl ToolEffects {
    pub fn mutates_context(&self) -> bool {
        self.writes.iter().any(|f| {
            matches!(
                f,
                Field::CustomerName | Field::PhoneNumber | Field::RoamingPlan
            )
        })
    }

    /// External system this tool blocks on, if any.
    pub fn collaborator(&self) -> Option<Collaborator> {
        let touches = |field| self.reads.contains(&field) || self.writes.contains(&field);
        if touches(Field::RecordStore) {
            Some(Collaborator::RecordStore)
        } else if touches(Field::FaqIndex) {
            Some(Collaborator::SimilaritySearch)
        } else {
            None
        }
    }
}

/// Function declaration handed to the language model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A callable side-effecting operation.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;
    fn effects(&self) -> ToolEffects;

    /// Run the tool. A precondition failure must leave `ctx` untouched.
    async fn call(&self, ctx: &mut TelcoContext, args: Value) -> Result<Value>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// JSON schema for a typed argument struct.
pub fn schema_of<A: JsonSchema>() -> Value {
    let schema = schemars::schema_for!(A);
    serde_json::to_value(schema.schema).unwrap_or_else(|_| json!({ "type": "object" }))
}

/// Decode tool arguments; a missing or blank payload is read as `{}`.
pub fn parse_args<A: DeserializeOwned>(tool: &str, args: Value) -> Result<A> {
    let args = match args {
        Value::Null => json!({}),
        Value::String(s) if s.trim().is_empty() => json!({}),
        args => args,
    };
    serde_json::from_value(args).map_err(|e| AgentsError::InvalidToolArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

/// One routed tool invocation.
#[derive(Debug, Clone)]
pub struct ToolRequest {
    pub call: ToolCall,
    pub agent: AgentId,
    /// Scratch copy of the session context.
    pub context: TelcoContext,
}

#[derive(Debug, Clone)]
pub struct ToolResponse {
    pub call_id: String,
    pub context: TelcoContext,
    pub output: Value,
}

/// Boxed tool service type alias.
pub type ToolSvc = BoxCloneService<ToolRequest, ToolResponse, BoxError>;

fn tool_service(tool: Arc<dyn Tool>) -> ToolSvc {
    BoxCloneService::new(tower::service_fn(move |req: ToolRequest| {
        let tool = tool.clone();
        async move {
            let ToolRequest {
                call, mut context, ..
            } = req;
            let output = tool.call(&mut context, call.arguments).await?;
            Ok::<_, BoxError>(ToolResponse {
                call_id: call.id,
                context,
                output,
            })
        }
    }))
}

struct Registered {
    tool: Arc<dyn Tool>,
    agents: Vec<AgentId>,
}

/// Every tool the desk knows about, with the agents permitted to call it.
#[derive(Default)]
pub struct ToolRegistry {
    entries: Vec<Registered>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Re-registering a name replaces the earlier entry.
    pub fn register(&mut self, tool: Arc<dyn Tool>, agents: &[AgentId]) -> &mut Self {
        self.entries.retain(|r| r.tool.name() != tool.name());
        self.entries.push(Registered {
            tool,
            agents: agents.to_vec(),
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.entries
            .iter()
            .find(|r| r.tool.name() == name)
            .map(|r| &r.tool)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn is_permitted(&self, name: &str, agent: AgentId) -> bool {
        self.entries
            .iter()
            .any(|r| r.tool.name() == name && r.agents.contains(&agent))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|r| r.tool.name()).collect()
    }

    /// Declarations for the named tools, in the given order.
    pub fn specs(&self, names: &[String]) -> Vec<ToolSpec> {
        names
            .iter()
            .filter_map(|n| self.get(n))
            .map(|t| t.spec())
            .collect()
    }

    pub fn collaborator_for(&self, name: &str) -> Option<Collaborator> {
        self.get(name).and_then(|t| t.effects().collaborator())
    }

    pub fn router(&self) -> ToolRouter {
        let unknown = BoxCloneService::new(tower::service_fn(|req: ToolRequest| async move {
            Err::<ToolResponse, BoxError>(Box::new(AgentsError::UnknownTool {
                tool: req.call.name,
            }))
        }));

        let mut services: Vec<ToolSvc> = vec![unknown];
        let mut name_to_index = HashMap::new();
        let mut permissions = HashMap::new();
        for (i, r) in self.entries.iter().enumerate() {
            name_to_index.insert(r.tool.name().to_string(), i + 1);
            permissions.insert(r.tool.name().to_string(), r.agents.clone());
            services.push(tool_service(r.tool.clone()));
        }

        ToolRouter {
            name_to_index: Arc::new(name_to_index),
            permissions: Arc::new(permissions),
            services,
        }
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

/// Router service over registered tools using a name to index table.
#[derive(Clone)]
pub struct ToolRouter {
    name_to_index: Arc<HashMap<String, usize>>,
    permissions: Arc<HashMap<String, Vec<AgentId>>>,
    services: Vec<ToolSvc>, // index 0 is the unknown-tool fallback
}

impl Service<ToolRequest> for ToolRouter {
    type Response = ToolResponse;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ToolRequest) -> Self::Future {
        let idx = self
            .name_to_index
            .get(req.call.name.as_str())
            .copied()
            .unwrap_or(0);

        if idx != 0 {
            let permitted = self
                .permissions
                .get(req.call.name.as_str())
                .is_some_and(|agents| agents.contains(&req.agent));
            if !permitted {
                let err = AgentsError::ToolNotPermitted {
                    tool: req.call.name.clone(),
                    agent: req.agent.display_name().to_string(),
                };
                return Box::pin(async move { Err::<ToolResponse, BoxError>(Box::new(err)) });
            }
        }

        Box::pin(self.services[idx].call(req))
    }
}
