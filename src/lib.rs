//! # telco-desk
//!
//! A customer-service desk for a mobile operator, built as a small
//! multi-agent system. A dispatcher ("Customer Service Agent") captures the
//! caller's identity and hands the conversation to one of three specialists:
//! roaming recommendations and FAQ, plan purchase, and plan cancellation.
//! Specialists always hand back to the dispatcher.
//!
//! ## Core Concepts
//!
//! - **Agents**: definitions with context-rendered instructions, permitted tools
//!   and handoff edges, arranged in an [`AgentGraph`]
//! - **Tools**: typed functions behind a tower router; they read and update the
//!   session's [`TelcoContext`]
//! - **Guardrails**: relevance and jailbreak checks run on every user message
//!   before the active agent sees it
//! - **Runner**: drives one turn of a [`ConversationSession`]
//!
//! ## Getting Started
//!
//! Set your OpenAI API key in the `OPENAI_API_KEY` environment variable.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use telco_desk::{
//!     agent_graph, default_guardrails, tool_registry, Collaborators, ConversationSession,
//!     CoverageMap, EmbeddingFaqIndex, OpenAIEmbedder, OpenAIProvider, Runner, SqlitePlanStore,
//! };
//!
//! # async fn example() -> telco_desk::Result<()> {
//! let faqs = telco_desk::faq::builtin_faqs()?;
//! let embedder = Arc::new(OpenAIEmbedder::new("text-embedding-3-small"));
//! let collaborators = Collaborators {
//!     store: Arc::new(SqlitePlanStore::new("roaming_plans.db").await?),
//!     faq: Arc::new(EmbeddingFaqIndex::build(embedder, faqs).await?),
//!     coverage: Arc::new(CoverageMap::builtin()?),
//! };
//!
//! let provider = Arc::new(OpenAIProvider::new("gpt-4.1-mini"));
//! let graph = agent_graph(default_guardrails(provider.clone()))?;
//! let runner = Runner::new(graph, tool_registry(&collaborators), provider)?;
//!
//! let mut session = ConversationSession::new();
//! let turn = runner.run_turn(&mut session, "I'm going to Japan next week").await?;
//! println!("[{}] {}", turn.active_agent, turn.reply);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod context;
pub mod coverage;
pub mod error;
pub mod faq;
pub mod guardrail;
pub mod handoff;
pub mod items;
pub mod model;
pub mod runner;
pub mod session;
pub mod store;
pub mod telco;
pub mod tool;
pub mod tools;
pub mod usage;

pub use agent::{AgentDefinition, AgentGraph, AgentId};
pub use config::{ConfigBuilder, DeskConfig};
pub use context::{RoamingPlan, TelcoContext};
pub use coverage::{CoverageMap, Recommendation};
pub use error::{AgentsError, Collaborator, ErrorCategory, Result};
pub use faq::{EmbeddingFaqIndex, FaqSearch, OpenAIEmbedder, SimilarityMetric};
pub use guardrail::{GuardrailVerdict, InputGuardrail, ModelGuardrail, PatternGuardrail};
pub use handoff::{Handoff, HandoffData};
pub use items::{Message, Role, RunItem, ToolCall};
pub use model::{MockProvider, ModelProvider, OpenAIProvider};
pub use runner::{AgentAction, RunConfig, Runner, TurnOutcome, TurnResult};
pub use session::ConversationSession;
pub use store::{InMemoryPlanStore, PlanRecord, PlanStore, SqlitePlanStore};
pub use telco::{agent_graph, default_guardrails, tool_registry, Collaborators};
pub use tool::{Tool, ToolRegistry};
pub use usage::{Usage, UsageStats};
