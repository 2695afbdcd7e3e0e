//! The customer-service desk: four agents, their tools and guardrails.
//!
//! The dispatcher ("Customer Service Agent") captures identity and routes;
//! each specialist owns one routine and always hands back to the dispatcher.

use std::sync::Arc;

use crate::agent::{AgentDefinition, AgentGraph, AgentId};
use crate::context::TelcoContext;
use crate::coverage::CoverageMap;
use crate::error::Result;
use crate::faq::FaqSearch;
use crate::guardrail::{InputGuardrail, ModelGuardrail};
use crate::handoff::HANDOFF_PROMPT_PREFIX;
use crate::model::ModelProvider;
use crate::store::PlanStore;
use crate::tool::ToolRegistry;
use crate::tools::{
    CancelPlan, CaptureIdentity, LookupFaq, LookupRoamingPlan, PurchasePlan, CANCEL_PLAN,
    CAPTURE_IDENTITY, LOOKUP_FAQ, LOOKUP_ROAMING_PLAN, PURCHASE_PLAN,
};

/// Rendered in place of a context field nobody has filled in yet.
pub const UNKNOWN: &str = "[unknown]";
/// Rendered as the plan once identity is known but no plan is active.
pub const NO_PLAN: &str = "[none]";

/// External systems the tools talk to.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn PlanStore>,
    pub faq: Arc<dyn FaqSearch>,
    pub coverage: Arc<CoverageMap>,
}

fn name_of(ctx: &TelcoContext) -> &str {
    ctx.customer_name.as_deref().unwrap_or(UNKNOWN)
}

fn phone_of(ctx: &TelcoContext) -> &str {
    ctx.phone_number.as_deref().unwrap_or(UNKNOWN)
}

fn plan_of(ctx: &TelcoContext) -> String {
    match (ctx.roaming_plan, ctx.has_identity()) {
        (Some(plan), _) => plan.to_string(),
        (None, true) => NO_PLAN.to_string(),
        (None, false) => UNKNOWN.to_string(),
    }
}

pub fn dispatcher_instructions(ctx: &TelcoContext) -> String {
    format!(
        "{HANDOFF_PROMPT_PREFIX}\n\
         You are a helpful customer service agent. You delegate the customer's request to the \
         appropriate agent using your handoff tools.\n\
         The customer's name is {name} and their phone number is {phone}.\n\
         1. If either is {UNKNOWN}, ask the customer for it and record both with the \
         {CAPTURE_IDENTITY} tool before delegating. Do not ask again for details you already have.\n\
         2. If the customer needs a roaming plan recommendation, or has questions about roaming \
         plans, transfer to the roaming agent. Never answer roaming questions from your own \
         knowledge.\n\
         3. If the customer wishes to purchase a roaming plan, transfer to the purchase agent.\n\
         4. If the customer wishes to cancel a roaming plan, transfer to the cancellation agent.\n\
         5. Only answer directly for greetings and small talk.",
        name = name_of(ctx),
        phone = phone_of(ctx),
    )
}

pub fn roaming_instructions(ctx: &TelcoContext) -> String {
    format!(
        "{HANDOFF_PROMPT_PREFIX}\n\
         You are a roaming plans agent. You recommend ReadyRoam roaming plans and answer \
         questions about them. Use the following routine to support the customer.\n\
         1. The customer's phone number is {phone}. If it is {UNKNOWN}, transfer back to the \
         customer service agent so it can be captured; otherwise confirm it is the number they \
         are asking about.\n\
         2. Determine whether the customer needs a recommendation or has a question.\n\
         3. For a recommendation, collect every destination they will travel to and call \
         {LOOKUP_ROAMING_PLAN} once with the full list.\n\
         4. For a question, answer it with {LOOKUP_FAQ}. Do not rely on your own knowledge.\n\
         When done, or if the customer asks about anything else, transfer back to the customer \
         service agent.",
        phone = phone_of(ctx),
    )
}

pub fn purchase_instructions(ctx: &TelcoContext) -> String {
    format!(
        "{HANDOFF_PROMPT_PREFIX}\n\
         You are a purchase agent. Use the following routine to support the customer.\n\
         1. The customer's phone number is {phone} and their current plan is {plan}. Confirm \
         with the customer that both are correct. If the phone number is {UNKNOWN}, transfer \
         back to the customer service agent.\n\
         2. Once confirmed, ask which roaming plan they would like to purchase: Neighbours, \
         Asia, Worldwide or Others. Do not recommend a plan.\n\
         3. Only after the customer has explicitly confirmed the plan, call {PURCHASE_PLAN} once.\n\
         4. Once completed, always transfer back to the customer service agent. If the \
         customer asks about anything other than a purchase, transfer back as well.",
        phone = phone_of(ctx),
        plan = plan_of(ctx),
    )
}

pub fn cancellation_instructions(ctx: &TelcoContext) -> String {
    format!(
        "{HANDOFF_PROMPT_PREFIX}\n\
         You are a cancellation agent. Use the following routine to support the customer.\n\
         1. The customer's phone number is {phone} and their current plan is {plan}. Confirm \
         with the customer that both are correct. If the phone number is {UNKNOWN}, transfer \
         back to the customer service agent. If the plan is {NO_PLAN}, tell the customer there \
         is nothing to cancel.\n\
         2. Only after the customer has explicitly confirmed, call {CANCEL_PLAN} once.\n\
         3. Once completed, always transfer back to the customer service agent. If the \
         customer asks about anything else, or does not wish to cancel, transfer back as well.",
        phone = phone_of(ctx),
        plan = plan_of(ctx),
    )
}

/// Every desk tool, registered for the agents allowed to call it.
pub fn tool_registry(collaborators: &Collaborators) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry
        .register(
            Arc::new(CaptureIdentity::new(collaborators.store.clone())),
            &[AgentId::Dispatcher],
        )
        .register(
            Arc::new(LookupRoamingPlan::new(collaborators.coverage.clone())),
            &[AgentId::Roaming],
        )
        .register(
            Arc::new(LookupFaq::new(collaborators.faq.clone())),
            &[AgentId::Roaming],
        )
        .register(
            Arc::new(PurchasePlan::new(collaborators.store.clone())),
            &[AgentId::Purchase],
        )
        .register(
            Arc::new(CancelPlan::new(collaborators.store.clone())),
            &[AgentId::Cancellation],
        );
    registry
}

/// Relevance and jailbreak classifiers on the given model.
pub fn default_guardrails(provider: Arc<dyn ModelProvider>) -> Vec<Arc<dyn InputGuardrail>> {
    vec![
        Arc::new(ModelGuardrail::relevance(provider.clone())),
        Arc::new(ModelGuardrail::jailbreak(provider)),
    ]
}

/// The four agents, wired dispatcher-out then specialist-back.
pub fn agent_graph(guardrails: Vec<Arc<dyn InputGuardrail>>) -> Result<AgentGraph> {
    let mut graph = AgentGraph::new(AgentId::Dispatcher);
    graph
        .insert(
            AgentDefinition::new(AgentId::Dispatcher, dispatcher_instructions)
                .with_handoff_description(
                    "A customer service agent that can delegate a customer's request to the \
                     appropriate agent.",
                )
                .with_tool(CAPTURE_IDENTITY)
                .with_guardrails(guardrails.clone()),
        )
        .insert(
            AgentDefinition::new(AgentId::Roaming, roaming_instructions)
                .with_handoff_description(
                    "Recommends roaming plans and answers questions about roaming plans.",
                )
                .with_tool(LOOKUP_ROAMING_PLAN)
                .with_tool(LOOKUP_FAQ)
                .with_guardrails(guardrails.clone()),
        )
        .insert(
            AgentDefinition::new(AgentId::Purchase, purchase_instructions)
                .with_handoff_description(
                    "Updates the roaming plan for the customer's phone number.",
                )
                .with_tool(PURCHASE_PLAN)
                .with_guardrails(guardrails.clone()),
        )
        .insert(
            AgentDefinition::new(AgentId::Cancellation, cancellation_instructions)
                .with_handoff_description(
                    "Cancels the roaming plan for the customer's phone number.",
                )
                .with_tool(CANCEL_PLAN)
                .with_guardrails(guardrails),
        );

    for specialist in [AgentId::Roaming, AgentId::Purchase, AgentId::Cancellation] {
        graph.connect(AgentId::Dispatcher, specialist)?;
    }
    graph.wire_back_edges()?;
    Ok(graph)
}
