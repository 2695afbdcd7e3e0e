mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;

use telco_desk::items::{Role, RunItem};
use telco_desk::{
    agent_graph, tool_registry, AgentId, AgentsError, Collaborator, ConversationSession,
    InMemoryPlanStore, MockProvider, ModelGuardrail, PlanRecord, PlanStore, Result, RoamingPlan,
    RunConfig, Runner, TelcoContext, TurnOutcome,
};

fn identified(plan: Option<RoamingPlan>) -> TelcoContext {
    TelcoContext {
        customer_name: Some("Ada Lim".to_string()),
        phone_number: Some("91234567".to_string()),
        roaming_plan: plan,
    }
}

fn tool_errors(items: &[RunItem]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| match item {
            RunItem::ToolOutput(out) => out.error.clone(),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_japan_and_korea_trip_gets_asia() {
    let store = Arc::new(InMemoryPlanStore::new());
    let provider = Arc::new(
        MockProvider::new("gpt-test")
            .with_message("Happy to help! May I have your name and phone number?")
            .with_tool_call(
                "capture_identity",
                json!({"customer_name": "Ada Lim", "phone_number": "91234567"}),
            )
            .with_tool_call("transfer_to_roaming_agent", json!({"reason": "trip advice"}))
            .with_tool_call("lookup_roaming_plan", json!({"destinations": ["Japan", "Korea"]}))
            .with_message("ReadyRoam Asia covers both Japan and Korea."),
    );
    let runner = common::desk(store.clone(), provider.clone()).await;
    let mut session = ConversationSession::new();

    let first = runner
        .run_turn(&mut session, "Hi, I'm going to Japan and Korea next month")
        .await
        .unwrap();
    assert_eq!(first.active_agent, AgentId::Dispatcher);
    assert_eq!(session.transcript().len(), 2);

    let second = runner
        .run_turn(&mut session, "Ada Lim, 91234567")
        .await
        .unwrap();
    assert_eq!(second.active_agent, AgentId::Roaming);
    assert_eq!(second.reply, "ReadyRoam Asia covers both Japan and Korea.");
    assert_eq!(second.new_messages.len(), 8);
    assert_eq!(session.transcript().len(), 10);
    assert_eq!(session.context(), &identified(None));

    // first contact writes exactly one row, with no plan
    let rows = store.query("Ada Lim", "91234567").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].roaming_plan, None);

    let requests = provider.requests();
    assert_eq!(requests.len(), 5);
    assert!(requests[3].instructions.contains("phone number is 91234567"));
    let last = requests[4].messages.last().unwrap();
    assert_eq!(last.role, Role::Tool);
    assert_eq!(last.content, "ReadyRoam Asia would be suitable for your trip.");

    assert!(second
        .items
        .iter()
        .any(|i| matches!(i, RunItem::Handoff(h) if h.to_agent == "Roaming Agent")));
    assert_eq!(second.usage.total.request_count, 4);
}

#[tokio::test]
async fn test_returning_customer_cancels_worldwide() {
    let store = Arc::new(InMemoryPlanStore::new());
    store
        .append("Ada Lim", "91234567", Some(RoamingPlan::Worldwide))
        .await
        .unwrap();
    let provider = Arc::new(
        MockProvider::new("gpt-test")
            .with_tool_call(
                "capture_identity",
                json!({"customer_name": "Ada Lim", "phone_number": "91234567"}),
            )
            .with_tool_call("transfer_to_cancellation_agent", json!({}))
            .with_message("You are on ReadyRoam Worldwide. Shall I cancel it?")
            .with_tool_call("cancel_plan", json!({}))
            .with_tool_call("transfer_to_customer_service_agent", json!({}))
            .with_message("Your plan has been cancelled. Anything else?"),
    );
    let runner = common::desk(store.clone(), provider.clone()).await;
    let mut session = ConversationSession::new();

    let turn = runner
        .run_turn(&mut session, "Please cancel my roaming plan. Ada Lim, 91234567")
        .await
        .unwrap();
    assert_eq!(turn.active_agent, AgentId::Cancellation);
    assert_eq!(session.context().roaming_plan, Some(RoamingPlan::Worldwide));
    assert!(provider.requests()[2]
        .instructions
        .contains("current plan is Worldwide"));

    let turn = runner.run_turn(&mut session, "Yes please").await.unwrap();
    assert_eq!(turn.active_agent, AgentId::Dispatcher);
    assert_eq!(session.context(), &identified(None));

    let rows: Vec<PlanRecord> = store.query("Ada Lim", "91234567").await.unwrap();
    let plans: Vec<_> = rows.iter().map(|r| r.roaming_plan).collect();
    assert_eq!(plans, vec![Some(RoamingPlan::Worldwide), None]);
    assert_eq!(store.len().await, 2);
}

#[tokio::test]
async fn test_invalid_tier_is_explained_then_fixed() {
    let store = Arc::new(InMemoryPlanStore::new());
    let provider = Arc::new(
        MockProvider::new("gpt-test")
            .with_tool_call("transfer_to_purchase_agent", json!({}))
            .with_tool_call("purchase_plan", json!({"new_roaming_plan": "Gold"}))
            .with_tool_call("purchase_plan", json!({"new_roaming_plan": "asia"}))
            .with_tool_call("transfer_to_customer_service_agent", json!({}))
            .with_message("You're all set with ReadyRoam Asia."),
    );
    let runner = common::desk(store.clone(), provider.clone()).await;
    let mut session = ConversationSession::with_context(identified(None));

    let turn = runner
        .run_turn(&mut session, "I'd like to buy the Gold roaming plan, then Asia")
        .await
        .unwrap();
    assert_eq!(turn.active_agent, AgentId::Dispatcher);
    assert_eq!(session.context().roaming_plan, Some(RoamingPlan::Asia));

    let errors = tool_errors(&turn.items);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("'Gold' is not a roaming plan"));
    let fed_back = provider.requests()[2].messages.last().unwrap().content.clone();
    assert!(fed_back.starts_with("Error: "));

    let rows = store.query("Ada Lim", "91234567").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].roaming_plan, Some(RoamingPlan::Asia));
}

#[tokio::test]
async fn test_cancel_without_plan_writes_nothing() {
    let store = Arc::new(InMemoryPlanStore::new());
    let provider = Arc::new(
        MockProvider::new("gpt-test")
            .with_tool_call("transfer_to_cancellation_agent", json!({}))
            .with_tool_call("cancel_plan", json!({}))
            .with_message("You don't have an active roaming plan to cancel."),
    );
    let runner = common::desk(store.clone(), provider).await;
    let mut session = ConversationSession::with_context(identified(None));

    let turn = runner.run_turn(&mut session, "Cancel my plan").await.unwrap();
    assert_eq!(
        tool_errors(&turn.items),
        vec!["There is no active roaming plan to cancel.".to_string()]
    );
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_faq_question_is_answered_from_index() {
    let store = Arc::new(InMemoryPlanStore::new());
    let provider = Arc::new(
        MockProvider::new("gpt-test")
            .with_tool_call("transfer_to_roaming_agent", json!({}))
            .with_tool_call(
                "lookup_faq",
                json!({"question": "Do I have to switch anything on for roaming?"}),
            )
            .with_message("Yes, turn on data roaming when you land."),
    );
    let runner = common::desk(store, provider.clone()).await;
    let mut session = ConversationSession::with_context(identified(None));

    runner
        .run_turn(&mut session, "Do I need to switch on roaming?")
        .await
        .unwrap();
    let answer = provider.requests()[2].messages.last().unwrap().content.clone();
    assert!(answer.starts_with("Yes. Turn on data roaming"));
}

#[tokio::test]
async fn test_guardrail_trip_keeps_active_agent() {
    let store = Arc::new(InMemoryPlanStore::new());
    let relevance = Arc::new(
        MockProvider::new("guard")
            .with_json(json!({"reasoning": "roaming question", "is_relevant": true}))
            .with_json(json!({"reasoning": "weather is off topic", "is_relevant": false})),
    );
    let jailbreak = Arc::new(
        MockProvider::new("guard")
            .with_json(json!({"reasoning": "benign", "is_safe": true}))
            .with_json(json!({"reasoning": "benign", "is_safe": true})),
    );
    let agents = Arc::new(
        MockProvider::new("gpt-test")
            .with_tool_call("transfer_to_roaming_agent", json!({}))
            .with_message("Where are you travelling to?"),
    );

    let graph = agent_graph(vec![
        Arc::new(ModelGuardrail::relevance(relevance)),
        Arc::new(ModelGuardrail::jailbreak(jailbreak)),
    ])
    .unwrap();
    let tools = tool_registry(&common::collaborators(store).await);
    let runner = Runner::new(graph, tools, agents.clone()).unwrap();
    let mut session = ConversationSession::new();

    runner
        .run_turn(&mut session, "I need a roaming plan")
        .await
        .unwrap();
    assert_eq!(session.active_agent(), AgentId::Roaming);
    let transcript_len = session.transcript().len();

    let turn = runner
        .run_turn(&mut session, "What's the weather in Tokyo?")
        .await
        .unwrap();
    assert_eq!(
        turn.outcome,
        TurnOutcome::Refused {
            guardrail: "Relevance Guardrail".to_string(),
            reasoning: "weather is off topic".to_string(),
        }
    );
    assert_eq!(turn.active_agent, AgentId::Roaming);
    assert_eq!(session.active_agent(), AgentId::Roaming);
    assert_eq!(session.transcript().len(), transcript_len);
    assert_eq!(agents.requests().len(), 2);
}

#[tokio::test]
async fn test_guardrail_outage_fails_the_turn() {
    let store = Arc::new(InMemoryPlanStore::new());
    let relevance = Arc::new(MockProvider::new("guard").with_outage("connection refused"));
    let jailbreak =
        Arc::new(MockProvider::new("guard").with_json(json!({"reasoning": "ok", "is_safe": true})));
    let graph = agent_graph(vec![
        Arc::new(ModelGuardrail::relevance(relevance)),
        Arc::new(ModelGuardrail::jailbreak(jailbreak)),
    ])
    .unwrap();
    let tools = tool_registry(&common::collaborators(store).await);
    let runner = Runner::new(graph, tools, Arc::new(MockProvider::new("gpt-test"))).unwrap();
    let mut session = ConversationSession::new();

    let err = runner.run_turn(&mut session, "hello").await.unwrap_err();
    assert!(matches!(
        err,
        AgentsError::CollaboratorUnavailable {
            collaborator: Collaborator::LanguageModel,
            ..
        }
    ));
    assert!(session.transcript().is_empty());
}

/// A store whose calls never complete.
struct StalledStore;

#[async_trait]
impl PlanStore for StalledStore {
    async fn append(&self, _: &str, _: &str, _: Option<RoamingPlan>) -> Result<PlanRecord> {
        std::future::pending().await
    }

    async fn query(&self, _: &str, _: &str) -> Result<Vec<PlanRecord>> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_stalled_store_times_out_without_partial_update() {
    let provider = Arc::new(MockProvider::new("gpt-test").with_tool_call(
        "capture_identity",
        json!({"customer_name": "Ada Lim", "phone_number": "91234567"}),
    ));
    let config = RunConfig {
        tool_timeout: Duration::from_millis(50),
        ..RunConfig::default()
    };
    let runner = common::desk_with(Arc::new(StalledStore), provider, config).await;
    let mut session = ConversationSession::new();

    let err = runner
        .run_turn(&mut session, "Ada Lim, 91234567")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AgentsError::Timeout {
            collaborator: Collaborator::RecordStore,
            ..
        }
    ));
    assert_eq!(session.context(), &TelcoContext::new());
    assert!(session.transcript().is_empty());
    assert_eq!(session.active_agent(), AgentId::Dispatcher);
}

#[tokio::test]
async fn test_sessions_do_not_share_context() {
    let store = Arc::new(InMemoryPlanStore::new());
    let provider = Arc::new(
        MockProvider::new("gpt-test")
            .with_tool_call(
                "capture_identity",
                json!({"customer_name": "Ada Lim", "phone_number": "91234567"}),
            )
            .with_message("Thanks Ada.")
            .with_message("Hello! Who am I speaking with?"),
    );
    let runner = common::desk(store, provider).await;
    let mut ada = ConversationSession::new();
    let mut other = ConversationSession::new();

    runner.run_turn(&mut ada, "Ada Lim, 91234567").await.unwrap();
    runner.run_turn(&mut other, "hi").await.unwrap();

    assert!(ada.context().has_identity());
    assert_eq!(other.context(), &TelcoContext::new());
    assert_eq!(other.transcript().len(), 2);
}
