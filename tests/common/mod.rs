#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use telco_desk::faq::{builtin_faqs, Embedder};
use telco_desk::{
    agent_graph, tool_registry, Collaborators, CoverageMap, EmbeddingFaqIndex, MockProvider,
    PatternGuardrail, PlanStore, Result, RunConfig, Runner,
};

const KEYWORDS: [&str; 6] = ["activate", "charged", "calls", "use up", "cancel", "switch"];

/// Embeds text as presence flags over a fixed keyword list.
pub struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(inputs
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                KEYWORDS
                    .iter()
                    .map(|k| if lower.contains(k) { 1.0 } else { 0.0 })
                    .collect()
            })
            .collect())
    }
}

pub async fn collaborators(store: Arc<dyn PlanStore>) -> Collaborators {
    let faq = EmbeddingFaqIndex::build(Arc::new(KeywordEmbedder), builtin_faqs().unwrap())
        .await
        .unwrap();
    Collaborators {
        store,
        faq: Arc::new(faq),
        coverage: Arc::new(CoverageMap::builtin().unwrap()),
    }
}

/// The full desk with pattern guardrails and a scripted model.
pub async fn desk(store: Arc<dyn PlanStore>, provider: Arc<MockProvider>) -> Runner {
    desk_with(store, provider, RunConfig::default()).await
}

pub async fn desk_with(
    store: Arc<dyn PlanStore>,
    provider: Arc<MockProvider>,
    config: RunConfig,
) -> Runner {
    let graph = agent_graph(vec![Arc::new(PatternGuardrail::injection())]).unwrap();
    let tools = tool_registry(&collaborators(store).await);
    Runner::new(graph, tools, provider).unwrap().with_config(config)
}
