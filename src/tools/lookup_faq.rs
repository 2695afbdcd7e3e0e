use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use super::LOOKUP_FAQ;
use crate::context::TelcoContext;
use crate::error::{AgentsError, Result};
use crate::faq::{FaqSearch, SimilarityMetric};
use crate::tool::{parse_args, schema_of, Field, Tool, ToolEffects};

#[derive(Debug, Deserialize, JsonSchema)]
struct LookupFaqArgs {
    /// The customer's question, in their own words.
    question: String,
}

/// Answers roaming questions from the FAQ index, verbatim.
pub struct LookupFaq {
    search: Arc<dyn FaqSearch>,
    metric: SimilarityMetric,
}

impl LookupFaq {
    pub fn new(search: Arc<dyn FaqSearch>) -> Self {
        Self {
            search,
            metric: SimilarityMetric::Cosine,
        }
    }

    pub fn with_metric(mut self, metric: SimilarityMetric) -> Self {
        self.metric = metric;
        self
    }
}

#[async_trait]
impl Tool for LookupFaq {
    fn name(&self) -> &str {
        LOOKUP_FAQ
    }

    fn description(&self) -> &str {
        "Look up the answer to a question about roaming plans."
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<LookupFaqArgs>()
    }

    fn effects(&self) -> ToolEffects {
        ToolEffects {
            reads: &[Field::FaqIndex],
            writes: &[],
        }
    }

    async fn call(&self, _ctx: &mut TelcoContext, args: Value) -> Result<Value> {
        let args: LookupFaqArgs = parse_args(self.name(), args)?;
        let question = args.question.trim();
        if question.is_empty() {
            return Err(AgentsError::precondition(self.name(), "The question is empty."));
        }

        let hit = self
            .search
            .search(question, 1, self.metric)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                AgentsError::precondition(self.name(), "No FAQ entry matched that question.")
            })?;
        Ok(json!(hit.answer))
    }
}
