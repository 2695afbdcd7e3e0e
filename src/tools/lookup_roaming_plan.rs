use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::LOOKUP_ROAMING_PLAN;
use crate::context::TelcoContext;
use crate::coverage::CoverageMap;
use crate::error::{AgentsError, Result};
use crate::tool::{parse_args, schema_of, Field, Tool, ToolEffects};

#[derive(Debug, Deserialize, JsonSchema)]
struct LookupRoamingPlanArgs {
    /// Every country or territory the customer will visit.
    destinations: Vec<String>,
}

/// Recommends the narrowest roaming tier covering a trip. Reads only the
/// coverage map.
pub struct LookupRoamingPlan {
    coverage: Arc<CoverageMap>,
}

impl LookupRoamingPlan {
    pub fn new(coverage: Arc<CoverageMap>) -> Self {
        Self { coverage }
    }
}

#[async_trait]
impl Tool for LookupRoamingPlan {
    fn name(&self) -> &str {
        LOOKUP_ROAMING_PLAN
    }

    fn description(&self) -> &str {
        "Recommend a roaming plan for the customer's intended destination(s)."
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<LookupRoamingPlanArgs>()
    }

    fn effects(&self) -> ToolEffects {
        ToolEffects {
            reads: &[Field::CoverageMap],
            writes: &[],
        }
    }

    async fn call(&self, _ctx: &mut TelcoContext, args: Value) -> Result<Value> {
        let args: LookupRoamingPlanArgs = parse_args(self.name(), args)?;
        let recommendation = self
            .coverage
            .recommend(&args.destinations)
            .map_err(|e| AgentsError::precondition(self.name(), e.to_string()))?;
        debug!(destinations = ?args.destinations, ?recommendation, "roaming lookup");
        Ok(json!(recommendation.message()))
    }
}
