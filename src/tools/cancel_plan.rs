use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::{require_identity, CANCEL_PLAN};
use crate::context::TelcoContext;
use crate::error::{AgentsError, Result};
use crate::store::PlanStore;
use crate::tool::{parse_args, schema_of, Field, Tool, ToolEffects};

#[derive(Debug, Default, Deserialize, JsonSchema)]
struct CancelPlanArgs {}

/// Removes the active roaming plan. Reads identity and plan; clears the plan
/// and appends a no-plan row.
pub struct CancelPlan {
    store: Arc<dyn PlanStore>,
}

impl CancelPlan {
    pub fn new(store: Arc<dyn PlanStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CancelPlan {
    fn name(&self) -> &str {
        CANCEL_PLAN
    }

    fn description(&self) -> &str {
        "Remove the roaming plan for the customer's phone number."
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<CancelPlanArgs>()
    }

    fn effects(&self) -> ToolEffects {
        ToolEffects {
            reads: &[Field::CustomerName, Field::PhoneNumber, Field::RoamingPlan],
            writes: &[Field::RoamingPlan, Field::RecordStore],
        }
    }

    async fn call(&self, ctx: &mut TelcoContext, args: Value) -> Result<Value> {
        let _: CancelPlanArgs = parse_args(self.name(), args)?;
        let Some(previous) = ctx.roaming_plan else {
            return Err(AgentsError::precondition(
                self.name(),
                "There is no active roaming plan to cancel.",
            ));
        };
        let (name, phone) = require_identity(ctx, self.name())?;

        self.store.append(&name, &phone, None).await?;
        ctx.roaming_plan = None;
        info!(phone = %phone, %previous, "roaming plan cancelled");

        Ok(json!(format!("Removed roaming plan for {phone}")))
    }
}
