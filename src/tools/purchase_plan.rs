use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::{require_identity, PURCHASE_PLAN};
use crate::context::{RoamingPlan, TelcoContext};
use crate::error::{AgentsError, Result};
use crate::store::PlanStore;
use crate::tool::{parse_args, schema_of, Field, Tool, ToolEffects};

#[derive(Debug, Deserialize, JsonSchema)]
struct PurchasePlanArgs {
    /// One of Neighbours, Asia, Worldwide or Others.
    new_roaming_plan: String,
}

/// Switches the customer to a new roaming plan.
///
/// Reads name and phone; writes the plan and appends a store row.
pub struct PurchasePlan {
    store: Arc<dyn PlanStore>,
}

impl PurchasePlan {
    pub fn new(store: Arc<dyn PlanStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for PurchasePlan {
    fn name(&self) -> &str {
        PURCHASE_PLAN
    }

    fn description(&self) -> &str {
        "Update the roaming plan for the customer's phone number."
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<PurchasePlanArgs>()
    }

    fn effects(&self) -> ToolEffects {
        ToolEffects {
            reads: &[Field::CustomerName, Field::PhoneNumber],
            writes: &[Field::RoamingPlan, Field::RecordStore],
        }
    }

    async fn call(&self, ctx: &mut TelcoContext, args: Value) -> Result<Value> {
        let args: PurchasePlanArgs = parse_args(self.name(), args)?;
        let plan: RoamingPlan = args
            .new_roaming_plan
            .parse()
            .map_err(|e| AgentsError::precondition(self.name(), format!("{e}.")))?;
        let (name, phone) = require_identity(ctx, self.name())?;

        self.store.append(&name, &phone, Some(plan)).await?;
        ctx.roaming_plan = Some(plan);
        info!(phone = %phone, %plan, "roaming plan purchased");

        Ok(json!(format!("Updated roaming plan to {plan} for {phone}")))
    }
}
