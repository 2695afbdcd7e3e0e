use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::CAPTURE_IDENTITY;
use crate::context::TelcoContext;
use crate::error::{AgentsError, Result};
use crate::store::{latest_plan, PlanStore};
use crate::tool::{parse_args, schema_of, Field, Tool, ToolEffects};

#[derive(Debug, Deserialize, JsonSchema)]
struct CaptureIdentityArgs {
    /// The customer's full name.
    customer_name: String,
    /// The customer's phone number, which is also their account number.
    phone_number: String,
}

/// Records who the customer is and adopts their last stored plan.
///
/// Reads the record store; writes name, phone and plan. A first contact
/// appends one row with no plan; later calls for the same identity write
/// nothing.
pub struct CaptureIdentity {
    store: Arc<dyn PlanStore>,
}

impl CaptureIdentity {
    pub fn new(store: Arc<dyn PlanStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CaptureIdentity {
    fn name(&self) -> &str {
        CAPTURE_IDENTITY
    }

    fn description(&self) -> &str {
        "Record the customer's name and phone number. Only needs to be called once per conversation."
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<CaptureIdentityArgs>()
    }

    fn effects(&self) -> ToolEffects {
        ToolEffects {
            reads: &[Field::PhoneNumber, Field::RoamingPlan, Field::RecordStore],
            writes: &[
                Field::CustomerName,
                Field::PhoneNumber,
                Field::RoamingPlan,
                Field::RecordStore,
            ],
        }
    }

    async fn call(&self, ctx: &mut TelcoContext, args: Value) -> Result<Value> {
        let args: CaptureIdentityArgs = parse_args(self.name(), args)?;
        let name = args.customer_name.trim();
        let phone = args.phone_number.trim();
        if name.is_empty() || phone.is_empty() {
            return Err(AgentsError::precondition(
                self.name(),
                "Both the customer's name and phone number are required.",
            ));
        }
        if let Some(existing) = ctx.phone_number.as_deref() {
            if existing != phone {
                return Err(AgentsError::precondition(
                    self.name(),
                    format!(
                        "This conversation is already linked to phone number {existing}; \
                         it cannot be changed."
                    ),
                ));
            }
        }

        let records = self.store.query(name, phone).await?;
        let plan = match latest_plan(&records) {
            Some(stored) => stored,
            None => {
                self.store.append(name, phone, ctx.roaming_plan).await?;
                ctx.roaming_plan
            }
        };

        ctx.customer_name = Some(name.to_string());
        ctx.phone_number = Some(phone.to_string());
        ctx.roaming_plan = plan;
        info!(phone, plan = ?plan, returning = !records.is_empty(), "customer identified");

        let plan_text = plan.map_or_else(|| "none".to_string(), |p| p.to_string());
        Ok(json!(format!(
            "Customer profile updated for {name} ({phone}). Current roaming plan: {plan_text}."
        )))
    }
}
