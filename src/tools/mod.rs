//! The desk's tools. Each one documents the context fields and external
//! systems it reads and writes through [`ToolEffects`](crate::tool::ToolEffects).

mod cancel_plan;
mod capture_identity;
mod lookup_faq;
mod lookup_roaming_plan;
mod purchase_plan;

pub use cancel_plan::CancelPlan;
pub use capture_identity::CaptureIdentity;
pub use lookup_faq::LookupFaq;
pub use lookup_roaming_plan::LookupRoamingPlan;
pub use purchase_plan::PurchasePlan;

use crate::context::TelcoContext;
use crate::error::{AgentsError, Result};

pub const CAPTURE_IDENTITY: &str = "capture_identity";
pub const LOOKUP_ROAMING_PLAN: &str = "lookup_roaming_plan";
pub const LOOKUP_FAQ: &str = "lookup_faq";
pub const PURCHASE_PLAN: &str = "purchase_plan";
pub const CANCEL_PLAN: &str = "cancel_plan";

/// Name and phone, or a precondition failure naming `tool`.
fn require_identity(ctx: &TelcoContext, tool: &str) -> Result<(String, String)> {
    ctx.identity()
        .map(|(name, phone)| (name.to_string(), phone.to_string()))
        .ok_or_else(|| {
            AgentsError::precondition(
                tool,
                "The customer's name and phone number have not been captured yet.",
            )
        })
}
