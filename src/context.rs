//! # Conversation context
//!
//! Mutable state shared by every agent and tool for one session: who the
//! customer is and which roaming plan is active. Agents only ever see it
//! through their rendered instructions; tools receive it by `&mut` and are
//! the only code that changes it.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Roaming coverage tier, ordered narrowest to broadest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RoamingPlan {
    Neighbours,
    Asia,
    Worldwide,
    Others,
}

impl RoamingPlan {
    pub const ALL: [RoamingPlan; 4] = [
        RoamingPlan::Neighbours,
        RoamingPlan::Asia,
        RoamingPlan::Worldwide,
        RoamingPlan::Others,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoamingPlan::Neighbours => "Neighbours",
            RoamingPlan::Asia => "Asia",
            RoamingPlan::Worldwide => "Worldwide",
            RoamingPlan::Others => "Others",
        }
    }
}

impl fmt::Display for RoamingPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPlan(pub String);

impl fmt::Display for UnknownPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' is not a roaming plan; choose one of Neighbours, Asia, Worldwide or Others",
            self.0
        )
    }
}

impl std::error::Error for UnknownPlan {}

impl FromStr for RoamingPlan {
    type Err = UnknownPlan;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        RoamingPlan::ALL
            .into_iter()
            .find(|plan| plan.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownPlan(wanted.to_string()))
    }
}

/// Per-session customer state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelcoContext {
    pub customer_name: Option<String>,
    pub phone_number: Option<String>,
    pub roaming_plan: Option<RoamingPlan>,
}

impl TelcoContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context with a synthetic local phone number already filled in.
    pub fn demo() -> Self {
        let mut rng = rand::thread_rng();
        let digits: String = (0..7)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect();
        Self {
            phone_number: Some(format!("7{digits}")),
            ..Self::default()
        }
    }

    pub fn has_identity(&self) -> bool {
        self.customer_name.is_some() && self.phone_number.is_some()
    }

    /// Both identity fields, if captured.
    pub fn identity(&self) -> Option<(&str, &str)> {
        match (&self.customer_name, &self.phone_number) {
            (Some(name), Some(phone)) => Some((name.as_str(), phone.as_str())),
            _ => None,
        }
    }
}
