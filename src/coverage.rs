//! Static roaming coverage map and the plan ranking over it.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use thiserror::Error;

use crate::context::RoamingPlan;
use crate::error::{AgentsError, Result};

const BUILTIN_LOCATIONS: &str = include_str!("../data/roaming_locations.json");

/// Home market used when none is configured.
pub const DEFAULT_HOME_MARKET: &str = "singapore";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoverageError {
    #[error("Please tell me at least one destination.")]
    NoDestinations,
    #[error("Roaming is not applicable for local {0} usage.")]
    HomeMarket(String),
}

/// Outcome of matching a trip against the coverage tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recommendation {
    Plan(RoamingPlan),
    Unavailable,
}

impl Recommendation {
    pub fn message(&self) -> String {
        match self {
            Recommendation::Plan(plan) => {
                format!("ReadyRoam {plan} would be suitable for your trip.")
            }
            Recommendation::Unavailable => "Unfortunately, we are unable to provide ReadyRoam \
                 coverage for all your destinations."
                .to_string(),
        }
    }
}

/// Coverage tier to covered locations. Read-only after load.
#[derive(Debug, Clone)]
pub struct CoverageMap {
    tiers: BTreeMap<RoamingPlan, BTreeSet<String>>,
    home_market: String,
}

fn normalize(location: &str) -> String {
    location.trim().to_lowercase()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl CoverageMap {
    /// The map bundled with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_LOCATIONS)
    }

    /// Parse `{"tier": ["location", ...]}`. Tier names are case-insensitive.
    pub fn from_json(raw: &str) -> Result<Self> {
        let parsed: BTreeMap<String, Vec<String>> = serde_json::from_str(raw)?;
        let mut tiers = BTreeMap::new();
        for (tier, locations) in parsed {
            let plan: RoamingPlan = tier
                .parse()
                .map_err(|e| AgentsError::Configuration(format!("coverage map: {e}")))?;
            tiers.insert(plan, locations.iter().map(|l| normalize(l)).collect());
        }
        Ok(Self {
            tiers,
            home_market: DEFAULT_HOME_MARKET.to_string(),
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn with_home_market(mut self, home: impl AsRef<str>) -> Self {
        self.home_market = normalize(home.as_ref());
        self
    }

    pub fn home_market(&self) -> &str {
        &self.home_market
    }

    pub fn covers(&self, plan: RoamingPlan, location: &str) -> bool {
        self.tiers
            .get(&plan)
            .is_some_and(|set| set.contains(&normalize(location)))
    }

    /// Pick the narrowest tier that covers every destination.
    ///
    /// Destinations are compared case-insensitively and deduplicated. A tier
    /// only qualifies when its intersection with the trip is as large as the
    /// trip itself; ties go to the lowest tier in [`RoamingPlan`] order.
    pub fn recommend<S: AsRef<str>>(
        &self,
        destinations: &[S],
    ) -> std::result::Result<Recommendation, CoverageError> {
        let trip: BTreeSet<String> = destinations
            .iter()
            .map(|d| normalize(d.as_ref()))
            .filter(|d| !d.is_empty())
            .collect();

        if trip.is_empty() {
            return Err(CoverageError::NoDestinations);
        }
        if trip.contains(&self.home_market) {
            return Err(CoverageError::HomeMarket(capitalize(&self.home_market)));
        }

        let mut best: Option<(usize, RoamingPlan)> = None;
        for plan in RoamingPlan::ALL {
            let hits = self
                .tiers
                .get(&plan)
                .map_or(0, |set| set.intersection(&trip).count());
            // strict `>` keeps the narrower tier on ties
            if best.map_or(true, |(max, _)| hits > max) {
                best = Some((hits, plan));
            }
        }

        match best {
            Some((hits, plan)) if hits == trip.len() => Ok(Recommendation::Plan(plan)),
            _ => Ok(Recommendation::Unavailable),
        }
    }
}
