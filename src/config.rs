//! Desk configuration
//!
//! Defaults, overlaid by environment variables or a TOML file, then checked
//! once at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::coverage::DEFAULT_HOME_MARKET;
use crate::error::{AgentsError, Result};
use crate::runner::RunConfig;

/// Top-level desk configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    /// Model driving the agents
    pub model: String,

    /// Model behind the relevance and jailbreak guardrails
    pub guardrail_model: String,

    /// Model used to embed FAQ questions
    pub embedding_model: String,

    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,

    /// Reasoning steps allowed per turn
    pub max_steps_per_turn: usize,

    pub model_timeout_secs: u64,
    pub guardrail_timeout_secs: u64,
    pub tool_timeout_secs: u64,

    /// SQLite file holding plan records
    pub database_path: PathBuf,

    /// Coverage map JSON; the built-in map when unset
    pub coverage_path: Option<PathBuf>,

    /// FAQ JSON; the built-in FAQ when unset
    pub faq_path: Option<PathBuf>,

    /// Market where roaming does not apply
    pub home_market: String,

    /// Start sessions with a synthetic phone number
    pub demo_mode: bool,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4.1-mini".to_string(),
            guardrail_model: "gpt-4.1-nano".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            temperature: None,
            max_tokens: None,
            max_steps_per_turn: 10,
            model_timeout_secs: 30,
            guardrail_timeout_secs: 15,
            tool_timeout_secs: 20,
            database_path: PathBuf::from("roaming_plans.db"),
            coverage_path: None,
            faq_path: None,
            home_market: DEFAULT_HOME_MARKET.to_string(),
            demo_mode: false,
        }
    }
}

impl DeskConfig {
    pub fn validate(&self) -> Result<()> {
        let err = |msg: &str| Err(AgentsError::Configuration(msg.to_string()));
        if self.model.trim().is_empty() {
            return err("model must not be empty");
        }
        if self.guardrail_model.trim().is_empty() {
            return err("guardrail_model must not be empty");
        }
        if self.embedding_model.trim().is_empty() {
            return err("embedding_model must not be empty");
        }
        if self.max_steps_per_turn == 0 {
            return err("max_steps_per_turn must be at least 1");
        }
        if self.model_timeout_secs == 0
            || self.guardrail_timeout_secs == 0
            || self.tool_timeout_secs == 0
        {
            return err("timeouts must be greater than zero");
        }
        if self.home_market.trim().is_empty() {
            return err("home_market must not be empty");
        }
        Ok(())
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            max_steps: self.max_steps_per_turn,
            model_timeout: Duration::from_secs(self.model_timeout_secs),
            tool_timeout: Duration::from_secs(self.tool_timeout_secs),
            guardrail_timeout: Duration::from_secs(self.guardrail_timeout_secs),
        }
    }
}

/// Configuration builder
pub struct ConfigBuilder {
    config: DeskConfig,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: DeskConfig::default(),
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn guardrail_model(mut self, model: impl Into<String>) -> Self {
        self.config.guardrail_model = model.into();
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.config.temperature = Some(temp);
        self
    }

    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.config.max_tokens = Some(tokens);
        self
    }

    pub fn max_steps(mut self, steps: usize) -> Self {
        self.config.max_steps_per_turn = steps;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.model_timeout_secs = timeout.as_secs();
        self
    }

    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = path.into();
        self
    }

    pub fn coverage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.coverage_path = Some(path.into());
        self
    }

    pub fn faq_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.faq_path = Some(path.into());
        self
    }

    pub fn home_market(mut self, market: impl Into<String>) -> Self {
        self.config.home_market = market.into();
        self
    }

    pub fn demo(mut self, enabled: bool) -> Self {
        self.config.demo_mode = enabled;
        self
    }

    pub fn build(self) -> DeskConfig {
        self.config
    }
}

/// Load configuration from environment variables
pub fn from_env() -> DeskConfig {
    overlay(DeskConfig::default(), |key| std::env::var(key).ok())
}

fn overlay(mut config: DeskConfig, var: impl Fn(&str) -> Option<String>) -> DeskConfig {
    if let Some(model) = var("TELCO_DESK_MODEL") {
        config.model = model;
    }

    if let Some(model) = var("TELCO_DESK_GUARDRAIL_MODEL") {
        config.guardrail_model = model;
    }

    if let Some(path) = var("TELCO_DESK_DB") {
        config.database_path = PathBuf::from(path);
    }

    if let Some(market) = var("TELCO_DESK_HOME_MARKET") {
        config.home_market = market;
    }

    if let Some(demo) = var("TELCO_DESK_DEMO") {
        config.demo_mode = demo.to_lowercase() == "true" || demo == "1";
    }

    if let Some(timeout) = var("TELCO_DESK_TIMEOUT") {
        if let Ok(timeout_secs) = timeout.parse::<u64>() {
            config.model_timeout_secs = timeout_secs;
        }
    }

    config
}

/// Load configuration from a TOML file
pub fn from_file(path: impl AsRef<Path>) -> Result<DeskConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| {
        AgentsError::Configuration(format!("cannot read {}: {e}", path.display()))
    })?;
    toml::from_str(&contents)
        .map_err(|e| AgentsError::Configuration(format!("invalid {}: {e}", path.display())))
}

/// The OpenAI key, which every model-backed collaborator needs.
pub fn require_api_key() -> Result<String> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(AgentsError::Configuration(
            "OPENAI_API_KEY is not set".to_string(),
        )),
    }
}
