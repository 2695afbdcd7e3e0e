//! Error types for the customer-service desk

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for the desk
pub type Result<T> = std::result::Result<T, AgentsError>;

/// External capability a turn depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collaborator {
    LanguageModel,
    RecordStore,
    SimilaritySearch,
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Collaborator::LanguageModel => "language model",
            Collaborator::RecordStore => "record store",
            Collaborator::SimilaritySearch => "similarity search",
        };
        f.write_str(name)
    }
}

/// Coarse classification used by callers to decide how to surface a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    GuardrailTripped,
    ToolPrecondition,
    CollaboratorUnavailable,
    Configuration,
    Internal,
}

/// Main error type for the desk
#[derive(Debug, Error)]
pub enum AgentsError {
    /// An input guardrail set its tripwire
    #[error("Guardrail '{guardrail}' tripped: {reasoning}")]
    GuardrailTripped { guardrail: String, reasoning: String },

    /// A tool's input or state precondition failed
    #[error("{message}")]
    ToolPrecondition { tool: String, message: String },

    /// Tool arguments did not decode into the declared parameters
    #[error("Invalid arguments for tool '{tool}': {message}")]
    InvalidToolArguments { tool: String, message: String },

    /// The active agent called a tool it is not allowed to use
    #[error("Tool '{tool}' is not available to {agent}")]
    ToolNotPermitted { tool: String, agent: String },

    /// The model asked for a tool nobody registered
    #[error("Unknown tool: {tool}")]
    UnknownTool { tool: String },

    /// An external capability failed
    #[error("{collaborator} unavailable: {message}")]
    CollaboratorUnavailable {
        collaborator: Collaborator,
        message: String,
    },

    /// An external capability did not answer in time
    #[error("{collaborator} timed out after {after:?}")]
    Timeout {
        collaborator: Collaborator,
        after: Duration,
    },

    /// A tool with no external collaborator did not finish in time
    #[error("Tool '{tool}' timed out after {after:?}")]
    ToolTimeout { tool: String, after: Duration },

    /// A tool failed with an error outside the desk's taxonomy
    #[error("Tool '{tool}' failed: {message}")]
    ToolFailed { tool: String, message: String },

    /// Model output did not match what was asked of it
    #[error("Model behavior error: {message}")]
    ModelBehaviorError { message: String },

    /// Handoff error
    #[error("Handoff error: {message}")]
    HandoffError { message: String },

    /// Too many reasoning steps within one turn
    #[error("Maximum turns exceeded: {max_turns}")]
    MaxTurnsExceeded { max_turns: usize },

    /// Missing or invalid startup configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error from the OpenAI API
    #[error("OpenAI API error: {0}")]
    OpenAIError(#[from] async_openai::error::OpenAIError),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// Config file parse error
    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl AgentsError {
    pub fn precondition(tool: impl Into<String>, message: impl Into<String>) -> Self {
        AgentsError::ToolPrecondition {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn unavailable(collaborator: Collaborator, message: impl fmt::Display) -> Self {
        AgentsError::CollaboratorUnavailable {
            collaborator,
            message: message.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            AgentsError::GuardrailTripped { .. } => ErrorCategory::GuardrailTripped,
            AgentsError::ToolPrecondition { .. }
            | AgentsError::InvalidToolArguments { .. }
            | AgentsError::ToolNotPermitted { .. }
            | AgentsError::UnknownTool { .. } => ErrorCategory::ToolPrecondition,
            AgentsError::CollaboratorUnavailable { .. }
            | AgentsError::Timeout { .. }
            | AgentsError::ToolTimeout { .. }
            | AgentsError::ModelBehaviorError { .. }
            | AgentsError::OpenAIError(_)
            | AgentsError::DatabaseError(_) => ErrorCategory::CollaboratorUnavailable,
            AgentsError::Configuration(_) | AgentsError::TomlError(_) => {
                ErrorCategory::Configuration
            }
            AgentsError::HandoffError { .. }
            | AgentsError::ToolFailed { .. }
            | AgentsError::MaxTurnsExceeded { .. }
            | AgentsError::SerializationError(_)
            | AgentsError::IoError(_) => ErrorCategory::Internal,
        }
    }

    /// Recoverable errors are handed back to the active agent as tool output.
    pub fn is_recoverable(&self) -> bool {
        self.category() == ErrorCategory::ToolPrecondition
    }
}
