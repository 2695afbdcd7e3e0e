//! Model abstraction for LLM interactions
//!
//! Wraps the async-openai crate behind [`ModelProvider`]: instructions plus
//! history (plus optional tool declarations and output schema) in, free text,
//! tool calls, or schema-conforming JSON out.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
        ChatCompletionTool, ChatCompletionToolArgs, ChatCompletionToolType,
        CreateChatCompletionRequestArgs, FunctionCall, FunctionObjectArgs, ResponseFormat,
        ResponseFormatJsonSchema,
    },
    Client,
};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::error::{AgentsError, Collaborator, Result};
use crate::items::{Message, ModelResponse, Role, ToolCall};
use crate::tool::{schema_of, ToolSpec};
use crate::usage::Usage;

/// A JSON schema the reply must conform to.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    pub name: String,
    pub schema: Value,
}

impl OutputSchema {
    pub fn of<T: JsonSchema>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: schema_of::<T>(),
        }
    }

    /// Decode a structured reply. Anything malformed is a model fault.
    pub fn decode<T: DeserializeOwned>(&self, response: &ModelResponse) -> Result<T> {
        let raw = response
            .content
            .as_deref()
            .ok_or_else(|| AgentsError::ModelBehaviorError {
                message: format!("no content for structured output '{}'", self.name),
            })?;
        serde_json::from_str(raw).map_err(|e| AgentsError::ModelBehaviorError {
            message: format!("malformed '{}' output: {e}", self.name),
        })
    }
}

/// One call to the language capability.
#[derive(Debug, Clone, Default)]
pub struct ModelRequest {
    pub instructions: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolSpec>,
    pub output_schema: Option<OutputSchema>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ModelRequest {
    pub fn new(instructions: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            instructions: instructions.into(),
            messages,
            ..Self::default()
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_output_schema(mut self, schema: OutputSchema) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Trait for model providers
#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn complete(&self, request: ModelRequest) -> Result<(ModelResponse, Usage)>;

    fn model_name(&self) -> &str;
}

/// OpenAI model provider using async-openai
pub struct OpenAIProvider {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAIProvider {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            model: model.into(),
        }
    }

    pub fn with_client(client: Client<OpenAIConfig>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    fn convert_message(
        &self,
        msg: &Message,
    ) -> std::result::Result<ChatCompletionRequestMessage, OpenAIError> {
        Ok(match msg.role {
            Role::System => ChatCompletionRequestSystemMessageArgs::default()
                .content(msg.content.clone())
                .build()?
                .into(),
            Role::User => ChatCompletionRequestUserMessageArgs::default()
                .content(msg.content.clone())
                .build()?
                .into(),
            Role::Assistant => {
                let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
                builder.content(msg.content.clone());
                if let Some(tool_calls) = &msg.tool_calls {
                    let openai_tool_calls: Vec<_> = tool_calls
                        .iter()
                        .map(|tc| ChatCompletionMessageToolCall {
                            id: tc.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: tc.name.clone(),
                                arguments: tc.arguments.to_string(),
                            },
                        })
                        .collect();
                    builder.tool_calls(openai_tool_calls);
                }
                builder.build()?.into()
            }
            Role::Tool => ChatCompletionRequestToolMessageArgs::default()
                .content(msg.content.clone())
                .tool_call_id(msg.tool_call_id.clone().unwrap_or_default())
                .build()?
                .into(),
        })
    }

    fn convert_tools(
        &self,
        tools: &[ToolSpec],
    ) -> std::result::Result<Vec<ChatCompletionTool>, OpenAIError> {
        tools
            .iter()
            .map(|tool| {
                ChatCompletionToolArgs::default()
                    .r#type(ChatCompletionToolType::Function)
                    .function(
                        FunctionObjectArgs::default()
                            .name(tool.name.clone())
                            .description(tool.description.clone())
                            .parameters(tool.parameters.clone())
                            .build()?,
                    )
                    .build()
            })
            .collect()
    }
}

#[async_trait]
impl ModelProvider for OpenAIProvider {
    async fn complete(&self, request: ModelRequest) -> Result<(ModelResponse, Usage)> {
        let mut openai_messages = Vec::with_capacity(request.messages.len() + 1);
        openai_messages.push(self.convert_message(&Message::system(request.instructions.clone()))?);
        for msg in &request.messages {
            openai_messages.push(self.convert_message(msg)?);
        }

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model).messages(openai_messages);

        if !request.tools.is_empty() {
            args.tools(self.convert_tools(&request.tools)?);
        }
        if let Some(schema) = &request.output_schema {
            args.response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    description: None,
                    name: schema.name.clone(),
                    schema: Some(schema.schema.clone()),
                    strict: None,
                },
            });
        }
        if let Some(temp) = request.temperature {
            args.temperature(temp);
        }
        if let Some(max) = request.max_tokens {
            args.max_tokens(max);
        }

        let response = self
            .client
            .chat()
            .create(args.build()?)
            .await
            .map_err(|e| AgentsError::unavailable(Collaborator::LanguageModel, e))?;

        let choice = response
            .choices
            .first()
            .ok_or_else(|| AgentsError::ModelBehaviorError {
                message: "No choices in response".to_string(),
            })?;

        let tool_calls = choice
            .message
            .tool_calls
            .iter()
            .flatten()
            .map(|tc| {
                let raw = tc.function.arguments.trim();
                let arguments = if raw.is_empty() {
                    Value::Object(Default::default())
                } else {
                    serde_json::from_str(raw).unwrap_or_else(|e| {
                        warn!(tool = %tc.function.name, error = %e, "unparseable tool arguments");
                        Value::String(tc.function.arguments.clone())
                    })
                };
                ToolCall {
                    id: tc.id.clone(),
                    name: tc.function.name.clone(),
                    arguments,
                }
            })
            .collect();

        let model_response = ModelResponse {
            id: response.id.clone(),
            content: choice.message.content.clone(),
            tool_calls,
            finish_reason: choice.finish_reason.as_ref().map(|r| format!("{:?}", r)),
            created_at: chrono::Utc::now(),
        };

        let usage = match response.usage {
            Some(usage) => Usage::new(
                usage.prompt_tokens as usize,
                usage.completion_tokens as usize,
            ),
            None => Usage::empty(),
        };

        Ok((model_response, usage))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

enum Scripted {
    Response(ModelResponse),
    Unavailable(String),
    Stall,
}

/// Scripted provider for tests and offline runs.
///
/// Responses are handed out in the order they were queued. Every request is
/// recorded so callers can inspect what the model was shown.
pub struct MockProvider {
    model: String,
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl MockProvider {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn push(self, step: Scripted) -> Self {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(step);
        self
    }

    pub fn with_response(self, response: ModelResponse) -> Self {
        self.push(Scripted::Response(response))
    }

    pub fn with_message(self, content: impl Into<String>) -> Self {
        self.with_response(ModelResponse::new_message(content))
    }

    pub fn with_tool_call(self, tool_name: impl Into<String>, args: Value) -> Self {
        self.with_tool_calls(vec![ToolCall::new(tool_name, args)])
    }

    pub fn with_tool_calls(self, calls: Vec<ToolCall>) -> Self {
        self.with_response(ModelResponse::new_tool_calls(calls))
    }

    /// Queue a structured reply serialized from `value`.
    pub fn with_json(self, value: Value) -> Self {
        self.with_message(value.to_string())
    }

    pub fn with_outage(self, message: impl Into<String>) -> Self {
        self.push(Scripted::Unavailable(message.into()))
    }

    /// Queue a call that never completes.
    pub fn with_stall(self) -> Self {
        self.push(Scripted::Stall)
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    async fn complete(&self, request: ModelRequest) -> Result<(ModelResponse, Usage)> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);
        let step = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match step {
            Some(Scripted::Response(response)) => Ok((response, Usage::new(10, 5))),
            Some(Scripted::Unavailable(message)) => {
                Err(AgentsError::unavailable(Collaborator::LanguageModel, message))
            }
            Some(Scripted::Stall) => futures::future::pending().await,
            None => Err(AgentsError::ModelBehaviorError {
                message: "mock provider has no scripted response".to_string(),
            }),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
