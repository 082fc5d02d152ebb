//! `OpenAI` provider implementation using the `async-openai` crate.
//!
//! Works with any `OpenAI`-compatible API (`OpenAI`, Azure `OpenAI` behind a
//! compatible gateway, local proxies) via the base URL in [`LlmConfig`].

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessage,
    ChatCompletionRequestAssistantMessageContent, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessage, ChatCompletionRequestSystemMessageContent,
    ChatCompletionRequestToolMessage, ChatCompletionRequestToolMessageContent,
    ChatCompletionRequestUserMessage, ChatCompletionRequestUserMessageContent, ChatCompletionTool,
    ChatCompletionToolType, CreateChatCompletionRequest, CreateChatCompletionResponse,
    FinishReason, FunctionCall, FunctionObject,
};
use async_trait::async_trait;
use tracing::debug;

use crate::agent::message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
use crate::agent::provider::LlmProvider;
use crate::agent::tool::ToolCall;
use crate::config::LlmConfig;
use crate::error::ToolError;

/// `OpenAI`-compatible chat provider.
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
}

impl OpenAiProvider {
    /// Creates a provider from LLM configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::ApiRequest`] if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, ToolError> {
        let mut openai_config = OpenAIConfig::new().with_api_key(&config.api_key);
        if let Some(ref base_url) = config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        let http = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client: Client::with_config(openai_config).with_http_client(http),
        })
    }

    /// Converts our message type to the SDK type.
    fn convert_message(msg: &ChatMessage) -> ChatCompletionRequestMessage {
        match msg.role {
            Role::System => {
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(msg.content.clone()),
                    name: None,
                })
            }
            Role::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
                name: None,
            }),
            Role::Assistant => {
                #[allow(deprecated)]
                ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                    content: (!msg.content.is_empty()).then(|| {
                        ChatCompletionRequestAssistantMessageContent::Text(msg.content.clone())
                    }),
                    name: None,
                    tool_calls: (!msg.tool_calls.is_empty())
                        .then(|| msg.tool_calls.iter().map(sdk_tool_call).collect()),
                    refusal: None,
                    audio: None,
                    function_call: None,
                })
            }
            Role::Tool => ChatCompletionRequestMessage::Tool(ChatCompletionRequestToolMessage {
                content: ChatCompletionRequestToolMessageContent::Text(msg.content.clone()),
                tool_call_id: msg.tool_call_id.clone().unwrap_or_default(),
            }),
        }
    }

    /// Builds the SDK request from our request.
    fn build_request(request: &ChatRequest) -> CreateChatCompletionRequest {
        let messages = request.messages.iter().map(Self::convert_message).collect();

        let tools = (!request.tools.is_empty()).then(|| {
            request
                .tools
                .iter()
                .map(|td| ChatCompletionTool {
                    r#type: ChatCompletionToolType::Function,
                    function: FunctionObject {
                        name: td.name.clone(),
                        description: Some(td.description.clone()),
                        parameters: Some(td.parameters.clone()),
                        strict: None,
                    },
                })
                .collect()
        });

        CreateChatCompletionRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            max_completion_tokens: request.max_tokens,
            tools,
            ..Default::default()
        }
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("client", &"<async-openai::Client>")
            .finish()
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ToolError> {
        let response = self
            .client
            .chat()
            .create(Self::build_request(request))
            .await?;
        let response = from_sdk_response(response);

        debug!(
            model = %request.model,
            total_tokens = response.usage.total_tokens,
            tool_calls = response.tool_calls.len(),
            finish_reason = ?response.finish_reason,
            "Chat completion"
        );
        Ok(response)
    }
}

fn sdk_tool_call(call: &ToolCall) -> ChatCompletionMessageToolCall {
    ChatCompletionMessageToolCall {
        id: call.id.clone(),
        r#type: ChatCompletionToolType::Function,
        function: FunctionCall {
            name: call.name.clone(),
            arguments: call.arguments.clone(),
        },
    }
}

const fn finish_reason_name(reason: &FinishReason) -> &'static str {
    match reason {
        FinishReason::Stop => "stop",
        FinishReason::Length => "length",
        FinishReason::ToolCalls => "tool_calls",
        FinishReason::ContentFilter => "content_filter",
        FinishReason::FunctionCall => "function_call",
    }
}

/// Reads the first choice of a completion. A response without choices is an
/// empty answer rather than an error.
fn from_sdk_response(response: CreateChatCompletionResponse) -> ChatResponse {
    let usage = response.usage.map_or_else(TokenUsage::default, |u| TokenUsage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    let Some(choice) = response.choices.into_iter().next() else {
        return ChatResponse {
            usage,
            ..ChatResponse::default()
        };
    };

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| ToolCall {
            id: tc.id,
            name: tc.function.name,
            arguments: tc.function.arguments,
        })
        .collect();

    ChatResponse {
        content: choice.message.content.unwrap_or_default(),
        usage,
        tool_calls,
        finish_reason: choice
            .finish_reason
            .map(|r| finish_reason_name(&r).to_string()),
    }
}
