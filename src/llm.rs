//! Chat-completions client used through [`crate::Ctx::llm`].
//!
//! ```rust,ignore
//! let reply = ctx
//!     .llm()
//!     .system("You are a careful reviewer.")
//!     .messages(state.messages())
//!     .send()?;
//! ```

use crate::config::LlmConfig;
use crate::message::{Message, Role};
use crate::tools::http_post_json;
use crate::StepError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// A function the model may call instead of answering in text.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: Value,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolChoice {
    Auto,
    Required,
    None,
}

impl ToolChoice {
    fn as_str(self) -> &'static str {
        match self {
            ToolChoice::Auto => "auto",
            ToolChoice::Required => "required",
            ToolChoice::None => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

// ---------------------------------------------------------------------------
// Request builder
// ---------------------------------------------------------------------------

pub struct LlmRequest<'a> {
    config: Option<&'a LlmConfig>,
    model: Option<String>,
    messages: Vec<Message>,
    tools: Vec<ToolSpec>,
    tool_choice: Option<ToolChoice>,
    temperature: Option<f32>,
}

impl<'a> LlmRequest<'a> {
    pub(crate) fn new(config: Option<&'a LlmConfig>) -> Self {
        Self {
            config,
            model: None,
            messages: Vec::new(),
            tools: Vec::new(),
            tool_choice: None,
            temperature: None,
        }
    }

    /// Override the configured model (the deployment name on Azure).
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn system(self, content: impl Into<String>) -> Self {
        self.message(Message::system(content))
    }

    pub fn user(self, content: impl Into<String>) -> Self {
        self.message(Message::human(content))
    }

    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn messages(mut self, messages: &[Message]) -> Self {
        self.messages.extend_from_slice(messages);
        self
    }

    pub fn tool(mut self, tool: ToolSpec) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = Some(choice);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Send and return the text of the reply.
    pub fn send(self) -> Result<String, StepError> {
        Ok(self.send_chat()?.content)
    }

    /// Send and return the full reply, including tool calls.
    pub fn send_chat(self) -> Result<ChatResponse, StepError> {
        let config = self
            .config
            .ok_or_else(|| StepError::invalid("no model configured; call Ctx::with_llm"))?;
        let model = self.model.as_deref().unwrap_or(&config.model);
        let body = self.body(model)?;
        let url = config.chat_url(model);
        let (auth_name, auth_value) = config.auth_header();

        debug!(model, messages = self.messages.len(), tools = self.tools.len(), "chat request");
        let reply = http_post_json(&url, &[(auth_name, auth_value.as_str())], &body, config.timeout)?;

        if !reply.is_success() {
            warn!(model, status = reply.status, "chat request rejected");
            return Err(status_error(reply.status, &reply.body));
        }

        parse_chat_response(&reply.body)
    }

    fn body(&self, model: &str) -> Result<Value, StepError> {
        let request = WireRequest {
            model,
            messages: self
                .messages
                .iter()
                .map(|m| WireMessage {
                    role: role_name(m.role),
                    content: &m.content,
                })
                .collect(),
            temperature: self.temperature,
            tools: self
                .tools
                .iter()
                .map(|t| WireTool {
                    kind: "function",
                    function: WireFunction {
                        name: &t.name,
                        description: &t.description,
                        parameters: &t.parameters,
                    },
                })
                .collect(),
            tool_choice: self.tool_choice.map(ToolChoice::as_str),
        };
        Ok(serde_json::to_value(request)?)
    }
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::Human => "user",
        Role::Ai => "assistant",
        Role::System => "system",
    }
}

fn status_error(status: u16, body: &str) -> StepError {
    match status {
        429 | 500..=599 => StepError::transient(format!("model returned {status}: {body}")),
        401 | 403 => StepError::invalid(format!("model rejected credentials ({status})")),
        _ => StepError::other(format!("model returned {status}: {body}")),
    }
}

pub(crate) fn parse_chat_response(body: &str) -> Result<ChatResponse, StepError> {
    let response: WireResponse = serde_json::from_str(body)?;
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| StepError::invalid("no choices in model response"))?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| {
            let arguments = serde_json::from_str(&call.function.arguments)?;
            Ok(ToolCall {
                name: call.function.name,
                arguments,
            })
        })
        .collect::<Result<Vec<_>, StepError>>()?;

    Ok(ChatResponse {
        content: choice.message.content.unwrap_or_default(),
        tool_calls,
    })
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction<'a>,
}

#[derive(Serialize)]
struct WireFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireReply,
}

#[derive(Deserialize)]
struct WireReply {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct WireToolCall {
    function: WireCall,
}

#[derive(Deserialize)]
struct WireCall {
    name: String,
    arguments: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn body_maps_roles_and_skips_unset_fields() {
        let history = [Message::human("write fizzbuzz"), Message::ai("def fizzbuzz(): ...")];
        let body = LlmRequest::new(None)
            .system("extract the code")
            .messages(&history)
            .body("gpt-4o-mini")
            .unwrap();

        assert_eq!(
            body,
            json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {"role": "system", "content": "extract the code"},
                    {"role": "user", "content": "write fizzbuzz"},
                    {"role": "assistant", "content": "def fizzbuzz(): ..."}
                ]
            })
        );
    }

    #[test]
    fn body_includes_tools_and_choice() {
        let body = LlmRequest::new(None)
            .user("hi")
            .tool(ToolSpec::new("NoCode", "no code found", json!({"type": "object"})))
            .tool_choice(ToolChoice::Required)
            .temperature(0.0)
            .body("m")
            .unwrap();

        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "NoCode");
        assert_eq!(body["tool_choice"], "required");
        assert_eq!(body["temperature"], 0.0);
    }

    #[test]
    fn parses_text_reply() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"hello"}}]}"#;
        let reply = parse_chat_response(body).unwrap();
        assert_eq!(reply.content, "hello");
        assert!(reply.tool_calls.is_empty());
    }

    #[test]
    fn parses_tool_calls_with_null_content() {
        let body = r#"{"choices":[{"message":{"content":null,"tool_calls":[
            {"id":"call_1","type":"function","function":{"name":"ExtractPythonCode","arguments":"{\"python_code\":\"print(1)\"}"}}
        ]}}]}"#;
        let reply = parse_chat_response(body).unwrap();
        assert_eq!(reply.content, "");
        assert_eq!(reply.tool_calls[0].name, "ExtractPythonCode");
        assert_eq!(reply.tool_calls[0].arguments["python_code"], "print(1)");
    }

    #[test]
    fn empty_choices_is_invalid() {
        let err = parse_chat_response(r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, StepError::Invalid(_)));
    }

    #[test]
    fn status_codes_map_to_error_kinds() {
        assert!(status_error(429, "slow down").is_transient());
        assert!(status_error(503, "").is_transient());
        assert!(matches!(status_error(401, ""), StepError::Invalid(_)));
        assert!(matches!(status_error(400, "bad"), StepError::Other(_)));
    }
}
