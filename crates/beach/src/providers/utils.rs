use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Map, Value};

use super::base::{Completion, Usage};
use crate::errors::AgentError;
use crate::models::message::Message;
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall, ToolRequest};

lazy_static! {
    static ref INVALID_NAME_CHARS: Regex = Regex::new(r"[^a-zA-Z0-9_-]").unwrap();
    static ref VALID_NAME: Regex = Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
}

/// Convert internal Message format to OpenAI's API message specification
///
/// Tool requests the model got wrong are answered inline with a `tool`
/// message carrying the error, directly after the assistant turn.
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    let mut messages_spec = Vec::new();

    for message in messages {
        let mut converted = Map::new();
        converted.insert("role".to_string(), json!(message.role));

        let mut tool_calls = Vec::new();
        let mut errors = Vec::new();
        for request in &message.tool_calls {
            match &request.tool_call {
                Ok(tool_call) => tool_calls.push(json!({
                    "id": request.id,
                    "type": "function",
                    "function": {
                        "name": sanitize_function_name(&tool_call.name),
                        "arguments": tool_call.arguments.to_string(),
                    }
                })),
                Err(e) => errors.push(json!({
                    "role": "tool",
                    "content": format!("Error: {}", e),
                    "tool_call_id": request.id
                })),
            }
        }

        if !message.content.is_empty() || tool_calls.is_empty() {
            converted.insert("content".to_string(), json!(message.content));
        }
        if !tool_calls.is_empty() {
            converted.insert("tool_calls".to_string(), json!(tool_calls));
        }
        if let Some(name) = message.name.as_ref().filter(|_| message.role != Role::Tool) {
            converted.insert("name".to_string(), json!(sanitize_function_name(name)));
        }
        if let Some(id) = &message.tool_call_id {
            converted.insert("tool_call_id".to_string(), json!(id));
        }

        // An assistant turn holding only malformed requests has nothing to send
        let only_failed_requests = message.role == Role::Assistant
            && message.content.is_empty()
            && !message.tool_calls.is_empty()
            && tool_calls.is_empty();
        if !only_failed_requests {
            messages_spec.push(Value::Object(converted));
        }
        messages_spec.extend(errors);
    }

    messages_spec
}

/// Convert internal Tool format to OpenAI's API tool specification
pub fn tools_to_openai_spec(tools: &[Tool]) -> Result<Vec<Value>> {
    let mut tool_names = std::collections::HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }

        result.push(json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.parameters,
            }
        }));
    }

    Ok(result)
}

/// Build the chat completions request body shared by every provider.
pub fn chat_payload(
    model: &str,
    messages: &[Message],
    tools: &[Tool],
    temperature: Option<f32>,
    max_tokens: Option<i32>,
) -> Result<Value> {
    let mut payload = Map::new();
    payload.insert("model".to_string(), json!(model));
    payload.insert("messages".to_string(), json!(messages_to_openai_spec(messages)));

    let tools_spec = tools_to_openai_spec(tools)?;
    if !tools_spec.is_empty() {
        payload.insert("tools".to_string(), json!(tools_spec));
    }
    if let Some(temp) = temperature {
        payload.insert("temperature".to_string(), json!(temp));
    }
    if let Some(tokens) = max_tokens {
        payload.insert("max_tokens".to_string(), json!(tokens));
    }

    Ok(Value::Object(payload))
}

/// Convert OpenAI's API response to a completion.
///
/// Any tool call in the reply makes it a `ToolCalls` completion; otherwise
/// the text content is taken as is, absent content being empty text.
pub fn openai_response_to_completion(response: &Value) -> Result<Completion> {
    let original = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| anyhow!("No message in response: {}", response))?;

    let requests: Vec<ToolRequest> = original
        .get("tool_calls")
        .and_then(|tool_calls| tool_calls.as_array())
        .map(|tool_calls| tool_calls.iter().map(parse_tool_call).collect())
        .unwrap_or_default();

    if !requests.is_empty() {
        return Ok(Completion::ToolCalls(requests));
    }

    let text = original
        .get("content")
        .and_then(|content| content.as_str())
        .unwrap_or_default();
    Ok(Completion::Text(text.to_string()))
}

fn parse_tool_call(tool_call: &Value) -> ToolRequest {
    let id = tool_call["id"].as_str().unwrap_or_default().to_string();
    let function_name = tool_call["function"]["name"]
        .as_str()
        .unwrap_or_default()
        .to_string();

    if !is_valid_function_name(&function_name) {
        let error = AgentError::ToolNotFound(format!(
            "The provided function name '{}' had invalid characters, it must match this regex [a-zA-Z0-9_-]+",
            function_name
        ));
        return ToolRequest::new(id, Err(error));
    }

    // Some servers send arguments as an object rather than an encoded string
    let arguments = match &tool_call["function"]["arguments"] {
        Value::String(encoded) => serde_json::from_str::<Value>(encoded),
        Value::Null => Ok(json!({})),
        other => Ok(other.clone()),
    };

    match arguments {
        Ok(params) => ToolRequest::new(id, Ok(ToolCall::new(function_name, params))),
        Err(e) => {
            let error = AgentError::InvalidParameters(format!(
                "Could not interpret tool use parameters for id {}: {}",
                id, e
            ));
            ToolRequest::new(id, Err(error))
        }
    }
}

pub fn get_openai_usage(data: &Value) -> Result<Usage> {
    let usage = data
        .get("usage")
        .ok_or_else(|| anyhow!("No usage data in response"))?;

    let input_tokens = usage
        .get("prompt_tokens")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32);

    let output_tokens = usage
        .get("completion_tokens")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32);

    let total_tokens = usage
        .get("total_tokens")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32)
        .or_else(|| match (input_tokens, output_tokens) {
            (Some(input), Some(output)) => Some(input + output),
            _ => None,
        });

    Ok(Usage::new(input_tokens, output_tokens, total_tokens))
}

pub fn sanitize_function_name(name: &str) -> String {
    INVALID_NAME_CHARS.replace_all(name, "_").to_string()
}

pub fn is_valid_function_name(name: &str) -> bool {
    VALID_NAME.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const OPENAI_TOOL_USE_RESPONSE: &str = r#"{
        "choices": [{
            "role": "assistant",
            "message": {
                "content": null,
                "tool_calls": [{
                    "id": "1",
                    "function": {
                        "name": "beach__tide_predictions",
                        "arguments": "{\"beach\": \"Clearwater Beach\"}"
                    }
                }]
            }
        }],
        "usage": {
            "prompt_tokens": 10,
            "completion_tokens": 25,
            "total_tokens": 35
        }
    }"#;

    fn beach_tool(name: &str) -> Tool {
        Tool::new(
            name,
            "Look up a beach",
            json!({
                "type": "object",
                "properties": {
                    "beach": {"type": "string", "description": "Beach name"}
                },
                "required": ["beach"]
            }),
        )
    }

    #[test]
    fn test_messages_to_openai_spec() {
        let spec = messages_to_openai_spec(&[Message::system("Be brief."), Message::user("Hello")]);

        assert_eq!(spec.len(), 2);
        assert_eq!(spec[0], json!({"role": "system", "content": "Be brief."}));
        assert_eq!(spec[1], json!({"role": "user", "content": "Hello"}));
    }

    #[test]
    fn test_messages_to_openai_spec_tool_round() {
        let messages = vec![
            Message::user("When is high tide at Clearwater Beach?"),
            Message::assistant("").with_tool_calls(vec![ToolRequest::new(
                "call_1",
                Ok(ToolCall::new("beach__tide_predictions", json!({"beach": "Clearwater Beach"}))),
            )]),
            Message::tool("beach__tide_predictions", "call_1", "[]"),
        ];

        let spec = messages_to_openai_spec(&messages);

        assert_eq!(spec.len(), 3);
        assert_eq!(spec[1]["role"], "assistant");
        assert!(spec[1].get("content").is_none());
        assert_eq!(spec[1]["tool_calls"][0]["function"]["name"], "beach__tide_predictions");
        assert_eq!(
            spec[1]["tool_calls"][0]["function"]["arguments"],
            "{\"beach\":\"Clearwater Beach\"}"
        );
        assert_eq!(spec[2]["role"], "tool");
        assert_eq!(spec[2]["tool_call_id"], spec[1]["tool_calls"][0]["id"]);
        assert_eq!(spec[2]["content"], "[]");
    }

    #[test]
    fn test_messages_to_openai_spec_failed_request() {
        let messages = vec![Message::assistant("").with_tool_calls(vec![ToolRequest::new(
            "call_1",
            Err(AgentError::InvalidParameters("bad json".to_string())),
        )])];

        let spec = messages_to_openai_spec(&messages);

        assert_eq!(spec.len(), 1);
        assert_eq!(spec[0]["role"], "tool");
        assert_eq!(spec[0]["tool_call_id"], "call_1");
        assert_eq!(spec[0]["content"], "Error: Invalid parameters: bad json");
    }

    #[test]
    fn test_tools_to_openai_spec() -> Result<()> {
        let spec = tools_to_openai_spec(&[beach_tool("beach__weather")])?;

        assert_eq!(spec.len(), 1);
        assert_eq!(spec[0]["type"], "function");
        assert_eq!(spec[0]["function"]["name"], "beach__weather");
        assert_eq!(spec[0]["function"]["parameters"]["required"], json!(["beach"]));
        Ok(())
    }

    #[test]
    fn test_tools_to_openai_spec_duplicate() {
        let result = tools_to_openai_spec(&[beach_tool("dup"), beach_tool("dup")]);
        assert!(result.unwrap_err().to_string().contains("Duplicate tool name"));
    }

    #[test]
    fn test_chat_payload_omits_unset_options() -> Result<()> {
        let payload = chat_payload("llama3.2", &[Message::user("Hi")], &[], None, None)?;
        assert_eq!(payload["model"], "llama3.2");
        assert!(payload.get("tools").is_none());
        assert!(payload.get("temperature").is_none());
        assert!(payload.get("max_tokens").is_none());

        let payload = chat_payload("llama3.2", &[], &[beach_tool("t")], Some(0.5), Some(1000))?;
        assert_eq!(payload["temperature"], json!(0.5));
        assert_eq!(payload["max_tokens"], json!(1000));
        assert_eq!(payload["tools"].as_array().map(Vec::len), Some(1));
        Ok(())
    }

    #[test]
    fn test_sanitize_function_name() {
        assert_eq!(sanitize_function_name("hello-world"), "hello-world");
        assert_eq!(sanitize_function_name("hello world"), "hello_world");
        assert_eq!(sanitize_function_name("hello@world"), "hello_world");
    }

    #[test]
    fn test_is_valid_function_name() {
        assert!(is_valid_function_name("beach__weather"));
        assert!(!is_valid_function_name("hello world"));
        assert!(!is_valid_function_name(""));
    }

    #[test]
    fn test_response_to_completion_text() -> Result<()> {
        let response = json!({
            "choices": [{"message": {"role": "assistant", "content": "Surf's up!"}}]
        });
        assert_eq!(
            openai_response_to_completion(&response)?,
            Completion::Text("Surf's up!".to_string())
        );

        let response = json!({"choices": [{"message": {"content": null}}]});
        assert_eq!(openai_response_to_completion(&response)?, Completion::Text(String::new()));
        Ok(())
    }

    #[test]
    fn test_response_to_completion_tool_calls() -> Result<()> {
        let response: Value = serde_json::from_str(OPENAI_TOOL_USE_RESPONSE)?;

        match openai_response_to_completion(&response)? {
            Completion::ToolCalls(requests) => {
                assert_eq!(requests.len(), 1);
                let tool_call = requests[0].tool_call.as_ref().unwrap();
                assert_eq!(tool_call.name, "beach__tide_predictions");
                assert_eq!(tool_call.arguments, json!({"beach": "Clearwater Beach"}));
            }
            other => panic!("Expected tool calls, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_response_to_completion_invalid_func_name() -> Result<()> {
        let mut response: Value = serde_json::from_str(OPENAI_TOOL_USE_RESPONSE)?;
        response["choices"][0]["message"]["tool_calls"][0]["function"]["name"] = json!("invalid fn");

        let Completion::ToolCalls(requests) = openai_response_to_completion(&response)? else {
            panic!("Expected tool calls");
        };
        match &requests[0].tool_call {
            Err(AgentError::ToolNotFound(msg)) => assert!(msg.starts_with("The provided function name")),
            other => panic!("Expected ToolNotFound error, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_response_to_completion_json_decode_error() -> Result<()> {
        let mut response: Value = serde_json::from_str(OPENAI_TOOL_USE_RESPONSE)?;
        response["choices"][0]["message"]["tool_calls"][0]["function"]["arguments"] = json!("invalid json {");

        let Completion::ToolCalls(requests) = openai_response_to_completion(&response)? else {
            panic!("Expected tool calls");
        };
        match &requests[0].tool_call {
            Err(AgentError::InvalidParameters(msg)) => {
                assert!(msg.starts_with("Could not interpret tool use parameters"))
            }
            other => panic!("Expected InvalidParameters error, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_response_without_choices_is_error() {
        assert!(openai_response_to_completion(&json!({"error": "boom"})).is_err());
    }

    #[test]
    fn test_usage_totals_fall_back_to_sum() -> Result<()> {
        let usage = get_openai_usage(&json!({
            "usage": {"prompt_tokens": 4, "completion_tokens": 6}
        }))?;
        assert_eq!(usage.total_tokens, Some(10));
        assert!(get_openai_usage(&json!({})).is_err());
        Ok(())
    }
}
