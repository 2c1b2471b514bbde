use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod models;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Body of `POST /api/chat`. Built fresh for every submission.
#[derive(Debug, Serialize, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
}

/// One line of a streamed `/api/chat` response.
#[derive(Debug, Deserialize)]
pub struct ChatStreamLine {
    pub done: bool,
    #[serde(default)]
    pub message: Option<ChatStreamMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ChatStreamMessage {
    #[serde(default)]
    pub content: String,
}

/// In-band error object Ollama emits instead of a chunk.
#[derive(Debug, Deserialize)]
pub struct ChatStreamError {
    pub error: String,
}

/// A tool the backend may call. Passed through to the request untouched.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Value,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<ModelInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chat_request_omits_tools_when_absent() {
        let request = ChatRequest {
            model: "llama3".into(),
            messages: vec![ChatMessage {
                role: "user".into(),
                content: "hi".into(),
            }],
            stream: true,
            tools: None,
        };

        let body = serde_json::to_value(&request).expect("serialize");
        assert_eq!(
            body,
            json!({
                "model": "llama3",
                "messages": [{"role": "user", "content": "hi"}],
                "stream": true
            })
        );
    }

    #[test]
    fn chat_request_passes_tool_parameters_through() {
        let parameters = json!({"type": "object", "properties": {"q": {"type": "string"}}});
        let request = ChatRequest {
            model: "llama3".into(),
            messages: Vec::new(),
            stream: true,
            tools: Some(vec![ToolDefinition {
                name: "search".into(),
                description: "Search the web".into(),
                parameters: parameters.clone(),
            }]),
        };

        let body = serde_json::to_value(&request).expect("serialize");
        assert_eq!(body["tools"][0]["name"], "search");
        assert_eq!(body["tools"][0]["parameters"], parameters);
    }

    #[test]
    fn tags_response_tolerates_missing_models() {
        let parsed: TagsResponse = serde_json::from_str("{}").expect("parse");
        assert!(parsed.models.is_empty());
    }
}
