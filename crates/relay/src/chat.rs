//! `POST /api/openai`: forwards chat messages to the completion endpoint

use crate::error::ChatError;
use crate::state::RelayState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Body accepted from the front end
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// Falls back to the configured model when absent
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

/// Body sent upstream
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

pub(crate) async fn chat_completion(
    State(state): State<RelayState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<Value>, ChatError> {
    let config = state.config();
    let Some(api_key) = state.api_key() else {
        log::error!(
            "No upstream API key; set the {} environment variable",
            config.api_key_env
        );
        return Err(ChatError::Setup);
    };

    let model = request
        .model
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or(&config.model);
    let body = CompletionRequest {
        model,
        messages: &request.messages,
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    };

    log::debug!(
        "Relaying {} messages to {} (model {})",
        request.messages.len(),
        config.upstream_url,
        model
    );

    let response = state
        .client()
        .post(&config.upstream_url)
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .await
        .map_err(|e| {
            log::error!("Error communicating with completion API: {}", e);
            ChatError::from_transport(&e)
        })?;

    let status = response.status();
    let bytes = response.bytes().await.map_err(|e| {
        log::error!("Completion API response was cut short: {}", e);
        ChatError::NoResponse
    })?;
    let payload = serde_json::from_slice::<Value>(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

    if !status.is_success() {
        log::warn!("Completion API answered {}", status);
        return Err(ChatError::Upstream {
            status,
            body: payload,
        });
    }

    Ok(Json(payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_model_is_optional() {
        let request: ChatRequest =
            serde_json::from_str(r#"{"messages": [{"role": "user", "content": "hi"}]}"#).unwrap();
        assert!(request.model.is_none());
        assert_eq!(request.messages[0].role, "user");
    }

    #[test]
    fn test_upstream_body_shape() {
        let messages = vec![ChatMessage {
            role: "user".to_string(),
            content: "What is phishing?".to_string(),
        }];
        let body = CompletionRequest {
            model: "gpt-3.5-turbo",
            messages: &messages,
            temperature: 0.7,
            max_tokens: 150,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["max_tokens"], 150);
        assert_eq!(value["messages"][0]["content"], "What is phishing?");
    }
}
