use crate::error::{AgentError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Function definition for the chat completions API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Function call returned by the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String, // JSON string
}

/// Message in OpenAI chat format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String, // "system", "user", "assistant"
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl LlmClient {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            temperature: 0.1,
            max_tokens: 1024,
        }
    }

    pub fn with_sampling(mut self, temperature: f64, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Call the model with function calling. When `force` names one of `functions`
    /// the model must answer with that function.
    pub async fn call_llm_with_functions(
        &self,
        messages: &[ChatMessage],
        functions: &[FunctionDefinition],
        force: Option<&str>,
    ) -> Result<FunctionCall> {
        let api_functions: Vec<serde_json::Value> = functions
            .iter()
            .map(|f| {
                serde_json::json!({
                    "name": f.name,
                    "description": f.description,
                    "parameters": f.parameters,
                })
            })
            .collect();

        let function_call = match force {
            Some(name) => serde_json::json!({ "name": name }),
            None => serde_json::json!("auto"),
        };

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "functions": api_functions,
            "function_call": function_call,
            "temperature": self.temperature,
        });

        // Set token limits
        if self.model.starts_with("gpt-4") || self.model.starts_with("gpt-5") || self.model.contains("o1") {
            body["max_completion_tokens"] = serde_json::json!(self.max_tokens);
        } else {
            body["max_tokens"] = serde_json::json!(self.max_tokens);
        }

        debug!("Calling {} with {} message(s)", self.model, messages.len());

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::Oracle(format!("LLM API call failed: {}", e)))?;

        // Check HTTP status
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AgentError::Oracle(format!(
                "LLM API error ({}): {}",
                status, error_text
            )));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AgentError::Oracle(format!("Failed to parse LLM response: {}", e)))?;

        extract_function_call(&response_json)
    }
}

fn extract_function_call(response_json: &serde_json::Value) -> Result<FunctionCall> {
    if let Some(error) = response_json.get("error") {
        return Err(AgentError::Oracle(format!("LLM API error: {}", error)));
    }

    let message = response_json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|choices| choices.first())
        .map(|choice| &choice["message"])
        .ok_or_else(|| AgentError::Oracle("No choices in LLM response".to_string()))?;

    if let Some(function_call_json) = message.get("function_call") {
        let name = function_call_json["name"]
            .as_str()
            .ok_or_else(|| AgentError::Oracle("No function name in function_call".to_string()))?
            .to_string();

        let arguments = function_call_json["arguments"]
            .as_str()
            .ok_or_else(|| AgentError::Oracle("No arguments in function_call".to_string()))?
            .to_string();

        Ok(FunctionCall { name, arguments })
    } else {
        // Model answered in prose instead of calling the function
        let content = message
            .get("content")
            .and_then(|c| c.as_str())
            .unwrap_or("");

        Err(AgentError::Oracle(format!(
            "LLM did not call a function. Response: {}",
            content
        )))
    }
}
