//! Shared utilities for OpenAI-compatible chat completion HTTP calls.
//!
//! These free functions are used by every provider adapter in the gateway
//! (`mastery_core::llm`) so the request-building and response-parsing logic
//! is written once.

use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

use serde::{Deserialize, Serialize};

/// Build an `HttpRequest` for an OpenAI-compatible chat completions endpoint.
pub fn build_chat_request(
    url: &str,
    api_key: &str,
    model_id: &str,
    system_prompt: &str,
    user_prompt: &str,
    temperature: f32,
    max_tokens: u32,
) -> HttpRequest {
    let body = serde_json::json!({
        "model": model_id,
        "messages": [
            { "role": "system", "content": system_prompt },
            { "role": "user", "content": user_prompt },
        ],
        "temperature": temperature,
        "max_tokens": max_tokens,
        "stream": false,
    });

    let mut headers = HashMap::new();
    headers.insert("Authorization".to_string(), format!("Bearer {}", api_key));
    headers.insert("Content-Type".to_string(), "application/json".to_string());

    HttpRequest {
        method: "POST".to_string(),
        url: url.to_string(),
        headers,
        body: Some(body.to_string()),
    }
}

/// Parse a chat completions response body, extracting the raw text content.
///
/// Returns an error if the API returned an error object or the response is
/// malformed (missing `choices[0].message.content`).
pub fn parse_chat_content(response_body: &str, provider_name: &str) -> anyhow::Result<String> {
    let json: serde_json::Value = serde_json::from_str(response_body)?;

    if let Some(error) = json.get("error") {
        let msg = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error");
        return Err(anyhow::anyhow!("{} API Error: {}", provider_name, msg));
    }

    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Invalid {} API response: missing choices[0].message.content",
                provider_name
            )
        })
}

/// Extract token usage (prompt, completion) from a chat completions response, if present.
pub fn parse_chat_usage(response_body: &str) -> Option<(u64, u64)> {
    let json: serde_json::Value = serde_json::from_str(response_body).ok()?;
    let usage = json.get("usage")?;
    let prompt = usage.get("prompt_tokens")?.as_u64()?;
    let completion = usage.get("completion_tokens")?.as_u64()?;
    Some((prompt, completion))
}

/// Strip Markdown code fences (` ```json ... ``` ` or ` ``` ... ``` `) that
/// providers routinely wrap JSON responses in before returning plain prose.
///
/// Mirrors the original evaluator's `_clean_json_response`: strips a leading
/// fenced-block opener (optionally tagged `json`) and a trailing closing
/// fence, then trims whitespace. Content with no fences passes through
/// unchanged.
pub fn strip_json_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_open = if let Some(rest) = trimmed.strip_prefix("```json") {
        rest
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        rest
    } else {
        trimmed
    };
    let without_open = without_open.trim_start();
    let without_close = without_open
        .strip_suffix("```")
        .unwrap_or(without_open);
    without_close.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_tagged_fence() {
        let raw = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_json_fences(raw), "{\"a\": 1}");
    }

    #[test]
    fn strips_bare_fence() {
        let raw = "```\n{\"a\": 1}\n```";
        assert_eq!(strip_json_fences(raw), "{\"a\": 1}");
    }

    #[test]
    fn passes_through_unfenced() {
        let raw = "{\"a\": 1}";
        assert_eq!(strip_json_fences(raw), "{\"a\": 1}");
    }

    #[test]
    fn parse_chat_content_surfaces_api_error() {
        let body = r#"{"error": {"message": "rate limited"}}"#;
        let err = parse_chat_content(body, "provider_o").unwrap_err();
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn parse_chat_content_extracts_text() {
        let body = r#"{"choices": [{"message": {"content": "hello"}}]}"#;
        assert_eq!(parse_chat_content(body, "provider_o").unwrap(), "hello");
    }
}
