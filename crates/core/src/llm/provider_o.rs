//! Provider O adapter — an OpenAI-compatible chat completions endpoint.
//! First in the default fallback chain (§4.2).

use std::time::Duration;

use mastery_shared::llm_http::{build_chat_request, parse_chat_content, parse_chat_usage};

use super::{Provider, RawProviderResponse};

const API_URL: &str = "https://api.provider-o.example/v1/chat/completions";

pub struct ProviderO {
    api_key: Option<String>,
    client: reqwest::Client,
}

impl ProviderO {
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key, client: reqwest::Client::new() }
    }
}

#[async_trait::async_trait]
impl Provider for ProviderO {
    fn id(&self) -> &'static str {
        "O"
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn call(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: &str,
        temperature: f32,
        max_tokens: u32,
        timeout: Duration,
    ) -> anyhow::Result<RawProviderResponse> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("provider O has no credentials configured"))?;

        let request = build_chat_request(API_URL, api_key, model, system_prompt, user_prompt, temperature, max_tokens);

        let mut req = self.client.post(&request.url).timeout(timeout);
        for (k, v) in &request.headers {
            req = req.header(k, v);
        }
        let body = request.body.unwrap_or_default();
        let response = req.body(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(anyhow::anyhow!("provider O HTTP {status}: {text}"));
        }

        let content = parse_chat_content(&text, "provider_o")?;
        let (prompt_tokens, completion_tokens) = parse_chat_usage(&text).unwrap_or((0, 0));
        Ok(RawProviderResponse { content, prompt_tokens, completion_tokens })
    }
}
