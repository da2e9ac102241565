//! LLM Gateway (§4.2): provider-agnostic call with ordered fallback,
//! response sanitization, and cost estimation. No response caching; safe for
//! concurrent calls.

mod provider_a;
mod provider_g;
mod provider_o;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::config_store::LlmSettings;

/// A single provider adapter's uniform call contract.
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    fn id(&self) -> &'static str;
    fn is_available(&self) -> bool;
    async fn call(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: &str,
        temperature: f32,
        max_tokens: u32,
        timeout: Duration,
    ) -> anyhow::Result<RawProviderResponse>;
}

pub struct RawProviderResponse {
    pub content: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub content: String,
    pub provider: String,
    pub model: String,
    pub success: bool,
    pub tokens_used: u64,
    pub cost_estimate: f64,
    pub duration_ms: u64,
    pub error: Option<String>,
}

pub struct Gateway {
    providers: HashMap<&'static str, Box<dyn Provider>>,
}

impl Gateway {
    pub fn new(a_key: Option<String>, o_key: Option<String>, g_key: Option<String>) -> Self {
        let mut providers: HashMap<&'static str, Box<dyn Provider>> = HashMap::new();
        providers.insert("A", Box::new(provider_a::ProviderA::new(a_key)));
        providers.insert("O", Box::new(provider_o::ProviderO::new(o_key)));
        providers.insert("G", Box::new(provider_g::ProviderG::new(g_key)));
        Self { providers }
    }

    /// Call the fallback chain in order, skipping unavailable providers.
    /// Returns the first sanitized, non-empty success; `success=false` with
    /// the last error only after every provider in the chain has failed.
    pub async fn call(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        settings: &LlmSettings,
        phase: &str,
    ) -> GatewayResponse {
        let mut last_error = "no providers configured".to_string();

        for provider_id in &settings.fallback_chain {
            let Some(provider) = self.providers.get(provider_id.as_str()) else {
                continue;
            };
            if !provider.is_available() {
                continue;
            }

            let phase_settings = settings
                .phase_settings
                .get(provider_id.as_str())
                .and_then(|p| p.get(phase));
            let Some(phase_settings) = phase_settings else {
                warn!(provider = provider_id, phase, "no phase settings configured; skipping provider");
                continue;
            };

            let start = Instant::now();
            let result = provider
                .call(
                    system_prompt,
                    user_prompt,
                    &phase_settings.default_model,
                    phase_settings.temperature,
                    phase_settings.max_tokens,
                    Duration::from_secs(phase_settings.timeout_secs),
                )
                .await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(raw) => {
                    let sanitized = mastery_shared::llm_http::strip_json_fences(&raw.content);
                    if sanitized.is_empty() {
                        warn!(provider = provider_id, phase, "empty content after sanitization; falling back");
                        last_error = format!("provider {provider_id} returned empty content");
                        continue;
                    }
                    let cost_estimate = estimate_cost(settings, provider_id, raw.prompt_tokens, raw.completion_tokens);
                    return GatewayResponse {
                        content: sanitized,
                        provider: provider_id.clone(),
                        model: phase_settings.default_model.clone(),
                        success: true,
                        tokens_used: raw.prompt_tokens + raw.completion_tokens,
                        cost_estimate,
                        duration_ms,
                        error: None,
                    };
                }
                Err(e) => {
                    warn!(provider = provider_id, phase, error = %e, "provider call failed; falling back");
                    last_error = e.to_string();
                }
            }
        }

        GatewayResponse {
            content: String::new(),
            provider: "none".to_string(),
            model: String::new(),
            success: false,
            tokens_used: 0,
            cost_estimate: 0.0,
            duration_ms: 0,
            error: Some(last_error),
        }
    }
}

/// If a provider omits token counts, estimate conservatively from a rough
/// default (1000 input / 500 output) per §4.2.
fn estimate_cost(settings: &LlmSettings, provider_id: &str, prompt_tokens: u64, completion_tokens: u64) -> f64 {
    let Some(rate) = settings.rates.get(provider_id) else {
        return 0.0;
    };
    let (input_tokens, output_tokens) = if prompt_tokens == 0 && completion_tokens == 0 {
        (1000u64, 500u64)
    } else {
        (prompt_tokens, completion_tokens)
    };
    (input_tokens as f64 / 1000.0) * rate.input_per_1k + (output_tokens as f64 / 1000.0) * rate.output_per_1k
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StubProvider {
        id: &'static str,
        available: bool,
        calls: Arc<AtomicUsize>,
        outcome: fn() -> anyhow::Result<RawProviderResponse>,
    }

    #[async_trait::async_trait]
    impl Provider for StubProvider {
        fn id(&self) -> &'static str {
            self.id
        }
        fn is_available(&self) -> bool {
            self.available
        }
        async fn call(
            &self,
            _system_prompt: &str,
            _user_prompt: &str,
            _model: &str,
            _temperature: f32,
            _max_tokens: u32,
            _timeout: Duration,
        ) -> anyhow::Result<RawProviderResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }
    }

    fn settings_for(chain: &[&str]) -> LlmSettings {
        let mut settings = LlmSettings::default();
        settings.fallback_chain = chain.iter().map(|s| s.to_string()).collect();
        settings
    }

    #[tokio::test]
    async fn falls_back_to_next_provider_on_failure() {
        let o_calls = Arc::new(AtomicUsize::new(0));
        let a_calls = Arc::new(AtomicUsize::new(0));

        let mut gateway = Gateway { providers: HashMap::new() };
        gateway.providers.insert(
            "O",
            Box::new(StubProvider {
                id: "O",
                available: true,
                calls: o_calls.clone(),
                outcome: || Err(anyhow::anyhow!("provider O exploded")),
            }),
        );
        gateway.providers.insert(
            "A",
            Box::new(StubProvider {
                id: "A",
                available: true,
                calls: a_calls.clone(),
                outcome: || {
                    Ok(RawProviderResponse {
                        content: "{\"ok\": true}".to_string(),
                        prompt_tokens: 10,
                        completion_tokens: 5,
                    })
                },
            }),
        );

        let settings = settings_for(&["O", "A"]);
        let response = gateway.call("sys", "user", &settings, "combined").await;

        assert!(response.success);
        assert_eq!(response.provider, "A");
        assert_eq!(o_calls.load(Ordering::SeqCst), 1);
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn all_providers_failing_yields_aggregate_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut gateway = Gateway { providers: HashMap::new() };
        for id in ["O", "A", "G"] {
            gateway.providers.insert(
                id,
                Box::new(StubProvider {
                    id: Box::leak(id.to_string().into_boxed_str()),
                    available: true,
                    calls: calls.clone(),
                    outcome: || Err(anyhow::anyhow!("down")),
                }),
            );
        }

        let settings = settings_for(&["O", "A", "G"]);
        let response = gateway.call("sys", "user", &settings, "combined").await;

        assert!(!response.success);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn unavailable_provider_never_called() {
        let o_calls = Arc::new(AtomicUsize::new(0));
        let a_calls = Arc::new(AtomicUsize::new(0));
        let mut gateway = Gateway { providers: HashMap::new() };
        gateway.providers.insert(
            "O",
            Box::new(StubProvider {
                id: "O",
                available: false,
                calls: o_calls.clone(),
                outcome: || Err(anyhow::anyhow!("should never run")),
            }),
        );
        gateway.providers.insert(
            "A",
            Box::new(StubProvider {
                id: "A",
                available: true,
                calls: a_calls.clone(),
                outcome: || {
                    Ok(RawProviderResponse {
                        content: "```json\n{\"ok\": true}\n```".to_string(),
                        prompt_tokens: 0,
                        completion_tokens: 0,
                    })
                },
            }),
        );

        let settings = settings_for(&["O", "A"]);
        let response = gateway.call("sys", "user", &settings, "combined").await;

        assert!(response.success);
        assert_eq!(response.content, "{\"ok\": true}");
        assert_eq!(o_calls.load(Ordering::SeqCst), 0);
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
    }
}
