use anyhow::{Context, Result};
use mastery_shared::{ActivityHistoryRow, SkillProgress};
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::config::CliConfig;

pub struct MasteryClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl MasteryClient {
    pub fn new(config: &CliConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn add_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("X-API-Key", key),
            None => req,
        }
    }

    async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body: serde_json::Value = resp.json().await.unwrap_or_default();
        let msg = body
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error");
        anyhow::bail!("{status}: {msg}");
    }

    /// GET request returning deserialized JSON.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let req = self.client.get(self.url(path));
        let resp = self
            .add_auth(req)
            .send()
            .await
            .context("Failed to connect to the Mastery Engine service")?;
        let resp = Self::check_status(resp).await?;
        resp.json::<T>().await.context("Failed to parse response")
    }

    /// POST request with JSON body, returning deserialized JSON.
    pub async fn post<B: serde::Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let req = self.client.post(self.url(path)).json(body);
        let resp = self
            .add_auth(req)
            .send()
            .await
            .context("Failed to connect to the Mastery Engine service")?;
        let resp = Self::check_status(resp).await?;
        resp.json::<T>().await.context("Failed to parse response")
    }

    /// PUT request with JSON body, returning deserialized JSON.
    pub async fn put<B: serde::Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let req = self.client.put(self.url(path)).json(body);
        let resp = self
            .add_auth(req)
            .send()
            .await
            .context("Failed to connect to the Mastery Engine service")?;
        let resp = Self::check_status(resp).await?;
        resp.json::<T>().await.context("Failed to parse response")
    }

    /// GET `/api/system/health`.
    pub async fn health(&self) -> Result<serde_json::Value> {
        self.get("/api/system/health").await
    }

    /// GET `/api/system/version`.
    pub async fn version(&self) -> Result<serde_json::Value> {
        self.get("/api/system/version").await
    }

    /// POST `/api/evaluate` — run a submission envelope through the pipeline.
    pub async fn evaluate(&self, activity_id: &str, learner_id: &str, activity_transcript: serde_json::Value) -> Result<serde_json::Value> {
        let body = serde_json::json!({
            "activity_id": activity_id,
            "learner_id": learner_id,
            "activity_transcript": activity_transcript,
        });
        self.post("/api/evaluate", &body).await
    }

    /// GET `/api/learners/:id/skills`.
    pub async fn skill_progress(&self, learner_id: &str) -> Result<Vec<SkillProgress>> {
        let data: serde_json::Value = self.get(&format!("/api/learners/{learner_id}/skills")).await?;
        let skills = data.get("skills").cloned().unwrap_or(serde_json::Value::Null);
        Ok(serde_json::from_value(skills)?)
    }

    /// GET `/api/learners/:id/history?skill_id=&order=`.
    pub async fn history(&self, learner_id: &str, skill_id: &str, recent_first: bool) -> Result<Vec<ActivityHistoryRow>> {
        let order = if recent_first { "recent" } else { "chronological" };
        let data: serde_json::Value = self
            .get(&format!("/api/learners/{learner_id}/history?skill_id={skill_id}&order={order}"))
            .await?;
        let rows = data.get("history").cloned().unwrap_or(serde_json::Value::Null);
        Ok(serde_json::from_value(rows)?)
    }

    /// GET `/api/config/:doc`.
    pub async fn get_config_doc(&self, doc: &str) -> Result<serde_json::Value> {
        self.get(&format!("/api/config/{doc}")).await
    }

    /// PUT `/api/admin/config/:doc` — admin-key protected.
    pub async fn put_config_doc(&self, doc: &str, value: serde_json::Value) -> Result<serde_json::Value> {
        self.put(&format!("/api/admin/config/{doc}"), &value).await
    }

    /// POST `/api/admin/learners/:id/reset`.
    pub async fn reset_learner(&self, learner_id: &str) -> Result<serde_json::Value> {
        let body = serde_json::Value::Null;
        self.post(&format!("/api/admin/learners/{learner_id}/reset"), &body).await
    }

    /// POST `/api/admin/recalculate`.
    pub async fn recalculate(&self, learner_id: Option<&str>, skill_id: Option<&str>) -> Result<serde_json::Value> {
        let body = serde_json::json!({ "learner_id": learner_id, "skill_id": skill_id });
        self.post("/api/admin/recalculate", &body).await
    }

    /// GET `/api/events/history?limit=N`.
    pub async fn event_history(&self, limit: usize) -> Result<Vec<serde_json::Value>> {
        let data: serde_json::Value = self.get(&format!("/api/events/history?limit={limit}")).await?;
        let events = data.get("events").cloned().unwrap_or(serde_json::Value::Null);
        Ok(serde_json::from_value(events)?)
    }

    /// GET `/api/events` SSE stream (raw response for line-by-line parsing).
    pub async fn sse_stream(&self) -> Result<reqwest::Response> {
        let req = self.client.get(self.url("/api/events"));
        let resp = self
            .add_auth(req)
            .send()
            .await
            .context("Failed to connect to event stream")?;

        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("SSE connection failed: {body}");
        }

        Ok(resp)
    }
}
