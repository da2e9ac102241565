//! Event Log (§6): two append-only JSON-lines streams (`evaluations.jsonl`,
//! `errors.jsonl`) plus a live broadcast channel the SSE handler subscribes
//! to. The rotating plain-text system log is a separate `tracing-appender`
//! file sink wired up at startup (see `run_server`); this module only owns
//! the structured evaluation/error/system event streams.

use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::{broadcast, Mutex};

/// One entry in the structured event stream. Every variant carries its own
/// UTC ISO-8601 timestamp with a terminal `Z` (§6).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    PhaseStart {
        timestamp: String,
        learner_id: String,
        activity_id: String,
        phase: String,
    },
    PhaseComplete {
        timestamp: String,
        learner_id: String,
        activity_id: String,
        phase: String,
        success: bool,
        duration_ms: u64,
        tokens_used: u64,
        cost_estimate: f64,
        provider: Option<String>,
    },
    ProviderFailed {
        timestamp: String,
        phase: String,
        provider: String,
        message: String,
    },
    Error {
        timestamp: String,
        kind: String,
        message: String,
        learner_id: Option<String>,
        activity_id: Option<String>,
    },
    System {
        timestamp: String,
        message: String,
    },
}

impl Event {
    pub fn phase_start(learner_id: impl Into<String>, activity_id: impl Into<String>, phase: impl Into<String>) -> Self {
        Event::PhaseStart {
            timestamp: now(),
            learner_id: learner_id.into(),
            activity_id: activity_id.into(),
            phase: phase.into(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn phase_complete(
        learner_id: impl Into<String>,
        activity_id: impl Into<String>,
        phase: impl Into<String>,
        success: bool,
        duration_ms: u64,
        tokens_used: u64,
        cost_estimate: f64,
        provider: Option<String>,
    ) -> Self {
        Event::PhaseComplete {
            timestamp: now(),
            learner_id: learner_id.into(),
            activity_id: activity_id.into(),
            phase: phase.into(),
            success,
            duration_ms,
            tokens_used,
            cost_estimate,
            provider,
        }
    }

    pub fn provider_failed(phase: impl Into<String>, provider: impl Into<String>, message: impl Into<String>) -> Self {
        Event::ProviderFailed {
            timestamp: now(),
            phase: phase.into(),
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn error(
        kind: impl Into<String>,
        message: impl Into<String>,
        learner_id: Option<String>,
        activity_id: Option<String>,
    ) -> Self {
        Event::Error {
            timestamp: now(),
            kind: kind.into(),
            message: message.into(),
            learner_id,
            activity_id,
        }
    }

    pub fn system(message: impl Into<String>) -> Self {
        Event::System { timestamp: now(), message: message.into() }
    }

    fn is_error(&self) -> bool {
        matches!(self, Event::Error { .. } | Event::ProviderFailed { .. })
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Append-only JSONL writer plus a broadcast fan-out for `GET /api/events`.
pub struct EventLog {
    evaluations_path: PathBuf,
    errors_path: PathBuf,
    write_lock: Mutex<()>,
    tx: broadcast::Sender<Event>,
}

impl EventLog {
    pub fn new(dir: PathBuf) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&dir)?;
        let (tx, _rx) = broadcast::channel(1024);
        Ok(Self {
            evaluations_path: dir.join("evaluations.jsonl"),
            errors_path: dir.join("errors.jsonl"),
            write_lock: Mutex::new(()),
            tx,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Read the most recent `limit` entries across both JSONL streams,
    /// merged and ordered oldest-first (mirrors the "chronological" history
    /// read convention of §4.5). Used by `GET /api/events/history`; the live
    /// tail is approximate (file reads, no lock against concurrent appends)
    /// since this is an operator convenience view, not a durability-critical
    /// read path.
    pub async fn recent(&self, limit: usize) -> anyhow::Result<Vec<serde_json::Value>> {
        let mut merged = Vec::new();
        for path in [&self.evaluations_path, &self.errors_path] {
            merged.extend(read_jsonl_tail(path, limit).await?);
        }
        merged.sort_by(|a, b| {
            let ta = a.get("timestamp").and_then(|t| t.as_str()).unwrap_or("");
            let tb = b.get("timestamp").and_then(|t| t.as_str()).unwrap_or("");
            ta.cmp(tb)
        });
        if merged.len() > limit {
            let drop = merged.len() - limit;
            merged.drain(..drop);
        }
        Ok(merged)
    }

    /// Append `event` to the appropriate JSONL file and broadcast it to any
    /// subscribed SSE clients. Errors/provider-failures go to `errors.jsonl`;
    /// everything else goes to `evaluations.jsonl`.
    pub async fn emit(&self, event: Event) {
        let path = if event.is_error() { &self.errors_path } else { &self.evaluations_path };
        if let Err(e) = self.append(path, &event).await {
            tracing::warn!(error = %e, path = %path.display(), "failed to append event to log file");
        }
        let _ = self.tx.send(event);
    }

    async fn append(&self, path: &PathBuf, event: &Event) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock().await;
        let line = serde_json::to_string(event)?;
        let mut file = tokio::fs::OpenOptions::new().create(true).append(true).open(path).await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        Ok(())
    }
}

/// Read up to the last `limit` lines of a JSONL file without loading the
/// whole file for large logs; missing files read as empty.
async fn read_jsonl_tail(path: &PathBuf, limit: usize) -> anyhow::Result<Vec<serde_json::Value>> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let lines: Vec<&str> = contents.lines().collect();
    let start = lines.len().saturating_sub(limit);
    Ok(lines[start..]
        .iter()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emits_to_evaluations_file_and_broadcast() {
        let dir = std::env::temp_dir().join(format!("mastery-events-test-{}", std::process::id()));
        let log = EventLog::new(dir.clone()).unwrap();
        let mut rx = log.subscribe();

        log.emit(Event::phase_start("l1", "a1", "combined")).await;

        let received = rx.try_recv().unwrap();
        assert!(matches!(received, Event::PhaseStart { .. }));

        let contents = tokio::fs::read_to_string(dir.join("evaluations.jsonl")).await.unwrap();
        assert!(contents.contains("\"event\":\"phase_start\""));

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn errors_go_to_errors_file() {
        let dir = std::env::temp_dir().join(format!("mastery-events-test2-{}", std::process::id()));
        let log = EventLog::new(dir.clone()).unwrap();

        log.emit(Event::error("LLMAggregateError", "all providers failed", Some("l1".into()), Some("a1".into()))).await;

        let contents = tokio::fs::read_to_string(dir.join("errors.jsonl")).await.unwrap();
        assert!(contents.contains("all providers failed"));
        assert!(!dir.join("evaluations.jsonl").exists());

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
