use anyhow::{Context, Result};
use colored::Colorize;
use futures::StreamExt;

use crate::client::MasteryClient;
use crate::output;

pub async fn run(client: &MasteryClient, follow: bool, limit: usize, json_mode: bool) -> Result<()> {
    if follow {
        follow_stream(client, json_mode).await
    } else {
        show_history(client, limit, json_mode).await
    }
}

/// Display recent entries from the durable evaluation/error JSONL streams.
async fn show_history(client: &MasteryClient, limit: usize, json_mode: bool) -> Result<()> {
    let sp = if !json_mode { Some(output::spinner("Loading event history...")) } else { None };
    let history = client.event_history(limit).await?;
    if let Some(sp) = sp {
        sp.finish_and_clear();
    }

    if json_mode {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    if history.is_empty() {
        output::print_header("Event Log");
        println!("  {}", "No events recorded.".dimmed());
        println!();
        return Ok(());
    }

    output::print_header("Event Log");

    // history comes back oldest-first; print in that order
    for event in &history {
        print_event(event);
    }
    println!();

    Ok(())
}

/// Follow the SSE stream and print events in real-time.
async fn follow_stream(client: &MasteryClient, json_mode: bool) -> Result<()> {
    if !json_mode {
        output::print_header("Live Event Stream");
        println!("  {} Press {} to stop", "ℹ".dimmed(), "Ctrl+C".bold());
        println!();
    }

    let response = client.sse_stream().await.context("Failed to connect to event stream")?;

    let mut stream = response.bytes_stream();
    let mut buffer = String::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("Stream read error")?;
        buffer.push_str(&String::from_utf8_lossy(&chunk));

        while let Some(pos) = buffer.find("\n\n") {
            let event_block = buffer[..pos].to_string();
            buffer = buffer[pos + 2..].to_string();

            for line in event_block.lines() {
                if let Some(data) = line.strip_prefix("data:") {
                    let data = data.trim();
                    if data == "connected" || data == "keep-alive" || data.is_empty() {
                        continue;
                    }

                    if let Ok(event) = serde_json::from_str::<serde_json::Value>(data) {
                        if json_mode {
                            println!("{}", serde_json::to_string(&event)?);
                        } else {
                            print_event(&event);
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

/// Format and print a single evaluation-engine event (§6) with color coding.
/// Events are internally tagged (`{"event": "phase_start", ...fields}`).
fn print_event(event: &serde_json::Value) {
    let event_type = event.get("event").and_then(|t| t.as_str()).unwrap_or("unknown");

    let timestamp = event
        .get("timestamp")
        .and_then(|t| t.as_str())
        .and_then(|t| chrono::DateTime::parse_from_rfc3339(t).ok())
        .map(|dt| dt.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "??:??:??".to_string());

    let field = |name: &str| event.get(name).and_then(|v| v.as_str()).unwrap_or("?");

    let (tag, detail) = match event_type {
        "phase_start" => (
            format!("[{}]", "PhaseStart".cyan()),
            format!("{} phase={} activity={}", field("learner_id"), field("phase"), field("activity_id")),
        ),
        "phase_complete" => {
            let success = event.get("success").and_then(|v| v.as_bool()).unwrap_or(false);
            let duration = event.get("duration_ms").and_then(|v| v.as_u64()).unwrap_or(0);
            let tokens = event.get("tokens_used").and_then(|v| v.as_u64()).unwrap_or(0);
            let cost = event.get("cost_estimate").and_then(|v| v.as_f64()).unwrap_or(0.0);
            let state = if success { "ok".green().to_string() } else { "failed".red().to_string() };
            (
                format!("[{}]", "PhaseComplete".green().bold()),
                format!(
                    "{} phase={} {} {}ms {} tok ${:.4}",
                    field("learner_id"),
                    field("phase"),
                    state,
                    duration,
                    tokens,
                    cost,
                ),
            )
        }
        "provider_failed" => (
            format!("[{}]", "ProviderFailed".yellow()),
            format!("phase={} provider={}: {}", field("phase"), field("provider"), field("message")),
        ),
        "error" => (
            format!("[{}]", "Error".red().bold()),
            format!("{}: {}", field("kind"), field("message")),
        ),
        "system" => (format!("[{}]", "System".blue()), field("message").to_string()),
        _ => (
            format!("[{}]", event_type.dimmed()),
            serde_json::to_string(event).unwrap_or_default().dimmed().to_string(),
        ),
    };

    println!("  {} {:<20} {}", timestamp.dimmed(), tag, detail);
}
