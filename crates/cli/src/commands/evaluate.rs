use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::client::MasteryClient;
use crate::output;

/// `mastery evaluate <activity_id> <learner_id> [--transcript FILE]` — submit
/// a submission envelope to `POST /api/evaluate`. The transcript is read
/// from `--transcript` or, if omitted, from stdin; either way it must be the
/// JSON `activity_transcript` object (§6 submission envelope).
pub async fn run(
    client: &MasteryClient,
    activity_id: &str,
    learner_id: &str,
    transcript: Option<PathBuf>,
    json_mode: bool,
) -> Result<()> {
    let raw = match transcript {
        Some(path) => std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).context("Failed to read transcript from stdin")?;
            buf
        }
    };
    let activity_transcript: serde_json::Value =
        serde_json::from_str(&raw).context("transcript is not valid JSON")?;

    let sp = if !json_mode { Some(output::spinner("Running evaluation pipeline...")) } else { None };
    let result = client.evaluate(activity_id, learner_id, activity_transcript).await?;
    if let Some(sp) = sp {
        sp.finish_and_clear();
    }

    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    output::print_header("Evaluation Result");
    let overall_success = result.get("overall_success").and_then(|v| v.as_bool()).unwrap_or(false);
    println!(
        "  {}  {}",
        "Overall:".dimmed(),
        if overall_success { "success".green().bold().to_string() } else { "failed".red().bold().to_string() },
    );
    if let Some(phases) = result.get("phases").and_then(|v| v.as_array()) {
        for phase in phases {
            let name = phase.get("phase").and_then(|v| v.as_str()).unwrap_or("?");
            let success = phase.get("success").and_then(|v| v.as_bool()).unwrap_or(false);
            let dot = output::status_dot(if success { "passed" } else { "needs_improvement" });
            println!("  {dot} {name}");
            if let Some(err) = phase.get("error").and_then(|v| v.as_str()) {
                println!("      {} {err}", "error:".dimmed());
            }
        }
    }
    println!();

    Ok(())
}
