use anyhow::Result;
use colored::Colorize;

use crate::client::MasteryClient;
use crate::output;

pub async fn run(client: &MasteryClient, json_mode: bool) -> Result<()> {
    let sp = if !json_mode { Some(output::spinner("Checking service health...")) } else { None };

    let health = client.health().await?;
    let version = client.version().await?;

    if let Some(sp) = sp {
        sp.finish_and_clear();
    }

    if json_mode {
        let data = serde_json::json!({
            "endpoint": client.base_url(),
            "health": health,
            "version": version,
        });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    let status = health.get("status").and_then(|s| s.as_str()).unwrap_or("unknown");
    let version_str = version.get("version").and_then(|v| v.as_str()).unwrap_or("unknown");

    output::print_header("Mastery Engine Status");

    println!("  {}    v{}", "Version:".dimmed(), version_str);
    println!("  {}  {}", "Endpoint:".dimmed(), client.base_url());
    println!(
        "  {}     {} {}",
        "Health:".dimmed(),
        output::status_dot(if status == "ok" { "passed" } else { "needs_improvement" }),
        status,
    );
    println!();
    println!(
        "  Use {} or {} to inspect learner progress and the live event stream.",
        "mastery learner skills <id>".bold(),
        "mastery logs --follow".bold(),
    );
    println!();

    Ok(())
}
