use anyhow::{Context, Result};
use colored::Colorize;

use crate::cli::DocsCommand;
use crate::client::MasteryClient;
use crate::output;

pub async fn run(client: &MasteryClient, cmd: DocsCommand, json_mode: bool) -> Result<()> {
    match cmd {
        DocsCommand::Get { doc } => get(client, &doc, json_mode).await,
        DocsCommand::Set { doc, file } => set(client, &doc, &file, json_mode).await,
    }
}

async fn get(client: &MasteryClient, doc: &str, json_mode: bool) -> Result<()> {
    let value = client.get_config_doc(doc).await?;
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        output::print_header(&format!("Config Document — {doc}"));
        println!("{}", serde_json::to_string_pretty(&value)?);
        println!();
    }
    Ok(())
}

async fn set(client: &MasteryClient, doc: &str, file: &std::path::Path, json_mode: bool) -> Result<()> {
    let contents = std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let value: serde_json::Value = serde_json::from_str(&contents).context("file is not valid JSON")?;

    client.put_config_doc(doc, value).await?;

    if json_mode {
        println!("{}", serde_json::json!({ "status": "ok", "doc": doc }));
    } else {
        println!("  {} {doc} updated", "✓".green().bold());
    }
    Ok(())
}
