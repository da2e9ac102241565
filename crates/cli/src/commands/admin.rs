use anyhow::Result;
use colored::Colorize;
use dialoguer::Confirm;

use crate::cli::AdminCommand;
use crate::client::MasteryClient;
use crate::output;

pub async fn run(client: &MasteryClient, cmd: AdminCommand, json_mode: bool) -> Result<()> {
    match cmd {
        AdminCommand::Reset { learner_id, force } => reset(client, &learner_id, force, json_mode).await,
        AdminCommand::Recalculate { learner_id, skill_id } => {
            recalculate(client, learner_id.as_deref(), skill_id.as_deref(), json_mode).await
        }
    }
}

async fn reset(client: &MasteryClient, learner_id: &str, force: bool, json_mode: bool) -> Result<()> {
    if !force && !json_mode {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "This permanently deletes all history, skill progress, and activity records for learner '{learner_id}'. Continue?"
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("  Aborted.");
            return Ok(());
        }
    }

    let sp = if !json_mode { Some(output::spinner("Resetting learner history...")) } else { None };
    let result = client.reset_learner(learner_id).await?;
    if let Some(sp) = sp {
        sp.finish_and_clear();
    }

    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("  {} learner '{learner_id}' reset", "✓".green().bold());
    }
    Ok(())
}

async fn recalculate(client: &MasteryClient, learner_id: Option<&str>, skill_id: Option<&str>, json_mode: bool) -> Result<()> {
    let sp = if !json_mode { Some(output::spinner("Recalculating decay-adjusted evidence...")) } else { None };
    let result = client.recalculate(learner_id, skill_id).await?;
    if let Some(sp) = sp {
        sp.finish_and_clear();
    }

    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let pairs = result.get("pairs_recalculated").and_then(|v| v.as_u64()).unwrap_or(0);
    println!("  {} {pairs} (learner, skill) pair(s) recalculated", "✓".green().bold());
    Ok(())
}
