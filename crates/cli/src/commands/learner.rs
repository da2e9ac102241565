use anyhow::Result;

use crate::cli::LearnerCommand;
use crate::client::MasteryClient;
use crate::output;

pub async fn run(client: &MasteryClient, cmd: LearnerCommand, json_mode: bool) -> Result<()> {
    match cmd {
        LearnerCommand::Skills { learner_id } => skills(client, &learner_id, json_mode).await,
        LearnerCommand::History { learner_id, skill_id, recent } => {
            history(client, &learner_id, &skill_id, recent, json_mode).await
        }
    }
}

async fn skills(client: &MasteryClient, learner_id: &str, json_mode: bool) -> Result<()> {
    let sp = if !json_mode { Some(output::spinner("Fetching skill progress...")) } else { None };
    let skills = client.skill_progress(learner_id).await?;
    if let Some(sp) = sp {
        sp.finish_and_clear();
    }

    if json_mode {
        println!("{}", serde_json::to_string_pretty(&skills)?);
        return Ok(());
    }

    output::print_header(&format!("Skill Progress — {learner_id}"));
    output::print_skills_table(&skills);
    println!();
    Ok(())
}

async fn history(client: &MasteryClient, learner_id: &str, skill_id: &str, recent: bool, json_mode: bool) -> Result<()> {
    let sp = if !json_mode { Some(output::spinner("Fetching activity history...")) } else { None };
    let rows = client.history(learner_id, skill_id, recent).await?;
    if let Some(sp) = sp {
        sp.finish_and_clear();
    }

    if json_mode {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    output::print_header(&format!("Activity History — {learner_id} / {skill_id}"));
    output::print_history_table(&rows);
    println!();
    Ok(())
}
