pub mod admin;
pub mod config_cmd;
pub mod docs;
pub mod evaluate;
pub mod learner;
pub mod logs;
pub mod status;

use crate::cli::*;
use crate::client::MasteryClient;
use crate::config::CliConfig;
use anyhow::Result;

pub async fn dispatch(cli: Cli) -> Result<()> {
    let config = CliConfig::load()?;
    let client = MasteryClient::new(&config);

    match cli.command {
        Commands::Status => status::run(&client, cli.json).await,
        Commands::Evaluate { activity_id, learner_id, transcript } => {
            evaluate::run(&client, &activity_id, &learner_id, transcript, cli.json).await
        }
        Commands::Learner(cmd) => learner::run(&client, cmd, cli.json).await,
        Commands::Docs(cmd) => docs::run(&client, cmd, cli.json).await,
        Commands::Config(cmd) => config_cmd::run(cmd, &config),
        Commands::Admin(cmd) => admin::run(&client, cmd, cli.json).await,
        Commands::Logs { follow, limit } => logs::run(&client, follow, limit, cli.json).await,
        Commands::Tui { learner_id } => crate::tui::run(learner_id).await,
    }
}
