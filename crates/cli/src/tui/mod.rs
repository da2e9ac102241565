pub mod app;
pub mod event;
pub mod ui;
pub mod widgets;

use anyhow::{Context, Result};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::prelude::*;
use std::io;
use tokio::sync::mpsc;

use crate::client::MasteryClient;
use crate::config::CliConfig;
use app::{App, AppAction};

/// Launch the TUI dashboard.
pub async fn run(learner_id: Option<String>) -> Result<()> {
    let config = CliConfig::load()?;
    let client = MasteryClient::new(&config);
    let endpoint = config.url.clone();

    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

    let (tx, mut rx) = mpsc::channel::<AppAction>(64);

    // Background polling task: health + (if a learner is targeted) skill progress.
    let poll_client = MasteryClient::new(&config);
    let poll_learner = learner_id.clone();
    let poll_tx = tx.clone();
    tokio::spawn(async move {
        loop {
            let healthy = poll_client.health().await.is_ok();
            let _ = poll_tx.send(AppAction::HealthUpdated(healthy)).await;

            if let Some(ref id) = poll_learner {
                if let Ok(skills) = poll_client.skill_progress(id).await {
                    let _ = poll_tx.send(AppAction::SkillsUpdated(skills)).await;
                }
            }
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        }
    });

    // SSE listener task: forwards every streamed event into the app state.
    let sse_client = MasteryClient::new(&config);
    let sse_tx = tx.clone();
    tokio::spawn(async move {
        loop {
            if let Ok(response) = sse_client.sse_stream().await {
                let mut stream = response.bytes_stream();
                let mut buffer = String::new();

                while let Some(chunk) = stream.next().await {
                    let chunk = match chunk {
                        Ok(c) => c,
                        Err(_) => break,
                    };
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
                                    let _ = sse_tx.send(AppAction::NewEvent(event)).await;
                                }
                            }
                        }
                    }
                }
            }
            tokio::time::sleep(std::time::Duration::from_secs(3)).await;
        }
    });

    // Initial fetch, so the dashboard isn't empty while the background tasks warm up.
    let _ = tx.send(AppAction::HealthUpdated(client.health().await.is_ok())).await;
    if let Some(ref id) = learner_id {
        if let Ok(skills) = client.skill_progress(id).await {
            let _ = tx.send(AppAction::SkillsUpdated(skills)).await;
        }
    }
    if let Ok(history) = client.event_history(100).await {
        for event in history {
            let _ = tx.send(AppAction::NewEvent(event)).await;
        }
    }

    let mut app = App::new(endpoint, learner_id);

    loop {
        terminal.draw(|f| ui::draw(f, &app))?;

        while let Ok(action) = rx.try_recv() {
            app.apply(action);
        }

        if !event::handle_events(&mut app)? {
            break;
        }

        if app.should_quit {
            break;
        }
    }

    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen).context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;

    Ok(())
}
