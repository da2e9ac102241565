use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState};

use crate::tui::app::App;

pub fn render(f: &mut Frame, area: Rect, app: &App, is_active: bool) {
    let border_style = if is_active {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let block = Block::default()
        .title(" Events ")
        .borders(Borders::ALL)
        .border_style(border_style);

    if app.events.is_empty() {
        let items = vec![ListItem::new(Span::styled(
            "  Waiting for events...",
            Style::default().fg(Color::DarkGray),
        ))];
        let list = List::new(items).block(block);
        f.render_widget(list, area);
        return;
    }

    // Show events in reverse order (newest first)
    let items: Vec<ListItem> = app
        .events
        .iter()
        .rev()
        .map(|event| {
            let event_type = event.get("event").and_then(|t| t.as_str()).unwrap_or("unknown");

            let timestamp = event
                .get("timestamp")
                .and_then(|t| t.as_str())
                .and_then(|t| chrono::DateTime::parse_from_rfc3339(t).ok())
                .map_or_else(|| "??:??:??".to_string(), |dt| dt.format("%H:%M:%S").to_string());

            let (type_color, detail) = match event_type {
                "phase_start" => {
                    let phase = event.get("phase").and_then(|v| v.as_str()).unwrap_or("?");
                    (Color::Cyan, format!("{phase} started"))
                }
                "phase_complete" => {
                    let phase = event.get("phase").and_then(|v| v.as_str()).unwrap_or("?");
                    let success = event.get("success").and_then(serde_json::Value::as_bool).unwrap_or(false);
                    let duration = event.get("duration_ms").and_then(|v| v.as_u64()).unwrap_or(0);
                    (
                        if success { Color::Green } else { Color::Red },
                        format!("{phase} {} ({duration}ms)", if success { "ok" } else { "failed" }),
                    )
                }
                "provider_failed" => {
                    let provider = event.get("provider").and_then(|v| v.as_str()).unwrap_or("?");
                    (Color::Yellow, format!("{provider} fallback"))
                }
                "error" => {
                    let message = event.get("message").and_then(|v| v.as_str()).unwrap_or("?");
                    (Color::Red, message.to_string())
                }
                "system" => {
                    let message = event.get("message").and_then(|v| v.as_str()).unwrap_or("");
                    (Color::Magenta, message.to_string())
                }
                _ => (Color::DarkGray, event_type.to_string()),
            };

            let time_span = Span::styled(format!("  {timestamp} "), Style::default().fg(Color::DarkGray));
            let type_span = Span::styled(format!("[{:<16}] ", event_type), Style::default().fg(type_color));
            let detail_span = Span::styled(detail, Style::default().fg(Color::White));

            ListItem::new(Line::from(vec![time_span, type_span, detail_span]))
        })
        .collect();

    let mut state = ListState::default();
    if !app.events.is_empty() {
        // Convert logical index to display index: list is rendered newest-first.
        let display_index = app.events.len() - 1 - app.event_scroll.min(app.events.len() - 1);
        state.select(Some(display_index));
    }

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray));

    f.render_stateful_widget(list, area, &mut state);
}
