use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Row, Table, TableState};

use crate::output::{gate_label_raw, overall_label_raw};
use crate::tui::app::App;
use mastery_shared::{GateStatus, OverallStatus};

fn status_color(label: &str) -> Color {
    match label {
        "passed" | "mastered" => Color::Green,
        "approaching" => Color::Yellow,
        _ => Color::DarkGray,
    }
}

fn gate_cell(status: GateStatus) -> Cell<'static> {
    let label = gate_label_raw(status);
    Cell::from(label).style(Style::default().fg(status_color(label)))
}

fn overall_cell(status: OverallStatus) -> Cell<'static> {
    let label = overall_label_raw(status);
    Cell::from(label).style(Style::default().fg(status_color(label)).add_modifier(Modifier::BOLD))
}

pub fn render(f: &mut Frame, area: Rect, app: &App, is_active: bool) {
    let border_style = if is_active {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let title = match &app.learner_id {
        Some(id) => format!(" Skills — {id} "),
        None => " Skills (pass --learner-id) ".to_string(),
    };

    let block = Block::default().title(title).borders(Borders::ALL).border_style(border_style);

    if app.skills.is_empty() {
        let empty = Table::new(Vec::<Row>::new(), [Constraint::Percentage(100)]).block(block);
        f.render_widget(empty, area);
        return;
    }

    let header = Row::new(vec!["Skill", "Score", "Gate 1", "Gate 2", "Overall"])
        .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = app
        .skills
        .iter()
        .map(|s| {
            Row::new(vec![
                Cell::from(s.skill_name.clone()),
                Cell::from(format!("{:.1}", s.cumulative_score)),
                gate_cell(s.gate_1_status),
                gate_cell(s.gate_2_status),
                overall_cell(s.overall_status),
            ])
        })
        .collect();

    let mut state = TableState::default();
    if !app.skills.is_empty() {
        state.select(Some(app.skill_scroll.min(app.skills.len() - 1)));
    }

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(40),
            Constraint::Length(8),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(14),
        ],
    )
    .header(header)
    .block(block)
    .row_highlight_style(Style::default().bg(Color::DarkGray));

    f.render_stateful_widget(table, area, &mut state);
}
