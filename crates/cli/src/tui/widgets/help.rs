use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

pub fn render(f: &mut Frame) {
    let area = centered_rect(50, 40, f.area());

    let lines = vec![
        Line::from(Span::styled(
            "Keybindings",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![Span::styled("  Tab / Shift+Tab  ", Style::default().fg(Color::Cyan)), Span::raw("switch pane")]),
        Line::from(vec![Span::styled("  ↑/k ↓/j          ", Style::default().fg(Color::Cyan)), Span::raw("scroll")]),
        Line::from(vec![Span::styled("  r                ", Style::default().fg(Color::Cyan)), Span::raw("force refresh")]),
        Line::from(vec![Span::styled("  ?                ", Style::default().fg(Color::Cyan)), Span::raw("toggle this help")]),
        Line::from(vec![Span::styled("  q / Ctrl+C       ", Style::default().fg(Color::Cyan)), Span::raw("quit")]),
        Line::from(""),
        Line::from(Span::styled("  press any key to close", Style::default().fg(Color::DarkGray))),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    f.render_widget(Clear, area);
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
