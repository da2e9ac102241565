use colored::Colorize;
use comfy_table::{presets::NOTHING, ContentArrangement, Table};
use mastery_shared::{ActivityHistoryRow, GateStatus, OverallStatus, SkillProgress};

/// Print a decorated section header.
pub fn print_header(title: &str) {
    let line = "─".repeat(36);
    println!();
    println!("  {}", title.bold());
    println!("  {}", line.dimmed());
}

/// Status dot: ● (passed/green), ◐ (approaching/yellow), ○ (below/dim).
pub fn status_dot(status: &str) -> String {
    match status {
        "passed" | "mastered" => "●".green().to_string(),
        "approaching" => "◐".yellow().to_string(),
        _ => "○".dimmed().to_string(),
    }
}

fn gate_label(status: GateStatus) -> String {
    match status {
        GateStatus::Passed => "passed".green().to_string(),
        GateStatus::Approaching => "approaching".yellow().to_string(),
        GateStatus::Developing => "developing".to_string(),
        GateStatus::NeedsImprovement => "needs_improvement".dimmed().to_string(),
    }
}

/// Plain (uncolored) label for `GateStatus`, suitable for non-ANSI renderers.
pub fn gate_label_raw(status: GateStatus) -> &'static str {
    match status {
        GateStatus::Passed => "passed",
        GateStatus::Approaching => "approaching",
        GateStatus::Developing => "developing",
        GateStatus::NeedsImprovement => "needs_improvement",
    }
}

fn overall_label(status: OverallStatus) -> String {
    match status {
        OverallStatus::Mastered => "mastered".green().bold().to_string(),
        OverallStatus::Approaching => "approaching".yellow().to_string(),
        OverallStatus::Developing => "developing".to_string(),
        OverallStatus::NeedsImprovement => "needs_improvement".dimmed().to_string(),
    }
}

/// Print a learner's skill progress as a rich table.
pub fn print_skills_table(skills: &[SkillProgress]) {
    if skills.is_empty() {
        println!("  {}", "No skill progress recorded for this learner.".dimmed());
        return;
    }

    let mut table = Table::new();
    table.load_preset(NOTHING).set_content_arrangement(ContentArrangement::Dynamic);

    for skill in skills {
        table.add_row(vec![
            format!("  {}", status_dot(overall_label_raw(skill.overall_status))),
            skill.skill_id.clone().bold().to_string(),
            skill.skill_name.clone().dimmed().to_string(),
            format!("{:.3}", skill.cumulative_score),
            format!("{:.1}", skill.total_adjusted_evidence),
            gate_label(skill.gate_1_status),
            gate_label(skill.gate_2_status),
            overall_label(skill.overall_status),
        ]);
    }

    println!("{table}");
}

pub fn overall_label_raw(status: OverallStatus) -> &'static str {
    match status {
        OverallStatus::Mastered => "mastered",
        OverallStatus::Approaching => "approaching",
        OverallStatus::Developing => "developing",
        OverallStatus::NeedsImprovement => "needs_improvement",
    }
}

/// Print an `ActivityHistoryRow` ledger as a table.
pub fn print_history_table(rows: &[ActivityHistoryRow]) {
    if rows.is_empty() {
        println!("  {}", "No history rows for this (learner, skill) pair.".dimmed());
        return;
    }

    let mut table = Table::new();
    table.load_preset(NOTHING).set_content_arrangement(ContentArrangement::Dynamic);

    for row in rows {
        table.add_row(vec![
            row.completion_timestamp.format("%Y-%m-%d %H:%M").to_string().dimmed().to_string(),
            row.activity_title.clone().bold().to_string(),
            row.activity_type.as_str().to_string(),
            format!("{:.2}", row.performance_score),
            format!("{:.2}", row.validity_modifier),
            format!("{:.2}", row.adjusted_evidence_volume),
            format!("{:.2}", row.decay_adjusted_evidence_volume),
            format!("{:.3}", row.cumulative_performance),
            format!("{:.1}", row.cumulative_evidence),
        ]);
    }

    println!("{table}");
}

/// Create a styled spinner with a message.
pub fn spinner(msg: &str) -> indicatif::ProgressBar {
    let pb = indicatif::ProgressBar::new_spinner();
    pb.set_style(
        indicatif::ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template("  {spinner} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}
