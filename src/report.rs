//! Human-readable import summary for terminal output.
use colored::*;

use crate::leak::Import;
use crate::stats::{ImportStats, top_reused_passwords};
use crate::table::AutoGenKey;

fn visible_len(s: &str) -> usize {
    // Strip ANSI escape sequences (\x1b[ ... m) to compute printable width
    let mut len = 0;
    let mut iter = s.chars().peekable();
    while let Some(ch) = iter.next() {
        if ch == '\u{1b}' {
            if let Some('[') = iter.peek().cloned() {
                let _ = iter.next();
            }
            for c in iter.by_ref() {
                if c == 'm' {
                    break;
                }
            }
        } else {
            len += 1;
        }
    }
    len
}

fn section_header(title: &str) -> String {
    let len = visible_len(title);
    let mut s = String::new();
    s.push('\n');
    s.push_str(title);
    s.push('\n');
    s.push_str(&"─".repeat(len));
    s.push_str("\n\n");
    s
}

fn push_section(out: &mut String, title: ColoredString, lines: Vec<String>) {
    out.push_str(&section_header(&title.to_string()));
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }
}

pub fn render_summary(import: &Import, leak_id: AutoGenKey, stats: &ImportStats) -> String {
    render_summary_with_top(import, leak_id, stats, 10)
}

pub fn render_summary_with_top(
    import: &Import,
    leak_id: AutoGenKey,
    stats: &ImportStats,
    top_n: usize,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", "leakdb-import: Import Summary".bold().cyan()));

    let platforms: Vec<&str> = import
        .affected_platforms
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    let leakers: Vec<&str> = import
        .leakers
        .iter()
        .map(|l| l.identifier.as_str())
        .collect();
    push_section(
        &mut out,
        "Leak".bold().cyan(),
        vec![
            format!("Key: {}", leak_id),
            format!("Context: {}", import.leak.context),
            format!("Share Date: {}", import.leak.share_date),
            format!("Platforms: {}", platforms.join(", ")),
            format!("Leakers: {}", leakers.join(", ")),
        ],
    );

    let rejected = if stats.rejected_lines > 0 {
        stats.rejected_lines.to_string().red().to_string()
    } else {
        stats.rejected_lines.to_string()
    };
    push_section(
        &mut out,
        "Dump Statistics".bold().yellow(),
        vec![
            format!("Lines: {}", stats.lines_total),
            format!("Rejected Lines: {}", rejected),
            format!("Accepted Percentage: {}", stats.accepted_percentage),
            format!("Affected Users: {}", stats.users),
            format!("Distinct Passwords: {}", stats.distinct_passwords),
            format!("Platforms: {}", stats.platforms),
            format!("Leakers: {}", stats.leakers),
        ],
    );

    let top = top_reused_passwords(import, top_n);
    let top_lines = if top.is_empty() {
        vec!["(No reused passwords)".dimmed().to_string()]
    } else {
        top.into_iter()
            .map(|(pw, count)| format!("  {}: {}", pw, count))
            .collect()
    };
    push_section(&mut out, "Top Reused Passwords".bold().magenta(), top_lines);

    out
}
