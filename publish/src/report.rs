use std::{fmt::Write, time::Duration};

use models::{error::Error, progress::{format_duration, StepTimeline}, storage::SaveStats, transactions::TransactionRow};

pub const NO_BACKENDS: &str = "⚠️ No storage backends configured, nothing was saved";
pub const NOTHING_TO_SAVE: &str = "🤷 No transactions found, nothing to save";

const MAX_HIGHLIGHTED_ROWS: usize = 10;

pub fn saving(name: &str) -> String {
    format!("📝 {} saving", name)
}

pub fn render_success(name: &str, stats: &SaveStats, duration: Duration, timeline: &StepTimeline) -> String {
    let mut out = format!("✅ {} saved in {}\n", name, format_duration(duration));
    let _ = writeln!(out, "added {}, existing {}, skipped {}", stats.added, stats.existing, stats.other_skipped);

    for highlight in &stats.highlights {
        let _ = writeln!(out, "{}: {}", highlight.label, highlight.transactions.len());
        for row in highlight.transactions.iter().take(MAX_HIGHLIGHTED_ROWS) {
            let _ = writeln!(out, "  {}", render_row(row));
        }
        if highlight.transactions.len() > MAX_HIGHLIGHTED_ROWS {
            let _ = writeln!(out, "  … and {} more", highlight.transactions.len() - MAX_HIGHLIGHTED_ROWS);
        }
    }

    out.push_str(&timeline.render());
    out
}

pub fn render_failure(name: &str, error: &Error, duration: Duration, timeline: &StepTimeline) -> String {
    let mut out = format!("❌ {} failed after {}: {}\n", name, format_duration(duration), error);
    out.push_str(&timeline.render());
    out
}

fn render_row(row: &TransactionRow) -> String {
    format!("{} {} {:.2}", row.date, row.description, row.amount)
}
