//! Output formatting for CLI

use crate::simulate::{Report, SlotSummary, TimelineRow};
use console::style;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};
use vantage_core::MediaPhase;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "table" => OutputFormat::Table,
            _ => OutputFormat::Text,
        }
    }
}

/// Pretty JSON, falling back to an empty object
pub fn to_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
}

#[derive(Tabled)]
struct TimelineTableRow {
    #[tabled(rename = "t (ms)")]
    at_ms: u64,
    #[tabled(rename = "Slot")]
    slot: String,
    #[tabled(rename = "Phase")]
    phase: String,
    #[tabled(rename = "In view")]
    in_view: String,
    #[tabled(rename = "Progress")]
    progress: String,
    #[tabled(rename = "Render")]
    render: String,
    #[tabled(rename = "Error")]
    error: String,
}

impl From<&TimelineRow> for TimelineTableRow {
    fn from(row: &TimelineRow) -> Self {
        Self {
            at_ms: row.at_ms,
            slot: row.slot.clone(),
            phase: row.phase.to_string(),
            in_view: yes_no(row.in_view),
            progress: format!("{:.0}%", row.progress),
            render: if row.thumbnail { "thumbnail" } else { "media" }.to_string(),
            error: row.error.map(|e| e.label().to_string()).unwrap_or_default(),
        }
    }
}

#[derive(Tabled)]
struct SummaryTableRow {
    #[tabled(rename = "Slot")]
    slot: String,
    #[tabled(rename = "Loads")]
    loads: u32,
    #[tabled(rename = "Releases")]
    releases: u32,
    #[tabled(rename = "Plays")]
    plays: u32,
    #[tabled(rename = "Rejected")]
    rejected_plays: u32,
    #[tabled(rename = "Final")]
    final_phase: String,
}

impl From<&SlotSummary> for SummaryTableRow {
    fn from(summary: &SlotSummary) -> Self {
        Self {
            slot: summary.slot.clone(),
            loads: summary.loads,
            releases: summary.releases,
            plays: summary.plays,
            rejected_plays: summary.rejected_plays,
            final_phase: summary
                .final_phase
                .map(|p| p.to_string())
                .unwrap_or_else(|| "unmounted".to_string()),
        }
    }
}

fn yes_no(value: bool) -> String {
    if value { "yes" } else { "no" }.to_string()
}

fn styled_phase(phase: MediaPhase) -> String {
    let label = phase.to_string();
    match phase {
        MediaPhase::Playing => style(label).green().to_string(),
        MediaPhase::Ready => style(label).cyan().to_string(),
        MediaPhase::Loading | MediaPhase::Scheduled => style(label).yellow().to_string(),
        MediaPhase::Idle => style(label).dim().to_string(),
    }
}

/// Render a simulation report
pub fn render_report(report: &Report, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(report),
        OutputFormat::Table => {
            let timeline: Vec<TimelineTableRow> = report.timeline.iter().map(Into::into).collect();
            let summary: Vec<SummaryTableRow> = report.slots.iter().map(Into::into).collect();
            format!(
                "{}\n\n{}\n\nPeak loaded slots: {}",
                Table::new(timeline).with(Style::rounded()),
                Table::new(summary).with(Style::rounded()),
                report.peak_loaded
            )
        }
        OutputFormat::Text => {
            let mut out = String::new();
            out.push_str("Timeline:\n");
            for row in &report.timeline {
                out.push_str(&format!(
                    "  [{:>6}ms] {:<16} {:<10} view={} progress={:.0}%{}\n",
                    row.at_ms,
                    row.slot,
                    styled_phase(row.phase),
                    yes_no(row.in_view),
                    row.progress,
                    row.error
                        .map(|e| format!(" error={}", style(e.label()).red()))
                        .unwrap_or_default(),
                ));
            }

            out.push_str("\nSlots:\n");
            for slot in &report.slots {
                out.push_str(&format!(
                    "  {:<16} loads={} releases={} plays={} rejected={} final={}\n",
                    slot.slot,
                    slot.loads,
                    slot.releases,
                    slot.plays,
                    slot.rejected_plays,
                    slot.final_phase
                        .map(styled_phase)
                        .unwrap_or_else(|| "unmounted".to_string()),
                ));
            }

            out.push_str(&format!(
                "\nPeak loaded slots: {}\nDuration: {}ms",
                report.peak_loaded, report.duration_ms
            ));
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parsing() {
        assert_eq!(OutputFormat::from("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from("table"), OutputFormat::Table);
        assert_eq!(OutputFormat::from("anything"), OutputFormat::Text);
    }
}
