use clap::ValueEnum;
use serde::Serialize;

pub const REPORT_HEADERS: [&str; 6] = [
    "Alias Name",
    "Region",
    "Key ID",
    "ARN",
    "Key Description",
    "Ethereum Address",
];

const PLAN_HEADERS: [&str; 3] = ["Alias Name", "Key Description", "Action"];

/// One provisioned key, in the order the taxonomy names it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub alias: String,
    pub region: String,
    pub key_id: String,
    pub arn: String,
    pub description: String,
    pub address: String,
}

impl ReportRow {
    fn cells(&self) -> Vec<&str> {
        vec![
            self.alias.as_str(),
            self.region.as_str(),
            self.key_id.as_str(),
            self.arn.as_str(),
            self.description.as_str(),
            self.address.as_str(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlanStatus {
    Create,
    Exists { target_key_id: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    pub alias: String,
    pub description: String,
    #[serde(flatten)]
    pub status: PlanStatus,
}

impl PlanEntry {
    fn action(&self) -> String {
        match &self.status {
            PlanStatus::Create => "create".to_string(),
            PlanStatus::Exists {
                target_key_id: Some(id),
            } => format!("exists ({})", id),
            PlanStatus::Exists { target_key_id: None } => "exists".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

pub fn render_rows(rows: &[ReportRow], format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Table => {
            let cells: Vec<Vec<&str>> = rows.iter().map(ReportRow::cells).collect();
            Ok(render_grid(&REPORT_HEADERS, &cells))
        }
        OutputFormat::Json => serde_json::to_string_pretty(rows),
    }
}

pub fn render_plan(entries: &[PlanEntry], format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Table => {
            let actions: Vec<String> = entries.iter().map(PlanEntry::action).collect();
            let cells: Vec<Vec<&str>> = entries
                .iter()
                .zip(&actions)
                .map(|(e, action)| vec![e.alias.as_str(), e.description.as_str(), action.as_str()])
                .collect();
            Ok(render_grid(&PLAN_HEADERS, &cells))
        }
        OutputFormat::Json => serde_json::to_string_pretty(entries),
    }
}

/// Box-drawn grid with a double rule under the header and a single rule
/// between body rows.
fn render_grid(headers: &[&str], rows: &[Vec<&str>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let rule = |left: &str, fill: &str, mid: &str, right: &str| {
        let segments: Vec<String> = widths.iter().map(|w| fill.repeat(w + 2)).collect();
        format!("{}{}{}\n", left, segments.join(mid), right)
    };
    let line = |cells: &[&str]| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!(" {}{} ", cell, " ".repeat(w - cell.chars().count())))
            .collect();
        format!("│{}│\n", padded.join("│"))
    };

    let mut out = rule("╒", "═", "╤", "╕");
    out.push_str(&line(headers));
    if rows.is_empty() {
        out.push_str(&rule("╘", "═", "╧", "╛"));
        return out;
    }
    out.push_str(&rule("╞", "═", "╪", "╡"));
    for (index, row) in rows.iter().enumerate() {
        out.push_str(&line(row.as_slice()));
        if index + 1 < rows.len() {
            out.push_str(&rule("├", "─", "┼", "┤"));
        }
    }
    out.push_str(&rule("╘", "═", "╧", "╛"));
    out
}
