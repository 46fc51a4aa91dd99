//! Diff Report Rendering
//!
//! Turns a [`DiffReport`] into terminal text, JSON or a standalone HTML page.
//! The HTML page lists every configured table, marking unchanged ones.

use colored::Colorize;

use crate::engine::diff::{DiffReport, TableDiff};
use crate::engine::snapshot::{SnapshotSchema, VersionInfo};

const HTML_STYLE: &str = r#"<style type="text/css">
* {font-family:consolas}
table {background-color:#C0C0C0;border:0px;}
tr {border:1px solid #101010;}
.title {background-color:gray;font-size:20px;font-weight:bold;padding:5px;}
.added {background-color:darkgreen;font-size:16px;font-weight:bold;padding:5px;color:white;}
.removed {background-color:darkred;font-size:16px;font-weight:bold;padding:5px;color:white;}
.content {padding:10px;}
</style>
"#;

pub fn render_json(report: &DiffReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

/// `udger_client_list` -> `Udger Client List`
pub fn humanize_table_name(table: &str) -> String {
    table
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn format_date(info: &VersionInfo) -> String {
    info.last_update.format("%a %b %d %Y %H:%M:%S GMT+0000").to_string()
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn html_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| escape_html(item))
        .collect::<Vec<_>>()
        .join("<br/>")
}

/// Render the report as an HTML page covering every table in `schema`
pub fn render_html(report: &DiffReport, schema: &SnapshotSchema) -> String {
    let mut html = String::from(HTML_STYLE);
    html.push_str("<h1>Snapshot Update Report</h1>\n");

    html.push_str("<table width=\"100%\" cellpadding=\"2\" cellspacing=\"0\">\n");
    html.push_str("<tr><td colspan=\"3\" width=\"100%\" class=\"title\">Versions</td></tr>\n");
    html.push_str(
        "<tr><td width=\"170\">&nbsp;</td><td width=\"300\"><b>Date</b></td><td width=\"300\"><b>Version</b></td></tr>\n",
    );
    for (label, info) in [("N", &report.current_version), ("N+1", &report.next_version)] {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            label,
            format_date(info),
            escape_html(&info.version)
        ));
    }
    html.push_str("</table><br/>\n");

    for spec in &schema.tables {
        let title = humanize_table_name(&spec.name);
        html.push_str("<table width=\"100%\" cellpadding=\"2\" cellspacing=\"0\">\n");
        match report.table(&spec.name).filter(|t| t.changes() > 0) {
            Some(diff) => html.push_str(&html_table_changes(&title, diff)),
            None => html.push_str(&format!(
                "<tr><td colspan=\"2\" width=\"100%\" class=\"title\">{} (no change) </td></tr>\n",
                title
            )),
        }
        html.push_str("</table><br/>\n");
    }

    html
}

fn html_table_changes(title: &str, diff: &TableDiff) -> String {
    format!(
        "<tr><td colspan=\"2\" width=\"100%\" class=\"title\">{} ({} changes) </td></tr>\n\
         <tr><td width=\"50%\" class=\"removed\">Removed ({})</td><td width=\"50%\" class=\"added\">Added ({})</td></tr>\n\
         <tr valign=\"top\" style=\"font-size:12px\"><td class=\"content\">{}</td><td class=\"content\">{}</td></tr>\n",
        title,
        diff.changes(),
        diff.removed.count,
        diff.added.count,
        html_list(&diff.removed.sample),
        html_list(&diff.added.sample),
    )
}

/// Plain terminal summary, colored when stdout supports it
pub fn render_text(report: &DiffReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} {} ({})\n",
        "current:".bright_white().bold(),
        report.current_version.version,
        format_date(&report.current_version)
    ));
    out.push_str(&format!(
        "{} {} ({})\n",
        "next:   ".bright_white().bold(),
        report.next_version.version,
        format_date(&report.next_version)
    ));

    if report.is_empty() {
        out.push_str(&format!("{}\n", "no table changed".bright_black()));
        return out;
    }

    for diff in report.tables.values() {
        out.push_str(&format!(
            "\n{} {} -> {} rows ({:+})\n",
            humanize_table_name(&diff.table).bright_cyan().bold(),
            diff.current_count,
            diff.next_count,
            diff.delta()
        ));
        out.push_str(&format!("  {} {}\n", "+".green().bold(), diff.added.count));
        for item in &diff.added.sample {
            out.push_str(&format!("    {}\n", item.green()));
        }
        out.push_str(&format!("  {} {}\n", "-".red().bold(), diff.removed.count));
        for item in &diff.removed.sample {
            out.push_str(&format!("    {}\n", item.red()));
        }
    }
    out
}
