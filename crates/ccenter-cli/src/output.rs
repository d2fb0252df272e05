use ccenter_core::types::RunningExecution;
use serde::Serialize;
use std::fmt::Write as _;

pub const EXECUTION_HEADERS: &[&str] =
    &["EXECUTION", "JOB", "STATUS", "PROGRESS", "SOURCE", "STEP"];

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    print!("{}", render_table(headers, &rows));
}

/// Left-aligned columns sized to their widest cell, a dashed rule under the
/// header, and no trailing whitespace. Cells past the header count are
/// printed unpadded.
fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let widths: Vec<usize> = (0..headers.len())
        .map(|col| {
            rows.iter()
                .filter_map(|r| r.get(col))
                .map(String::len)
                .fold(headers[col].len(), usize::max)
        })
        .collect();

    let mut out = String::new();
    let _ = writeln!(out, "{}", pad_line(&widths, headers.iter().copied()));
    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    let _ = writeln!(out, "{}", rule.join("  "));
    for row in rows {
        let _ = writeln!(out, "{}", pad_line(&widths, row.iter().map(String::as_str)));
    }
    out
}

fn pad_line<'a>(widths: &[usize], cells: impl Iterator<Item = &'a str>) -> String {
    let padded: Vec<String> = cells
        .enumerate()
        .map(|(col, cell)| {
            let w = widths.get(col).copied().unwrap_or(0);
            format!("{cell:<w$}")
        })
        .collect();
    padded.join("  ").trim_end().to_string()
}

/// Rows for a list of executions, shared by `status` and `replay`.
pub fn execution_rows(entries: &[RunningExecution]) -> Vec<Vec<String>> {
    entries
        .iter()
        .map(|e| {
            let step = if e.current_step_label.is_empty() {
                "-".to_string()
            } else {
                e.current_step_label.clone()
            };
            vec![
                e.execution_id.clone(),
                e.job_name.clone(),
                e.status.to_string(),
                format!("{}%", e.progress_percent),
                e.source_origin.to_string(),
                step,
            ]
        })
        .collect()
}
