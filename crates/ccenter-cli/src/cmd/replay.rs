use crate::output::{execution_rows, print_json, print_table, EXECUTION_HEADERS};
use anyhow::Context;
use ccenter_core::clock::Clock;
use ccenter_core::config::Config;
use ccenter_core::events::{ReconcilerInput, Replay};
use ccenter_core::skill::SkillCatalog;
use ccenter_core::Outcome;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct Decision {
    line: usize,
    input: &'static str,
    #[serde(flatten)]
    outcome: Outcome,
}

/// Replay `file` line by line. Blank lines and `#` comments are skipped; any
/// other line must parse as a [`ReconcilerInput`].
pub fn run(root: &Path, file: &Path, start_millis: i64, json: bool) -> anyhow::Result<()> {
    let config = Config::load_or_default(root).context("failed to load config")?;
    let catalog = SkillCatalog::load_dir(&config.skills_path(root))
        .context("failed to load skill definitions")?;
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;

    let mut replay = Replay::new(&config.reconciler, catalog, start_millis);
    let mut decisions = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let n = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let input: ReconcilerInput =
            serde_json::from_str(line).with_context(|| format!("line {n}: invalid event"))?;
        let kind = input.kind();
        let outcome = replay
            .apply(input)
            .with_context(|| format!("line {n}: {kind} rejected"))?;
        decisions.push(Decision {
            line: n,
            input: kind,
            outcome,
        });
    }

    let reconciler = replay.reconciler();
    let running = reconciler.running_list();

    if json {
        return print_json(&serde_json::json!({
            "decisions": decisions,
            "running": running,
            "watched": reconciler.watched(),
            "clock_millis": replay.clock().now_millis(),
        }));
    }

    let rows = decisions
        .iter()
        .map(|d| {
            let removals = d
                .outcome
                .removals
                .iter()
                .map(|r| format!("{}@+{}ms", r.execution_id, r.delay_millis))
                .collect::<Vec<_>>()
                .join(",");
            vec![
                d.line.to_string(),
                d.input.to_string(),
                d.outcome.redraw.to_string(),
                if removals.is_empty() { "-".to_string() } else { removals },
            ]
        })
        .collect();
    print_table(&["LINE", "INPUT", "REDRAW", "REMOVALS"], rows);

    println!();
    if running.is_empty() {
        println!("No running executions.");
    } else {
        print_table(EXECUTION_HEADERS, execution_rows(&running));
    }
    if let Some(id) = reconciler.watched() {
        println!("watching {id}");
    }
    Ok(())
}
