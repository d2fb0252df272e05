use crate::output::{execution_rows, print_json, print_table, EXECUTION_HEADERS};
use anyhow::Context;
use ccenter_core::config::Config;
use ccenter_core::types::RunningExecution;
use std::path::Path;

pub fn run(root: &Path, url: Option<&str>, json: bool) -> anyhow::Result<()> {
    let base = match url {
        Some(u) => u.trim_end_matches('/').to_string(),
        None => {
            let config = Config::load_or_default(root).context("failed to load config")?;
            format!("http://localhost:{}", config.server.port)
        }
    };
    let endpoint = format!("{base}/api/running");

    let entries: Vec<RunningExecution> = ureq::get(&endpoint)
        .call()
        .with_context(|| format!("could not reach {endpoint}"))?
        .into_json()
        .context("unexpected response body")?;

    if json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("No running executions.");
        return Ok(());
    }
    print_table(EXECUTION_HEADERS, execution_rows(&entries));
    Ok(())
}
