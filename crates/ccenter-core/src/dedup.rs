use crate::registry::RunRegistry;
use std::collections::HashMap;
use tracing::debug;

/// One entry dropped because another entry for the same job outranked it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collapsed {
    pub removed_id: String,
    pub survivor_id: String,
    pub job_name: String,
}

/// Collapse `Running` entries that share a job name down to one: highest
/// source priority wins, ties go to the earliest inserted. Idempotent.
pub fn deduplicate(registry: &mut RunRegistry) -> Vec<Collapsed> {
    let entries = registry.entries_mut();

    // job name -> index of the current best entry
    let mut best: HashMap<&str, usize> = HashMap::new();
    for (i, e) in entries.iter().enumerate() {
        if !e.is_running() {
            continue;
        }
        match best.get(e.job_name.as_str()) {
            None => {
                best.insert(&e.job_name, i);
            }
            Some(&j) => {
                let cur = &entries[j];
                let better = e.source_origin.priority() > cur.source_origin.priority()
                    || (e.source_origin.priority() == cur.source_origin.priority()
                        && e.added_at_millis < cur.added_at_millis);
                if better {
                    best.insert(&e.job_name, i);
                }
            }
        }
    }

    let mut collapsed = Vec::new();
    for (i, e) in entries.iter().enumerate() {
        if !e.is_running() {
            continue;
        }
        if let Some(&keep) = best.get(e.job_name.as_str()) {
            if keep != i {
                collapsed.push(Collapsed {
                    removed_id: e.execution_id.clone(),
                    survivor_id: entries[keep].execution_id.clone(),
                    job_name: e.job_name.clone(),
                });
            }
        }
    }
    drop(best);

    if collapsed.is_empty() {
        return collapsed;
    }
    entries.retain(|e| {
        !(e.is_running() && collapsed.iter().any(|c| c.removed_id == e.execution_id))
    });
    for c in &collapsed {
        debug!(
            job_name = %c.job_name,
            removed = %c.removed_id,
            survivor = %c.survivor_id,
            "dedup: collapsed duplicate running entry"
        );
    }
    collapsed
}
