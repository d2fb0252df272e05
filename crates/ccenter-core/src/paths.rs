use crate::error::{CenterError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const CCENTER_DIR: &str = ".ccenter";
pub const CONFIG_FILE: &str = ".ccenter/config.yaml";
pub const SKILLS_DIR: &str = ".ccenter/skills";

/// Execution-state file written by the skill daemon, relative to $HOME.
pub const DEFAULT_STATE_FILE: &str = ".config/ccenter/skill_execution.json";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn ccenter_dir(root: &Path) -> PathBuf {
    root.join(CCENTER_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn skills_dir(root: &Path) -> PathBuf {
    root.join(SKILLS_DIR)
}

pub fn default_state_file() -> Result<PathBuf> {
    let home = home::home_dir().ok_or(CenterError::HomeNotFound)?;
    Ok(home.join(DEFAULT_STATE_FILE))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

static NAME_RE: OnceLock<Regex> = OnceLock::new();

fn name_re() -> &'static Regex {
    NAME_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.:\-]*$").unwrap())
}

/// Validate a job name or execution id received from outside the process.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > 128 || !name_re().is_match(name) {
        return Err(CenterError::InvalidName(name.to_string()));
    }
    Ok(())
}
