//! Skill definitions: the step list of each skill, read from YAML files.
//!
//! ```yaml
//! name: deploy-prod
//! description: Build, test and ship
//! steps:
//!   - name: build
//!   - name: test
//!     description: full suite
//!   - name: ship
//! ```

use crate::error::{CenterError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillStep {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub steps: Vec<SkillStep>,
}

impl SkillDefinition {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let def: SkillDefinition = serde_yaml::from_str(&data)?;
        paths::validate_name(&def.name).map_err(|_| CenterError::InvalidSkill {
            path: path.display().to_string(),
            reason: format!("invalid skill name '{}'", def.name),
        })?;
        if let Some(empty) = def.steps.iter().position(|s| s.name.trim().is_empty()) {
            return Err(CenterError::InvalidSkill {
                path: path.display().to_string(),
                reason: format!("step {empty} has an empty name"),
            });
        }
        Ok(def)
    }
}

/// Skill definitions by name.
#[derive(Debug, Clone, Default)]
pub struct SkillCatalog {
    skills: BTreeMap<String, SkillDefinition>,
}

impl SkillCatalog {
    /// Load every `*.yaml` / `*.yml` file in `dir`. A missing directory is an
    /// empty catalog; files that fail to parse are skipped with a warning.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut catalog = SkillCatalog::default();
        if !dir.is_dir() {
            return Ok(catalog);
        }
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| {
                matches!(
                    p.extension().and_then(|e| e.to_str()),
                    Some("yaml") | Some("yml")
                )
            })
            .collect();
        paths.sort();
        for path in paths {
            match SkillDefinition::load(&path) {
                Ok(def) => catalog.insert(def),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping skill definition"),
            }
        }
        Ok(catalog)
    }

    pub fn insert(&mut self, def: SkillDefinition) {
        self.skills.insert(def.name.clone(), def);
    }

    pub fn get(&self, name: &str) -> Option<&SkillDefinition> {
        self.skills.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&SkillDefinition> {
        self.get(name)
            .ok_or_else(|| CenterError::SkillNotFound(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SkillDefinition> {
        self.skills.values()
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}
