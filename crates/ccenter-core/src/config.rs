use crate::error::{CenterError, Result};
use crate::paths;
use crate::registry::RegistryOptions;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ReconcilerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Anti-duplicate window for near-simultaneous starts of the same job.
    #[serde(default = "default_dedup_window_ms")]
    pub dedup_window_ms: u64,
    /// How long a finished execution stays visible.
    #[serde(default = "default_terminal_grace_ms")]
    pub terminal_grace_ms: u64,
    #[serde(default = "default_stale_after_minutes")]
    pub stale_after_minutes: u64,
}

fn default_dedup_window_ms() -> u64 {
    2_000
}

fn default_terminal_grace_ms() -> u64 {
    5_000
}

fn default_stale_after_minutes() -> u64 {
    30
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            dedup_window_ms: default_dedup_window_ms(),
            terminal_grace_ms: default_terminal_grace_ms(),
            stale_after_minutes: default_stale_after_minutes(),
        }
    }
}

impl ReconcilerConfig {
    pub fn registry_options(&self) -> RegistryOptions {
        RegistryOptions {
            dedup_window_ms: self.dedup_window_ms as i64,
            terminal_grace_ms: self.terminal_grace_ms as i64,
        }
    }

    pub fn stale_after_millis(&self) -> u64 {
        self.stale_after_minutes * 60 * 1_000
    }
}

// ---------------------------------------------------------------------------
// SourcesConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Push stream of skill execution events. `None` disables the adapter.
    #[serde(default = "default_websocket_url")]
    pub websocket_url: Option<String>,
    /// Execution-state file; defaults to the daemon's file under $HOME.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,
    /// Base URL of the skill daemon bridge. `None` disables the poller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,
    #[serde(default = "default_file_poll_ms")]
    pub file_poll_ms: u64,
    #[serde(default = "default_rpc_poll_ms")]
    pub rpc_poll_ms: u64,
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,
}

fn default_websocket_url() -> Option<String> {
    Some("ws://localhost:9876".to_string())
}

fn default_file_poll_ms() -> u64 {
    800
}

fn default_rpc_poll_ms() -> u64 {
    2_000
}

fn default_max_backoff_secs() -> u64 {
    30
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            websocket_url: default_websocket_url(),
            state_file: None,
            rpc_url: None,
            file_poll_ms: default_file_poll_ms(),
            rpc_poll_ms: default_rpc_poll_ms(),
            max_backoff_secs: default_max_backoff_secs(),
        }
    }
}

impl SourcesConfig {
    pub fn state_file_path(&self) -> Result<PathBuf> {
        match &self.state_file {
            Some(p) => Ok(p.clone()),
            None => paths::default_state_file(),
        }
    }
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    3171
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub server: ServerConfig,
    /// Directory of skill definition files, relative to the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills_dir: Option<PathBuf>,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            reconciler: ReconcilerConfig::default(),
            sources: SourcesConfig::default(),
            server: ServerConfig::default(),
            skills_dir: None,
        }
    }
}

impl Config {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(CenterError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Like [`Config::load`], but an absent file yields the defaults.
    pub fn load_or_default(root: &Path) -> Result<Self> {
        match Self::load(root) {
            Err(CenterError::NotInitialized) => Ok(Self::default()),
            other => other,
        }
    }

    /// Write `.ccenter/config.yaml` through a sibling tempfile so readers
    /// never see a partial file.
    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let dir = paths::ccenter_dir(root);
        std::fs::create_dir_all(&dir)?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(serde_yaml::to_string(self)?.as_bytes())?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Lay out `.ccenter/` under `root`: the skills directory plus a default
    /// config unless one exists. Returns whether the config was written.
    pub fn init(root: &Path) -> Result<bool> {
        std::fs::create_dir_all(paths::skills_dir(root))?;
        if paths::config_path(root).exists() {
            return Ok(false);
        }
        Self::default().save(root)?;
        Ok(true)
    }

    pub fn skills_path(&self, root: &Path) -> PathBuf {
        match &self.skills_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => root.join(dir),
            None => paths::skills_dir(root),
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let r = &self.reconciler;
        let s = &self.sources;

        if r.terminal_grace_ms == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "reconciler.terminal_grace_ms is 0: finished runs vanish before they can be seen".to_string(),
            });
        }
        if r.dedup_window_ms > 10_000 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "reconciler.dedup_window_ms={} (>10000 hides legitimate re-runs)",
                    r.dedup_window_ms
                ),
            });
        }
        if r.stale_after_minutes == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "reconciler.stale_after_minutes must be greater than 0".to_string(),
            });
        }
        if s.file_poll_ms < 100 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!("sources.file_poll_ms={} is very aggressive", s.file_poll_ms),
            });
        }
        if s.rpc_poll_ms < 250 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!("sources.rpc_poll_ms={} is very aggressive", s.rpc_poll_ms),
            });
        }
        if let Some(url) = &s.websocket_url {
            if !(url.starts_with("ws://") || url.starts_with("wss://")) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("sources.websocket_url '{url}' must start with ws:// or wss://"),
                });
            }
        }
        if let Some(url) = &s.rpc_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("sources.rpc_url '{url}' must start with http:// or https://"),
                });
            }
        }
        if s.websocket_url.is_none() && s.rpc_url.is_none() && s.state_file.is_none() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "only the default state file is watched: no websocket_url or rpc_url configured".to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.version, 1);
        assert_eq!(parsed.reconciler.dedup_window_ms, 2_000);
        assert_eq!(parsed.reconciler.terminal_grace_ms, 5_000);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = "reconciler:\n  terminal_grace_ms: 8000\nsources:\n  rpc_url: http://localhost:7000\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.reconciler.terminal_grace_ms, 8_000);
        assert_eq!(cfg.reconciler.stale_after_minutes, 30);
        assert_eq!(cfg.sources.rpc_poll_ms, 2_000);
        assert_eq!(cfg.sources.websocket_url.as_deref(), Some("ws://localhost:9876"));
        assert_eq!(cfg.server.port, 3171);
    }

    #[test]
    fn load_missing_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(CenterError::NotInitialized)
        ));
        assert_eq!(Config::load_or_default(dir.path()).unwrap().version, 1);
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::default();
        cfg.reconciler.dedup_window_ms = 1_500;
        cfg.save(dir.path()).unwrap();
        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.reconciler.dedup_window_ms, 1_500);
    }

    #[test]
    fn init_keeps_an_existing_config() {
        let dir = TempDir::new().unwrap();
        assert!(Config::init(dir.path()).unwrap());
        assert!(paths::skills_dir(dir.path()).is_dir());

        let mut cfg = Config::load(dir.path()).unwrap();
        cfg.server.port = 4000;
        cfg.save(dir.path()).unwrap();
        assert!(!Config::init(dir.path()).unwrap());
        assert_eq!(Config::load(dir.path()).unwrap().server.port, 4000);
    }

    #[test]
    fn validate_flags_bad_urls_and_zero_stale() {
        let mut cfg = Config::default();
        cfg.sources.websocket_url = Some("http://nope".to_string());
        cfg.reconciler.stale_after_minutes = 0;
        let warnings = cfg.validate();
        assert_eq!(
            warnings
                .iter()
                .filter(|w| w.level == WarnLevel::Error)
                .count(),
            2
        );
    }

    #[test]
    fn default_config_is_clean() {
        assert!(Config::default().validate().is_empty());
    }

    #[test]
    fn relative_skills_dir_resolves_against_root() {
        let mut cfg = Config::default();
        let root = Path::new("/tmp/project");
        assert_eq!(cfg.skills_path(root), root.join(".ccenter/skills"));
        cfg.skills_dir = Some(PathBuf::from("skills"));
        assert_eq!(cfg.skills_path(root), root.join("skills"));
    }
}
