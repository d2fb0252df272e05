use thiserror::Error;

#[derive(Debug, Error)]
pub enum SkillStreamError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse skill stream message: {source}\n  line: {line}")]
    Parse {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Invalid stream URL '{0}': expected ws:// or wss://")]
    InvalidUrl(String),
}
