use thiserror::Error;

#[derive(Debug, Error)]
pub enum CenterError {
    #[error("not initialized: run 'ccenter config init'")]
    NotInitialized,

    #[error("invalid name '{0}': must contain only letters, digits, '-', '_', '.' or ':'")]
    InvalidName(String),

    #[error("skill not found: {0}")]
    SkillNotFound(String),

    #[error("execution not found: {0}")]
    ExecutionNotFound(String),

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("invalid skill definition {path}: {reason}")]
    InvalidSkill { path: String, reason: String },

    #[error("rpc call failed: {0}")]
    Rpc(String),

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CenterError>;
