//! `skill-stream`: typed client for the skill execution push stream.
//!
//! ```text
//! ws://host:port ──▶ pump task (connect, read, reconnect with backoff)
//!                        │  mpsc
//!                        ▼
//!                  SkillEventStream  ← futures::Stream<Item = Result<SkillMessage>>
//! ```

pub mod error;
pub mod stream;
pub mod types;

pub use error::SkillStreamError;
pub use stream::{next_backoff, parse_frame, SkillEventStream, StreamOptions};
pub use types::{SkillCompleted, SkillMessage, SkillProgress, SkillStarted, StepUpdate};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, SkillStreamError>;

/// Connect to the skill execution stream at `url`.
pub fn connect(url: &str, opts: StreamOptions) -> Result<SkillEventStream> {
    SkillEventStream::connect(url, opts)
}
