pub mod clock;
pub mod config;
pub mod dedup;
pub mod error;
pub mod events;
pub mod paths;
pub mod reconciler;
pub mod registry;
pub mod render;
pub mod skill;
pub mod snapshot;
pub mod steps;
pub mod types;

pub use error::{CenterError, Result};
pub use reconciler::{Outcome, Reconciler, ScheduledRemoval};
