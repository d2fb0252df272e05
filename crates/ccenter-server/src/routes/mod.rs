pub mod config;
pub mod events;
pub mod jobs;
pub mod running;
pub mod skills;
pub mod view;
pub mod watch;
