pub mod config;
pub mod replay;
pub mod serve;
pub mod skills;
pub mod status;
