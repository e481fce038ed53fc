//! Subcommand implementations.

pub mod logs;
pub mod serve;
pub mod users;
