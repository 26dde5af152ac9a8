//! Application layer - use cases and services

pub mod commands;
pub mod report;
pub mod services;

pub use commands::{Cli, Commands, CommandExecutor};
pub use services::OracleSession;
