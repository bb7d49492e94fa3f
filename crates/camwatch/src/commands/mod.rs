//! Subcommand handlers.

pub mod check;
pub mod config_cmd;
pub mod run;
