//! CLI, configuration and output writing
//!
//! This crate provides the `rapla-ics` command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
