//! rawhid command-line tool
//!
//! Configuration loading and the command implementations behind the
//! `rawhid` binary. Commands are generic over the USB host so they can run
//! against the in-memory host in tests.

pub mod commands;
pub mod config;

pub use config::{CliConfig, Overrides};
